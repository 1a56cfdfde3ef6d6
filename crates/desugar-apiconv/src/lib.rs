#![forbid(unsafe_code)]

//! Conversion of values crossing the boundary between program code, which
//! sees desugared library types, and the platform library, which still uses
//! the original types.
//!
//! Calls into the library get their arguments and results converted,
//! program overrides of library methods get callbacks with the library's
//! signature, and the conversions themselves are synthesized on demand as
//! wrapper classes, enum and array conversions. [`ApiConversionPass`] runs
//! everything over a [`desugar_ir::ClassGraph`]; [`apply_type_lens`] then
//! maps the result onto runtime types.

mod array_conversion;
mod call_site;
mod callback;
mod context;
mod decision;
mod enum_conversion;
mod error;
mod lens;
mod options;
mod pass;
mod preceding;
mod reporter;
mod synthetic_items;
mod wrapper;

pub use crate::call_site::{box_method, unbox_method};
pub use crate::context::{ConversionContext, SynthesizedItems};
pub use crate::decision::ConversionDirection;
pub use crate::error::ConversionError;
pub use crate::lens::{apply_type_lens, find_vivified_references, VivifiedReference};
pub use crate::options::ConversionOptions;
pub use crate::pass::{ApiConversionPass, PassSummary};
pub use crate::preceding::{
    BackportedMethods, InterfaceMethodDesugaring, PrecedingDesugaring, RetargetedMethods,
};
pub use crate::reporter::{Diagnostic, Reporter, Severity};
pub use crate::wrapper::WrapperConversions;
