#![forbid(unsafe_code)]

//! Machine-readable description of the desugared library and the type
//! rewriter derived from it.

mod error;
mod rewriter;
mod specification;
mod validation;

pub use crate::error::{SpecError, SpecValidationError, SpecWarning};
pub use crate::rewriter::{SpecificationTypeRewriter, TypeRewriter};
pub use crate::specification::{MachineSpecification, SpecificationBuilder};
pub use crate::validation::SpecDiagnostics;
