#![forbid(unsafe_code)]

//! JVM descriptor grammar and access flags shared by the desugaring crates.

pub mod access;
mod descriptor;
mod error;

pub use crate::access::AccessFlags;
pub use crate::descriptor::{parse_field_descriptor, parse_method_descriptor};
pub use crate::descriptor::{BaseType, FieldType, MethodDescriptor, ReturnType};
pub use crate::error::{Error, Result};
