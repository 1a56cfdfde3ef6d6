use desugar_ir::{MethodRef, TypeRef};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// A signature mentions a rewritten type that has no conversion. Only an
    /// error when compiling the desugared library itself.
    #[error("{message}")]
    UnconvertibleType {
        ty: TypeRef,
        context: MethodRef,
        message: String,
    },
    /// The specification disagrees with the library classes.
    #[error("specification inconsistency: {0}")]
    SpecificationInconsistency(String),
    #[error("no definition for `{0}`")]
    MissingDefinition(TypeRef),
}

impl ConversionError {
    pub(crate) fn inconsistency(message: impl Into<String>) -> Self {
        ConversionError::SpecificationInconsistency(message.into())
    }
}
