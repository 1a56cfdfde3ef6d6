use std::path::PathBuf;

use desugar_ir::{ClassName, MethodRef};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("failed to read specification {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse specification: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid specification: {}", join_errors(.0))]
    Validation(Vec<SpecValidationError>),
}

fn join_errors(errors: &[SpecValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Non-fatal findings of [`crate::MachineSpecification::validate`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecWarning {
    #[error("`{ty}` listed in `{section}` has no definition")]
    MissingDefinition {
        ty: ClassName,
        section: &'static str,
    },
    #[error("`{ty}` has a custom conversion and is also listed as a wrapper; the custom conversion wins")]
    CustomConversionShadowsWrapper { ty: ClassName },
    #[error("`{ty}` listed in `{section}` is not a rewritten type")]
    NotRewritten {
        ty: ClassName,
        section: &'static str,
    },
}

/// Fatal findings of [`crate::MachineSpecification::validate`]: the
/// specification disagrees with the library it describes.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecValidationError {
    #[error("wrapper type `{ty}` is a final class and cannot be wrapped")]
    FinalWrapperType { ty: ClassName },
    #[error(
        "enum `{ty}` declares constants {expected:?} but its desugared counterpart `{desugared}` declares {found:?}"
    )]
    EnumConstantMismatch {
        ty: ClassName,
        desugared: ClassName,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("`{subwrapper}` cannot be a subwrapper of `{ty}`: {reason}")]
    InvalidSubwrapper {
        ty: ClassName,
        subwrapper: ClassName,
        reason: &'static str,
    },
    #[error("generic conversion for `{method}` lists {found} entries, expected {expected}")]
    GenericConversionArity {
        method: MethodRef,
        expected: usize,
        found: usize,
    },
}
