use thiserror::Error;

#[derive(Debug, Error)]
pub enum IrError {
    #[error(transparent)]
    Descriptor(#[from] desugar_classfile::Error),
    #[error("invalid method reference `{0}` (expected `holder#name(descriptor)`)")]
    InvalidMethodReference(String),
}
