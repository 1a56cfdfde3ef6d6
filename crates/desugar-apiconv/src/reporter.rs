use std::fmt;

use desugar_ir::{MethodRef, TypeRef};
use parking_lot::Mutex;

use crate::error::ConversionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Class the diagnostic is about.
    pub origin: Option<TypeRef>,
    /// Method the diagnostic is about.
    pub position: Option<MethodRef>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            origin: None,
            position: None,
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: TypeRef) -> Self {
        self.origin = Some(origin);
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: MethodRef) -> Self {
        self.position = Some(position);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        match (&self.origin, &self.position) {
            (_, Some(position)) => write!(f, " [{position}]"),
            (Some(origin), None) => write!(f, " [{origin}]"),
            (None, None) => Ok(()),
        }
    }
}

/// Collects the diagnostics of a pass. Every report is mirrored to `tracing`.
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Info => tracing::info!(target: "desugar.apiconv", "{diagnostic}"),
            Severity::Warning => tracing::warn!(target: "desugar.apiconv", "{diagnostic}"),
            Severity::Error => tracing::error!(target: "desugar.apiconv", "{diagnostic}"),
        }
        self.diagnostics.lock().push(diagnostic);
    }

    pub fn info(&self, diagnostic: Diagnostic) {
        self.report(Diagnostic {
            severity: Severity::Info,
            ..diagnostic
        });
    }

    pub fn warning(&self, diagnostic: Diagnostic) {
        self.report(Diagnostic {
            severity: Severity::Warning,
            ..diagnostic
        });
    }

    /// Records `error` and hands it back for the caller to propagate.
    pub fn fatal_error(&self, error: ConversionError, position: Option<MethodRef>) -> ConversionError {
        let mut diagnostic = Diagnostic::new(Severity::Error, error.to_string());
        diagnostic.position = position;
        self.report(diagnostic);
        error
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .lock()
            .iter()
            .any(|diagnostic| diagnostic.severity == Severity::Error)
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock())
    }
}
