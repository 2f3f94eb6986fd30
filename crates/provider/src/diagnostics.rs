//! Diagnostics reported back to the host

use serde::Serialize;
use shellform_common::{Error, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A problem found while validating or applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    /// Attribute the diagnostic refers to, if any
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(summary, detail)
        }
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Diagnostic for a failed operation, summarized by error kind
    pub fn from_error(operation: &str, err: &Error) -> Self {
        let summary = match err.kind() {
            ErrorKind::Configuration => format!("Invalid configuration during {}", operation),
            ErrorKind::Resolution => format!("No command available for {}", operation),
            ErrorKind::Execution => format!("Command failed during {}", operation),
            ErrorKind::Internal => format!("Internal error during {}", operation),
        };
        Self::error(summary, err.to_string())
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// True when any diagnostic is an error
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}
