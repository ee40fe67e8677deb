//! Human-readable outcome records shared by every engine.
//!
//! Engines never print. They return [`Diagnostic`] values in their reports and
//! mirror each one as a tracing event at the matching level, so the CLI decides
//! how to render them and tests can assert on them.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What a diagnostic is about. Internal classification only; the message is
/// the user-facing part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    NoCategories,
    UnreachableCategory,
    MissingReference,
    MalformedInclude,
    EmptyWildcard,
    InvalidSkillId,
    Reenabled,
    AutoDisabled,
    PersistFailed,
    Overridden,
    PathEscape,
    WriteFailed,
    TargetUpdated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn info(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::info!(?kind, "{message}");
        Self {
            severity: Severity::Info,
            kind,
            message,
        }
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!(?kind, "{message}");
        Self {
            severity: Severity::Warning,
            kind,
            message,
        }
    }

    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(?kind, "{message}");
        Self {
            severity: Severity::Error,
            kind,
            message,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "[{label}] {}", self.message)
    }
}
