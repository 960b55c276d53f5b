//! Positions and the user facing reports attached to them

use derive_more::Display;
use std::ops::Deref;
use thiserror::Error;

/// A place in the source, `file(line)` when printed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Display)]
#[display(fmt = "{}({})", file, line)]
pub struct Position {
    pub file: String,
    pub line: usize,
}

impl Position {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    #[error("expected {expected}, found {found}")]
    Mismatch { expected: String, found: String },

    #[error("unknown method '{0}', treated as an inline vector")]
    UnknownMethod(String),

    #[error("method '{0}' takes named parameters in parentheses")]
    ExpectedParameterList(String),

    #[error("method '{method}' is missing the required parameter '{param}'")]
    MissingParameter { method: String, param: String },

    #[error("parameter '{param}' of method '{method}' has no value, using an empty string")]
    EmptyParameter { method: String, param: String },

    #[error("unknown instruction '{0}'")]
    UnknownInstruction(String),

    #[error("unknown directive '.{0}'")]
    UnknownDirective(String),

    #[error("'{mnemonic}' needs an operand")]
    MissingOperand { mnemonic: &'static str },

    #[error("'{text}' is not a valid {tag}")]
    InvalidLiteral { tag: String, text: String },

    #[error("label '{0}' is already defined, keeping the first definition")]
    DuplicateLabel(String),

    #[error("label '{0}' is never defined, using offset 0")]
    UnresolvedLabel(String),

    #[error("gave up on the input after {0} attempts to place the same symbol")]
    RetryLimit(usize),

    #[error("cannot include '{0}'")]
    IncludeFailed(String),

    #[error("includes are nested deeper than {0} levels")]
    IncludeDepth(usize),

    #[error("{0} after the end of data is ignored")]
    AfterEnd(String),
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        use DiagnosticKind::*;
        match self {
            UnknownMethod(_)
            | MissingParameter { .. }
            | EmptyParameter { .. }
            | DuplicateLabel(_)
            | AfterEnd(_) => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display(fmt = "{}: {}: {}", position, severity, kind)]
pub struct Diagnostic {
    pub severity: Severity,
    pub position: Position,
    pub kind: DiagnosticKind,
}

/// Collects the diagnostics of one pipeline run in the order they were raised
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn report(&mut self, position: &Position, kind: DiagnosticKind) {
        let severity = kind.severity();
        match severity {
            Severity::Warning => tracing::warn!(%position, "{kind}"),
            Severity::Error => tracing::error!(%position, "{kind}"),
        }
        self.0.push(Diagnostic {
            severity,
            position: position.clone(),
            kind,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn append(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn kinds(&self) -> impl Iterator<Item = &DiagnosticKind> {
        self.0.iter().map(|d| &d.kind)
    }
}

impl Deref for Diagnostics {
    type Target = [Diagnostic];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
