use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Diagnostic>;

/// Class of a fatal compiler diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    LoadFailed,
    SchemaInvalid,
    ExtensionTypeMismatch,
    NameCollision,
    WriteFailed,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use DiagnosticKind::*;
        match self {
            LoadFailed => write!(f, "LoadFailed"),
            SchemaInvalid => write!(f, "SchemaInvalid"),
            ExtensionTypeMismatch => write!(f, "ExtensionTypeMismatch"),
            NameCollision => write!(f, "NameCollision"),
            WriteFailed => write!(f, "WriteFailed"),
        }
    }
}

/// Compiler stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Load,
    Lower,
    Emit,
    Write,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Load => write!(f, "load"),
            Phase::Lower => write!(f, "lower"),
            Phase::Emit => write!(f, "emit"),
            Phase::Write => write!(f, "write"),
        }
    }
}

/// A fatal, structured compiler diagnostic.
///
/// Diagnostics are never recovered from: the first one aborts the run and is
/// printed with [`Diagnostic::render`].
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub phase: Phase,
    pub location: Option<String>,
    pub operation: Option<String>,
    pub received: Option<String>,
    pub expected: Option<String>,
    pub context: Vec<(String, String)>,
    pub hints: Vec<String>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, phase: Phase, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            phase,
            location: None,
            operation: None,
            received: None,
            expected: None,
            context: vec![],
            hints: vec![],
            source: None,
        }
    }

    pub fn load_failed(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::LoadFailed, Phase::Load, message).at(location)
    }

    pub fn schema_invalid(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::SchemaInvalid, Phase::Lower, message).at(location)
    }

    pub fn extension_mismatch(
        location: impl Into<String>,
        extension: &str,
        received: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::new(
            DiagnosticKind::ExtensionTypeMismatch,
            Phase::Lower,
            format!("vendor extension `{extension}` has an unexpected value"),
        )
        .at(location)
        .with_context("extension", extension)
        .received(received)
        .expected(expected)
    }

    pub fn name_collision(phase: Phase, name: &str, first: &str, second: &str) -> Self {
        Self::new(
            DiagnosticKind::NameCollision,
            phase,
            format!("identifier `{name}` is produced by more than one source"),
        )
        .with_context("first", first)
        .with_context("second", second)
        .with_hint("rename one of the sources so that their normalised names differ")
    }

    pub fn write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        let mut diagnostic = Self::new(
            DiagnosticKind::WriteFailed,
            Phase::Write,
            format!("failed to write artifact: {source}"),
        )
        .at(path);
        diagnostic.source = Some(Box::new(source));
        diagnostic
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn in_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn for_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn received(mut self, received: impl Into<String>) -> Self {
        self.received = Some(received.into());
        self
    }

    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Multi-line representation printed by the CLI.
    pub fn render(&self) -> String {
        let mut out = format!("error[{}]: {}\n", self.kind, self.message);
        out.push_str(&format!("  phase: {}\n", self.phase));
        if let Some(operation) = &self.operation {
            out.push_str(&format!("  operation: {operation}\n"));
        }
        if let Some(location) = &self.location {
            out.push_str(&format!("  location: {location}\n"));
        }
        for (key, value) in &self.context {
            out.push_str(&format!("  {key}: {value}\n"));
        }
        if let Some(received) = &self.received {
            out.push_str(&format!("  received: {received}\n"));
        }
        if let Some(expected) = &self.expected {
            out.push_str(&format!("  expected: {expected}\n"));
        }
        if let Some(source) = &self.source {
            out.push_str(&format!("  caused by: {source}\n"));
        }
        for hint in &self.hints {
            out.push_str(&format!("  hint: {hint}\n"));
        }
        out
    }
}

/// Short name of a JSON value's shape, used in `received` summaries.
pub fn value_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
