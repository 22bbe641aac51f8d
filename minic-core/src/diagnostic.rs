//! Diagnostics produced by the pipeline phases.
//!
//! A diagnostic is plain data: it records which phase found a defect, how
//! severe it is, a stable code and a message. Phases never use diagnostics
//! to steer control flow; only the orchestrator looks at severities.
//!
//! Codes are grouped by phase:
//!
//! - **E0001-E0099**: lexical errors
//! - **E0100-E0199**: syntax errors
//! - **E0200-E0299**: semantic errors (and `W02xx` warnings)
//! - **E0300-E0399**: runtime errors

use serde::{Serialize, Serializer};

use crate::span::Span;

/// Pipeline phase, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Lexical,
    Syntax,
    Semantic,
    Execution,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Lexical => "lexical",
            Phase::Syntax => "syntax",
            Phase::Semantic => "semantic",
            Phase::Execution => "execution",
        }
    }
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Code {
    // Lexical
    InvalidCharacter = 1,
    UnterminatedString = 2,
    InvalidEscape = 3,
    UnterminatedComment = 4,
    InvalidNumber = 5,

    // Syntax
    UnexpectedToken = 100,
    UnmatchedDelimiter = 101,
    MissingTerminator = 102,
    ExpectedExpression = 103,
    ExpectedIdentifier = 104,
    InvalidAssignmentTarget = 105,
    NestingTooDeep = 106,
    NestedFunction = 107,

    // Semantic
    UndeclaredIdentifier = 200,
    Redeclaration = 201,
    TypeMismatch = 202,
    ArityMismatch = 203,
    UseBeforeDeclaration = 204,
    InvalidControlFlow = 205,
    NotCallable = 206,
    UnreachableCode = 207,
    UninitializedGlobal = 208,

    // Runtime
    DivisionByZero = 300,
    StackOverflow = 301,
    Timeout = 302,
    RuntimeType = 303,
    RuntimeNotCallable = 304,
    IntegerOverflow = 305,
    OutputLimit = 306,
    RuntimeArity = 307,
    ValueTooLarge = 308,
}

impl Code {
    /// Warnings are rendered with a `W` prefix, everything else with `E`.
    pub fn as_string(self) -> String {
        let prefix = match self {
            Code::UnreachableCode | Code::UninitializedGlobal => 'W',
            _ => 'E',
        };
        format!("{prefix}{:04}", self as u16)
    }
}

impl Serialize for Code {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_string())
    }
}

/// A single diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub phase: Phase,
    pub severity: Severity,
    pub code: Code,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(phase: Phase, code: Code, message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            phase,
            severity: Severity::Error,
            code,
            message: message.into(),
            span,
        }
    }

    pub fn warning(phase: Phase, code: Code, message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            phase,
            severity: Severity::Warning,
            code,
            message: message.into(),
            span,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl core::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{}:{}: {}[{}]: {}",
            self.phase,
            self.span.start,
            severity,
            self.code.as_string(),
            self.message
        )
    }
}

/// Wire form: the span is flattened into `line`/`column`/`offset`.
impl Serialize for Diagnostic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Diagnostic", 7)?;
        state.serialize_field("phase", &self.phase)?;
        state.serialize_field("severity", &self.severity)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("line", &self.span.start.line)?;
        state.serialize_field("column", &self.span.start.column)?;
        state.serialize_field("offset", &self.span.start.offset)?;
        state.end()
    }
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Position;

    #[test]
    fn formats_codes_by_severity() {
        assert_eq!(Code::InvalidCharacter.as_string(), "E0001");
        assert_eq!(Code::UndeclaredIdentifier.as_string(), "E0200");
        assert_eq!(Code::UnreachableCode.as_string(), "W0207");
        assert_eq!(Code::Timeout.as_string(), "E0302");
        assert_eq!(Code::ValueTooLarge.as_string(), "E0308");
    }

    #[test]
    fn serializes_flat_position() {
        let diag = Diagnostic::error(
            Phase::Semantic,
            Code::UndeclaredIdentifier,
            "undeclared identifier 'y'",
            Span::new(Position::new(1, 7, 6), 7),
        );
        let json = serde_json::to_value(&diag).expect("serialize");
        assert_eq!(json["phase"], "semantic");
        assert_eq!(json["severity"], "error");
        assert_eq!(json["code"], "E0200");
        assert_eq!(json["line"], 1);
        assert_eq!(json["column"], 7);
        assert_eq!(json["offset"], 6);
    }

    #[test]
    fn renders_human_readable_line() {
        let diag = Diagnostic::warning(
            Phase::Semantic,
            Code::UnreachableCode,
            "unreachable code",
            Span::new(Position::new(3, 2, 20), 25),
        );
        assert_eq!(
            diag.to_string(),
            "semantic:3:2: warning[W0207]: unreachable code"
        );
    }
}
