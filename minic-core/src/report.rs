//! Wire shape of a pipeline run.
//!
//! Field order in these structs is the key order of the JSON object, so
//! `phases` always serializes as `lexical, syntax, semantic, execution`.

use serde::Serialize;
use serde_json::Value as Json;

use crate::diagnostic::{Diagnostic, has_errors};
use crate::error::CoreError;
use crate::interpreter::{ExecutionOutcome, ExecutionStatus};
use crate::lexer::Token;
use crate::scope::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    Ok,
    Error,
    Timeout,
    Skipped,
}

impl PhaseStatus {
    fn from_diagnostics(diagnostics: &[Diagnostic]) -> Self {
        if has_errors(diagnostics) {
            PhaseStatus::Error
        } else {
            PhaseStatus::Ok
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LexicalReport {
    pub status: PhaseStatus,
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

impl LexicalReport {
    pub fn new(tokens: Vec<Token>, diagnostics: Vec<Diagnostic>) -> Self {
        LexicalReport {
            status: PhaseStatus::from_diagnostics(&diagnostics),
            tokens,
            diagnostics,
        }
    }
}

/// Response of the standalone lexical analysis.
#[derive(Debug, Clone, Serialize)]
pub struct LexicalAnalysis {
    #[serde(flatten)]
    pub report: LexicalReport,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyntaxReport {
    pub status: PhaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ast_summary: Option<Json>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SyntaxReport {
    pub fn new(ast_summary: Json, diagnostics: Vec<Diagnostic>) -> Self {
        SyntaxReport {
            status: PhaseStatus::from_diagnostics(&diagnostics),
            ast_summary: Some(ast_summary),
            diagnostics,
        }
    }

    pub fn skipped() -> Self {
        SyntaxReport {
            status: PhaseStatus::Skipped,
            ast_summary: None,
            diagnostics: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SemanticReport {
    pub status: PhaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<Symbol>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SemanticReport {
    pub fn new(symbols: Vec<Symbol>, diagnostics: Vec<Diagnostic>) -> Self {
        SemanticReport {
            status: PhaseStatus::from_diagnostics(&diagnostics),
            symbols: Some(symbols),
            diagnostics,
        }
    }

    pub fn skipped() -> Self {
        SemanticReport {
            status: PhaseStatus::Skipped,
            symbols: None,
            diagnostics: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub status: PhaseStatus,
    /// Present iff the program ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ExecutionReport {
    pub fn skipped() -> Self {
        ExecutionReport {
            status: PhaseStatus::Skipped,
            output: None,
            diagnostics: Vec::new(),
        }
    }
}

impl From<ExecutionOutcome> for ExecutionReport {
    fn from(outcome: ExecutionOutcome) -> Self {
        let status = match outcome.status {
            ExecutionStatus::Ok => PhaseStatus::Ok,
            ExecutionStatus::Timeout => PhaseStatus::Timeout,
            ExecutionStatus::Error => PhaseStatus::Error,
        };
        ExecutionReport {
            status,
            output: Some(outcome.output),
            diagnostics: outcome.diagnostics,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Phases {
    pub lexical: LexicalReport,
    pub syntax: SyntaxReport,
    pub semantic: SemanticReport,
    pub execution: ExecutionReport,
}

impl Phases {
    /// Lexing always runs; everything after it starts out skipped.
    pub fn new(lexical: LexicalReport) -> Self {
        Phases {
            lexical,
            syntax: SyntaxReport::skipped(),
            semantic: SemanticReport::skipped(),
            execution: ExecutionReport::skipped(),
        }
    }

    pub fn all_ok(&self) -> bool {
        [
            self.lexical.status,
            self.syntax.status,
            self.semantic.status,
            self.execution.status,
        ]
        .iter()
        .all(|status| *status == PhaseStatus::Ok)
    }

    /// Diagnostics of every phase, in phase order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.lexical
            .diagnostics
            .iter()
            .chain(&self.syntax.diagnostics)
            .chain(&self.semantic.diagnostics)
            .chain(&self.execution.diagnostics)
    }
}

/// Milliseconds spent per phase; phases that did not run are omitted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ElapsedMs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub syntax: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<f64>,
    pub total: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Metrics {
    pub elapsed_ms: ElapsedMs,
    pub token_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_count: Option<u64>,
    pub lines_of_code: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub success: bool,
    pub phases: Phases,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
}

impl PipelineResult {
    pub fn output(&self) -> Option<&str> {
        self.phases.execution.output.as_deref()
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
