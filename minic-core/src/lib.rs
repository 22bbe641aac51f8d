//! Core of the minic compile-and-run service.
//!
//! A request's source text goes through four phases, strictly in order:
//!
//!   source text
//!     -> lexer        (tokens)
//!     -> parser       (syntax tree, with error recovery)
//!     -> semantic     (scopes, types, control flow)
//!     -> interpreter  (bounded tree-walking execution)
//!
//! [`compiler::compile`] drives the phases and assembles the
//! [`report::PipelineResult`] that the CLI prints and the HTTP server
//! returns. Nothing in this crate keeps state between calls.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod span;
pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod lexer;
pub mod parser;
pub mod ast;

// ---------------------------------------------------------------------
// Semantic layers: types, scopes, analysis
// ---------------------------------------------------------------------

pub mod types;
pub mod scope;
pub mod semantic;

// ---------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------

pub mod value;
pub mod interpreter;

// ---------------------------------------------------------------------
// Orchestration, reports and bundled samples
// ---------------------------------------------------------------------

pub mod compiler;
pub mod report;
pub mod samples;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{CompileOptions, analyze_lexical, analyze_syntax, compile};
pub use diagnostic::{Code, Diagnostic, Phase, Severity};
pub use error::CoreError;
pub use interpreter::ExecutionLimits;
pub use report::{PhaseStatus, PipelineResult};
pub use samples::{Sample, load_samples};
