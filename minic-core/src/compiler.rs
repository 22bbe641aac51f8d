use std::time::Instant;

use tracing::debug;

use crate::diagnostic::has_errors;
use crate::interpreter::{ExecutionLimits, execute};
use crate::lexer::tokenize;
use crate::parser::parse;
use crate::report::{
    ExecutionReport, LexicalAnalysis, LexicalReport, Metrics, Phases, PipelineResult,
    SemanticReport, SyntaxReport,
};
use crate::semantic::analyze;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub limits: ExecutionLimits,
    pub include_metrics: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            limits: ExecutionLimits::default(),
            include_metrics: true,
        }
    }
}

/// Run the whole pipeline over `source`.
///
/// Phases run in order and the first one that reports an error stops the
/// run; the phases after it are reported as skipped. Warnings never stop
/// the run.
#[tracing::instrument(level = "debug", skip_all, fields(bytes = source.len()))]
pub fn compile(source: &str, options: &CompileOptions) -> PipelineResult {
    let started = Instant::now();
    let mut metrics = Metrics {
        lines_of_code: lines_of_code(source),
        ..Metrics::default()
    };

    let lexed = timed(&mut metrics.elapsed_ms.lexical, || tokenize(source));
    metrics.token_count = lexed.tokens.len();
    debug!(
        tokens = lexed.tokens.len(),
        diagnostics = lexed.diagnostics.len(),
        "lexical phase finished"
    );
    let parsed = (!has_errors(&lexed.diagnostics))
        .then(|| timed(&mut metrics.elapsed_ms.syntax, || parse(&lexed.tokens)));
    let mut phases = Phases::new(LexicalReport::new(lexed.tokens, lexed.diagnostics));

    let Some(parsed) = parsed else {
        return finish(phases, metrics, started, options);
    };
    metrics.node_count = Some(parsed.program.node_count());
    debug!(
        nodes = parsed.program.node_count(),
        diagnostics = parsed.diagnostics.len(),
        "syntax phase finished"
    );
    let syntax_failed = has_errors(&parsed.diagnostics);
    phases.syntax = SyntaxReport::new(parsed.program.summary(), parsed.diagnostics);
    if syntax_failed {
        return finish(phases, metrics, started, options);
    }

    let analyzed = timed(&mut metrics.elapsed_ms.semantic, || analyze(&parsed.program));
    debug!(
        symbols = analyzed.symbols.len(),
        diagnostics = analyzed.diagnostics.len(),
        "semantic phase finished"
    );
    let semantic_failed = has_errors(&analyzed.diagnostics);
    phases.semantic = SemanticReport::new(analyzed.symbols, analyzed.diagnostics);
    if semantic_failed {
        return finish(phases, metrics, started, options);
    }

    let outcome = timed(&mut metrics.elapsed_ms.execution, || {
        execute(&parsed.program, &options.limits)
    });
    metrics.step_count = Some(outcome.steps);
    debug!(
        steps = outcome.steps,
        status = ?outcome.status,
        output_bytes = outcome.output.len(),
        "execution phase finished"
    );
    phases.execution = ExecutionReport::from(outcome);
    finish(phases, metrics, started, options)
}

/// Lex `source` on its own.
pub fn analyze_lexical(source: &str) -> LexicalAnalysis {
    let lexed = tokenize(source);
    LexicalAnalysis {
        count: lexed.tokens.len(),
        report: LexicalReport::new(lexed.tokens, lexed.diagnostics),
    }
}

/// Lex and parse `source`. The parser runs even when lexing reported
/// errors; the diagnostics of both phases are returned together.
pub fn analyze_syntax(source: &str) -> SyntaxReport {
    let lexed = tokenize(source);
    let parsed = parse(&lexed.tokens);
    let mut diagnostics = lexed.diagnostics;
    diagnostics.extend(parsed.diagnostics);
    SyntaxReport::new(parsed.program.summary(), diagnostics)
}

fn finish(
    phases: Phases,
    mut metrics: Metrics,
    started: Instant,
    options: &CompileOptions,
) -> PipelineResult {
    metrics.elapsed_ms.total = millis_since(started);
    let success = phases.all_ok();
    debug!(success, total_ms = metrics.elapsed_ms.total, "pipeline finished");
    PipelineResult {
        success,
        phases,
        metrics: options.include_metrics.then_some(metrics),
    }
}

fn timed<T>(slot: &mut Option<f64>, f: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let value = f();
    *slot = Some(millis_since(started));
    value
}

fn millis_since(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

fn lines_of_code(source: &str) -> usize {
    source.split('\n').count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Code;
    use crate::report::PhaseStatus;

    #[test]
    fn successful_run_reports_every_phase() {
        let result = compile("let x = 1 + 2;\nprint(x);", &CompileOptions::default());
        assert!(result.success);
        assert_eq!(result.output(), Some("3\n"));

        let metrics = result.metrics.as_ref().expect("metrics");
        assert_eq!(metrics.token_count, 13);
        assert_eq!(metrics.lines_of_code, 2);
        assert!(metrics.node_count.is_some());
        assert!(metrics.step_count.is_some_and(|steps| steps > 0));
        assert!(metrics.elapsed_ms.execution.is_some());
    }

    #[test]
    fn lexical_error_skips_the_rest() {
        let result = compile("let x = 1 @ 2;", &CompileOptions::default());
        assert!(!result.success);
        assert_eq!(result.phases.lexical.status, PhaseStatus::Error);
        assert_eq!(result.phases.syntax.status, PhaseStatus::Skipped);
        assert_eq!(result.phases.execution.status, PhaseStatus::Skipped);
        assert!(result.phases.syntax.ast_summary.is_none());

        let metrics = result.metrics.expect("metrics");
        assert!(metrics.node_count.is_none());
        assert!(metrics.elapsed_ms.syntax.is_none());
    }

    #[test]
    fn syntax_error_keeps_best_effort_tree() {
        let result = compile("let x = ;\nprint(1);", &CompileOptions::default());
        assert_eq!(result.phases.syntax.status, PhaseStatus::Error);
        assert!(result.phases.syntax.ast_summary.is_some());
        assert_eq!(result.phases.semantic.status, PhaseStatus::Skipped);
        assert!(result.output().is_none());
    }

    #[test]
    fn warnings_do_not_stop_the_run() {
        let result = compile("print(g); let g = 2;", &CompileOptions::default());
        assert!(result.success);
        assert_eq!(result.phases.semantic.diagnostics.len(), 1);
        assert_eq!(result.phases.semantic.diagnostics[0].code, Code::UninitializedGlobal);
        assert_eq!(result.output(), Some("nil\n"));
    }

    #[test]
    fn runtime_error_is_not_success() {
        let result = compile("print(1); print(1 / 0);", &CompileOptions::default());
        assert!(!result.success);
        assert_eq!(result.phases.execution.status, PhaseStatus::Error);
        assert_eq!(result.output(), Some("1\n"));
    }

    #[test]
    fn metrics_can_be_left_out() {
        let options = CompileOptions {
            include_metrics: false,
            ..CompileOptions::default()
        };
        let result = compile("print(1);", &options);
        assert!(result.metrics.is_none());
        let json = serde_json::to_value(&result).expect("serialize");
        assert!(json.get("metrics").is_none());
    }

    #[test]
    fn standalone_syntax_analysis_survives_lexical_errors() {
        let report = analyze_syntax("let a = \"x\\q\";\nprint(a);");
        assert_eq!(report.status, PhaseStatus::Error);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].code, Code::InvalidEscape);
        let summary = report.ast_summary.expect("summary");
        assert_eq!(summary["body"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn standalone_lexical_analysis_counts_tokens() {
        let analysis = analyze_lexical("print(1);");
        assert_eq!(analysis.count, 6);
        assert_eq!(analysis.report.status, PhaseStatus::Ok);
        let json = serde_json::to_value(&analysis).expect("serialize");
        assert_eq!(json["count"], 6);
        assert_eq!(json["tokens"][0]["kind"], "PRINT");
    }
}
