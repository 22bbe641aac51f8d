//! End-to-end scenarios for the compile pipeline.

use std::time::{Duration, Instant};

use minic_core::lexer::TokenKind;
use minic_core::{Code, CompileOptions, ExecutionLimits, PhaseStatus, Severity, compile};

fn run(source: &str) -> minic_core::PipelineResult {
    compile(source, &CompileOptions::default())
}

#[test]
fn declares_adds_and_prints() {
    let result = run("let x = 1 + 2; print(x);");

    let kinds: Vec<_> = result.phases.lexical.tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Let,
            TokenKind::Ident,
            TokenKind::Equal,
            TokenKind::Number,
            TokenKind::Plus,
            TokenKind::Number,
            TokenKind::Semicolon,
            TokenKind::Print,
            TokenKind::LParen,
            TokenKind::Ident,
            TokenKind::RParen,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
    assert_eq!(result.phases.lexical.tokens[1].lexeme, "x");
    assert_eq!(result.phases.lexical.tokens[3].lexeme, "1");
    assert!(result.phases.semantic.diagnostics.is_empty());
    assert_eq!(result.output(), Some("3\n"));
    assert!(result.success);
}

#[test]
fn undeclared_identifier_skips_execution() {
    let result = run("print(y);");

    let semantic = &result.phases.semantic.diagnostics;
    assert_eq!(semantic.len(), 1);
    assert_eq!(semantic[0].message, "undeclared identifier 'y'");
    assert_eq!(semantic[0].code, Code::UndeclaredIdentifier);
    assert_eq!(semantic[0].span.start.line, 1);
    assert_eq!(result.phases.execution.status, PhaseStatus::Skipped);
    assert!(result.output().is_none());
    assert!(!result.success);

    let json = serde_json::to_value(&result).expect("serialize");
    assert!(json["phases"]["execution"].get("output").is_none());
    assert_eq!(json["phases"]["execution"]["status"], "skipped");
    assert!(json["metrics"].get("step_count").is_none());
}

#[test]
fn undeclared_identifier_in_larger_program() {
    let result = run(
        "func twice(n) { return n * 2; }\n\
         let total = twice(4);\n\
         print(totl);\n",
    );
    let semantic = &result.phases.semantic.diagnostics;
    assert_eq!(semantic.len(), 1);
    assert_eq!(semantic[0].message, "undeclared identifier 'totl'");
    assert_eq!(
        (semantic[0].span.start.line, semantic[0].span.start.column),
        (3, 7)
    );
}

#[test]
fn calls_user_function() {
    let result = run("func add(a, b) { return a + b; } print(add(2, 3));");
    assert_eq!(result.output(), Some("5\n"));
    assert_eq!(result.phases.diagnostics().count(), 0);
    assert!(result.success);
}

#[test]
fn infinite_loop_times_out() {
    let options = CompileOptions {
        limits: ExecutionLimits {
            step_budget: 100_000,
            ..ExecutionLimits::default()
        },
        ..CompileOptions::default()
    };
    let started = Instant::now();
    let result = compile("while (true) { }", &options);

    assert!(started.elapsed() < options.limits.timeout + Duration::from_secs(1));
    assert_eq!(result.phases.execution.status, PhaseStatus::Timeout);
    let runtime = &result.phases.execution.diagnostics;
    assert_eq!(runtime.len(), 1);
    assert_eq!(runtime[0].code, Code::Timeout);
    assert_eq!(result.output(), Some(""));
    assert!(!result.success);
}

#[test]
fn phases_serialize_in_fixed_order() {
    let result = run("let x = 1; print(x);");
    let text = serde_json::to_string(&result).expect("serialize");
    let phases_at = text.find("\"phases\"").expect("phases");
    let keys = ["\"lexical\":", "\"syntax\":", "\"semantic\":", "\"execution\":"];
    let positions: Vec<_> = keys
        .iter()
        .map(|key| phases_at + text[phases_at..].find(key).expect("phase key"))
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn diagnostics_carry_their_phase() {
    let lexical = run("let s = \"open;");
    assert!(
        lexical
            .phases
            .diagnostics()
            .all(|d| d.phase == minic_core::Phase::Lexical)
    );

    let syntax = run("let = 4;");
    assert!(syntax.phases.diagnostics().all(|d| d.phase == minic_core::Phase::Syntax));

    let runtime = run("print(10 % 0);");
    assert!(
        runtime
            .phases
            .diagnostics()
            .all(|d| d.phase == minic_core::Phase::Execution)
    );
}

#[test]
fn syntax_recovery_reports_each_bad_statement_once() {
    let result = run("let a = ;\nlet b = 2\nprint(a b);\nprint(3);");
    assert_eq!(result.phases.lexical.status, PhaseStatus::Ok);
    assert_eq!(result.phases.syntax.status, PhaseStatus::Error);
    let lines: Vec<_> = result
        .phases
        .syntax
        .diagnostics
        .iter()
        .map(|d| d.span.start.line)
        .collect();
    assert_eq!(lines, vec![1, 3, 3]);
}

#[test]
fn warnings_are_reported_but_do_not_block() {
    let result = run("func f() { return 1; print(0); }\nprint(f());");
    assert!(result.success);
    let warnings: Vec<_> = result
        .phases
        .semantic
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].code.as_string(), "W0207");
    assert_eq!(result.output(), Some("1\n"));
}

#[test]
fn metrics_describe_the_run() {
    let result = run("let i = 0;\nwhile (i < 3) { i = i + 1; }\nprint(i);\n");
    let metrics = result.metrics.expect("metrics");
    assert_eq!(metrics.lines_of_code, 4);
    assert_eq!(metrics.token_count, result.phases.lexical.tokens.len());
    assert!(metrics.node_count.is_some_and(|n| n > 10));
    assert!(metrics.step_count.is_some_and(|n| n > 3));
    let elapsed = &metrics.elapsed_ms;
    assert!(elapsed.lexical.is_some() && elapsed.syntax.is_some());
    assert!(elapsed.semantic.is_some() && elapsed.execution.is_some());
}

#[test]
fn runaway_string_growth_is_a_runtime_error() {
    let result = run(
        "let s = \"abcdefgh\"; let i = 0; while (i < 40) { s = s + s; i = i + 1; } print(i);",
    );
    assert!(!result.success);
    assert_eq!(result.phases.semantic.status, PhaseStatus::Ok);
    assert_eq!(result.phases.execution.status, PhaseStatus::Error);
    let runtime = &result.phases.execution.diagnostics;
    assert_eq!(runtime.len(), 1);
    assert_eq!(runtime[0].code, Code::ValueTooLarge);
    assert_eq!(result.output(), Some(""));
}

#[test]
fn concurrent_runs_keep_their_output_apart() {
    let programs: Vec<String> = (0..8)
        .map(|n| format!("let i = 0; while (i < 200) {{ print({n}); i = i + 1; }}"))
        .collect();
    let outputs: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = programs
            .iter()
            .map(|source| scope.spawn(move || run(source)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                let result = handle.join().expect("pipeline thread");
                assert!(result.success);
                result.output().unwrap_or_default().to_string()
            })
            .collect()
    });
    for (n, output) in outputs.iter().enumerate() {
        assert_eq!(*output, format!("{n}\n").repeat(200));
    }
}
