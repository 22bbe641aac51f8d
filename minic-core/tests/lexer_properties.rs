//! Property-based tests for the lexer and parser.
//!
//! Uses proptest to generate source text and check that every character is
//! accounted for, that re-lexing a token stream is stable and that the
//! parser nests spans properly.

use std::collections::HashSet;

use minic_core::Code;
use minic_core::ast::{Expr, ExprKind, Stmt, StmtKind};
use minic_core::lexer::{TokenKind, tokenize};
use minic_core::parser::parse;
use minic_core::span::Span;
use proptest::prelude::*;

/// Source text over an alphabet without strings or comments, so every byte
/// is either part of a token, whitespace, or an invalid character.
fn plain_source() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            "a", "b", "x1", "_y", "let", "print", "while", "0", "42", "3.5", "7.", "+", "-", "*",
            "%", "=", "==", "!", "!=", "<", "<=", ">", ">=", "&&", "||", "&", "|", "(", ")",
            "{", "}", ";", ",", " ", "\n", "\t", "@", "#", "$", "é",
        ]),
        0..40,
    )
    .prop_map(|parts| parts.concat())
}

/// Strategy for small, well-formed expressions.
fn expr() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        (0u32..1000).prop_map(|n| n.to_string()),
        Just("2.5".to_string()),
        Just("true".to_string()),
        Just("nil".to_string()),
        Just("\"s\\n\"".to_string()),
        prop::sample::select(vec!["a", "b", "count"]).prop_map(str::to_string),
    ];
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            (
                inner.clone(),
                prop::sample::select(vec!["+", "-", "*", "/", "%", "==", "<", "&&", "||"]),
                inner.clone()
            )
                .prop_map(|(l, op, r)| format!("{l} {op} {r}")),
            inner.clone().prop_map(|e| format!("({e})")),
            inner.clone().prop_map(|e| format!("-{e}")),
            prop::collection::vec(inner, 0..3)
                .prop_map(|args| format!("f({})", args.join(", "))),
        ]
    })
}

/// Strategy for small, well-formed programs.
fn program() -> impl Strategy<Value = String> {
    let stmt = prop_oneof![
        expr().prop_map(|e| format!("let a = {e};")),
        expr().prop_map(|e| format!("print({e});")),
        expr().prop_map(|e| format!("b = {e};")),
        (expr(), expr()).prop_map(|(c, e)| format!("if ({c}) {{ print({e}); }} else {{ a = 1; }}")),
        expr().prop_map(|c| format!("while ({c}) {{ break; }}")),
        expr().prop_map(|e| format!("func f(x, int y) {{ return {e}; }}")),
    ];
    prop::collection::vec(stmt, 0..6).prop_map(|stmts| stmts.join("\n  /* c */ "))
}

fn line_and_column(source: &str, offset: usize) -> (u32, u32) {
    let before = &source[..offset];
    let line = before.matches('\n').count() as u32 + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() as u32 + 1;
    (line, column)
}

/// Collects every `(parent, child)` pair whose child span escapes its parent.
#[derive(Default)]
struct SpanNesting {
    escapes: Vec<(Span, Span)>,
}

impl SpanNesting {
    fn enclose(&mut self, parent: Span, child: Span) {
        if !parent.contains(&child) {
            self.escapes.push((parent, child));
        }
    }

    fn stmt(&mut self, parent: Span, stmt: &Stmt) {
        self.enclose(parent, stmt.span);
        let here = stmt.span;
        match &stmt.kind {
            StmtKind::VarDecl { init, .. } => {
                if let Some(init) = init {
                    self.expr(here, init);
                }
            }
            StmtKind::Expr(expr) | StmtKind::Print(expr) => self.expr(here, expr),
            StmtKind::Block(block) => {
                for inner in &block.stmts {
                    self.stmt(block.span, inner);
                }
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.expr(here, cond);
                self.stmt(here, then_branch);
                if let Some(else_branch) = else_branch {
                    self.stmt(here, else_branch);
                }
            }
            StmtKind::While { cond, body } => {
                self.expr(here, cond);
                self.stmt(here, body);
            }
            StmtKind::Function(func) => {
                self.enclose(here, func.body.span);
                for inner in &func.body.stmts {
                    self.stmt(func.body.span, inner);
                }
            }
            StmtKind::Return(Some(value)) => self.expr(here, value),
            StmtKind::Return(None) | StmtKind::Break | StmtKind::Continue => {}
        }
    }

    fn expr(&mut self, parent: Span, expr: &Expr) {
        self.enclose(parent, expr.span);
        let here = expr.span;
        match &expr.kind {
            ExprKind::Literal(_) | ExprKind::Identifier(_) => {}
            ExprKind::Assign { value, .. } => self.expr(here, value),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(here, lhs);
                self.expr(here, rhs);
            }
            ExprKind::Unary { operand, .. } => self.expr(here, operand),
            ExprKind::Call { callee, args } => {
                self.expr(here, callee);
                for arg in args {
                    self.expr(here, arg);
                }
            }
        }
    }
}

proptest! {
    /// Every character is in a token, whitespace, or a reported invalid character.
    #[test]
    fn tokens_cover_the_source(source in plain_source()) {
        let result = tokenize(&source);

        let eofs = result.tokens.iter().filter(|t| t.kind == TokenKind::Eof).count();
        prop_assert_eq!(eofs, 1);
        prop_assert_eq!(result.tokens.last().map(|t| t.kind), Some(TokenKind::Eof));

        let invalid: HashSet<u32> = result
            .diagnostics
            .iter()
            .filter(|d| d.code == Code::InvalidCharacter)
            .map(|d| d.span.start.offset)
            .collect();

        let mut cursor = 0usize;
        for token in &result.tokens {
            let start = token.span.start.offset as usize;
            prop_assert!(start >= cursor, "tokens overlap at {}", start);
            for (offset, ch) in source[cursor..start].char_indices() {
                let offset = cursor + offset;
                prop_assert!(
                    ch.is_whitespace() || invalid.contains(&(offset as u32)),
                    "unaccounted {:?} at {}", ch, offset
                );
            }
            prop_assert_eq!(&source[start..token.span.end as usize], token.lexeme.as_str());
            cursor = token.span.end as usize;
        }
        prop_assert_eq!(cursor, source.len());
    }

    /// Token positions agree with the source text.
    #[test]
    fn positions_match_offsets(source in plain_source()) {
        for token in tokenize(&source).tokens {
            let (line, column) = line_and_column(&source, token.span.start.offset as usize);
            prop_assert_eq!((token.span.start.line, token.span.start.column), (line, column));
        }
    }

    /// Re-lexing the lexemes joined by single spaces parses to the same tree.
    #[test]
    fn relexing_is_idempotent(source in program()) {
        let first = tokenize(&source);
        prop_assert!(first.diagnostics.is_empty(), "{:?}", first.diagnostics);
        let parsed = parse(&first.tokens);
        prop_assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);

        let joined = first
            .tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| t.lexeme.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let second = tokenize(&joined);
        prop_assert!(second.diagnostics.is_empty());
        prop_assert_eq!(second.tokens.len(), first.tokens.len());
        let reparsed = parse(&second.tokens);
        prop_assert!(reparsed.diagnostics.is_empty());
        prop_assert_eq!(reparsed.program.summary(), parsed.program.summary());
    }

    /// Every node's span lies inside the span of the node that contains it.
    #[test]
    fn child_spans_nest_in_parent_spans(source in program()) {
        let lexed = tokenize(&source);
        let parsed = parse(&lexed.tokens);
        prop_assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);

        let mut nesting = SpanNesting::default();
        for item in &parsed.program.items {
            nesting.stmt(parsed.program.span, item);
        }
        prop_assert!(nesting.escapes.is_empty(), "{:?}", nesting.escapes);
    }
}
