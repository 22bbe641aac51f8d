//! Parser for minic.
//!
//! Statements are parsed by recursive descent, expressions by precedence
//! climbing. A production that cannot continue records one diagnostic and
//! unwinds to the nearest statement, which then discards tokens up to a
//! statement boundary and resumes. The tree built so far is always
//! returned.

use crate::ast::{
    BinaryOp, Block, Expr, ExprKind, FunctionDecl, Ident, Literal, Param, Program, Stmt,
    StmtKind, TypeName, UnaryOp,
};
use crate::diagnostic::{Code, Diagnostic, Phase};
use crate::lexer::{Token, TokenKind, unescape};
use crate::span::{Position, Span};

/// Maximum combined nesting of statements and expressions.
pub const MAX_NESTING: usize = 128;

#[derive(Debug)]
pub struct ParseResult {
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
}

/// Marker for "a diagnostic was recorded, unwind to the statement level".
#[derive(Debug)]
struct ParseError;

type PResult<T> = Result<T, ParseError>;

pub fn parse(tokens: &[Token]) -> ParseResult {
    let eof_pos = tokens
        .last()
        .map(|t| Position::new(t.span.start.line, t.span.start.column, t.span.end))
        .unwrap_or(Position::new(1, 1, 0));
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        eof: Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            span: Span::point(eof_pos),
        },
        diagnostics: Vec::new(),
    };
    let program = parser.parse_program();
    ParseResult {
        program,
        diagnostics: parser.diagnostics,
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    eof: Token,
    diagnostics: Vec<Diagnostic>,
}

impl<'t> Parser<'t> {
    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn parse_program(&mut self) -> Program {
        let start = self.peek().span;
        let mut items = Vec::new();
        while !self.at(TokenKind::Eof) {
            if let Some(stmt) = self.statement_with_recovery() {
                items.push(stmt);
            }
        }
        Program {
            items,
            span: start.to(self.peek().span),
        }
    }

    /// Parse one statement; on failure synchronize and return `None`.
    fn statement_with_recovery(&mut self) -> Option<Stmt> {
        let start = self.pos;
        match self.parse_stmt() {
            Ok(stmt) => Some(stmt),
            Err(ParseError) => {
                self.synchronize();
                if self.pos == start {
                    self.advance();
                }
                None
            }
        }
    }

    /// Discard tokens up to a statement boundary: just past a `;`, or
    /// before a `}` or a keyword that starts a statement.
    fn synchronize(&mut self) {
        loop {
            let kind = self.peek().kind;
            match kind {
                TokenKind::Eof | TokenKind::RBrace => return,
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                _ if kind.starts_statement() => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        self.nested(|p| p.parse_stmt_inner())
    }

    fn parse_stmt_inner(&mut self) -> PResult<Stmt> {
        let start = self.peek().span;
        match self.peek().kind {
            TokenKind::Let => {
                self.advance();
                self.parse_var_decl(start, None)
            }
            kind if kind.is_type_name() => {
                let ty = type_name(kind);
                self.advance();
                self.parse_var_decl(start, ty)
            }
            TokenKind::Func => {
                let func = self.parse_function()?;
                if self.depth > 1 {
                    self.error_at(
                        Code::NestedFunction,
                        "function declarations are only allowed at the top level",
                        func.name.span,
                    );
                }
                Ok(Stmt {
                    span: func.span,
                    kind: StmtKind::Function(func),
                })
            }
            TokenKind::If => self.parse_if(start),
            TokenKind::While => self.parse_while(start),
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                Ok(Stmt {
                    span: block.span,
                    kind: StmtKind::Block(block),
                })
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.at(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect_semicolon("after return value")?;
                Ok(self.stmt(StmtKind::Return(value), start))
            }
            TokenKind::Print => {
                self.advance();
                let open = self.expect(TokenKind::LParen, Code::UnexpectedToken, "'(' after 'print'")?;
                let expr = self.parse_expr()?;
                self.expect_closing(TokenKind::RParen, &open)?;
                self.expect_semicolon("after print statement")?;
                Ok(self.stmt(StmtKind::Print(expr), start))
            }
            TokenKind::Break => {
                self.advance();
                self.expect_semicolon("after 'break'")?;
                Ok(self.stmt(StmtKind::Break, start))
            }
            TokenKind::Continue => {
                self.advance();
                self.expect_semicolon("after 'continue'")?;
                Ok(self.stmt(StmtKind::Continue, start))
            }
            TokenKind::RBrace => {
                self.error_at_current(Code::UnmatchedDelimiter, "unmatched '}'");
                Err(ParseError)
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect_semicolon("after expression")?;
                Ok(self.stmt(StmtKind::Expr(expr), start))
            }
        }
    }

    fn parse_var_decl(&mut self, start: Span, ty: Option<TypeName>) -> PResult<Stmt> {
        let name = self.expect_ident("a variable name")?;
        let init = if self.eat(TokenKind::Equal) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect_semicolon("after variable declaration")?;
        Ok(self.stmt(StmtKind::VarDecl { name, ty, init }, start))
    }

    fn parse_function(&mut self) -> PResult<FunctionDecl> {
        let start = self.advance().span; // 'func'
        let name = self.expect_ident("a function name")?;
        let open = self.expect(TokenKind::LParen, Code::UnexpectedToken, "'(' after function name")?;

        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                let ty = type_name(self.peek().kind);
                if ty.is_some() {
                    self.advance();
                }
                let name = self.expect_ident("a parameter name")?;
                params.push(Param { name, ty });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect_closing(TokenKind::RParen, &open)?;

        let body = self.parse_block()?;
        Ok(FunctionDecl {
            name,
            params,
            span: start.to(body.span),
            body,
        })
    }

    fn parse_if(&mut self, start: Span) -> PResult<Stmt> {
        self.advance(); // 'if'
        let cond = self.parse_condition("if")?;
        let then_branch = Box::new(self.parse_stmt()?);
        let else_branch = if self.eat(TokenKind::Else) {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(self.stmt(
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            },
            start,
        ))
    }

    fn parse_while(&mut self, start: Span) -> PResult<Stmt> {
        self.advance(); // 'while'
        let cond = self.parse_condition("while")?;
        let body = Box::new(self.parse_stmt()?);
        Ok(self.stmt(StmtKind::While { cond, body }, start))
    }

    fn parse_condition(&mut self, keyword: &str) -> PResult<Expr> {
        let open = self.expect(
            TokenKind::LParen,
            Code::UnexpectedToken,
            &format!("'(' after '{keyword}'"),
        )?;
        let cond = self.parse_expr()?;
        self.expect_closing(TokenKind::RParen, &open)?;
        Ok(cond)
    }

    fn parse_block(&mut self) -> PResult<Block> {
        let open = self.expect(TokenKind::LBrace, Code::UnexpectedToken, "'{'")?;
        let mut stmts = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::RBrace => {
                    let close = self.advance().span;
                    return Ok(Block {
                        stmts,
                        span: open.span.to(close),
                    });
                }
                TokenKind::Eof => {
                    self.error_at(Code::UnmatchedDelimiter, "unclosed '{'", open.span);
                    return Ok(Block {
                        stmts,
                        span: open.span.to(self.peek().span),
                    });
                }
                _ => {
                    if let Some(stmt) = self.statement_with_recovery() {
                        stmts.push(stmt);
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.nested(|p| p.parse_assignment())
    }

    fn parse_assignment(&mut self) -> PResult<Expr> {
        let target = self.parse_binary(1)?;
        if !self.at(TokenKind::Equal) {
            return Ok(target);
        }
        let equal = self.advance().span;
        let value = self.parse_expr()?;
        match target.kind {
            ExprKind::Identifier(ident) => Ok(Expr {
                span: ident.span.to(value.span),
                kind: ExprKind::Assign {
                    target: ident,
                    value: Box::new(value),
                },
            }),
            _ => {
                self.error_at(
                    Code::InvalidAssignmentTarget,
                    "invalid assignment target",
                    equal,
                );
                Err(ParseError)
            }
        }
    }

    /// Precedence climbing over the binary operator table.
    fn parse_binary(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        while let Some((op, prec)) = binary_op(self.peek().kind) {
            if prec < min_prec {
                break;
            }
            self.advance();
            self.deepen()?;
            let rhs = self.parse_binary(prec + 1)?;
            lhs = Expr {
                span: lhs.span.to(rhs.span),
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_call(),
        };
        let start = self.advance().span;
        let operand = self.nested(|p| p.parse_unary())?;
        Ok(Expr {
            span: start.to(operand.span),
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
        })
    }

    fn parse_call(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        while self.at(TokenKind::LParen) {
            self.deepen()?;
            let open = self.advance();
            let mut args = Vec::new();
            if !self.at(TokenKind::RParen) {
                loop {
                    args.push(self.parse_expr()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            let close = self.expect_closing(TokenKind::RParen, &open)?;
            expr = Expr {
                span: expr.span.to(close.span),
                kind: ExprKind::Call {
                    callee: Box::new(expr),
                    args,
                },
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        let literal = match token.kind {
            // out-of-range literals were already reported by the lexer
            TokenKind::Number => Literal::Int(token.lexeme.parse().unwrap_or(0)),
            TokenKind::FNumber => Literal::Float(token.lexeme.parse().unwrap_or(0.0)),
            TokenKind::Str => Literal::Str(unescape(&token.lexeme)),
            TokenKind::True => Literal::Bool(true),
            TokenKind::False => Literal::Bool(false),
            TokenKind::Nil => Literal::Nil,
            TokenKind::Ident => {
                self.advance();
                return Ok(Expr {
                    span: token.span,
                    kind: ExprKind::Identifier(Ident {
                        name: token.lexeme,
                        span: token.span,
                    }),
                });
            }
            TokenKind::LParen => {
                let open = self.advance();
                let inner = self.parse_expr()?;
                self.expect_closing(TokenKind::RParen, &open)?;
                return Ok(inner);
            }
            _ => {
                let found = describe(&token);
                self.error_at_current(
                    Code::ExpectedExpression,
                    &format!("expected expression, found {found}"),
                );
                return Err(ParseError);
            }
        };
        self.advance();
        Ok(Expr {
            span: token.span,
            kind: ExprKind::Literal(literal),
        })
    }

    // -----------------------------------------------------------------
    // Token helpers
    // -----------------------------------------------------------------

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let saved = self.depth;
        self.deepen()?;
        let result = f(self);
        self.depth = saved;
        result
    }

    /// Count one more level of tree depth against `MAX_NESTING`. Left-leaning
    /// chains (`a + b + c`, `f()()`) deepen the tree without recursing here,
    /// so they call this directly; the enclosing `nested` restores the depth.
    fn deepen(&mut self) -> PResult<()> {
        if self.depth >= MAX_NESTING {
            self.error_at_current(Code::NestingTooDeep, "program is nested too deeply");
            return Err(ParseError);
        }
        self.depth += 1;
        Ok(())
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() && token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn previous_end(&self) -> u32 {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(token) => token.span.end,
            None => self.peek().span.start.offset,
        }
    }

    fn stmt(&self, kind: StmtKind, start: Span) -> Stmt {
        Stmt {
            kind,
            span: Span::new(start.start, self.previous_end().max(start.end)),
        }
    }

    fn expect(&mut self, kind: TokenKind, code: Code, what: &str) -> PResult<Token> {
        if self.at(kind) {
            return Ok(self.advance());
        }
        let found = describe(self.peek());
        self.error_at_current(code, &format!("expected {what}, found {found}"));
        Err(ParseError)
    }

    fn expect_semicolon(&mut self, context: &str) -> PResult<Token> {
        self.expect(
            TokenKind::Semicolon,
            Code::MissingTerminator,
            &format!("';' {context}"),
        )
    }

    fn expect_closing(&mut self, kind: TokenKind, open: &Token) -> PResult<Token> {
        if self.at(kind) {
            return Ok(self.advance());
        }
        let found = describe(self.peek());
        let closing = if kind == TokenKind::RParen { ')' } else { '}' };
        self.error_at_current(
            Code::UnmatchedDelimiter,
            &format!(
                "expected '{closing}' to close '{}' at {}, found {found}",
                open.lexeme, open.span.start
            ),
        );
        Err(ParseError)
    }

    fn expect_ident(&mut self, what: &str) -> PResult<Ident> {
        let token = self.expect(TokenKind::Ident, Code::ExpectedIdentifier, what)?;
        Ok(Ident {
            name: token.lexeme,
            span: token.span,
        })
    }

    fn error_at_current(&mut self, code: Code, message: &str) {
        let span = self.peek().span;
        self.error_at(code, message, span);
    }

    fn error_at(&mut self, code: Code, message: &str, span: Span) {
        self.diagnostics
            .push(Diagnostic::error(Phase::Syntax, code, message, span));
    }
}

fn binary_op(kind: TokenKind) -> Option<(BinaryOp, u8)> {
    let entry = match kind {
        TokenKind::OrOr => (BinaryOp::Or, 1),
        TokenKind::AndAnd => (BinaryOp::And, 2),
        TokenKind::EqualEqual => (BinaryOp::Eq, 3),
        TokenKind::BangEqual => (BinaryOp::Ne, 3),
        TokenKind::Less => (BinaryOp::Lt, 4),
        TokenKind::LessEqual => (BinaryOp::Le, 4),
        TokenKind::Greater => (BinaryOp::Gt, 4),
        TokenKind::GreaterEqual => (BinaryOp::Ge, 4),
        TokenKind::Plus => (BinaryOp::Add, 5),
        TokenKind::Minus => (BinaryOp::Sub, 5),
        TokenKind::Star => (BinaryOp::Mul, 6),
        TokenKind::Slash => (BinaryOp::Div, 6),
        TokenKind::Percent => (BinaryOp::Rem, 6),
        _ => return None,
    };
    Some(entry)
}

fn type_name(kind: TokenKind) -> Option<TypeName> {
    match kind {
        TokenKind::Int => Some(TypeName::Int),
        TokenKind::Float => Some(TypeName::Float),
        TokenKind::Bool => Some(TypeName::Bool),
        TokenKind::String => Some(TypeName::Str),
        _ => None,
    }
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Eof => "end of input".to_string(),
        _ => format!("'{}'", token.lexeme),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use serde_json::json;

    fn parse_source(source: &str) -> ParseResult {
        let lexed = tokenize(source);
        assert!(lexed.diagnostics.is_empty(), "{:?}", lexed.diagnostics);
        parse(&lexed.tokens)
    }

    fn parse_ok(source: &str) -> Program {
        let result = parse_source(source);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        result.program
    }

    fn first_expr(source: &str) -> serde_json::Value {
        let program = parse_ok(source);
        program.items[0].summary()["expr"].clone()
    }

    #[test]
    fn parses_declaration_and_print() {
        let program = parse_ok("let x = 1 + 2; print(x);");
        assert_eq!(program.items.len(), 2);
        assert!(matches!(program.items[0].kind, StmtKind::VarDecl { .. }));
        assert!(matches!(program.items[1].kind, StmtKind::Print(_)));
        assert_eq!(program.node_count(), 7);
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = first_expr("1 + 2 * 3;");
        assert_eq!(expr["op"], "+");
        assert_eq!(expr["rhs"]["op"], "*");
    }

    #[test]
    fn binary_operators_are_left_associative() {
        let expr = first_expr("10 - 4 - 3;");
        assert_eq!(expr["op"], "-");
        assert_eq!(expr["lhs"]["op"], "-");
        assert_eq!(expr["rhs"]["value"], 3);
    }

    #[test]
    fn logical_operators_follow_precedence_ladder() {
        let expr = first_expr("a || b && c == d < e + f;");
        assert_eq!(expr["op"], "||");
        let and = &expr["rhs"];
        assert_eq!(and["op"], "&&");
        let eq = &and["rhs"];
        assert_eq!(eq["op"], "==");
        assert_eq!(eq["rhs"]["op"], "<");
        assert_eq!(eq["rhs"]["rhs"]["op"], "+");
    }

    #[test]
    fn assignment_is_right_associative() {
        let expr = first_expr("a = b = 3;");
        assert_eq!(expr["node"], "Assignment");
        assert_eq!(expr["target"], "a");
        assert_eq!(expr["value"]["node"], "Assignment");
        assert_eq!(expr["value"]["target"], "b");
    }

    #[test]
    fn unary_binds_tighter_than_call_arguments() {
        let expr = first_expr("-f(1, !true);");
        assert_eq!(expr["node"], "UnaryExpr");
        let call = &expr["operand"];
        assert_eq!(call["node"], "CallExpr");
        assert_eq!(call["args"][1]["op"], "!");
    }

    #[test]
    fn parses_functions_with_optional_parameter_types() {
        let program = parse_ok("func add(int a, b) { return a + b; }");
        let StmtKind::Function(func) = &program.items[0].kind else {
            panic!("expected function");
        };
        assert_eq!(func.name.name, "add");
        assert_eq!(func.params.len(), 2);
        assert_eq!(func.params[0].ty, Some(TypeName::Int));
        assert_eq!(func.params[1].ty, None);
        assert_eq!(func.body.stmts.len(), 1);
    }

    #[test]
    fn parses_if_else_and_while() {
        let program = parse_ok(
            "int i = 0; while (i < 3) { if (i == 1) print(i); else { i = i + 1; } i = i + 1; }",
        );
        let summary = program.summary();
        let body = &summary["body"][1]["body"]["body"];
        assert_eq!(body[0]["node"], "IfStmt");
        assert_eq!(body[0]["then"]["node"], "PrintStmt");
        assert_eq!(body[0]["else"]["node"], "Block");
    }

    #[test]
    fn summary_has_no_spans() {
        let program = parse_ok("let s = \"hi\\n\";");
        assert_eq!(
            program.summary(),
            json!({
                "node": "Program",
                "body": [{
                    "node": "VarDecl",
                    "name": "s",
                    "type": null,
                    "init": { "node": "Literal", "value": "hi\n" }
                }]
            })
        );
    }

    #[test]
    fn missing_semicolon_yields_one_diagnostic_and_recovers() {
        let result = parse_source("let x = 1 print(x); let y = 2;");
        assert_eq!(result.diagnostics.len(), 1);
        let diag = &result.diagnostics[0];
        assert_eq!(diag.code, Code::MissingTerminator);
        assert_eq!(diag.phase, Phase::Syntax);
        assert_eq!(diag.span.start.column, 11);
        // the declaration is lost, the following statements survive
        assert_eq!(result.program.items.len(), 2);
    }

    #[test]
    fn garbage_expression_is_reported_once() {
        let result = parse_source("let x = * * * 3; print(1);");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Code::ExpectedExpression);
        assert_eq!(result.program.items.len(), 1);
    }

    #[test]
    fn recovers_inside_blocks() {
        let result = parse_source("while (true) { let = 3; print(1); } print(2);");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Code::ExpectedIdentifier);
        assert_eq!(result.program.items.len(), 2);
    }

    #[test]
    fn reports_unclosed_block() {
        let result = parse_source("if (true) { print(1);");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Code::UnmatchedDelimiter);
        assert_eq!(result.diagnostics[0].span.start.column, 11);
        assert_eq!(result.program.items.len(), 1);
    }

    #[test]
    fn reports_unmatched_parenthesis() {
        let result = parse_source("print((1 + 2);");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Code::UnmatchedDelimiter);
    }

    #[test]
    fn reports_stray_closing_brace() {
        let result = parse_source("print(1); } print(2);");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Code::UnmatchedDelimiter);
        assert_eq!(result.program.items.len(), 2);
    }

    #[test]
    fn rejects_invalid_assignment_target() {
        let result = parse_source("1 = 2;");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Code::InvalidAssignmentTarget);
    }

    #[test]
    fn rejects_nested_function_but_keeps_it() {
        let result = parse_source("func outer() { func inner() { return 1; } }");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Code::NestedFunction);
        assert_eq!(result.program.items.len(), 1);
    }

    #[test]
    fn bounds_nesting_depth() {
        let source = format!("print({}1{});", "(".repeat(1000), ")".repeat(1000));
        let result = parse_source(&source);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Code::NestingTooDeep);
    }

    #[test]
    fn bounds_left_leaning_chains() {
        let source = format!("let x = 1{};", " + 1".repeat(5000));
        let result = parse_source(&source);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Code::NestingTooDeep);

        let source = format!("let x = 1{};", " + 1".repeat(50));
        assert!(parse_source(&source).diagnostics.is_empty());
    }

    #[test]
    fn tolerates_token_stream_without_eof() {
        let result = parse(&[]);
        assert!(result.diagnostics.is_empty());
        assert!(result.program.items.is_empty());
    }
}
