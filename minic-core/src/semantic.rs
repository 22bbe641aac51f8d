//! Name resolution and static checks.
//!
//! Analysis runs in two passes over the tree:
//!
//! 1. every top-level function and variable is declared in the global
//!    scope, so top-level declarations may refer to each other in any
//!    order;
//! 2. the tree is walked with an explicit scope chain (one scope per block
//!    and per function body) resolving identifiers and checking types,
//!    arity and control flow.
//!
//! Block scopes are not hoisted. Before a block is checked the names it
//! declares are announced as pending, so reading one of them ahead of its
//! declaration is reported instead of silently resolving to an outer
//! binding.

use crate::ast::{Block, Expr, ExprKind, FunctionDecl, Ident, Literal, Program, Stmt, StmtKind};
use crate::diagnostic::{Code, Diagnostic, Phase};
use crate::scope::{Lookup, ScopeId, ScopeTree, Symbol, SymbolKind};
use crate::span::Span;
use crate::types::{Type, binary_result, unary_result};

#[derive(Debug, Clone, Default)]
pub struct SemanticResult {
    pub diagnostics: Vec<Diagnostic>,
    /// Global symbols in declaration order.
    pub symbols: Vec<Symbol>,
}

pub fn analyze(program: &Program) -> SemanticResult {
    let mut analyzer = Analyzer::new();
    analyzer.declare_globals(program);
    analyzer.check_stmts(&program.items);
    tracing::trace!(
        diagnostics = analyzer.diagnostics.len(),
        "semantic analysis finished"
    );
    SemanticResult {
        symbols: analyzer.scopes.globals(),
        diagnostics: analyzer.diagnostics,
    }
}

struct Analyzer {
    scopes: ScopeTree,
    current: ScopeId,
    diagnostics: Vec<Diagnostic>,
    function_depth: usize,
    loop_depth: usize,
}

impl Analyzer {
    fn new() -> Self {
        Analyzer {
            scopes: ScopeTree::new(),
            current: ScopeId::GLOBAL,
            diagnostics: Vec::new(),
            function_depth: 0,
            loop_depth: 0,
        }
    }

    fn error(&mut self, code: Code, message: impl Into<String>, span: Span) {
        self.diagnostics
            .push(Diagnostic::error(Phase::Semantic, code, message, span));
    }

    fn warning(&mut self, code: Code, message: impl Into<String>, span: Span) {
        self.diagnostics
            .push(Diagnostic::warning(Phase::Semantic, code, message, span));
    }

    // -----------------------------------------------------------------
    // Pass 1: globals
    // -----------------------------------------------------------------

    fn declare_globals(&mut self, program: &Program) {
        for item in &program.items {
            let symbol = match &item.kind {
                StmtKind::Function(func) => function_symbol(func, 0),
                StmtKind::VarDecl { name, ty, .. } => Symbol {
                    name: name.name.clone(),
                    kind: SymbolKind::Variable,
                    ty: ty.map_or(Type::Unknown, Type::from),
                    depth: 0,
                    declared_at: name.span,
                    initialized: false,
                },
                _ => continue,
            };
            self.declare(ScopeId::GLOBAL, symbol);
        }

        // Unannotated globals take their initializer's type up front, so a
        // function body checked before the `let` sees the same type as one
        // checked after it.
        for item in &program.items {
            let StmtKind::VarDecl {
                name,
                ty: None,
                init: Some(init),
            } = &item.kind
            else {
                continue;
            };
            let ty = self.initializer_type(init, name.span).inferred();
            match self.scopes.lookup_local_mut(ScopeId::GLOBAL, &name.name) {
                Some(symbol) if symbol.declared_at == name.span => symbol.ty = ty,
                _ => {}
            }
        }
    }

    /// Type of a top-level initializer without running pass 2: globals
    /// declared after `decl` are still nil there and count as unknown.
    fn initializer_type(&self, expr: &Expr, decl: Span) -> Type {
        match &expr.kind {
            ExprKind::Literal(lit) => literal_type(lit),
            ExprKind::Identifier(ident) => {
                match self.scopes.lookup_local(ScopeId::GLOBAL, &ident.name) {
                    Some(symbol)
                        if matches!(symbol.kind, SymbolKind::Function { .. })
                            || symbol.declared_at.start.offset < decl.start.offset =>
                    {
                        symbol.ty
                    }
                    _ => Type::Unknown,
                }
            }
            ExprKind::Assign { value, .. } => self.initializer_type(value, decl),
            ExprKind::Binary { op, lhs, rhs } => binary_result(
                *op,
                self.initializer_type(lhs, decl),
                self.initializer_type(rhs, decl),
            )
            .unwrap_or(Type::Unknown),
            ExprKind::Unary { op, operand } => {
                unary_result(*op, self.initializer_type(operand, decl)).unwrap_or(Type::Unknown)
            }
            ExprKind::Call { .. } => Type::Unknown,
        }
    }

    fn declare(&mut self, scope: ScopeId, symbol: Symbol) {
        let span = symbol.declared_at;
        let name = symbol.name.clone();
        if let Err(existing) = self.scopes.declare(scope, symbol) {
            let message = format!(
                "'{name}' is already declared in this scope (first declared at {})",
                existing.declared_at.start
            );
            self.error(Code::Redeclaration, message, span);
        }
    }

    // -----------------------------------------------------------------
    // Pass 2: statements
    // -----------------------------------------------------------------

    fn check_stmts(&mut self, stmts: &[Stmt]) {
        let mut diverged = false;
        let mut reported = false;
        for stmt in stmts {
            if diverged && !reported {
                self.warning(Code::UnreachableCode, "unreachable code", stmt.span);
                reported = true;
            }
            self.check_stmt(stmt);
            diverged |= stmt.kind.diverges();
        }
    }

    fn check_block(&mut self, block: &Block) {
        let outer = self.current;
        self.current = self.scopes.push(outer);
        self.announce(&block.stmts);
        self.check_stmts(&block.stmts);
        self.current = outer;
    }

    /// Branches and loop bodies get their own scope even without braces.
    fn check_branch(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => self.check_block(block),
            _ => {
                let outer = self.current;
                self.current = self.scopes.push(outer);
                self.check_stmt(stmt);
                self.current = outer;
            }
        }
    }

    fn announce(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            let name = match &stmt.kind {
                StmtKind::VarDecl { name, .. } => name,
                StmtKind::Function(func) => &func.name,
                _ => continue,
            };
            self.scopes.announce(self.current, &name.name, name.span);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::VarDecl { name, ty, init } => {
                let annotated = ty.map(Type::from);
                let init_ty = init.as_ref().map(|expr| (self.check_expr(expr), expr.span));
                if let (Some(expected), Some((found, span))) = (annotated, init_ty) {
                    if !expected.accepts(found) {
                        self.error(
                            Code::TypeMismatch,
                            format!(
                                "cannot initialize '{}' of type {expected} with a value of type {found}",
                                name.name
                            ),
                            span,
                        );
                    }
                }
                let resolved = annotated
                    .or(init_ty.map(|(found, _)| found.inferred()))
                    .unwrap_or(Type::Unknown);
                self.declare_variable(name, resolved);
            }
            StmtKind::Expr(expr) | StmtKind::Print(expr) => {
                self.check_expr(expr);
            }
            StmtKind::Block(block) => self.check_block(block),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.check_condition("if", cond);
                self.check_branch(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_branch(else_branch);
                }
            }
            StmtKind::While { cond, body } => {
                self.check_condition("while", cond);
                self.loop_depth += 1;
                self.check_branch(body);
                self.loop_depth -= 1;
            }
            StmtKind::Function(func) => self.check_function(func),
            StmtKind::Return(value) => {
                if self.function_depth == 0 {
                    self.error(
                        Code::InvalidControlFlow,
                        "'return' outside of a function",
                        stmt.span,
                    );
                }
                if let Some(value) = value {
                    self.check_expr(value);
                }
            }
            StmtKind::Break | StmtKind::Continue => {
                if self.loop_depth == 0 {
                    let keyword = if matches!(stmt.kind, StmtKind::Break) {
                        "break"
                    } else {
                        "continue"
                    };
                    self.error(
                        Code::InvalidControlFlow,
                        format!("'{keyword}' outside of a loop"),
                        stmt.span,
                    );
                }
            }
        }
    }

    fn declare_variable(&mut self, name: &Ident, ty: Type) {
        if self.current == ScopeId::GLOBAL {
            // Declared by pass 1; a duplicate was reported there.
            match self.scopes.lookup_local_mut(ScopeId::GLOBAL, &name.name) {
                Some(symbol) if symbol.declared_at == name.span => {
                    symbol.ty = ty;
                    symbol.initialized = true;
                }
                _ => {}
            }
            return;
        }
        let symbol = Symbol {
            name: name.name.clone(),
            kind: SymbolKind::Variable,
            ty,
            depth: self.scopes.depth(self.current),
            declared_at: name.span,
            initialized: true,
        };
        self.declare(self.current, symbol);
    }

    fn check_condition(&mut self, keyword: &str, cond: &Expr) {
        let ty = self.check_expr(cond);
        if !matches!(ty, Type::Bool | Type::Unknown) {
            self.error(
                Code::TypeMismatch,
                format!("'{keyword}' condition must be bool, found {ty}"),
                cond.span,
            );
        }
    }

    fn check_function(&mut self, func: &FunctionDecl) {
        if self.current != ScopeId::GLOBAL {
            // Only reachable when a nested declaration slipped past the parser.
            let depth = self.scopes.depth(self.current);
            self.declare(self.current, function_symbol(func, depth));
        }

        let outer = self.current;
        let outer_loops = self.loop_depth;
        self.current = self.scopes.push(outer);
        self.function_depth += 1;
        self.loop_depth = 0;

        let depth = self.scopes.depth(self.current);
        for param in &func.params {
            let symbol = Symbol {
                name: param.name.name.clone(),
                kind: SymbolKind::Parameter,
                ty: param.ty.map_or(Type::Unknown, Type::from),
                depth,
                declared_at: param.name.span,
                initialized: true,
            };
            self.declare(self.current, symbol);
        }
        // parameters and body share one scope
        self.announce(&func.body.stmts);
        self.check_stmts(&func.body.stmts);

        self.loop_depth = outer_loops;
        self.function_depth -= 1;
        self.current = outer;
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    fn check_expr(&mut self, expr: &Expr) -> Type {
        match &expr.kind {
            ExprKind::Literal(lit) => literal_type(lit),
            ExprKind::Identifier(ident) => match self.resolve(ident) {
                Some(symbol) if !symbol.initialized => Type::Unknown,
                Some(symbol) => symbol.ty,
                None => Type::Unknown,
            },
            ExprKind::Assign { target, value } => {
                let found = self.check_expr(value);
                match self.lookup(target) {
                    Some(symbol) if matches!(symbol.kind, SymbolKind::Function { .. }) => {
                        self.error(
                            Code::TypeMismatch,
                            format!("cannot assign to function '{}'", target.name),
                            target.span,
                        );
                    }
                    Some(symbol) if !symbol.ty.accepts(found) => {
                        self.error(
                            Code::TypeMismatch,
                            format!(
                                "cannot assign a value of type {found} to '{}' of type {}",
                                target.name, symbol.ty
                            ),
                            value.span,
                        );
                    }
                    _ => {}
                }
                found
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.check_expr(lhs);
                let r = self.check_expr(rhs);
                binary_result(*op, l, r).unwrap_or_else(|| {
                    self.error(
                        Code::TypeMismatch,
                        format!("operator '{}' cannot be applied to {l} and {r}", op.symbol()),
                        expr.span,
                    );
                    Type::Unknown
                })
            }
            ExprKind::Unary { op, operand } => {
                let ty = self.check_expr(operand);
                unary_result(*op, ty).unwrap_or_else(|| {
                    self.error(
                        Code::TypeMismatch,
                        format!("operator '{}' cannot be applied to {ty}", op.symbol()),
                        expr.span,
                    );
                    Type::Unknown
                })
            }
            ExprKind::Call { callee, args } => self.check_call(expr, callee, args),
        }
    }

    fn check_call(&mut self, call: &Expr, callee: &Expr, args: &[Expr]) -> Type {
        let arg_types: Vec<(Type, Span)> = args
            .iter()
            .map(|arg| (self.check_expr(arg), arg.span))
            .collect();

        let (name, signature, callee_ty) = match &callee.kind {
            ExprKind::Identifier(ident) => match self.resolve(ident) {
                Some(Symbol {
                    kind: SymbolKind::Function { params },
                    ..
                }) => (ident.name.clone(), Some(params), Type::Function),
                Some(symbol) if symbol.initialized => (ident.name.clone(), None, symbol.ty),
                _ => return Type::Unknown,
            },
            _ => {
                let ty = self.check_expr(callee);
                (String::from("expression"), None, ty)
            }
        };

        let Some(params) = signature else {
            if !matches!(callee_ty, Type::Function | Type::Unknown) {
                self.error(
                    Code::NotCallable,
                    format!("'{name}' of type {callee_ty} is not callable"),
                    callee.span,
                );
            }
            return Type::Unknown;
        };

        if params.len() != arg_types.len() {
            self.error(
                Code::ArityMismatch,
                format!(
                    "function '{name}' expects {} argument{}, found {}",
                    params.len(),
                    if params.len() == 1 { "" } else { "s" },
                    arg_types.len()
                ),
                call.span,
            );
            return Type::Unknown;
        }
        for (index, (expected, (found, span))) in params.iter().zip(arg_types).enumerate() {
            if !expected.accepts(found) {
                self.error(
                    Code::TypeMismatch,
                    format!(
                        "argument {} of '{name}' expects {expected}, found {found}",
                        index + 1
                    ),
                    span,
                );
            }
        }
        Type::Unknown
    }

    /// Resolve a read of `ident`, reporting anything that makes it invalid.
    fn resolve(&mut self, ident: &Ident) -> Option<Symbol> {
        let symbol = self.lookup(ident)?;
        if !symbol.initialized && symbol.depth == 0 && self.function_depth == 0 {
            self.warning(
                Code::UninitializedGlobal,
                format!(
                    "'{}' is read before its declaration and is nil at this point",
                    ident.name
                ),
                ident.span,
            );
        }
        Some(symbol)
    }

    fn lookup(&mut self, ident: &Ident) -> Option<Symbol> {
        match self.scopes.lookup(self.current, &ident.name) {
            Lookup::Found(symbol) => Some(symbol.clone()),
            Lookup::NotYetDeclared(_) => {
                self.error(
                    Code::UseBeforeDeclaration,
                    format!("'{}' is used before its declaration", ident.name),
                    ident.span,
                );
                None
            }
            Lookup::Missing => {
                self.error(
                    Code::UndeclaredIdentifier,
                    format!("undeclared identifier '{}'", ident.name),
                    ident.span,
                );
                None
            }
        }
    }
}

fn literal_type(lit: &Literal) -> Type {
    match lit {
        Literal::Int(_) => Type::Int,
        Literal::Float(_) => Type::Float,
        Literal::Bool(_) => Type::Bool,
        Literal::Str(_) => Type::Str,
        Literal::Nil => Type::Nil,
    }
}

fn function_symbol(func: &FunctionDecl, depth: usize) -> Symbol {
    Symbol {
        name: func.name.name.clone(),
        kind: SymbolKind::Function {
            params: func
                .params
                .iter()
                .map(|p| p.ty.map_or(Type::Unknown, Type::from))
                .collect(),
        },
        ty: Type::Function,
        depth,
        declared_at: func.name.span,
        initialized: true,
    }
}
