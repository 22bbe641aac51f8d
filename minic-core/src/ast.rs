//! Syntax tree produced by the parser.
//!
//! Every node carries the span of the source it was parsed from. The tree
//! is owned by the parse result; later phases only borrow it.

use serde_json::{Value as Json, json};

use crate::span::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// Static type annotation written in the source (`int x = 1;`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    Int,
    Float,
    Bool,
    Str,
}

impl TypeName {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeName::Int => "int",
            TypeName::Float => "float",
            TypeName::Bool => "bool",
            TypeName::Str => "string",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub items: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: Option<TypeName>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    VarDecl {
        name: Ident,
        ty: Option<TypeName>,
        init: Option<Expr>,
    },
    Expr(Expr),
    Block(Block),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    Function(FunctionDecl),
    Return(Option<Expr>),
    Print(Expr),
    Break,
    Continue,
}

impl StmtKind {
    /// Statements after which the rest of a block never runs.
    pub fn diverges(&self) -> bool {
        matches!(
            self,
            StmtKind::Return(_) | StmtKind::Break | StmtKind::Continue
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Identifier(Ident),
    Assign {
        target: Ident,
        value: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

// ---------------------------------------------------------------------
// Node counting and the span-free summary sent to clients
// ---------------------------------------------------------------------

impl Program {
    /// Number of nodes in the tree, the program node included.
    pub fn node_count(&self) -> usize {
        1 + self.items.iter().map(Stmt::node_count).sum::<usize>()
    }

    /// JSON view of the tree without spans, so that two parses of
    /// differently formatted but equivalent sources compare equal.
    pub fn summary(&self) -> Json {
        json!({
            "node": "Program",
            "body": self.items.iter().map(Stmt::summary).collect::<Vec<_>>(),
        })
    }
}

impl Block {
    fn node_count(&self) -> usize {
        1 + self.stmts.iter().map(Stmt::node_count).sum::<usize>()
    }

    fn summary(&self) -> Json {
        json!({
            "node": "Block",
            "body": self.stmts.iter().map(Stmt::summary).collect::<Vec<_>>(),
        })
    }
}

impl Stmt {
    pub fn node_count(&self) -> usize {
        let children = match &self.kind {
            StmtKind::VarDecl { init, .. } => init.as_ref().map_or(0, Expr::node_count),
            StmtKind::Expr(expr) | StmtKind::Print(expr) => expr.node_count(),
            // the block is the statement itself
            StmtKind::Block(block) => return block.node_count(),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.node_count()
                    + then_branch.node_count()
                    + else_branch.as_ref().map_or(0, |s| s.node_count())
            }
            StmtKind::While { cond, body } => cond.node_count() + body.node_count(),
            StmtKind::Function(func) => func.body.node_count(),
            StmtKind::Return(value) => value.as_ref().map_or(0, Expr::node_count),
            StmtKind::Break | StmtKind::Continue => 0,
        };
        1 + children
    }

    pub fn summary(&self) -> Json {
        match &self.kind {
            StmtKind::VarDecl { name, ty, init } => json!({
                "node": "VarDecl",
                "name": name.name,
                "type": ty.map(TypeName::as_str),
                "init": init.as_ref().map(Expr::summary),
            }),
            StmtKind::Expr(expr) => json!({ "node": "ExprStmt", "expr": expr.summary() }),
            StmtKind::Block(block) => block.summary(),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => json!({
                "node": "IfStmt",
                "cond": cond.summary(),
                "then": then_branch.summary(),
                "else": else_branch.as_ref().map(|s| s.summary()),
            }),
            StmtKind::While { cond, body } => json!({
                "node": "WhileStmt",
                "cond": cond.summary(),
                "body": body.summary(),
            }),
            StmtKind::Function(func) => json!({
                "node": "FunctionDecl",
                "name": func.name.name,
                "params": func
                    .params
                    .iter()
                    .map(|p| json!({ "name": p.name.name, "type": p.ty.map(TypeName::as_str) }))
                    .collect::<Vec<_>>(),
                "body": func.body.summary(),
            }),
            StmtKind::Return(value) => json!({
                "node": "ReturnStmt",
                "value": value.as_ref().map(Expr::summary),
            }),
            StmtKind::Print(expr) => json!({ "node": "PrintStmt", "expr": expr.summary() }),
            StmtKind::Break => json!({ "node": "BreakStmt" }),
            StmtKind::Continue => json!({ "node": "ContinueStmt" }),
        }
    }
}

impl Expr {
    pub fn node_count(&self) -> usize {
        let children = match &self.kind {
            ExprKind::Literal(_) | ExprKind::Identifier(_) => 0,
            ExprKind::Assign { value, .. } => value.node_count(),
            ExprKind::Binary { lhs, rhs, .. } => lhs.node_count() + rhs.node_count(),
            ExprKind::Unary { operand, .. } => operand.node_count(),
            ExprKind::Call { callee, args } => {
                callee.node_count() + args.iter().map(Expr::node_count).sum::<usize>()
            }
        };
        1 + children
    }

    pub fn summary(&self) -> Json {
        match &self.kind {
            ExprKind::Literal(lit) => {
                let value = match lit {
                    Literal::Int(v) => json!(v),
                    Literal::Float(v) => json!(v),
                    Literal::Bool(v) => json!(v),
                    Literal::Str(v) => json!(v),
                    Literal::Nil => Json::Null,
                };
                json!({ "node": "Literal", "value": value })
            }
            ExprKind::Identifier(ident) => json!({ "node": "Identifier", "name": ident.name }),
            ExprKind::Assign { target, value } => json!({
                "node": "Assignment",
                "target": target.name,
                "value": value.summary(),
            }),
            ExprKind::Binary { op, lhs, rhs } => json!({
                "node": "BinaryExpr",
                "op": op.symbol(),
                "lhs": lhs.summary(),
                "rhs": rhs.summary(),
            }),
            ExprKind::Unary { op, operand } => json!({
                "node": "UnaryExpr",
                "op": op.symbol(),
                "operand": operand.summary(),
            }),
            ExprKind::Call { callee, args } => json!({
                "node": "CallExpr",
                "callee": callee.summary(),
                "args": args.iter().map(Expr::summary).collect::<Vec<_>>(),
            }),
        }
    }
}
