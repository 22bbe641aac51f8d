//! Static types used by the semantic analyzer.
//!
//! The lattice is deliberately small: the four value types of the language
//! plus `Function`, `Nil` (the type of the `nil` literal) and `Unknown` for
//! anything that is only known at run time. `Unknown` is compatible with
//! every other type, so the checker never reports an error it cannot prove.

use serde::Serialize;

use crate::ast::{BinaryOp, TypeName, UnaryOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Int,
    Float,
    Bool,
    Str,
    Nil,
    Function,
    Unknown,
}

impl Type {
    pub fn name(self) -> &'static str {
        match self {
            Type::Int => "int",
            Type::Float => "float",
            Type::Bool => "bool",
            Type::Str => "string",
            Type::Nil => "nil",
            Type::Function => "function",
            Type::Unknown => "unknown",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    pub fn is_unknown(self) -> bool {
        self == Type::Unknown
    }

    /// Whether a value of type `value` may be stored in a slot of type `self`.
    ///
    /// `int` widens to `float`; `nil` fits everywhere.
    pub fn accepts(self, value: Type) -> bool {
        self == value
            || self.is_unknown()
            || value.is_unknown()
            || value == Type::Nil
            || (self == Type::Float && value == Type::Int)
    }

    /// Type a variable takes from its initializer when it has no annotation.
    pub fn inferred(self) -> Type {
        match self {
            Type::Nil => Type::Unknown,
            other => other,
        }
    }
}

impl From<TypeName> for Type {
    fn from(name: TypeName) -> Self {
        match name {
            TypeName::Int => Type::Int,
            TypeName::Float => Type::Float,
            TypeName::Bool => Type::Bool,
            TypeName::Str => Type::Str,
        }
    }
}

impl core::fmt::Display for Type {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Result type of `lhs op rhs`, or `None` when the operands do not fit.
pub fn binary_result(op: BinaryOp, lhs: Type, rhs: Type) -> Option<Type> {
    use BinaryOp::*;

    let unknown = lhs.is_unknown() || rhs.is_unknown();
    match op {
        Add => match (lhs, rhs) {
            (Type::Int, Type::Int) => Some(Type::Int),
            (Type::Str, Type::Str) => Some(Type::Str),
            (l, r) if l.is_numeric() && r.is_numeric() => Some(Type::Float),
            (l, r) if unknown && addable(l) && addable(r) => Some(Type::Unknown),
            _ => None,
        },
        Sub | Mul | Div | Rem => match (lhs, rhs) {
            (Type::Int, Type::Int) => Some(Type::Int),
            (l, r) if l.is_numeric() && r.is_numeric() => Some(Type::Float),
            (l, r) if unknown && numeric_or_unknown(l) && numeric_or_unknown(r) => {
                Some(Type::Unknown)
            }
            _ => None,
        },
        Lt | Le | Gt | Ge => {
            let ordered = (numeric_or_unknown(lhs) && numeric_or_unknown(rhs))
                || (matches!(lhs, Type::Str | Type::Unknown) && matches!(rhs, Type::Str | Type::Unknown));
            ordered.then_some(Type::Bool)
        }
        Eq | Ne => {
            let comparable = lhs == rhs
                || unknown
                || lhs == Type::Nil
                || rhs == Type::Nil
                || (lhs.is_numeric() && rhs.is_numeric());
            comparable.then_some(Type::Bool)
        }
        And | Or => {
            let boolish = |t: Type| matches!(t, Type::Bool | Type::Unknown);
            (boolish(lhs) && boolish(rhs)).then_some(Type::Bool)
        }
    }
}

pub fn unary_result(op: UnaryOp, operand: Type) -> Option<Type> {
    match (op, operand) {
        (UnaryOp::Neg, t) if t.is_numeric() || t.is_unknown() => Some(t),
        (UnaryOp::Not, Type::Bool | Type::Unknown) => Some(Type::Bool),
        _ => None,
    }
}

fn numeric_or_unknown(ty: Type) -> bool {
    ty.is_numeric() || ty.is_unknown()
}

fn addable(ty: Type) -> bool {
    matches!(ty, Type::Int | Type::Float | Type::Str | Type::Unknown)
}
