//! Runtime values.

use crate::ast::FunctionDecl;
use crate::types::Type;

/// A value produced while executing a program. Functions borrow their
/// declaration from the syntax tree, which outlives the run.
#[derive(Debug, Clone)]
pub enum Value<'ast> {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Nil,
    Function(&'ast FunctionDecl),
}

impl Value<'_> {
    pub fn ty(&self) -> Type {
        match self {
            Value::Int(_) => Type::Int,
            Value::Float(_) => Type::Float,
            Value::Bool(_) => Type::Bool,
            Value::Str(_) => Type::Str,
            Value::Nil => Type::Nil,
            Value::Function(_) => Type::Function,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(v) => Some(v as f64),
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Structural equality; `int` and `float` compare numerically and
    /// functions compare by identity.
    pub fn equals(&self, other: &Value<'_>) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Function(a), Value::Function(b)) => core::ptr::eq(*a, *b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl core::fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            // a float always shows its fractional part
            Value::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(v) => f.write_str(v),
            Value::Nil => f.write_str("nil"),
            Value::Function(decl) => write!(f, "<func {}>", decl.name.name),
        }
    }
}
