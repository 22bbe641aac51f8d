//! Tree-walking interpreter.
//!
//! The interpreter borrows the syntax tree for the whole run and evaluates
//! it directly. Control transfer (`return`, `break`, `continue`) travels as
//! a [`Signal`] returned from every statement, and runtime failures travel
//! as [`RuntimeError`] through `?` up to [`execute`], which turns the first
//! one into the phase's single diagnostic.
//!
//! All user logic is bounded: every statement, loop iteration and call
//! costs one step against [`ExecutionLimits::step_budget`], a wall-clock
//! deadline is polled periodically, the call depth is capped, strings
//! cannot grow past [`ExecutionLimits::max_value_bytes`] and printed output
//! goes to a size-bounded [`PrintSink`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use crate::ast::{BinaryOp, Expr, ExprKind, Literal, Program, Stmt, StmtKind, UnaryOp};
use crate::diagnostic::{Code, Diagnostic, Phase};
use crate::span::Span;
use crate::types::Type;
use crate::value::Value;

/// The wall clock is only read every this many steps.
const DEADLINE_CHECK_INTERVAL: u64 = 256;

/// Stack reserved for the interpreter thread. Call depth is bounded by
/// `max_call_depth`, but each level costs several host frames.
const INTERPRETER_STACK_BYTES: usize = 64 * 1024 * 1024;

/// Resource bounds for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    pub step_budget: u64,
    pub timeout: Duration,
    pub max_call_depth: usize,
    pub max_output_bytes: usize,
    /// Largest string a single value may hold.
    pub max_value_bytes: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        ExecutionLimits {
            step_budget: 1_000_000,
            timeout: Duration::from_millis(2000),
            max_call_depth: 200,
            max_output_bytes: 64 * 1024,
            max_value_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("{op} by zero")]
    DivisionByZero { op: &'static str, span: Span },
    #[error("maximum call depth of {limit} exceeded")]
    StackOverflow { limit: usize, span: Span },
    #[error("step budget of {budget} exhausted")]
    StepBudget { budget: u64, span: Span },
    #[error("execution exceeded the time limit of {limit_ms} ms")]
    Deadline { limit_ms: u128, span: Span },
    #[error("{message}")]
    Type { message: String, span: Span },
    #[error("value of type {ty} is not callable")]
    NotCallable { ty: Type, span: Span },
    #[error("integer overflow in '{op}'")]
    IntegerOverflow { op: &'static str, span: Span },
    #[error("output exceeded the limit of {limit} bytes")]
    OutputLimit { limit: usize, span: Span },
    #[error("string value exceeds the limit of {limit} bytes")]
    ValueTooLarge { limit: usize, span: Span },
    #[error("function '{name}' expects {expected} arguments, found {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },
}

impl RuntimeError {
    pub fn code(&self) -> Code {
        match self {
            RuntimeError::DivisionByZero { .. } => Code::DivisionByZero,
            RuntimeError::StackOverflow { .. } => Code::StackOverflow,
            RuntimeError::StepBudget { .. } | RuntimeError::Deadline { .. } => Code::Timeout,
            RuntimeError::Type { .. } => Code::RuntimeType,
            RuntimeError::NotCallable { .. } => Code::RuntimeNotCallable,
            RuntimeError::IntegerOverflow { .. } => Code::IntegerOverflow,
            RuntimeError::OutputLimit { .. } => Code::OutputLimit,
            RuntimeError::ValueTooLarge { .. } => Code::ValueTooLarge,
            RuntimeError::Arity { .. } => Code::RuntimeArity,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            RuntimeError::DivisionByZero { span, .. }
            | RuntimeError::StackOverflow { span, .. }
            | RuntimeError::StepBudget { span, .. }
            | RuntimeError::Deadline { span, .. }
            | RuntimeError::Type { span, .. }
            | RuntimeError::NotCallable { span, .. }
            | RuntimeError::IntegerOverflow { span, .. }
            | RuntimeError::OutputLimit { span, .. }
            | RuntimeError::ValueTooLarge { span, .. }
            | RuntimeError::Arity { span, .. } => *span,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.code() == Code::Timeout
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(Phase::Execution, self.code(), self.to_string(), self.span())
    }

    fn type_error(message: impl Into<String>, span: Span) -> Self {
        RuntimeError::Type {
            message: message.into(),
            span,
        }
    }
}

/// Output buffer that refuses to grow past its limit.
#[derive(Debug, Clone, Default)]
pub struct PrintSink {
    buffer: String,
    limit: usize,
}

impl PrintSink {
    pub fn new(limit: usize) -> Self {
        PrintSink {
            buffer: String::new(),
            limit,
        }
    }

    /// Append `text` and a newline, or fail without writing anything.
    pub fn write_line(&mut self, text: &str, span: Span) -> Result<(), RuntimeError> {
        if self.buffer.len() + text.len() + 1 > self.limit {
            return Err(RuntimeError::OutputLimit {
                limit: self.limit,
                span,
            });
        }
        self.buffer.push_str(text);
        self.buffer.push('\n');
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn into_string(self) -> String {
        self.buffer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Ok,
    Timeout,
    Error,
}

#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    /// Everything printed before the run ended, even when it failed.
    pub output: String,
    pub diagnostics: Vec<Diagnostic>,
    pub steps: u64,
}

/// Run `program` under `limits`.
///
/// The run happens on a dedicated thread with a large stack so deep (but
/// bounded) recursion in the program cannot exhaust the caller's stack.
pub fn execute(program: &Program, limits: &ExecutionLimits) -> ExecutionOutcome {
    std::thread::scope(|scope| {
        let worker = std::thread::Builder::new()
            .name("minic-interpreter".into())
            .stack_size(INTERPRETER_STACK_BYTES)
            .spawn_scoped(scope, || run(program, limits));
        match worker {
            Ok(handle) => handle
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic)),
            Err(err) => {
                tracing::warn!(error = %err, "could not spawn interpreter thread, running inline");
                run(program, limits)
            }
        }
    })
}

fn run(program: &Program, limits: &ExecutionLimits) -> ExecutionOutcome {
    let mut interpreter = Interpreter::new(*limits);
    let result = interpreter.run_program(program);
    let steps = interpreter.steps;
    let output = interpreter.sink.into_string();
    match result {
        Ok(()) => ExecutionOutcome {
            status: ExecutionStatus::Ok,
            output,
            diagnostics: Vec::new(),
            steps,
        },
        Err(err) => {
            tracing::debug!(error = %err, steps, "execution stopped");
            ExecutionOutcome {
                status: if err.is_timeout() {
                    ExecutionStatus::Timeout
                } else {
                    ExecutionStatus::Error
                },
                output,
                diagnostics: vec![err.to_diagnostic()],
                steps,
            }
        }
    }
}

/// How a statement finished.
#[derive(Debug)]
enum Signal<'ast> {
    Normal,
    Return(Value<'ast>),
    Break,
    Continue,
}

#[derive(Debug)]
struct Binding<'ast> {
    value: Value<'ast>,
    /// Annotated type; stores are coerced or rejected against it.
    declared: Option<Type>,
}

type Scope<'ast> = HashMap<&'ast str, Binding<'ast>>;

/// One activation: the global frame or a function call. Each frame is a
/// stack of block scopes, innermost last.
#[derive(Debug)]
struct Frame<'ast> {
    scopes: Vec<Scope<'ast>>,
}

impl<'ast> Frame<'ast> {
    fn with_scope(scope: Scope<'ast>) -> Self {
        Frame {
            scopes: vec![scope],
        }
    }
}

struct Interpreter<'ast> {
    limits: ExecutionLimits,
    deadline: Instant,
    steps: u64,
    sink: PrintSink,
    globals: Frame<'ast>,
    calls: Vec<Frame<'ast>>,
}

impl<'ast> Interpreter<'ast> {
    fn new(limits: ExecutionLimits) -> Self {
        Interpreter {
            limits,
            deadline: Instant::now() + limits.timeout,
            steps: 0,
            sink: PrintSink::new(limits.max_output_bytes),
            globals: Frame::with_scope(Scope::new()),
            calls: Vec::new(),
        }
    }

    fn run_program(&mut self, program: &'ast Program) -> Result<(), RuntimeError> {
        // Functions and top-level variables exist from the start; variables
        // hold nil until their declaration runs.
        for item in &program.items {
            let (name, binding) = match &item.kind {
                StmtKind::Function(func) => (
                    func.name.name.as_str(),
                    Binding {
                        value: Value::Function(func),
                        declared: None,
                    },
                ),
                StmtKind::VarDecl { name, ty, .. } => (
                    name.name.as_str(),
                    Binding {
                        value: Value::Nil,
                        declared: ty.map(Type::from),
                    },
                ),
                _ => continue,
            };
            self.globals.scopes[0].insert(name, binding);
        }

        for item in &program.items {
            if !matches!(self.exec_stmt(item)?, Signal::Normal) {
                break;
            }
        }
        Ok(())
    }

    fn tick(&mut self, span: Span) -> Result<(), RuntimeError> {
        if self.steps >= self.limits.step_budget {
            return Err(RuntimeError::StepBudget {
                budget: self.limits.step_budget,
                span,
            });
        }
        self.steps += 1;
        if self.steps % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= self.deadline {
            return Err(RuntimeError::Deadline {
                limit_ms: self.limits.timeout.as_millis(),
                span,
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Environment
    // -----------------------------------------------------------------

    fn frame_mut(&mut self) -> &mut Frame<'ast> {
        match self.calls.last_mut() {
            Some(frame) => frame,
            None => &mut self.globals,
        }
    }

    fn at_top_level(&self) -> bool {
        self.calls.is_empty() && self.globals.scopes.len() == 1
    }

    /// A call sees its own block scopes, then the global scope; top-level
    /// code sees every open global block.
    fn binding_mut(&mut self, name: &str) -> Option<&mut Binding<'ast>> {
        let globals = &mut self.globals.scopes;
        match self.calls.last_mut() {
            Some(frame) => frame
                .scopes
                .iter_mut()
                .rev()
                .chain(globals.iter_mut().take(1))
                .find_map(|scope| scope.get_mut(name)),
            None => globals
                .iter_mut()
                .rev()
                .find_map(|scope| scope.get_mut(name)),
        }
    }

    fn declare(&mut self, name: &'ast str, declared: Option<Type>, value: Value<'ast>, span: Span) -> Result<(), RuntimeError> {
        let value = coerce(declared, value, name, span)?;
        if let Some(scope) = self.frame_mut().scopes.last_mut() {
            scope.insert(name, Binding { value, declared });
        }
        Ok(())
    }

    fn store(&mut self, name: &str, value: Value<'ast>, span: Span) -> Result<Value<'ast>, RuntimeError> {
        let Some(binding) = self.binding_mut(name) else {
            return Err(RuntimeError::type_error(
                format!("undefined variable '{name}'"),
                span,
            ));
        };
        let value = coerce(binding.declared, value, name, span)?;
        binding.value = value.clone();
        Ok(value)
    }

    fn load(&mut self, name: &str, span: Span) -> Result<Value<'ast>, RuntimeError> {
        match self.binding_mut(name) {
            Some(binding) => Ok(binding.value.clone()),
            None => Err(RuntimeError::type_error(
                format!("undefined variable '{name}'"),
                span,
            )),
        }
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn exec_stmt(&mut self, stmt: &'ast Stmt) -> Result<Signal<'ast>, RuntimeError> {
        self.tick(stmt.span)?;
        match &stmt.kind {
            StmtKind::VarDecl { name, ty, init } => {
                let value = match init {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Nil,
                };
                if self.at_top_level() {
                    self.store(&name.name, value, name.span)?;
                } else {
                    self.declare(&name.name, ty.map(Type::from), value, name.span)?;
                }
                Ok(Signal::Normal)
            }
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
                Ok(Signal::Normal)
            }
            StmtKind::Print(expr) => {
                let value = self.eval(expr)?;
                self.sink.write_line(&value.to_string(), stmt.span)?;
                Ok(Signal::Normal)
            }
            StmtKind::Block(block) => self.exec_block(&block.stmts),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.condition(cond)? {
                    self.exec_branch(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_branch(else_branch)
                } else {
                    Ok(Signal::Normal)
                }
            }
            StmtKind::While { cond, body } => {
                loop {
                    self.tick(stmt.span)?;
                    if !self.condition(cond)? {
                        break;
                    }
                    match self.exec_branch(body)? {
                        Signal::Break => break,
                        Signal::Normal | Signal::Continue => {}
                        ret @ Signal::Return(_) => return Ok(ret),
                    }
                }
                Ok(Signal::Normal)
            }
            StmtKind::Function(func) => {
                // top-level functions were bound before the run started
                if !self.at_top_level() {
                    self.declare(&func.name.name, None, Value::Function(func), func.name.span)?;
                }
                Ok(Signal::Normal)
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Nil,
                };
                Ok(Signal::Return(value))
            }
            StmtKind::Break => Ok(Signal::Break),
            StmtKind::Continue => Ok(Signal::Continue),
        }
    }

    fn exec_stmts(&mut self, stmts: &'ast [Stmt]) -> Result<Signal<'ast>, RuntimeError> {
        for stmt in stmts {
            let signal = self.exec_stmt(stmt)?;
            if !matches!(signal, Signal::Normal) {
                return Ok(signal);
            }
        }
        Ok(Signal::Normal)
    }

    fn exec_block(&mut self, stmts: &'ast [Stmt]) -> Result<Signal<'ast>, RuntimeError> {
        self.frame_mut().scopes.push(Scope::new());
        let result = self.exec_stmts(stmts);
        self.frame_mut().scopes.pop();
        result
    }

    fn exec_branch(&mut self, stmt: &'ast Stmt) -> Result<Signal<'ast>, RuntimeError> {
        match &stmt.kind {
            StmtKind::Block(block) => self.exec_block(&block.stmts),
            _ => self.exec_block(core::slice::from_ref(stmt)),
        }
    }

    fn condition(&mut self, expr: &'ast Expr) -> Result<bool, RuntimeError> {
        match self.eval(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::type_error(
                format!("condition must be bool, found {}", other.ty()),
                expr.span,
            )),
        }
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    fn eval(&mut self, expr: &'ast Expr) -> Result<Value<'ast>, RuntimeError> {
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(match lit {
                Literal::Int(v) => Value::Int(*v),
                Literal::Float(v) => Value::Float(*v),
                Literal::Bool(v) => Value::Bool(*v),
                Literal::Str(v) => Value::Str(v.clone()),
                Literal::Nil => Value::Nil,
            }),
            ExprKind::Identifier(ident) => self.load(&ident.name, ident.span),
            ExprKind::Assign { target, value } => {
                let value = self.eval(value)?;
                self.store(&target.name, value, target.span)
            }
            ExprKind::Binary {
                op: op @ (BinaryOp::And | BinaryOp::Or),
                lhs,
                rhs,
            } => {
                let lhs = self.condition(lhs)?;
                // short-circuit
                if lhs == (*op == BinaryOp::Or) {
                    return Ok(Value::Bool(lhs));
                }
                Ok(Value::Bool(self.condition(rhs)?))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, lhs, rhs, self.limits.max_value_bytes, expr.span)
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand)?;
                unary(*op, value, expr.span)
            }
            ExprKind::Call { callee, args } => self.call(expr.span, callee, args),
        }
    }

    fn call(&mut self, span: Span, callee: &'ast Expr, args: &'ast [Expr]) -> Result<Value<'ast>, RuntimeError> {
        self.tick(span)?;
        let func = match self.eval(callee)? {
            Value::Function(func) => func,
            other => {
                return Err(RuntimeError::NotCallable {
                    ty: other.ty(),
                    span: callee.span,
                });
            }
        };

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg)?);
        }
        if values.len() != func.params.len() {
            return Err(RuntimeError::Arity {
                name: func.name.name.clone(),
                expected: func.params.len(),
                found: values.len(),
                span,
            });
        }
        if self.calls.len() >= self.limits.max_call_depth {
            return Err(RuntimeError::StackOverflow {
                limit: self.limits.max_call_depth,
                span,
            });
        }

        // parameters and the body share one scope
        let mut scope = Scope::new();
        for ((param, value), arg) in func.params.iter().zip(values).zip(args) {
            let declared = param.ty.map(Type::from);
            let value = coerce(declared, value, &param.name.name, arg.span)?;
            scope.insert(param.name.name.as_str(), Binding { value, declared });
        }

        self.calls.push(Frame::with_scope(scope));
        let result = self.exec_stmts(&func.body.stmts);
        self.calls.pop();
        match result? {
            Signal::Return(value) => Ok(value),
            _ => Ok(Value::Nil),
        }
    }
}

/// Fit `value` into a slot annotated with `declared`.
fn coerce<'ast>(declared: Option<Type>, value: Value<'ast>, name: &str, span: Span) -> Result<Value<'ast>, RuntimeError> {
    match (declared, value) {
        (Some(Type::Float), Value::Int(v)) => Ok(Value::Float(v as f64)),
        (Some(ty), value) if value.ty() != ty && !matches!(value, Value::Nil) => {
            Err(RuntimeError::type_error(
                format!(
                    "cannot store a value of type {} in '{name}' of type {ty}",
                    value.ty()
                ),
                span,
            ))
        }
        (_, value) => Ok(value),
    }
}

fn binary<'ast>(
    op: BinaryOp,
    lhs: Value<'ast>,
    rhs: Value<'ast>,
    max_value_bytes: usize,
    span: Span,
) -> Result<Value<'ast>, RuntimeError> {
    use BinaryOp::*;

    let mismatch = |lhs: &Value<'_>, rhs: &Value<'_>| {
        RuntimeError::type_error(
            format!(
                "operator '{}' cannot be applied to {} and {}",
                op.symbol(),
                lhs.ty(),
                rhs.ty()
            ),
            span,
        )
    };

    match op {
        Eq => return Ok(Value::Bool(lhs.equals(&rhs))),
        Ne => return Ok(Value::Bool(!lhs.equals(&rhs))),
        _ => {}
    }

    match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => int_binary(op, *a, *b, span),
        (Value::Str(a), Value::Str(b)) => match op {
            Add if a.len() + b.len() > max_value_bytes => Err(RuntimeError::ValueTooLarge {
                limit: max_value_bytes,
                span,
            }),
            Add => Ok(Value::Str(format!("{a}{b}"))),
            Lt => Ok(Value::Bool(a < b)),
            Le => Ok(Value::Bool(a <= b)),
            Gt => Ok(Value::Bool(a > b)),
            Ge => Ok(Value::Bool(a >= b)),
            _ => Err(mismatch(&lhs, &rhs)),
        },
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => float_binary(op, a, b, span),
            _ => Err(mismatch(&lhs, &rhs)),
        },
    }
}

fn int_binary<'ast>(op: BinaryOp, a: i64, b: i64, span: Span) -> Result<Value<'ast>, RuntimeError> {
    use BinaryOp::*;

    let overflow = || RuntimeError::IntegerOverflow {
        op: op.symbol(),
        span,
    };
    let value = match op {
        Add => Value::Int(a.checked_add(b).ok_or_else(overflow)?),
        Sub => Value::Int(a.checked_sub(b).ok_or_else(overflow)?),
        Mul => Value::Int(a.checked_mul(b).ok_or_else(overflow)?),
        Div | Rem if b == 0 => {
            return Err(RuntimeError::DivisionByZero {
                op: if op == Div { "division" } else { "modulo" },
                span,
            });
        }
        Div => Value::Int(a.checked_div(b).ok_or_else(overflow)?),
        Rem => Value::Int(a.checked_rem(b).ok_or_else(overflow)?),
        Lt => Value::Bool(a < b),
        Le => Value::Bool(a <= b),
        Gt => Value::Bool(a > b),
        Ge => Value::Bool(a >= b),
        Eq | Ne | And | Or => unreachable!("handled by the caller"),
    };
    Ok(value)
}

fn float_binary<'ast>(op: BinaryOp, a: f64, b: f64, span: Span) -> Result<Value<'ast>, RuntimeError> {
    use BinaryOp::*;

    let value = match op {
        Add => Value::Float(a + b),
        Sub => Value::Float(a - b),
        Mul => Value::Float(a * b),
        Div | Rem if b == 0.0 => {
            return Err(RuntimeError::DivisionByZero {
                op: if op == Div { "division" } else { "modulo" },
                span,
            });
        }
        Div => Value::Float(a / b),
        Rem => Value::Float(a % b),
        Lt => Value::Bool(a < b),
        Le => Value::Bool(a <= b),
        Gt => Value::Bool(a > b),
        Ge => Value::Bool(a >= b),
        Eq | Ne | And | Or => unreachable!("handled by the caller"),
    };
    Ok(value)
}

fn unary<'ast>(op: UnaryOp, value: Value<'ast>, span: Span) -> Result<Value<'ast>, RuntimeError> {
    match (op, value) {
        (UnaryOp::Neg, Value::Int(v)) => v
            .checked_neg()
            .map(Value::Int)
            .ok_or(RuntimeError::IntegerOverflow { op: "-", span }),
        (UnaryOp::Neg, Value::Float(v)) => Ok(Value::Float(-v)),
        (UnaryOp::Not, Value::Bool(v)) => Ok(Value::Bool(!v)),
        (op, value) => Err(RuntimeError::type_error(
            format!(
                "operator '{}' cannot be applied to {}",
                op.symbol(),
                value.ty()
            ),
            span,
        )),
    }
}
