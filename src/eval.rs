//! Tree-walking evaluator.

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::io;
use std::io::prelude::*;
use std::rc::Rc;

use crate::ast::{BinOp, Expr, LogicalOp, Stmt, UnaryOp};
use crate::diag::{Position, RuntimeError, RuntimeErrorKind};
use crate::interner::Symbol;

/// The runtime universe of values.
#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
}

impl Value {
    /// `nil` and `false` are falsy; everything else, `0` and `""` included,
    /// is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            // f64's default formatting already drops a whole number's ".0".
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Errors that abort an `interpret` call.
#[derive(Debug)]
pub enum EvalError {
    /// A language-level failure, destined for the diagnostic sink.
    Runtime(RuntimeError),
    /// The output writer failed; a host-level problem, not a diagnostic.
    Io(io::Error),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Runtime(e) => write!(f, "{}", e),
            EvalError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for EvalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EvalError::Runtime(e) => Some(e),
            EvalError::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for EvalError {
    fn from(e: io::Error) -> EvalError {
        EvalError::Io(e)
    }
}

impl From<RuntimeError> for EvalError {
    fn from(e: RuntimeError) -> EvalError {
        EvalError::Runtime(e)
    }
}

fn runtime(pos: Position, kind: RuntimeErrorKind) -> EvalError {
    EvalError::Runtime(RuntimeError { pos, kind })
}

fn undefined(name: &Symbol, pos: Position) -> EvalError {
    runtime(
        pos,
        RuntimeErrorKind::UndefinedVariable(name.as_str().to_owned()),
    )
}

/// Executes statements against a chain of lexical environments, writing
/// `print` output to the injected writer.
#[derive(Debug)]
pub struct Evaluator<'t, W: Write> {
    output: &'t mut W,
    globals: Rc<Env>,
}

impl<'a, W: Write> Evaluator<'a, W> {
    pub fn new(output: &'a mut W) -> Evaluator<'a, W> {
        Evaluator {
            output,
            globals: Env::global(),
        }
    }

    /// Executes `stmts` in order in the global environment.
    ///
    /// Stops at the first runtime error; side effects already committed
    /// persist. The global frame survives across calls, so an interactive
    /// session accumulates definitions.
    pub fn interpret(&mut self, stmts: &[Stmt]) -> Result<(), EvalError> {
        let globals = self.globals.clone();
        for stmt in stmts {
            self.execute(stmt, &globals)?;
        }
        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt, env: &Rc<Env>) -> Result<(), EvalError> {
        match stmt {
            Stmt::Expr(expr) => {
                self.evaluate(expr, env)?;
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr, env)?;
                writeln!(self.output, "{}", value)?;
            }
            Stmt::VarDecl(name, init) => {
                let value = self.evaluate(init, env)?;
                env.define(name, value);
            }
            Stmt::Block(stmts) => {
                // The fresh frame lives only for this block; the caller's
                // handle is untouched, so scope restoration holds on every
                // exit path, runtime-error unwinds included.
                let inner = Env::with_enclosing(env.clone());
                for stmt in stmts {
                    self.execute(stmt, &inner)?;
                }
            }
            Stmt::If(cond, then_branch, else_branch) => {
                if self.evaluate(cond, env)?.is_truthy() {
                    self.execute(then_branch, env)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch, env)?;
                }
            }
            Stmt::While(cond, body) => {
                while self.evaluate(cond, env)?.is_truthy() {
                    self.execute(body, env)?;
                }
            }
        };
        Ok(())
    }

    fn evaluate(&mut self, expr: &Expr, env: &Rc<Env>) -> Result<Value, EvalError> {
        match expr {
            Expr::Nil => Ok(Value::Nil),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Group(inner) => self.evaluate(inner, env),
            Expr::Var(name, pos) => match env.get(name) {
                Some(value) => Ok(value),
                None => Err(undefined(name, *pos)),
            },
            Expr::Unary(op, pos, operand) => {
                let value = self.evaluate(operand, env)?;
                match op {
                    UnaryOp::Neg => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(runtime(*pos, RuntimeErrorKind::OperandMustBeNumber)),
                    },
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                }
            }
            Expr::Binary(op, pos, lhs, rhs) => {
                // Strictly left then right.
                let l = self.evaluate(lhs, env)?;
                let r = self.evaluate(rhs, env)?;
                apply_binary(*op, *pos, l, r)
            }
            Expr::Logical(op, lhs, rhs) => {
                let l = self.evaluate(lhs, env)?;
                let short_circuits = match op {
                    LogicalOp::Or => l.is_truthy(),
                    LogicalOp::And => !l.is_truthy(),
                };
                // The operand itself, not a boolean.
                if short_circuits {
                    Ok(l)
                } else {
                    self.evaluate(rhs, env)
                }
            }
            Expr::Assign(name, pos, rhs) => {
                let value = self.evaluate(rhs, env)?;
                if env.assign(name, value.clone()) {
                    Ok(value)
                } else {
                    Err(undefined(name, *pos))
                }
            }
        }
    }
}

fn apply_binary(op: BinOp, pos: Position, l: Value, r: Value) -> Result<Value, EvalError> {
    match op {
        BinOp::Add => match (l, r) {
            (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
            (Value::Str(l), Value::Str(r)) => Ok(Value::Str(l + &r)),
            _ => Err(runtime(pos, RuntimeErrorKind::OperandsMustBeNumbersOrStrings)),
        },
        BinOp::Sub => numeric_operands(pos, l, r).map(|(l, r)| Value::Number(l - r)),
        BinOp::Mul => numeric_operands(pos, l, r).map(|(l, r)| Value::Number(l * r)),
        // Division by zero follows IEEE semantics: infinity or NaN.
        BinOp::Div => numeric_operands(pos, l, r).map(|(l, r)| Value::Number(l / r)),
        BinOp::Greater => numeric_operands(pos, l, r).map(|(l, r)| Value::Bool(l > r)),
        BinOp::GreaterEqual => numeric_operands(pos, l, r).map(|(l, r)| Value::Bool(l >= r)),
        BinOp::Less => numeric_operands(pos, l, r).map(|(l, r)| Value::Bool(l < r)),
        BinOp::LessEqual => numeric_operands(pos, l, r).map(|(l, r)| Value::Bool(l <= r)),
        // Equality is structural and works across kinds: nil equals nil,
        // values of different kinds are simply unequal.
        BinOp::Equal => Ok(Value::Bool(l == r)),
        BinOp::NotEqual => Ok(Value::Bool(l != r)),
    }
}

fn numeric_operands(pos: Position, l: Value, r: Value) -> Result<(f64, f64), EvalError> {
    match (l, r) {
        (Value::Number(l), Value::Number(r)) => Ok((l, r)),
        _ => Err(runtime(pos, RuntimeErrorKind::OperandsMustBeNumbers)),
    }
}

/// One frame of the lexical scope chain.
#[derive(Debug)]
struct Env {
    enclosing: Option<Rc<Env>>,
    bindings: RefCell<HashMap<Symbol, Value>>,
}

impl Env {
    fn global() -> Rc<Env> {
        Rc::new(Env {
            enclosing: None,
            bindings: RefCell::new(HashMap::new()),
        })
    }

    fn with_enclosing(enclosing: Rc<Env>) -> Rc<Env> {
        Rc::new(Env {
            enclosing: Some(enclosing),
            bindings: RefCell::new(HashMap::new()),
        })
    }

    /// Declares `name` in this frame, overwriting any previous binding here.
    fn define(&self, name: &Symbol, value: Value) {
        self.bindings.borrow_mut().insert(name.clone(), value);
    }

    /// Assigns to the nearest frame already containing `name`; never creates
    /// a binding. Returns whether a binding was found.
    fn assign(&self, name: &Symbol, value: Value) -> bool {
        if let Entry::Occupied(mut entry) = self.bindings.borrow_mut().entry(name.clone()) {
            entry.insert(value);
            true
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.assign(name, value)
        } else {
            false
        }
    }

    /// Reads `name` from the nearest frame containing it.
    fn get(&self, name: &Symbol) -> Option<Value> {
        match self.bindings.borrow().get(name) {
            Some(value) => Some(value.clone()),
            None => self.enclosing.as_ref().and_then(|e| e.get(name)),
        }
    }
}
