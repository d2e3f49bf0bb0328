//! Diagnostic types shared by the scanner, parser and evaluator.
//!
//! Static (lexical and syntactic) diagnostics render as
//! `[line N] Error: MESSAGE`, with an ` at 'LEXEME'` / ` at end` insert when
//! a specific token is to blame. Runtime errors render as the message
//! followed by `[line N]` on its own line.

use std::error::Error;
use std::fmt;

/// Line number, starting at one.
pub type Position = u32;

/// Where a static diagnostic points.
#[derive(Debug, PartialEq, Clone)]
pub enum ErrorLocation {
    /// Only a line is known (lexical errors).
    Line,
    /// A specific token, identified by its lexeme.
    Token(String),
    /// The end of input.
    Eof,
}

/// A lexical or syntactic error.
#[derive(Debug, PartialEq, Clone)]
pub struct SyntaxError {
    pub pos: Position,
    pub at: ErrorLocation,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.at {
            ErrorLocation::Line => write!(f, "[line {}] Error: {}", self.pos, self.message),
            ErrorLocation::Token(lexeme) => {
                write!(f, "[line {}] Error at '{}': {}", self.pos, lexeme, self.message)
            }
            ErrorLocation::Eof => write!(f, "[line {}] Error at end: {}", self.pos, self.message),
        }
    }
}

impl Error for SyntaxError {}

/// A semantic failure raised during evaluation.
///
/// Carries the line of the offending token; raising one aborts the current
/// `interpret` call.
#[derive(Debug, PartialEq, Clone)]
pub struct RuntimeError {
    pub pos: Position,
    pub kind: RuntimeErrorKind,
}

#[derive(Debug, PartialEq, Clone)]
pub enum RuntimeErrorKind {
    OperandMustBeNumber,
    OperandsMustBeNumbers,
    OperandsMustBeNumbersOrStrings,
    UndefinedVariable(String),
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeErrorKind::OperandMustBeNumber => write!(f, "Operand must be a number."),
            RuntimeErrorKind::OperandsMustBeNumbers => write!(f, "Operands must be numbers."),
            RuntimeErrorKind::OperandsMustBeNumbersOrStrings => {
                write!(f, "Operands must be two numbers or two strings.")
            }
            RuntimeErrorKind::UndefinedVariable(name) => {
                write!(f, "Undefined variable '{}'.", name)
            }
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n[line {}]", self.kind, self.pos)
    }
}

impl Error for RuntimeError {}

/// Anything reported through the session's diagnostic sink.
#[derive(Debug, PartialEq, Clone)]
pub enum Diagnostic {
    Syntax(SyntaxError),
    Runtime(RuntimeError),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Syntax(e) => write!(f, "{}", e),
            Diagnostic::Runtime(e) => write!(f, "{}", e),
        }
    }
}

impl From<SyntaxError> for Diagnostic {
    fn from(e: SyntaxError) -> Diagnostic {
        Diagnostic::Syntax(e)
    }
}

impl From<RuntimeError> for Diagnostic {
    fn from(e: RuntimeError) -> Diagnostic {
        Diagnostic::Runtime(e)
    }
}
