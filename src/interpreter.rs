//! API to control the interpreter.

use std::io;
use std::io::prelude::*;
use std::rc::Rc;

use crate::eval::{EvalError, Evaluator};
use crate::parser;
use crate::scanner;
use crate::session::Session;

/// Tree-walk interpreter running the full pipeline.
///
/// Program output and diagnostics go to two injected writers, so hosts can
/// wire them to stdout/stderr and tests can capture them in memory.
///
/// # Example
///
/// ```
/// use treelox::interpreter::Interpreter;
///
/// let mut output: Vec<u8> = Vec::new();
/// let mut errors: Vec<u8> = Vec::new();
/// let mut interp = Interpreter::new(&mut output, &mut errors);
///
/// interp.run("var greeting = \"hello\"; print greeting;")?;
///
/// assert_eq!(output, b"hello\n");
/// assert!(errors.is_empty());
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct Interpreter<'a, W: Write, E: Write> {
    session: Rc<Session>,
    evaluator: Evaluator<'a, W>,
    errors: &'a mut E,
}

impl<'a, W: Write, E: Write> Interpreter<'a, W, E> {
    pub fn new(output: &'a mut W, errors: &'a mut E) -> Interpreter<'a, W, E> {
        Interpreter {
            session: Session::new(),
            evaluator: Evaluator::new(output),
            errors,
        }
    }

    /// Runs the full pipeline on `source`: scan, parse, evaluate.
    ///
    /// Language problems of any phase are written to the error writer as
    /// diagnostics; afterwards the caller inspects [`Interpreter::had_error`]
    /// and [`Interpreter::had_runtime_error`]. An `Err` from this method is a
    /// host-level I/O failure, never a language diagnostic.
    ///
    /// The global environment survives across calls, so an interactive
    /// session accumulates definitions line by line.
    pub fn run(&mut self, source: &str) -> io::Result<()> {
        let tokens = scanner::scan(source, &self.session);
        let stmts = parser::parse(tokens, &self.session);
        self.flush_diagnostics()?;
        // A parse that reported errors may have dropped declarations; the
        // statements it did produce must not run.
        if self.session.had_error() {
            return Ok(());
        }

        match self.evaluator.interpret(&stmts) {
            Ok(()) => Ok(()),
            Err(EvalError::Runtime(e)) => {
                self.session.runtime_error(e);
                self.flush_diagnostics()
            }
            Err(EvalError::Io(e)) => Err(e),
        }
    }

    /// Whether any lexical or syntactic error was reported.
    pub fn had_error(&self) -> bool {
        self.session.had_error()
    }

    /// Whether any runtime error was reported.
    pub fn had_runtime_error(&self) -> bool {
        self.session.had_runtime_error()
    }

    /// Forgets static errors between interactive prompt lines. Runtime
    /// errors stay on record.
    pub fn clear_error(&self) {
        self.session.clear_error()
    }

    fn flush_diagnostics(&mut self) -> io::Result<()> {
        for diagnostic in self.session.drain_diagnostics() {
            writeln!(self.errors, "{}", diagnostic)?;
        }
        Ok(())
    }
}
