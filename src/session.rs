//! Per-run state shared by every phase of the pipeline.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::diag::{Diagnostic, ErrorLocation, Position, RuntimeError, SyntaxError};
use crate::interner::{Interner, Symbol};
use crate::token::Token;

/// Shared handle threaded through scanner, parser and facade.
///
/// Owns the identifier interner, the keyword table, the accumulated
/// diagnostics and the two error flags the host inspects after a run. There
/// is no process-global state: each session is independent, which keeps
/// interpreters testable side by side.
///
/// Execution is single-threaded, so plain `Cell`/`RefCell` interior
/// mutability suffices.
#[derive(Debug)]
pub struct Session {
    interner: RefCell<Interner>,
    keywords: HashMap<Symbol, Token>,
    diagnostics: RefCell<Vec<Diagnostic>>,
    had_error: Cell<bool>,
    had_runtime_error: Cell<bool>,
}

impl Session {
    /// Creates a new session.
    ///
    /// Returns an `Rc` because the handle is shared between phases.
    pub fn new() -> Rc<Session> {
        let mut interner = Interner::new();

        let mut keywords = HashMap::new();
        for (name, token) in KEYWORDS.iter().cloned() {
            keywords.insert(interner.intern(name), token);
        }

        Rc::new(Session {
            interner: RefCell::new(interner),
            keywords,
            diagnostics: RefCell::new(Vec::new()),
            had_error: Cell::new(false),
            had_runtime_error: Cell::new(false),
        })
    }

    /// Interns `name` if needed and returns its symbol.
    pub fn symbol(&self, name: &str) -> Symbol {
        self.interner.borrow_mut().intern(name)
    }

    /// Returns the token for `sym` if it names a keyword.
    pub fn keyword(&self, sym: &Symbol) -> Option<Token> {
        self.keywords.get(sym).cloned()
    }

    /// Reports a line-scoped (lexical) error and sets the static-error flag.
    pub fn line_error(&self, pos: Position, message: impl Into<String>) {
        self.report_syntax(SyntaxError {
            pos,
            at: ErrorLocation::Line,
            message: message.into(),
        });
    }

    /// Reports a parse error at `token` and sets the static-error flag.
    ///
    /// `Eof` renders as ` at end` rather than a lexeme.
    pub fn token_error(&self, pos: Position, token: &Token, message: impl Into<String>) {
        let at = match token {
            Token::Eof => ErrorLocation::Eof,
            other => ErrorLocation::Token(other.to_string()),
        };
        self.report_syntax(SyntaxError {
            pos,
            at,
            message: message.into(),
        });
    }

    fn report_syntax(&self, err: SyntaxError) {
        self.had_error.set(true);
        self.diagnostics.borrow_mut().push(err.into());
    }

    /// Reports a runtime error and sets the runtime-error flag.
    pub fn runtime_error(&self, err: RuntimeError) {
        self.had_runtime_error.set(true);
        self.diagnostics.borrow_mut().push(err.into());
    }

    pub fn had_error(&self) -> bool {
        self.had_error.get()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error.get()
    }

    /// Clears the static-error flag between interactive prompt lines.
    ///
    /// The runtime-error flag deliberately stays set.
    pub fn clear_error(&self) {
        self.had_error.set(false);
    }

    /// Hands accumulated diagnostics to the host, oldest first.
    pub fn drain_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow_mut().drain(..).collect()
    }
}

const KEYWORDS: [(&str, Token); 16] = [
    ("and", Token::And),
    ("class", Token::Class),
    ("else", Token::Else),
    ("false", Token::False),
    ("for", Token::For),
    ("fun", Token::Fun),
    ("if", Token::If),
    ("nil", Token::Nil),
    ("or", Token::Or),
    ("print", Token::Print),
    ("return", Token::Return),
    ("super", Token::Super),
    ("this", Token::This),
    ("true", Token::True),
    ("var", Token::Var),
    ("while", Token::While),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::RuntimeErrorKind;

    #[test]
    fn keywords_resolve_to_their_tokens() {
        let session = Session::new();
        let sym = session.symbol("while");
        assert_eq!(session.keyword(&sym), Some(Token::While));
    }

    #[test]
    fn non_keyword_resolves_to_none() {
        let session = Session::new();
        let sym = session.symbol("whale");
        assert_eq!(session.keyword(&sym), None);
    }

    #[test]
    fn line_error_sets_flag_and_queues_diagnostic() {
        let session = Session::new();
        assert!(!session.had_error());

        session.line_error(4, "Unexpected character.");
        assert!(session.had_error());

        let diags = session.drain_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].to_string(), "[line 4] Error: Unexpected character.");
        assert!(session.drain_diagnostics().is_empty());
    }

    #[test]
    fn token_error_renders_at_end_for_eof() {
        let session = Session::new();
        session.token_error(2, &Token::Eof, "Expect expression.");
        let diags = session.drain_diagnostics();
        assert_eq!(
            diags[0].to_string(),
            "[line 2] Error at end: Expect expression."
        );
    }

    #[test]
    fn clear_error_leaves_runtime_flag_alone() {
        let session = Session::new();
        session.line_error(1, "Unexpected character.");
        session.runtime_error(RuntimeError {
            pos: 1,
            kind: RuntimeErrorKind::OperandsMustBeNumbers,
        });
        session.clear_error();
        assert!(!session.had_error());
        assert!(session.had_runtime_error());
    }
}
