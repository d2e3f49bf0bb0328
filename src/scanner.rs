//! Lexical analyzer

use std::iter::Peekable;
use std::rc::Rc;
use std::str::Chars;

use crate::diag::Position;
use crate::session::Session;
use crate::token::Token;

/// Scans `source` to completion.
///
/// Never fails: malformed input is reported through the session's diagnostic
/// sink and the offending character is skipped. The returned stream always
/// ends with exactly one `Eof` token.
pub fn scan(source: &str, session: &Rc<Session>) -> Vec<(Position, Token)> {
    let mut scanner = Scanner::new(source, session.clone());
    let mut tokens = vec![];
    loop {
        let (pos, token) = scanner.next_token();
        let at_end = token == Token::Eof;
        tokens.push((pos, token));
        if at_end {
            break;
        }
    }
    tokens
}

/// Turns source text into a sequence of tokens.
#[derive(Debug)]
pub struct Scanner<'s> {
    input: Peekable<Chars<'s>>,
    line: Position,
    session: Rc<Session>,

    // Buffer used when scanning longer lexemes. Kept here to reuse memory.
    buf: String,
}

impl<'s> Scanner<'s> {
    pub fn new(source: &'s str, session: Rc<Session>) -> Scanner<'s> {
        Scanner {
            input: source.chars().peekable(),
            line: 1,
            session,
            buf: String::new(),
        }
    }

    /// Scans the next token and the line it started on.
    pub fn next_token(&mut self) -> (Position, Token) {
        loop {
            let ch = match self.input.next() {
                None => return (self.line, Token::Eof),
                Some(ch) => ch,
            };
            let start = self.line;
            let token = match ch {
                '\n' => {
                    self.line += 1;
                    continue;
                }
                ' ' | '\t' | '\r' => continue,
                '(' => Token::LeftParen,
                ')' => Token::RightParen,
                '{' => Token::LeftCurly,
                '}' => Token::RightCurly,
                ',' => Token::Comma,
                '.' => Token::Dot,
                '-' => Token::Minus,
                '+' => Token::Plus,
                ';' => Token::Semicolon,
                '*' => Token::Star,
                '!' => {
                    if self.advance_if('=') {
                        Token::BangEqual
                    } else {
                        Token::Bang
                    }
                }
                '=' => {
                    if self.advance_if('=') {
                        Token::EqualEqual
                    } else {
                        Token::Equal
                    }
                }
                '<' => {
                    if self.advance_if('=') {
                        Token::LessEqual
                    } else {
                        Token::Less
                    }
                }
                '>' => {
                    if self.advance_if('=') {
                        Token::GreaterEqual
                    } else {
                        Token::Greater
                    }
                }
                '/' => {
                    if self.advance_if('/') {
                        self.skip_comment();
                        continue;
                    } else {
                        Token::Slash
                    }
                }
                '"' => match self.scan_string() {
                    Some(token) => token,
                    None => continue,
                },
                '0'..='9' => match self.scan_number(ch) {
                    Some(token) => token,
                    None => continue,
                },
                ch if ch.is_ascii_alphabetic() || ch == '_' => self.scan_identifier(ch),
                _ => {
                    self.session.line_error(self.line, "Unexpected character.");
                    continue;
                }
            };
            return (start, token);
        }
    }

    /// Consumes the next character if it equals `expected`.
    fn advance_if(&mut self, expected: char) -> bool {
        if self.input.peek() == Some(&expected) {
            self.input.next();
            true
        } else {
            false
        }
    }

    /// One character past the peekable one.
    fn peek_next(&self) -> Option<char> {
        let mut ahead = self.input.clone();
        ahead.next();
        ahead.next()
    }

    fn skip_comment(&mut self) {
        // Through, but not including, the newline: the main loop counts it.
        while let Some(ch) = self.input.peek() {
            if *ch == '\n' {
                break;
            }
            self.input.next();
        }
    }

    /// Scans the rest of a string literal; the opening `"` is already
    /// consumed. The token's value is the interior text, without escapes.
    fn scan_string(&mut self) -> Option<Token> {
        self.buf.clear();
        loop {
            match self.input.next() {
                None => {
                    self.session.line_error(self.line, "Unterminated string.");
                    return None;
                }
                Some('"') => return Some(Token::Str(self.buf.clone())),
                Some(ch) => {
                    if ch == '\n' {
                        self.line += 1;
                    }
                    self.buf.push(ch);
                }
            }
        }
    }

    /// Scans a number literal. The decimal point is consumed only when a
    /// digit follows, so `1.` yields `1` and leaves the `.` for the next
    /// token.
    fn scan_number(&mut self, first_digit: char) -> Option<Token> {
        self.buf.clear();
        self.buf.push(first_digit);
        self.take_digits();
        if self.input.peek() == Some(&'.') && self.peek_next().map_or(false, |ch| ch.is_ascii_digit())
        {
            self.input.next();
            self.buf.push('.');
            self.take_digits();
        }
        // Digits with at most one interior point always parse.
        self.buf
            .parse::<f64>()
            .ok()
            .map(|n| Token::Number(n, self.buf.clone()))
    }

    fn take_digits(&mut self) {
        while let Some(ch) = self.input.peek() {
            if !ch.is_ascii_digit() {
                break;
            }
            self.buf.push(*ch);
            self.input.next();
        }
    }

    fn scan_identifier(&mut self, first_char: char) -> Token {
        self.buf.clear();
        self.buf.push(first_char);
        while let Some(ch) = self.input.peek() {
            if !(ch.is_ascii_alphanumeric() || *ch == '_') {
                break;
            }
            self.buf.push(*ch);
            self.input.next();
        }

        let sym = self.session.symbol(&self.buf);
        if let Some(token) = self.session.keyword(&sym) {
            token
        } else {
            Token::Identifier(sym)
        }
    }
}
