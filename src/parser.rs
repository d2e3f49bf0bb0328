//! Recursive-descent parser with error recovery.
//!
//! Parse errors are reported to the session as they are discovered and then
//! unwound (as `Err`) to the nearest declaration, which synchronizes to a
//! likely statement boundary and carries on. A single source may therefore
//! yield several diagnostics; callers must gate evaluation on the session's
//! `had_error` flag.

use std::rc::Rc;

use crate::ast::{BinOp, Expr, LogicalOp, Stmt, UnaryOp};
use crate::diag::Position;
use crate::session::Session;
use crate::token::Token;

/// Parses a scanned token stream into a statement list.
pub fn parse(tokens: Vec<(Position, Token)>, session: &Rc<Session>) -> Vec<Stmt> {
    Parser::new(tokens, session.clone()).parse_program()
}

/// Marker unwound from the point of a parse error to the declaration loop.
/// The error itself has already been reported through the session.
#[derive(Debug)]
struct ParseInterrupt;

type ParseResult<T> = Result<T, ParseInterrupt>;

#[derive(Debug)]
pub struct Parser {
    tokens: Vec<(Position, Token)>,
    current: usize,
    session: Rc<Session>,
}

impl Parser {
    /// `tokens` must come from the scanner: non-empty, terminated by `Eof`.
    pub fn new(tokens: Vec<(Position, Token)>, session: Rc<Session>) -> Parser {
        debug_assert!(matches!(tokens.last(), Some((_, Token::Eof))));
        Parser {
            tokens,
            current: 0,
            session,
        }
    }

    pub fn parse_program(&mut self) -> Vec<Stmt> {
        let mut program = vec![];
        while !self.at_end() {
            if let Some(stmt) = self.declaration() {
                program.push(stmt);
            }
        }
        program
    }

    /// Parses one declaration, recovering from parse errors so the ones
    /// after it can still be reported. A failed declaration yields `None`.
    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.matches(&Token::Var) {
            self.var_decl()
        } else {
            self.statement()
        };
        match result {
            Ok(stmt) => Some(stmt),
            Err(ParseInterrupt) => {
                self.synchronize();
                None
            }
        }
    }

    /// Variable declaration; the `var` keyword is already consumed.
    fn var_decl(&mut self) -> ParseResult<Stmt> {
        let name = match self.peek().clone() {
            Token::Identifier(sym) => {
                self.advance();
                sym
            }
            _ => return Err(self.error("Expect variable name.")),
        };
        let init = if self.matches(&Token::Equal) {
            self.expression()?
        } else {
            Expr::Nil
        };
        self.consume(Token::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::VarDecl(name, Box::new(init)))
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.matches(&Token::If) {
            return self.if_statement();
        }
        if self.matches(&Token::For) {
            return self.for_statement();
        }
        if self.matches(&Token::While) {
            return self.while_statement();
        }
        if self.matches(&Token::Print) {
            let expr = self.expression()?;
            self.consume(Token::Semicolon, "Expect ';' after value.")?;
            return Ok(Stmt::Print(Box::new(expr)));
        }
        if self.matches(&Token::LeftCurly) {
            return Ok(Stmt::Block(self.block()?));
        }
        let expr = self.expression()?;
        self.consume(Token::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expr(Box::new(expr)))
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(Token::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(Token::RightParen, "Expect ')' after if condition.")?;
        let then_branch = self.statement()?;
        let else_branch = if self.matches(&Token::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If(
            Box::new(condition),
            Box::new(then_branch),
            else_branch,
        ))
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(Token::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(Token::RightParen, "Expect ')' after condition.")?;
        let body = self.statement()?;
        Ok(Stmt::While(Box::new(condition), Box::new(body)))
    }

    /// `for` has no AST node of its own: it is rewritten here into the
    /// equivalent `Block`/`While` nesting.
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(Token::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.matches(&Token::Semicolon) {
            None
        } else if self.matches(&Token::Var) {
            Some(self.var_decl()?)
        } else {
            let expr = self.expression()?;
            self.consume(Token::Semicolon, "Expect ';' after expression.")?;
            Some(Stmt::Expr(Box::new(expr)))
        };

        let condition = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(Token::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(&Token::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(Token::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;
        if let Some(incr) = increment {
            body = Stmt::Block(vec![body, Stmt::Expr(Box::new(incr))]);
        }
        let condition = condition.unwrap_or(Expr::Bool(true));
        body = Stmt::While(Box::new(condition), Box::new(body));
        if let Some(init) = initializer {
            body = Stmt::Block(vec![init, body]);
        }
        Ok(body)
    }

    /// Statements between `{` and `}`; the `{` is already consumed.
    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut stmts = vec![];
        while !self.check(&Token::RightCurly) && !self.at_end() {
            if let Some(stmt) = self.declaration() {
                stmts.push(stmt);
            }
        }
        self.consume(Token::RightCurly, "Expect '}' after block.")?;
        Ok(stmts)
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.logic_or()?;
        if self.check(&Token::Equal) {
            let eq_pos = self.peek_pos();
            self.advance();
            let value = self.assignment()?;
            return match expr {
                Expr::Var(name, pos) => Ok(Expr::Assign(name, pos, Box::new(value))),
                // Reported without unwinding: the enclosing context keeps
                // parsing with the left-hand side it already has.
                lhs => {
                    self.session
                        .token_error(eq_pos, &Token::Equal, "Invalid assignment target.");
                    Ok(lhs)
                }
            };
        }
        Ok(expr)
    }

    fn logic_or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.logic_and()?;
        while self.matches(&Token::Or) {
            let rhs = self.logic_and()?;
            expr = Expr::Logical(LogicalOp::Or, Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn logic_and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while self.matches(&Token::And) {
            let rhs = self.equality()?;
            expr = Expr::Logical(LogicalOp::And, Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;
        loop {
            let op = match self.peek() {
                Token::BangEqual => BinOp::NotEqual,
                Token::EqualEqual => BinOp::Equal,
                _ => break,
            };
            let pos = self.peek_pos();
            self.advance();
            let rhs = self.comparison()?;
            expr = Expr::Binary(op, pos, Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;
        loop {
            let op = match self.peek() {
                Token::Greater => BinOp::Greater,
                Token::GreaterEqual => BinOp::GreaterEqual,
                Token::Less => BinOp::Less,
                Token::LessEqual => BinOp::LessEqual,
                _ => break,
            };
            let pos = self.peek_pos();
            self.advance();
            let rhs = self.term()?;
            expr = Expr::Binary(op, pos, Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;
        loop {
            let op = match self.peek() {
                Token::Minus => BinOp::Sub,
                Token::Plus => BinOp::Add,
                _ => break,
            };
            let pos = self.peek_pos();
            self.advance();
            let rhs = self.factor()?;
            expr = Expr::Binary(op, pos, Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Slash => BinOp::Div,
                Token::Star => BinOp::Mul,
                _ => break,
            };
            let pos = self.peek_pos();
            self.advance();
            let rhs = self.unary()?;
            expr = Expr::Binary(op, pos, Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek() {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Neg,
            _ => return self.primary(),
        };
        let pos = self.peek_pos();
        self.advance();
        let operand = self.unary()?;
        Ok(Expr::Unary(op, pos, Box::new(operand)))
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let pos = self.peek_pos();
        let expr = match self.peek().clone() {
            Token::False => Expr::Bool(false),
            Token::True => Expr::Bool(true),
            Token::Nil => Expr::Nil,
            Token::Number(n, _) => Expr::Number(n),
            Token::Str(s) => Expr::Str(s),
            Token::Identifier(sym) => Expr::Var(sym, pos),
            Token::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(Token::RightParen, "Expect ')' after expression.")?;
                return Ok(Expr::Group(Box::new(inner)));
            }
            _ => return Err(self.error("Expect expression.")),
        };
        self.advance();
        Ok(expr)
    }

    /// Discards tokens up to a likely statement boundary: just past a `;`,
    /// or just before a keyword that begins a new statement.
    fn synchronize(&mut self) {
        self.advance();
        while !self.at_end() {
            if *self.previous() == Token::Semicolon {
                return;
            }
            match self.peek() {
                Token::Class
                | Token::Fun
                | Token::Var
                | Token::For
                | Token::If
                | Token::While
                | Token::Print
                | Token::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Reports a parse error at the current token and returns the marker to
    /// unwind with.
    fn error(&self, message: &str) -> ParseInterrupt {
        let (pos, token) = &self.tokens[self.current];
        self.session.token_error(*pos, token, message);
        ParseInterrupt
    }

    fn consume(&mut self, expected: Token, message: &str) -> ParseResult<()> {
        if self.check(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn matches(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current].1
    }

    fn peek_pos(&self) -> Position {
        self.tokens[self.current].0
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1].1
    }

    fn at_end(&self) -> bool {
        *self.peek() == Token::Eof
    }

    fn advance(&mut self) {
        if !self.at_end() {
            self.current += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;

    fn parse_prg_with_session(input: &str, session: &Rc<Session>) -> Vec<Stmt> {
        let tokens = scan(input, session);
        parse(tokens, session)
    }

    fn parse_prg(input: &str) -> Vec<Stmt> {
        let session = Session::new();
        let prg = parse_prg_with_session(input, &session);
        assert!(!session.had_error(), "unexpected parse errors in {:?}", input);
        prg
    }

    /// Parses `input` as a single expression statement and unwraps it.
    fn parse_expr(input: &str) -> Expr {
        let mut prg = parse_prg(&format!("{};", input));
        assert_eq!(prg.len(), 1);
        match prg.remove(0) {
            Stmt::Expr(expr) => *expr,
            stmt => panic!("expected expression statement, got {:?}", stmt),
        }
    }

    fn diagnostics(session: &Rc<Session>) -> Vec<String> {
        session
            .drain_diagnostics()
            .iter()
            .map(|d| d.to_string())
            .collect()
    }

    fn number(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    #[test]
    fn literals() {
        assert_eq!(parse_expr("42"), Expr::Number(42.0));
        assert_eq!(parse_expr("true"), Expr::Bool(true));
        assert_eq!(parse_expr("false"), Expr::Bool(false));
        assert_eq!(parse_expr("nil"), Expr::Nil);
        assert_eq!(parse_expr("\"hi\""), Expr::Str("hi".to_string()));
    }

    #[test]
    fn factors_bind_tighter_than_terms() {
        assert_eq!(
            parse_expr("1 + 2 * 3"),
            Expr::Binary(
                BinOp::Add,
                1,
                number(1.0),
                Box::new(Expr::Binary(BinOp::Mul, 1, number(2.0), number(3.0))),
            )
        );
    }

    #[test]
    fn terms_are_left_associative() {
        assert_eq!(
            parse_expr("1 - 2 - 3"),
            Expr::Binary(
                BinOp::Sub,
                1,
                Box::new(Expr::Binary(BinOp::Sub, 1, number(1.0), number(2.0))),
                number(3.0),
            )
        );
    }

    #[test]
    fn unary_is_right_associative() {
        assert_eq!(
            parse_expr("--1"),
            Expr::Unary(
                UnaryOp::Neg,
                1,
                Box::new(Expr::Unary(UnaryOp::Neg, 1, number(1.0))),
            )
        );
    }

    #[test]
    fn bang_binds_tighter_than_equality() {
        let session = Session::new();
        let a = session.symbol("a");
        let b = session.symbol("b");
        let prg = parse_prg_with_session("!a == b;", &session);
        assert_eq!(
            prg,
            vec![Stmt::Expr(Box::new(Expr::Binary(
                BinOp::Equal,
                1,
                Box::new(Expr::Unary(UnaryOp::Not, 1, Box::new(Expr::Var(a, 1)))),
                Box::new(Expr::Var(b, 1)),
            )))]
        );
    }

    #[test]
    fn comparison_operators() {
        assert_eq!(
            parse_expr("1 <= 2"),
            Expr::Binary(BinOp::LessEqual, 1, number(1.0), number(2.0))
        );
        assert_eq!(
            parse_expr("1 >= 2"),
            Expr::Binary(BinOp::GreaterEqual, 1, number(1.0), number(2.0))
        );
    }

    #[test]
    fn grouping_overrides_precedence() {
        assert_eq!(
            parse_expr("(1 + 2) * 3"),
            Expr::Binary(
                BinOp::Mul,
                1,
                Box::new(Expr::Group(Box::new(Expr::Binary(
                    BinOp::Add,
                    1,
                    number(1.0),
                    number(2.0)
                )))),
                number(3.0),
            )
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        assert_eq!(
            parse_expr("1 or 2 and 3"),
            Expr::Logical(
                LogicalOp::Or,
                number(1.0),
                Box::new(Expr::Logical(LogicalOp::And, number(2.0), number(3.0))),
            )
        );
    }

    #[test]
    fn assignment_is_right_associative() {
        let session = Session::new();
        let a = session.symbol("a");
        let b = session.symbol("b");
        let prg = parse_prg_with_session("a = b = 1;", &session);
        assert!(!session.had_error());
        assert_eq!(
            prg,
            vec![Stmt::Expr(Box::new(Expr::Assign(
                a,
                1,
                Box::new(Expr::Assign(b, 1, number(1.0))),
            )))]
        );
    }

    #[test]
    fn invalid_assignment_target_keeps_lhs() {
        let session = Session::new();
        let prg = parse_prg_with_session("1 = 2;", &session);
        assert!(session.had_error());
        assert_eq!(
            diagnostics(&session),
            vec!["[line 1] Error at '=': Invalid assignment target.".to_string()]
        );
        // The left-hand side survives; parsing of the statement continued.
        assert_eq!(prg, vec![Stmt::Expr(number(1.0))]);
    }

    #[test]
    fn var_decl_with_and_without_initializer() {
        let session = Session::new();
        let foo = session.symbol("foo");
        let bar = session.symbol("bar");
        let prg = parse_prg_with_session("var foo; var bar = 2 * 3.14;", &session);
        assert!(!session.had_error());
        assert_eq!(
            prg,
            vec![
                Stmt::VarDecl(foo, Box::new(Expr::Nil)),
                Stmt::VarDecl(
                    bar,
                    Box::new(Expr::Binary(BinOp::Mul, 1, number(2.0), number(3.14))),
                ),
            ]
        );
    }

    #[test]
    fn print_statement() {
        assert_eq!(
            parse_prg("print 1 + 2;"),
            vec![Stmt::Print(Box::new(Expr::Binary(
                BinOp::Add,
                1,
                number(1.0),
                number(2.0)
            )))]
        );
    }

    #[test]
    fn blocks_nest() {
        assert_eq!(
            parse_prg("{ 1; { 2; } }"),
            vec![Stmt::Block(vec![
                Stmt::Expr(number(1.0)),
                Stmt::Block(vec![Stmt::Expr(number(2.0))]),
            ])]
        );
    }

    #[test]
    fn if_and_dangling_else() {
        // The else binds to the nearest if.
        assert_eq!(
            parse_prg("if (true) if (false) 1; else 2;"),
            vec![Stmt::If(
                Box::new(Expr::Bool(true)),
                Box::new(Stmt::If(
                    Box::new(Expr::Bool(false)),
                    Box::new(Stmt::Expr(number(1.0))),
                    Some(Box::new(Stmt::Expr(number(2.0)))),
                )),
                None,
            )]
        );
    }

    #[test]
    fn while_statement() {
        assert_eq!(
            parse_prg("while (true) 1;"),
            vec![Stmt::While(
                Box::new(Expr::Bool(true)),
                Box::new(Stmt::Expr(number(1.0))),
            )]
        );
    }

    #[test]
    fn full_for_loop_desugars_to_while() {
        let session = Session::new();
        let i = session.symbol("i");
        let prg = parse_prg_with_session("for (var i = 0; i < 3; i = i + 1) print i;", &session);
        assert!(!session.had_error());
        assert_eq!(
            prg,
            vec![Stmt::Block(vec![
                Stmt::VarDecl(i.clone(), number(0.0)),
                Stmt::While(
                    Box::new(Expr::Binary(
                        BinOp::Less,
                        1,
                        Box::new(Expr::Var(i.clone(), 1)),
                        number(3.0),
                    )),
                    Box::new(Stmt::Block(vec![
                        Stmt::Print(Box::new(Expr::Var(i.clone(), 1))),
                        Stmt::Expr(Box::new(Expr::Assign(
                            i.clone(),
                            1,
                            Box::new(Expr::Binary(
                                BinOp::Add,
                                1,
                                Box::new(Expr::Var(i, 1)),
                                number(1.0),
                            )),
                        ))),
                    ])),
                ),
            ])]
        );
    }

    #[test]
    fn bare_for_loop_runs_forever() {
        assert_eq!(
            parse_prg("for (;;) print 1;"),
            vec![Stmt::While(
                Box::new(Expr::Bool(true)),
                Box::new(Stmt::Print(number(1.0))),
            )]
        );
    }

    #[test]
    fn missing_right_paren_reports_at_end() {
        let session = Session::new();
        parse_prg_with_session("(1", &session);
        assert_eq!(
            diagnostics(&session),
            vec!["[line 1] Error at end: Expect ')' after expression.".to_string()]
        );
    }

    #[test]
    fn bare_semicolon_is_an_error() {
        let session = Session::new();
        parse_prg_with_session(";", &session);
        assert_eq!(
            diagnostics(&session),
            vec!["[line 1] Error at ';': Expect expression.".to_string()]
        );
    }

    #[test]
    fn reserved_keyword_is_rejected() {
        let session = Session::new();
        parse_prg_with_session("class Foo;", &session);
        assert!(session.had_error());
        assert_eq!(
            diagnostics(&session),
            vec!["[line 1] Error at 'class': Expect expression.".to_string()]
        );
    }

    #[test]
    fn parser_recovers_at_statement_boundary() {
        let session = Session::new();
        let prg = parse_prg_with_session("var 1; print 2;", &session);
        assert!(session.had_error());
        assert_eq!(
            diagnostics(&session),
            vec!["[line 1] Error at '1': Expect variable name.".to_string()]
        );
        // The statement after the bad declaration still parses.
        assert_eq!(prg, vec![Stmt::Print(number(2.0))]);
    }

    #[test]
    fn diagnostics_quote_the_number_lexeme_as_written() {
        let session = Session::new();
        parse_prg_with_session("var 3.0;", &session);
        assert!(session.had_error());
        assert_eq!(
            diagnostics(&session),
            vec!["[line 1] Error at '3.0': Expect variable name.".to_string()]
        );
    }

    #[test]
    fn several_errors_accumulate_in_one_parse() {
        let session = Session::new();
        let prg = parse_prg_with_session("var 1;\nvar 2;\nprint 3;", &session);
        assert_eq!(
            diagnostics(&session),
            vec![
                "[line 1] Error at '1': Expect variable name.".to_string(),
                "[line 2] Error at '2': Expect variable name.".to_string(),
            ]
        );
        assert_eq!(prg, vec![Stmt::Print(number(3.0))]);
    }

    #[test]
    fn recovery_inside_a_block_keeps_the_block() {
        let session = Session::new();
        let prg = parse_prg_with_session("{ var 1; print 2; }", &session);
        assert!(session.had_error());
        assert_eq!(prg, vec![Stmt::Block(vec![Stmt::Print(number(2.0))])]);
    }
}
