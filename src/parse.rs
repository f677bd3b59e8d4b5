// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Recursive descent parser from tokens to the AST.

use std::mem;
use itertools::Itertools;
use pest::{Position, Span, error::{Error, ErrorVariant, LineColLocation}};

use crate::ast::*;
use crate::lexer::{Lexer, Rule, Token, TokenKind};

/// Error from lexing or parsing, with the source location.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("lexical error: {0}")]
    Lex(Error<Rule>),
    #[error("syntax error: {0}")]
    Syntax(Error<Rule>),
}

impl ParseError {
    pub fn with_path(self, path: &str) -> Self {
        match self {
            ParseError::Lex(e) => ParseError::Lex(e.with_path(path)),
            ParseError::Syntax(e) => ParseError::Syntax(e.with_path(path)),
        }
    }

    fn inner(&self) -> &Error<Rule> {
        match self {
            ParseError::Lex(e) | ParseError::Syntax(e) => e,
        }
    }

    /// Line and column (both 1-based) where the error starts.
    pub fn line_col(&self) -> (usize, usize) {
        match self.inner().line_col {
            LineColLocation::Pos(pos) => pos,
            LineColLocation::Span(start, _) => start,
        }
    }

    /// The bare message, without the location and source excerpt.
    pub fn message(&self) -> String {
        match &self.inner().variant {
            ErrorVariant::CustomError { message } => message.clone(),
            _ => self.inner().to_string(),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

fn err<T>(span: Span, msg: impl Into<String>) -> ParseResult<T> {
    Err(ParseError::Syntax(Error::new_from_span(ErrorVariant::CustomError { message: msg.into() }, span)))
}

fn err_at<T>(pos: Position, msg: impl Into<String>) -> ParseResult<T> {
    Err(ParseError::Syntax(Error::new_from_pos(ErrorVariant::CustomError { message: msg.into() }, pos)))
}

fn check_label(opening: &Label, closing: &Label, span: Span) -> ParseResult<()> {
    if opening != closing {
        return err(span, format!("label {} does not match opening label {}", closing, opening));
    }
    Ok(())
}

// `<My Name>` -> `myname`
fn normalize_name(span: Span, text: &str) -> ParseResult<String> {
    let inner = text.trim_start_matches('<').trim_end_matches('>');
    let name: String = inner.chars().filter(|c| !c.is_whitespace())
                                    .flat_map(char::to_lowercase).collect();
    if name.is_empty() {
        return err(span, "empty variable name");
    }
    Ok(name)
}

type Level<'i> = fn(&mut Parser<'i>) -> ParseResult<Expr>;

struct Parser<'i> {
    lexer: Lexer<'i>,
    lookahead: Option<Token<'i>>,
    // label of the subroutine whose body is being parsed
    sub_label: Option<Label>,
    // labels of the enclosing while loops, innermost last
    loops: Vec<Label>,
}

impl<'i> Parser<'i> {
    fn new(input: &'i str) -> ParseResult<Self> {
        let mut lexer = Lexer::new(input);
        let lookahead = lexer.next_token()?;
        Ok(Parser { lexer, lookahead, sub_label: None, loops: vec![] })
    }

    // -- token handling

    fn advance(&mut self) -> ParseResult<()> {
        self.lookahead = self.lexer.next_token()?;
        Ok(())
    }

    fn peek(&self) -> Option<TokenKind> {
        self.lookahead.map(|tok| tok.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == Some(kind)
    }

    fn eat(&mut self, kind: TokenKind) -> ParseResult<Token<'i>> {
        match self.lookahead {
            Some(tok) if tok.kind == kind => {
                self.advance()?;
                Ok(tok)
            }
            Some(tok) => err(tok.span, format!("unexpected {}, expected {}", tok, kind)),
            None => self.eof_err(format!("unexpected end of input, expected {}", kind)),
        }
    }

    fn eof_err<T>(&self, msg: impl Into<String>) -> ParseResult<T> {
        err_at(self.lexer.source_pos(), msg)
    }

    /// A line terminator, or the end of input.
    fn end_of_line(&mut self) -> ParseResult<()> {
        match self.lookahead {
            None => Ok(()),
            Some(tok) if tok.kind == TokenKind::Rtn => self.advance(),
            Some(tok) => err(tok.span, format!("unexpected {}, expected end of line", tok)),
        }
    }

    // -- statements

    fn program(&mut self, filename: &str) -> ParseResult<Program> {
        let (body, _) = self.statement_list(&[])?;
        Ok(Program { filename: filename.into(), body })
    }

    /// Parse statements until an O-word followed by one of the `stop` keywords.
    ///
    /// The label of that O-word is returned together with the statements; the
    /// stop keyword itself is left as lookahead.
    fn statement_list(&mut self, stop: &[TokenKind])
                      -> ParseResult<(Vec<Statement>, Option<(Label, Span<'i>)>)> {
        let mut body = vec![];
        loop {
            let tok = match self.lookahead {
                Some(tok) => tok,
                None if stop.is_empty() => return Ok((body, None)),
                None => return self.eof_err(format!("unexpected end of input, expected {}",
                                                    stop.iter().join(" or "))),
            };
            match tok.kind {
                TokenKind::Rtn => self.advance()?,
                // a leading line number may precede any kind of statement
                TokenKind::Letter if tok.text.eq_ignore_ascii_case("n") => {
                    self.advance()?;
                    self.primary(true)?;
                }
                TokenKind::Letter => if let Some(stmt) = self.command_statement()? {
                    body.push(stmt);
                }
                TokenKind::OWord => {
                    let label = self.label()?;
                    match self.peek() {
                        Some(kind) if stop.contains(&kind) => return Ok((body, Some((label, tok.span)))),
                        _ => body.push(self.control_statement(label, tok)?),
                    }
                }
                _ => body.push(self.expression_statement()?),
            }
        }
    }

    /// Like `statement_list`, for blocks that must be closed.
    fn block(&mut self, stop: &[TokenKind]) -> ParseResult<(Vec<Statement>, Label, Span<'i>)> {
        match self.statement_list(stop)? {
            (body, Some((label, span))) => Ok((body, label, span)),
            (_, None) => self.eof_err(format!("unexpected end of input, expected {}",
                                              stop.iter().join(" or "))),
        }
    }

    fn command_statement(&mut self) -> ParseResult<Option<Statement>> {
        let mut lineno = 0;
        let mut words = vec![];
        while let Some(tok) = self.lookahead {
            match tok.kind {
                TokenKind::Rtn => break,
                TokenKind::Letter => {
                    if lineno == 0 {
                        lineno = tok.line();
                    }
                    self.advance()?;
                    let letter = char::from(tok.text.as_bytes()[0]).to_ascii_uppercase();
                    let value = self.primary(true)?;
                    // line numbers are accepted but ignored
                    if letter != 'N' {
                        words.push((letter, value));
                    }
                }
                _ => return err(tok.span, format!("unexpected {}, expected a command letter", tok)),
            }
        }
        self.end_of_line()?;
        if words.is_empty() {
            return Ok(None);
        }
        Ok(Some(Statement { lineno, kind: StmtKind::Command(words) }))
    }

    fn expression_statement(&mut self) -> ParseResult<Statement> {
        let lineno = self.lookahead.map_or(self.lexer.line(), |tok| tok.line());
        let expr = self.expression()?;
        self.end_of_line()?;
        Ok(Statement { lineno, kind: StmtKind::Expression(expr) })
    }

    fn label(&mut self) -> ParseResult<Label> {
        let o_word = self.eat(TokenKind::OWord)?;
        let tok = match self.lookahead {
            Some(tok) => tok,
            None => return self.eof_err("unexpected end of input, expected an O-word number or name"),
        };
        Ok(match tok.kind {
            TokenKind::VarName => {
                self.advance()?;
                Label::Name(normalize_name(tok.span, tok.text)?)
            }
            TokenKind::Integer => {
                self.advance()?;
                Label::Number(number(tok)?)
            }
            TokenKind::LBracket => Label::Number(self.bracketed()?),
            TokenKind::Hash => Label::Number(self.variable()?),
            _ => return err(o_word.span, format!("unexpected {} after O-word", tok)),
        })
    }

    /// Statement introduced by an O-word whose label was already parsed.
    fn control_statement(&mut self, label: Label, o_word: Token<'i>) -> ParseResult<Statement> {
        let lineno = o_word.line();
        let kw = match self.lookahead {
            Some(tok) => tok,
            None => return self.eof_err("unexpected end of input, expected a keyword after O-word"),
        };
        let kind = match kw.kind {
            TokenKind::If => StmtKind::If(self.if_statement(label, TokenKind::If)?),
            TokenKind::While => StmtKind::While(self.while_statement(label)?),
            TokenKind::Repeat => StmtKind::Repeat(self.repeat_statement(label)?),
            TokenKind::Sub => StmtKind::Sub(self.sub_statement(label, kw)?),
            TokenKind::Call => StmtKind::Call(self.call_statement(label)?),
            TokenKind::Return => StmtKind::Return(self.return_statement(label, o_word, kw)?),
            TokenKind::Break | TokenKind::Continue => {
                match self.loops.last() {
                    None => return err(kw.span, format!("{} outside of a while loop", kw.kind)),
                    Some(inner) if *inner != label =>
                        return err(o_word.span, format!("{} label {} does not match loop {}",
                                                        kw.kind, label, inner)),
                    _ => ()
                }
                self.advance()?;
                self.end_of_line()?;
                if kw.kind == TokenKind::Break {
                    StmtKind::Break(label)
                } else {
                    StmtKind::Continue(label)
                }
            }
            _ if kw.kind.is_keyword() => return err(kw.span, format!("{} without matching opening block", kw)),
            _ => return err(kw.span, format!("unexpected {} after O-word", kw)),
        };
        Ok(Statement { lineno, kind })
    }

    /// Parses from `if` (or `elseif`) to the matching `endif`.
    fn if_statement(&mut self, label: Label, keyword: TokenKind) -> ParseResult<IfStatement> {
        self.eat(keyword)?;
        let test = self.bracketed()?;
        self.end_of_line()?;
        let (consequent, closing, span) = self.block(&[TokenKind::ElseIf, TokenKind::Else,
                                                        TokenKind::EndIf])?;
        check_label(&label, &closing, span)?;

        let alternate = match self.peek() {
            Some(TokenKind::ElseIf) => {
                let lineno = span.start_pos().line_col().0;
                let nested = self.if_statement(closing, TokenKind::ElseIf)?;
                vec![Statement { lineno, kind: StmtKind::If(nested) }]
            }
            Some(TokenKind::Else) => {
                self.eat(TokenKind::Else)?;
                self.end_of_line()?;
                let (alternate, closing, span) = self.block(&[TokenKind::EndIf])?;
                check_label(&label, &closing, span)?;
                self.eat(TokenKind::EndIf)?;
                self.end_of_line()?;
                alternate
            }
            _ => {
                self.eat(TokenKind::EndIf)?;
                self.end_of_line()?;
                vec![]
            }
        };
        Ok(IfStatement { label, test, consequent, alternate })
    }

    fn while_statement(&mut self, label: Label) -> ParseResult<WhileStatement> {
        self.eat(TokenKind::While)?;
        let test = self.bracketed()?;
        self.end_of_line()?;
        self.loops.push(label.clone());
        let result = self.block(&[TokenKind::EndWhile]);
        self.loops.pop();
        let (body, closing, span) = result?;
        check_label(&label, &closing, span)?;
        self.eat(TokenKind::EndWhile)?;
        self.end_of_line()?;
        Ok(WhileStatement { label, test, body })
    }

    fn repeat_statement(&mut self, label: Label) -> ParseResult<RepeatStatement> {
        self.eat(TokenKind::Repeat)?;
        let count = self.bracketed()?;
        self.end_of_line()?;
        let (body, closing, span) = self.block(&[TokenKind::EndRepeat])?;
        check_label(&label, &closing, span)?;
        self.eat(TokenKind::EndRepeat)?;
        self.end_of_line()?;
        Ok(RepeatStatement { label, count, body })
    }

    fn sub_statement(&mut self, label: Label, kw: Token<'i>) -> ParseResult<SubStatement> {
        if let Some(outer) = &self.sub_label {
            return err(kw.span, format!("subroutine {} cannot be defined inside subroutine {}",
                                        label, outer));
        }
        self.eat(TokenKind::Sub)?;
        self.end_of_line()?;

        // loops outside the definition do not enclose its body
        self.sub_label = Some(label.clone());
        let loops = mem::take(&mut self.loops);
        let result = self.block(&[TokenKind::EndSub]);
        self.loops = loops;
        self.sub_label = None;

        let (body, closing, span) = result?;
        check_label(&label, &closing, span)?;
        let end = self.eat(TokenKind::EndSub)?;
        let tail_return = self.optional_bracketed()?;
        self.end_of_line()?;
        Ok(SubStatement { label, body, tail_return, end_lineno: end.line() })
    }

    fn call_statement(&mut self, label: Label) -> ParseResult<CallStatement> {
        self.eat(TokenKind::Call)?;
        let mut args = vec![];
        while self.at(TokenKind::LBracket) {
            args.push(self.bracketed()?);
        }
        self.end_of_line()?;
        Ok(CallStatement { label, args })
    }

    fn return_statement(&mut self, label: Label, o_word: Token<'i>, kw: Token<'i>)
                        -> ParseResult<ReturnStatement> {
        match &self.sub_label {
            None => return err(kw.span, "return outside of a subroutine"),
            Some(sub) if *sub != label =>
                return err(o_word.span, format!("return label {} does not match subroutine {}",
                                                label, sub)),
            _ => ()
        }
        self.eat(TokenKind::Return)?;
        let value = self.optional_bracketed()?;
        self.end_of_line()?;
        Ok(ReturnStatement { label, value })
    }

    // -- expressions

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let target = self.logical()?;
        if self.at(TokenKind::Assign) {
            self.advance()?;
            let value = self.assignment()?;
            return Ok(Expr::Assign(Box::new(target), Box::new(value)));
        }
        Ok(target)
    }

    /// One left-associative binary precedence level.
    fn binary(&mut self, kind: TokenKind, next: Level<'i>) -> ParseResult<Expr> {
        let mut lhs = next(self)?;
        while let Some(tok) = self.lookahead.filter(|tok| tok.kind == kind) {
            self.advance()?;
            let op = operator(tok)?;
            let rhs = next(self)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn logical(&mut self) -> ParseResult<Expr> {
        self.binary(TokenKind::Logical, Self::relational)
    }

    fn relational(&mut self) -> ParseResult<Expr> {
        self.binary(TokenKind::Relational, Self::additive)
    }

    fn additive(&mut self) -> ParseResult<Expr> {
        self.binary(TokenKind::Additive, Self::multiplicative)
    }

    fn multiplicative(&mut self) -> ParseResult<Expr> {
        self.binary(TokenKind::Multiplicative, Self::power)
    }

    fn power(&mut self) -> ParseResult<Expr> {
        self.binary(TokenKind::Power, Self::signed_primary)
    }

    fn signed_primary(&mut self) -> ParseResult<Expr> {
        self.primary(true)
    }

    /// A literal, bracketed expression, variable or function call.  A single
    /// leading sign is accepted if `signed` and becomes `0 +/- operand`.
    fn primary(&mut self, signed: bool) -> ParseResult<Expr> {
        let tok = match self.lookahead {
            Some(tok) => tok,
            None => return self.eof_err("unexpected end of input, expected an expression"),
        };
        match tok.kind {
            TokenKind::Additive if signed => {
                self.advance()?;
                let op = operator(tok)?;
                let operand = self.primary(false)?;
                Ok(Expr::Binary(op, Box::new(Expr::Number(0.)), Box::new(operand)))
            }
            TokenKind::Integer | TokenKind::Double => {
                self.advance()?;
                number(tok)
            }
            TokenKind::LBracket => self.bracketed(),
            TokenKind::Hash => self.variable(),
            TokenKind::Ident => self.builtin_call(),
            _ => err(tok.span, format!("unexpected {}, expected an expression", tok)),
        }
    }

    fn bracketed(&mut self) -> ParseResult<Expr> {
        self.eat(TokenKind::LBracket)?;
        let expr = self.expression()?;
        self.eat(TokenKind::RBracket)?;
        Ok(expr)
    }

    fn optional_bracketed(&mut self) -> ParseResult<Option<Expr>> {
        if self.at(TokenKind::LBracket) {
            return self.bracketed().map(Some);
        }
        Ok(None)
    }

    fn variable(&mut self) -> ParseResult<Expr> {
        let hash = self.eat(TokenKind::Hash)?;
        let tok = match self.lookahead {
            Some(tok) => tok,
            None => return self.eof_err("unexpected end of input, expected a variable index"),
        };
        match tok.kind {
            TokenKind::Integer => {
                self.advance()?;
                Ok(Expr::NumVar(Box::new(number(tok)?)))
            }
            TokenKind::VarName => {
                self.advance()?;
                Ok(Expr::NameVar(normalize_name(tok.span, tok.text)?))
            }
            TokenKind::LBracket => Ok(Expr::NumVar(Box::new(self.bracketed()?))),
            TokenKind::Hash => Ok(Expr::NumVar(Box::new(self.variable()?))),
            TokenKind::Double => err(tok.span, "variable number must be an integer"),
            _ => err(hash.span, format!("unexpected {} after #", tok)),
        }
    }

    fn builtin_call(&mut self) -> ParseResult<Expr> {
        let name = self.eat(TokenKind::Ident)?.text.to_ascii_lowercase();
        let mut args = vec![self.bracketed()?];
        if name == "atan" {
            let slash = self.eat(TokenKind::Multiplicative)?;
            if slash.text != "/" {
                return err(slash.span, format!("unexpected {}, expected / between ATAN arguments",
                                               slash));
            }
            args.push(self.bracketed()?);
        }
        Ok(Expr::Call(name, args))
    }
}

fn number(tok: Token) -> ParseResult<Expr> {
    match tok.text.parse() {
        Ok(value) => Ok(Expr::Number(value)),
        Err(_) => err(tok.span, format!("invalid number {}", tok.text)),
    }
}

fn operator(tok: Token) -> ParseResult<Op> {
    match tok.text.parse() {
        Ok(op) => Ok(op),
        Err(_) => err(tok.span, format!("unknown operator {}", tok.text)),
    }
}

/// Parse a whole program.  `filename` is only used in error messages.
pub fn parse(filename: &str, input: &str) -> ParseResult<Program> {
    Parser::new(input)
        .and_then(|mut parser| parser.program(filename))
        .map_err(|e| e.with_path(filename))
}
