// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Tokenizer for the macro language.
//!
//! The token patterns live in a Pest grammar (`ngc.pest`).  Instead of parsing
//! the whole file at once, the lexer asks Pest for a single token at the
//! current offset, so tokens are produced lazily and the parser only ever
//! holds one of them as lookahead.

use std::fmt;
use pest::{Parser, Position, Span, error::{Error, ErrorVariant}};
use pest_derive::Parser;
use strum_macros::{Display, IntoStaticStr};

use crate::parse::ParseError;

#[derive(Parser)]
#[grammar = "ngc.pest"]
pub struct TokenGrammar;

/// The kind of a token, displayed as a short tag such as `LETTER` or `RTN`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    Rtn,
    Letter,
    Integer,
    Double,
    Additive,
    Multiplicative,
    Power,
    Relational,
    Logical,
    Assign,
    #[strum(serialize = "[")]
    LBracket,
    #[strum(serialize = "]")]
    RBracket,
    #[strum(serialize = "#")]
    Hash,
    VarName,
    #[strum(serialize = "O")]
    OWord,
    Ident,
    // keywords
    #[strum(serialize = "if")]
    If,
    #[strum(serialize = "elseif")]
    ElseIf,
    #[strum(serialize = "else")]
    Else,
    #[strum(serialize = "endif")]
    EndIf,
    #[strum(serialize = "while")]
    While,
    #[strum(serialize = "endwhile")]
    EndWhile,
    #[strum(serialize = "break")]
    Break,
    #[strum(serialize = "continue")]
    Continue,
    #[strum(serialize = "sub")]
    Sub,
    #[strum(serialize = "endsub")]
    EndSub,
    #[strum(serialize = "return")]
    Return,
    #[strum(serialize = "repeat")]
    Repeat,
    #[strum(serialize = "endrepeat")]
    EndRepeat,
    #[strum(serialize = "call")]
    Call,
}

impl TokenKind {
    fn from_rule(rule: Rule) -> Option<Self> {
        Some(match rule {
            Rule::rtn => TokenKind::Rtn,
            Rule::letter => TokenKind::Letter,
            Rule::integer => TokenKind::Integer,
            Rule::double => TokenKind::Double,
            Rule::add_op => TokenKind::Additive,
            Rule::mul_op | Rule::mul_word => TokenKind::Multiplicative,
            Rule::power_op => TokenKind::Power,
            Rule::relational_op => TokenKind::Relational,
            Rule::logical_op => TokenKind::Logical,
            Rule::assign => TokenKind::Assign,
            Rule::lbracket => TokenKind::LBracket,
            Rule::rbracket => TokenKind::RBracket,
            Rule::hash => TokenKind::Hash,
            Rule::var_name => TokenKind::VarName,
            Rule::o_word => TokenKind::OWord,
            Rule::ident => TokenKind::Ident,
            Rule::kw_if => TokenKind::If,
            Rule::kw_elseif => TokenKind::ElseIf,
            Rule::kw_else => TokenKind::Else,
            Rule::kw_endif => TokenKind::EndIf,
            Rule::kw_while => TokenKind::While,
            Rule::kw_endwhile => TokenKind::EndWhile,
            Rule::kw_break => TokenKind::Break,
            Rule::kw_continue => TokenKind::Continue,
            Rule::kw_sub => TokenKind::Sub,
            Rule::kw_endsub => TokenKind::EndSub,
            Rule::kw_return => TokenKind::Return,
            Rule::kw_repeat => TokenKind::Repeat,
            Rule::kw_endrepeat => TokenKind::EndRepeat,
            Rule::kw_call => TokenKind::Call,
            _ => return None
        })
    }

    pub fn is_keyword(&self) -> bool {
        matches!(self, TokenKind::If | TokenKind::ElseIf | TokenKind::Else | TokenKind::EndIf |
                 TokenKind::While | TokenKind::EndWhile | TokenKind::Break | TokenKind::Continue |
                 TokenKind::Sub | TokenKind::EndSub | TokenKind::Return |
                 TokenKind::Repeat | TokenKind::EndRepeat | TokenKind::Call)
    }
}

/// A single token, borrowing its text from the source.
#[derive(Clone, Copy, Debug)]
pub struct Token<'i> {
    pub kind: TokenKind,
    pub text: &'i str,
    pub span: Span<'i>,
}

impl<'i> Token<'i> {
    /// 1-based line of the token's first character.
    pub fn line(&self) -> usize {
        self.span.start_pos().line_col().0
    }

    pub fn line_col(&self) -> (usize, usize) {
        self.span.start_pos().line_col()
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.kind == TokenKind::Rtn || self.kind.is_keyword() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}({})", self.kind, self.text)
        }
    }
}

/// A comment skipped by the lexer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Comment<'i> {
    pub line: usize,
    pub text: &'i str,
}

pub struct Lexer<'i> {
    input: &'i str,
    pos: usize,
    line: usize,
    column: usize,
    // set after `#` and O-words, where `<...>` is a name
    marked: bool,
    comments: Vec<Comment<'i>>,
}

impl<'i> Lexer<'i> {
    pub fn new(input: &'i str) -> Self {
        Lexer { input, pos: 0, line: 1, column: 1, marked: false, comments: vec![] }
    }

    /// Whether unconsumed input remains.  Trailing blanks and comments count
    /// as input, so `next_token` may still return `None` afterwards.
    pub fn has_more(&self) -> bool {
        self.pos < self.input.len()
    }

    /// Current line, 1-based.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Current column, 1-based, counted in characters.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Comments passed so far, in source order.
    pub fn comments(&self) -> &[Comment<'i>] {
        &self.comments
    }

    /// Current offset as a pest position, for error reporting.
    pub fn source_pos(&self) -> Position<'i> {
        Position::new(self.input, self.pos).expect("lexer offset is on a char boundary")
    }

    /// Produce the next significant token, or `None` at the end of input.
    pub fn next_token(&mut self) -> Result<Option<Token<'i>>, ParseError> {
        while self.has_more() {
            let rest = &self.input[self.pos..];
            let rule = if self.marked { Rule::token_marked } else { Rule::token };
            let pair = match TokenGrammar::parse(rule, rest).ok().and_then(|mut pairs| pairs.next()) {
                Some(pair) if !pair.as_str().is_empty() => pair,
                _ => return Err(self.unexpected_char(rest)),
            };
            let start = self.pos;
            let line = self.line;
            let text = &rest[..pair.as_str().len()];
            self.advance(text);

            let kind = match pair.as_rule() {
                Rule::blank => continue,
                Rule::paren_comment | Rule::line_comment => {
                    self.comments.push(Comment { line, text });
                    continue;
                }
                rule => match TokenKind::from_rule(rule) {
                    Some(kind) => kind,
                    None => unreachable!("grammar produced non-token rule {:?}", rule),
                }
            };
            self.marked = matches!(kind, TokenKind::Hash | TokenKind::OWord);
            let span = Span::new(self.input, start, self.pos).expect("token is on char boundaries");
            return Ok(Some(Token { kind, text, span }));
        }
        Ok(None)
    }

    fn advance(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos += text.len();
    }

    fn unexpected_char(&mut self, rest: &str) -> ParseError {
        let message = match rest.chars().next() {
            Some('(') => "unclosed comment".to_string(),
            Some(ch) => format!("unexpected character {:?}", ch),
            None => "unexpected end of input".to_string(),
        };
        let err = Error::new_from_pos(ErrorVariant::CustomError { message }, self.source_pos());
        // lexing errors are fatal; nothing after this point is tokenized
        self.pos = self.input.len();
        ParseError::Lex(err)
    }
}

impl<'i> Iterator for Lexer<'i> {
    type Item = Result<Token<'i>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_tracking() {
        let mut lexer = Lexer::new("G1\n  X2");
        assert_eq!(lexer.next_token().unwrap().unwrap().kind, TokenKind::Letter);
        assert_eq!((lexer.line(), lexer.column()), (1, 2));
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        assert_eq!((lexer.line(), lexer.column()), (2, 1));
        let x = lexer.next_token().unwrap().unwrap();
        assert_eq!(x.line_col(), (2, 3));
        assert_eq!((lexer.line(), lexer.column()), (2, 4));
    }

    #[test]
    fn test_has_more_counts_trivia() {
        let mut lexer = Lexer::new("G1 (tail)");
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        assert!(lexer.has_more());
        assert!(lexer.next_token().unwrap().is_none());
        assert!(!lexer.has_more());
        assert_eq!(lexer.comments().len(), 1);
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(TokenKind::Rtn.to_string(), "RTN");
        assert_eq!(TokenKind::VarName.to_string(), "VAR_NAME");
        assert_eq!(TokenKind::EndWhile.to_string(), "endwhile");
        let tag: &'static str = TokenKind::Letter.into();
        assert_eq!(tag, "LETTER");
    }
}
