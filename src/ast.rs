// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Abstract syntax tree of a macro program.
//!
//! The `Display` implementations render normalized source code, which parses
//! back into the same tree.

use std::fmt::{self, Display, Formatter};
use itertools::Itertools;
use strum_macros::EnumString;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub filename: String,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub lineno: usize,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Letter/value words of one line, e.g. `G1 X10`.
    Command(Vec<(char, Expr)>),
    /// A bare expression, usually an assignment.
    Expression(Expr),
    If(IfStatement),
    While(WhileStatement),
    Repeat(RepeatStatement),
    Sub(SubStatement),
    Call(CallStatement),
    Return(ReturnStatement),
    Break(Label),
    Continue(Label),
}

/// `if`, with `elseif` desugared: the alternate of an `elseif` chain holds
/// exactly one nested `IfStatement`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub label: Label,
    pub test: Expr,
    pub consequent: Vec<Statement>,
    pub alternate: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub label: Label,
    pub test: Expr,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepeatStatement {
    pub label: Label,
    pub count: Expr,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubStatement {
    pub label: Label,
    pub body: Vec<Statement>,
    /// Value of `endsub [expr]`, used when the body falls through.
    pub tail_return: Option<Expr>,
    pub end_lineno: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallStatement {
    pub label: Label,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    pub label: Label,
    pub value: Option<Expr>,
}

/// The O-word that names a block.
#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    Number(Expr),
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// `#1`, `#[expr]`, `##2`
    NumVar(Box<Expr>),
    /// `#<name>`
    NameVar(String),
    Binary(Op, Box<Expr>, Box<Expr>),
    /// Target and value; the target is only checked for being a variable
    /// when evaluated.
    Assign(Box<Expr>, Box<Expr>),
    /// Built-in function call, name in lowercase.
    Call(String, Vec<Expr>),
}

impl Expr {
    pub fn is_variable(&self) -> bool {
        matches!(self, Expr::NumVar(_) | Expr::NameVar(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Op {
    #[strum(serialize = "**")]
    Exp,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "mod")]
    Mod,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "==", serialize = "eq")]
    Eq,
    #[strum(serialize = "!=", serialize = "ne")]
    Ne,
    #[strum(serialize = ">", serialize = "gt")]
    Gt,
    #[strum(serialize = ">=", serialize = "ge")]
    Ge,
    #[strum(serialize = "<", serialize = "lt")]
    Lt,
    #[strum(serialize = "<=", serialize = "le")]
    Le,
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
    #[strum(serialize = "xor")]
    Xor,
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write_block(f, &self.body, 0)
    }
}

fn write_block(f: &mut Formatter, stmts: &[Statement], indent: usize) -> fmt::Result {
    for stmt in stmts {
        stmt.write_indented(f, indent)?;
    }
    Ok(())
}

impl Statement {
    fn write_indented(&self, f: &mut Formatter, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        match &self.kind {
            StmtKind::Command(words) => {
                writeln!(f, "{}{}", pad, words.iter().map(|(l, v)| format!("{}{}", l, Value(v))).join(" "))
            }
            StmtKind::Expression(expr) => writeln!(f, "{}{}", pad, expr),
            StmtKind::If(stmt) => {
                writeln!(f, "{}{} if {}", pad, stmt.label, Bracketed(&stmt.test))?;
                stmt.write_tail(f, indent)
            }
            StmtKind::While(stmt) => {
                writeln!(f, "{}{} while {}", pad, stmt.label, Bracketed(&stmt.test))?;
                write_block(f, &stmt.body, indent + 1)?;
                writeln!(f, "{}{} endwhile", pad, stmt.label)
            }
            StmtKind::Repeat(stmt) => {
                writeln!(f, "{}{} repeat {}", pad, stmt.label, Bracketed(&stmt.count))?;
                write_block(f, &stmt.body, indent + 1)?;
                writeln!(f, "{}{} endrepeat", pad, stmt.label)
            }
            StmtKind::Sub(stmt) => {
                writeln!(f, "{}{} sub", pad, stmt.label)?;
                write_block(f, &stmt.body, indent + 1)?;
                match &stmt.tail_return {
                    Some(expr) => writeln!(f, "{}{} endsub {}", pad, stmt.label, Bracketed(expr)),
                    None => writeln!(f, "{}{} endsub", pad, stmt.label),
                }
            }
            StmtKind::Call(stmt) => {
                write!(f, "{}{} call", pad, stmt.label)?;
                for arg in &stmt.args {
                    write!(f, " {}", Bracketed(arg))?;
                }
                writeln!(f)
            }
            StmtKind::Return(stmt) => match &stmt.value {
                Some(expr) => writeln!(f, "{}{} return {}", pad, stmt.label, Bracketed(expr)),
                None => writeln!(f, "{}{} return", pad, stmt.label),
            },
            StmtKind::Break(label) => writeln!(f, "{}{} break", pad, label),
            StmtKind::Continue(label) => writeln!(f, "{}{} continue", pad, label),
        }
    }
}

impl IfStatement {
    // Everything after the `if`/`elseif` line, down to and including `endif`.
    fn write_tail(&self, f: &mut Formatter, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        write_block(f, &self.consequent, indent + 1)?;
        match self.alternate.as_slice() {
            [] => writeln!(f, "{}{} endif", pad, self.label),
            // only an `if` with the same label can have come from `elseif`
            [Statement { kind: StmtKind::If(nested), .. }] if nested.label == self.label => {
                writeln!(f, "{}{} elseif {}", pad, nested.label, Bracketed(&nested.test))?;
                nested.write_tail(f, indent)
            }
            alternate => {
                writeln!(f, "{}{} else", pad, self.label)?;
                write_block(f, alternate, indent + 1)?;
                writeln!(f, "{}{} endif", pad, self.label)
            }
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Label::Name(name) => write!(f, "o<{}>", name),
            Label::Number(expr) => write!(f, "o{}", Value(expr)),
        }
    }
}

/// Displays an expression wrapped in brackets, unless it already is.
struct Bracketed<'a>(&'a Expr);

impl Display for Bracketed<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.0 {
            Expr::Binary(..) => write!(f, "{}", self.0),
            _ => write!(f, "[{}]", self.0),
        }
    }
}

/// Displays an expression so it can follow a letter or O directly.
struct Value<'a>(&'a Expr);

impl Display for Value<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.0 {
            Expr::Number(_) | Expr::NumVar(_) | Expr::NameVar(_) => write!(f, "{}", self.0),
            _ => write!(f, "{}", Bracketed(self.0)),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::NumVar(index) => match **index {
                Expr::Number(_) | Expr::NumVar(_) | Expr::NameVar(_) => write!(f, "#{}", index),
                _ => write!(f, "#{}", Bracketed(index)),
            },
            Expr::NameVar(name) => write!(f, "#<{}>", name),
            Expr::Binary(op, lhs, rhs) => write!(f, "[{} {} {}]", lhs, op, rhs),
            Expr::Assign(target, value) => write!(f, "{} = {}", target, value),
            Expr::Call(func, args) => {
                write!(f, "{}", func)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, "/")?;
                    }
                    write!(f, "{}", Bracketed(arg))?;
                }
                Ok(())
            }
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Op::Exp => "**",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Mod => "MOD",
            Op::Add => "+",
            Op::Sub => "-",
            Op::Eq  => "EQ",
            Op::Ne  => "NE",
            Op::Gt  => "GT",
            Op::Ge  => "GE",
            Op::Lt  => "LT",
            Op::Le  => "LE",
            Op::And => "AND",
            Op::Or  => "OR",
            Op::Xor => "XOR",
        })
    }
}
