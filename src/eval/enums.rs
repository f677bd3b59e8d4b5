// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use std::fmt;
use itertools::Itertools;
use strum_macros::{Display, EnumString};

/// Identifier for a parameter: either numeric or named.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Param {
    Num(u32),
    Named(String),
}

impl Param {
    /// Named parameters starting with an underscore are visible everywhere.
    pub fn is_global(&self) -> bool {
        matches!(self, Param::Named(name) if name.starts_with('_'))
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Param::Num(n) => write!(f, "#{}", n),
            Param::Named(s) => write!(f, "#<{}>", s),
        }
    }
}

/// Key of a registered subroutine, from its evaluated O-word.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum SubKey {
    Num(u32),
    Named(String),
}

impl fmt::Display for SubKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SubKey::Num(n) => write!(f, "o{}", n),
            SubKey::Named(s) => write!(f, "o<{}>", s),
        }
    }
}

/// Who owns a global parameter.  `Internal` ones are only written by the
/// evaluator itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum VarTag {
    Normal,
    Internal,
}

/// The built-in functions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Builtin {
    Abs,
    Acos,
    Asin,
    Atan,
    Cos,
    Exists,
    Exp,
    Fix,
    Fup,
    Ln,
    Round,
    Sin,
    Sqrt,
    Tan,
}

impl Builtin {
    pub fn arity(&self) -> usize {
        match self {
            Builtin::Atan => 2,
            _ => 1,
        }
    }
}

/// The words of one line, in source order.  A letter may occur more than once.
#[derive(Clone, PartialEq, Debug)]
pub struct CommandGroup {
    pub lineno: usize,
    pub words: Vec<(char, f64)>,
}

impl CommandGroup {
    /// Value of the first word with this letter.
    pub fn get(&self, letter: char) -> Option<f64> {
        self.get_all(letter).next()
    }

    pub fn get_all(&self, letter: char) -> impl Iterator<Item=f64> + '_ {
        let letter = letter.to_ascii_uppercase();
        self.words.iter().filter(move |(l, _)| *l == letter).map(|(_, v)| *v)
    }
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.words.iter().map(|(l, v)| format!("{}{}", l, v)).join(" "))
    }
}
