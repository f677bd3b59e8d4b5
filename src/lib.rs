// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! A parser and interpreter for the macro language of RS274/NGC G-code, in
//! the [LinuxCNC] dialect with O-word control flow.
//!
//! [LinuxCNC]: http://linuxcnc.org/docs/html/gcode/o-code.html
//!
//! ## Basic usage
//!
//! Use `ngc::parse::parse` to get an AST, then work with the abstract syntax
//! tree datastructures from `ngc::ast`.  The tokens can be inspected on their
//! own with `ngc::lexer::Lexer`.
//!
//! With the *eval* feature (enabled by default), the AST can be run by an
//! `ngc::eval::Evaluator`, which keeps the parameters, follows `if`, `while`,
//! `repeat` and subroutine calls, and collects the command words of each line.
//!
//! The following code (the same as the "ngc-parse" demo binary) takes a file as
//! an argument, parses it and outputs the display form, which is the same
//! program, but in a consistent format and cleaned of comments.
//!
//! ```rust,no_run
//! use std::{env, fs};
//! use ngc::parse::parse;
//!
//! fn main() {
//!     let filename = env::args().nth(1).unwrap();
//!     let input = fs::read_to_string(&filename).unwrap();
//!
//!     match parse(&filename, &input) {
//!         Err(e) => eprintln!("Parse error: {}", e),
//!         Ok(prog) => println!("{}", prog),
//!     }
//! }
//! ```
//!
//! ## Unsupported features
//!
//! The collected command words are not checked for modal group conflicts,
//! and nothing drives a machine with them.

pub mod ast;
pub mod lexer;
pub mod parse;

#[cfg(feature = "eval")]
pub mod eval;

// internal helpers
#[cfg(feature = "eval")]
pub(crate) mod util;

/// Any error from parsing or running a program.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] parse::ParseError),
    #[cfg(feature = "eval")]
    #[error(transparent)]
    Eval(#[from] eval::EvalError),
}

/// Parse and run a program in one go, returning the evaluator for
/// inspection of the resulting parameters and command words.
#[cfg(feature = "eval")]
pub fn run(filename: &str, input: &str, config: eval::Config) -> Result<eval::Evaluator, Error> {
    let program = parse::parse(filename, input)?;
    let mut evaluator = eval::Evaluator::with_config(program, config);
    evaluator.process_program()?;
    Ok(evaluator)
}
