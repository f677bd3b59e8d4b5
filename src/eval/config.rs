// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

/// What reading a parameter that was never assigned yields.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Undefined {
    /// Read as 0, like LinuxCNC does for numbered parameters.
    #[default]
    Zero,
    /// Raise `ErrType::UnknownParameter`.
    Error,
}

/// Evaluator settings.
#[derive(Clone, Debug)]
pub struct Config {
    pub undefined: Undefined,
    /// Maximum number of iterations of a single `while` or `repeat` loop.
    pub max_iterations: usize,
    /// Maximum number of nested subroutine calls.
    pub max_call_depth: usize,
    /// How far a parameter number may be from an integer.
    pub index_tolerance: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            undefined: Undefined::Zero,
            max_iterations: 1000,
            max_call_depth: 64,
            index_tolerance: 1e-6,
        }
    }
}

impl Config {
    /// The default settings, but with undefined parameters being an error.
    pub fn strict() -> Self {
        Config { undefined: Undefined::Error, ..Config::default() }
    }
}
