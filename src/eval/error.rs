// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use crate::ast::Label;
use super::enums::*;

#[derive(Debug, thiserror::Error)]
#[error("Error in line {lineno}: {errtype}")]
pub struct EvalError {
    pub lineno: usize,
    pub errtype: ErrType,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrType {
    #[error("The parameter {0} does not exist")]
    UnknownParameter(Param),
    #[error("Parameter number {0} is out of range or not an integer")]
    InvalidParamNumber(f64),
    #[error("Only parameters can be assigned to, not {0}")]
    InvalidAssignTarget(String),
    #[error("The parameter {0} is internal and cannot be assigned to")]
    InternalParameter(Param),
    #[error("Division by zero attempted")]
    DivByZero,
    #[error("The function {0} does not exist")]
    UnknownFunction(String),
    #[error("The function {0} takes {1} argument(s), but got {2}")]
    WrongArgCount(Builtin, usize, usize),
    #[error("The EXISTS function needs a parameter as argument")]
    ExistsNeedsParameter,
    #[error("Loop {0} exceeded the maximum of {1} iterations")]
    IterationLimit(Label, usize),
    #[error("The repeat count {0} is not a non-negative integer")]
    InvalidRepeatCount(f64),
    #[error("The O-word number {0} is out of range or not an integer")]
    InvalidLabel(f64),
    #[error("The subroutine {0} is not defined")]
    UndefinedSub(SubKey),
    #[error("Subroutine calls nested deeper than {0} levels")]
    CallDepth(usize),
    #[error("{0} outside of the construct it belongs to")]
    StrayFlow(&'static str),
}
