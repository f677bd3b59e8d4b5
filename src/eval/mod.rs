// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

mod config;
mod enums;
mod error;

use std::fmt;
use std::mem;
use std::rc::Rc;
use std::collections::HashMap;
use itertools::Itertools;
use tracing::{debug, info, trace, warn};

use crate::ast::*;
use crate::util::num_to_int;

pub use self::config::*;
pub use self::enums::*;
pub use self::error::*;

/// Internal global holding the value returned by the last subroutine call.
pub const RETURN_VALUE: &str = "_value";
/// Internal global set to 1 if the last subroutine call returned a value.
pub const VALUE_RETURNED: &str = "_value_returned";

/// Outcome of executing a statement.
///
/// Anything but `Completed` stops the enclosing statement lists until a
/// construct that handles it is reached: loops take `Break` and `Continue`,
/// subroutine calls take `Return`.
#[derive(Debug)]
enum Flow {
    Completed,
    Break(Label),
    Continue(Label),
    Return(Label, Option<f64>),
}

impl Flow {
    fn name(&self) -> &'static str {
        match self {
            Flow::Completed => "completion",
            Flow::Break(_) => "break",
            Flow::Continue(_) => "continue",
            Flow::Return(..) => "return",
        }
    }
}

/// Numbered and named parameters of one scope.
#[derive(Default)]
struct Scope {
    nums: HashMap<u32, f64>,
    names: HashMap<String, f64>,
}

impl Scope {
    fn get(&self, param: &Param) -> Option<f64> {
        match param {
            Param::Num(n) => self.nums.get(n).copied(),
            Param::Named(s) => self.names.get(s).copied(),
        }
    }

    fn set(&mut self, param: Param, value: f64) {
        match param {
            Param::Num(n) => { self.nums.insert(n, value); }
            Param::Named(s) => { self.names.insert(s, value); }
        }
    }
}

#[derive(Clone, Copy)]
struct Global {
    value: f64,
    tag: VarTag,
}

/// The Evaluator executes a parsed program: it keeps parameter values,
/// follows the O-word control flow and collects the command words of each
/// line in order.
///
/// It does *not* check whether the collected words make sense together, or
/// drive a machine with them.
pub struct Evaluator {
    program: Program,
    config: Config,
    // top-level parameters
    vars: Scope,
    // parameters starting with an underscore
    globals: HashMap<String, Global>,
    // one scope per active subroutine call, innermost last
    frames: Vec<Scope>,
    subs: HashMap<SubKey, Rc<SubStatement>>,
    commands: Vec<CommandGroup>,
}

impl Evaluator {
    pub fn new(program: Program) -> Self {
        Self::with_config(program, Config::default())
    }

    pub fn with_config(program: Program, config: Config) -> Self {
        let mut evaluator = Evaluator {
            program,
            config,
            vars: Scope::default(),
            globals: HashMap::new(),
            frames: vec![],
            subs: HashMap::new(),
            commands: vec![],
        };
        evaluator.init_internals();
        evaluator
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the program and forget all state from previous runs.
    pub fn reset(&mut self, program: Program) {
        self.program = program;
        self.vars = Scope::default();
        self.globals.clear();
        self.frames.clear();
        self.subs.clear();
        self.commands.clear();
        self.init_internals();
    }

    /// Run the whole program.  The first error aborts the run.
    pub fn process_program(&mut self) -> Result<(), EvalError> {
        info!(file = %self.program.filename, statements = self.program.body.len(),
              "evaluating program");
        let body = mem::take(&mut self.program.body);
        let result = self.exec_block(&body);
        self.program.body = body;
        match result? {
            Flow::Completed => {
                info!(commands = self.commands.len(), "program finished");
                Ok(())
            }
            flow => Err(EvalError { lineno: 0, errtype: ErrType::StrayFlow(flow.name()) }),
        }
    }

    /// The command groups collected so far, one per line with words.
    pub fn command_list(&self) -> &[CommandGroup] {
        &self.commands
    }

    /// Evaluate an expression in the current scope.
    pub fn get_value(&mut self, expr: &Expr) -> Result<f64, EvalError> {
        self.eval_expr(expr).map_err(|errtype| EvalError { lineno: 0, errtype })
    }

    /// Read a parameter, applying the configured policy if it is undefined.
    pub fn get_variable(&self, param: &Param) -> Result<f64, EvalError> {
        self.read_var(param).map_err(|errtype| EvalError { lineno: 0, errtype })
    }

    /// The value of a parameter, if it is defined.
    pub fn has_variable(&self, param: &Param) -> Option<f64> {
        self.lookup(param)
    }

    pub fn set_variable(&mut self, param: Param, value: f64) -> Result<(), EvalError> {
        self.write_var(param, value).map_err(|errtype| EvalError { lineno: 0, errtype })
    }

    /// A listing of all scopes and their parameters, for debugging.
    pub fn dump_variables(&self) -> VariableDump<'_> {
        VariableDump(self)
    }

    // -- parameters

    fn init_internals(&mut self) {
        self.write_internal(RETURN_VALUE, 0.);
        self.write_internal(VALUE_RETURNED, 0.);
    }

    fn scope(&self) -> &Scope {
        self.frames.last().unwrap_or(&self.vars)
    }

    fn scope_mut(&mut self) -> &mut Scope {
        match self.frames.last_mut() {
            Some(frame) => frame,
            None => &mut self.vars,
        }
    }

    fn lookup(&self, param: &Param) -> Option<f64> {
        match param {
            Param::Named(name) if param.is_global() => self.globals.get(name).map(|g| g.value),
            _ => self.scope().get(param),
        }
    }

    fn read_var(&self, param: &Param) -> Result<f64, ErrType> {
        match (self.lookup(param), self.config.undefined) {
            (Some(value), _) => Ok(value),
            (None, Undefined::Zero) => Ok(0.),
            (None, Undefined::Error) => Err(ErrType::UnknownParameter(param.clone())),
        }
    }

    /// Assign a parameter on behalf of the program.
    fn write_var(&mut self, param: Param, value: f64) -> Result<(), ErrType> {
        match param {
            Param::Named(name) if name.starts_with('_') => match self.globals.get_mut(&name) {
                Some(global) if global.tag == VarTag::Internal =>
                    return Err(ErrType::InternalParameter(Param::Named(name))),
                Some(global) => global.value = value,
                None => {
                    self.globals.insert(name, Global { value, tag: VarTag::Normal });
                }
            },
            param => self.scope_mut().set(param, value),
        }
        Ok(())
    }

    fn write_internal(&mut self, name: &str, value: f64) {
        self.globals.insert(name.into(), Global { value, tag: VarTag::Internal });
    }

    /// Resolve a variable expression to the parameter it refers to.
    fn param_of(&mut self, expr: &Expr) -> Result<Param, ErrType> {
        match expr {
            Expr::NumVar(index) => {
                let index = self.eval_expr(index)?;
                let n = num_to_int(index, self.config.index_tolerance, ErrType::InvalidParamNumber)?;
                Ok(Param::Num(n))
            }
            Expr::NameVar(name) => Ok(Param::Named(name.clone())),
            other => Err(ErrType::InvalidAssignTarget(other.to_string())),
        }
    }

    fn sub_key(&mut self, label: &Label) -> Result<SubKey, ErrType> {
        match label {
            Label::Name(name) => Ok(SubKey::Named(name.clone())),
            Label::Number(expr) => {
                let n = self.eval_expr(expr)?;
                Ok(SubKey::Num(num_to_int(n, self.config.index_tolerance, ErrType::InvalidLabel)?))
            }
        }
    }

    // -- statements

    fn exec_block(&mut self, stmts: &[Statement]) -> Result<Flow, EvalError> {
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Flow::Completed => (),
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Completed)
    }

    fn exec_stmt(&mut self, stmt: &Statement) -> Result<Flow, EvalError> {
        let lineno = stmt.lineno;
        let at = |errtype: ErrType| EvalError { lineno, errtype };
        Ok(match &stmt.kind {
            StmtKind::Command(words) => {
                let mut group = CommandGroup { lineno, words: Vec::with_capacity(words.len()) };
                for (letter, expr) in words {
                    group.words.push((*letter, self.eval_expr(expr).map_err(at)?));
                }
                self.commands.push(group);
                Flow::Completed
            }
            StmtKind::Expression(expr) => {
                self.eval_expr(expr).map_err(at)?;
                Flow::Completed
            }
            StmtKind::If(s) => {
                if self.eval_expr(&s.test).map_err(at)? != 0. {
                    self.exec_block(&s.consequent)?
                } else {
                    self.exec_block(&s.alternate)?
                }
            }
            StmtKind::While(s) => self.exec_while(lineno, s)?,
            StmtKind::Repeat(s) => self.exec_repeat(lineno, s)?,
            StmtKind::Sub(s) => {
                let key = self.sub_key(&s.label).map_err(at)?;
                debug!(sub = %key, "registering subroutine");
                self.subs.insert(key, Rc::new(s.clone()));
                Flow::Completed
            }
            StmtKind::Call(s) => self.exec_call(lineno, s)?,
            StmtKind::Return(s) => {
                let value = match &s.value {
                    Some(expr) => Some(self.eval_expr(expr).map_err(at)?),
                    None => None,
                };
                Flow::Return(s.label.clone(), value)
            }
            StmtKind::Break(label) => Flow::Break(label.clone()),
            StmtKind::Continue(label) => Flow::Continue(label.clone()),
        })
    }

    fn exec_while(&mut self, lineno: usize, stmt: &WhileStatement) -> Result<Flow, EvalError> {
        let at = |errtype: ErrType| EvalError { lineno, errtype };
        let mut iterations = 0;
        while self.eval_expr(&stmt.test).map_err(at)? != 0. {
            iterations += 1;
            if iterations > self.config.max_iterations {
                return Err(at(ErrType::IterationLimit(stmt.label.clone(), self.config.max_iterations)));
            }
            match self.exec_block(&stmt.body)? {
                Flow::Completed => (),
                Flow::Continue(label) if label == stmt.label => trace!(%label, "continue"),
                Flow::Break(label) if label == stmt.label => {
                    trace!(%label, "break");
                    break;
                }
                // returns, and loop control aimed at an outer loop
                flow => return Ok(flow),
            }
        }
        trace!(label = %stmt.label, iterations, "while loop done");
        Ok(Flow::Completed)
    }

    fn exec_repeat(&mut self, lineno: usize, stmt: &RepeatStatement) -> Result<Flow, EvalError> {
        let at = |errtype: ErrType| EvalError { lineno, errtype };
        let count = self.eval_expr(&stmt.count).map_err(at)?;
        let count = num_to_int(count, self.config.index_tolerance, ErrType::InvalidRepeatCount)
            .map_err(at)?;
        if count as usize > self.config.max_iterations {
            return Err(at(ErrType::IterationLimit(stmt.label.clone(), self.config.max_iterations)));
        }
        for _ in 0..count {
            // loop control belongs to an enclosing while
            match self.exec_block(&stmt.body)? {
                Flow::Completed => (),
                flow => return Ok(flow),
            }
        }
        trace!(label = %stmt.label, count, "repeat loop done");
        Ok(Flow::Completed)
    }

    fn exec_call(&mut self, lineno: usize, stmt: &CallStatement) -> Result<Flow, EvalError> {
        let at = |errtype: ErrType| EvalError { lineno, errtype };
        let key = self.sub_key(&stmt.label).map_err(at)?;
        let sub = match self.subs.get(&key) {
            Some(sub) => Rc::clone(sub),
            None => return Err(at(ErrType::UndefinedSub(key))),
        };
        if self.frames.len() >= self.config.max_call_depth {
            return Err(at(ErrType::CallDepth(self.config.max_call_depth)));
        }

        // arguments are evaluated in the caller's scope
        let mut frame = Scope::default();
        for (n, arg) in (1..).zip(&stmt.args) {
            let value = self.eval_expr(arg).map_err(at)?;
            frame.nums.insert(n, value);
        }
        self.write_internal(RETURN_VALUE, 0.);
        self.write_internal(VALUE_RETURNED, 0.);

        debug!(sub = %key, args = stmt.args.len(), depth = self.frames.len() + 1, "calling subroutine");
        self.frames.push(frame);
        let result = self.run_sub(&sub);
        self.frames.pop();
        let returned = result?;
        debug!(sub = %key, value = ?returned, "subroutine returned");

        if let Some(value) = returned {
            self.write_internal(RETURN_VALUE, value);
            self.write_internal(VALUE_RETURNED, 1.);
        }
        Ok(Flow::Completed)
    }

    /// Execute a subroutine body in the current (fresh) frame and determine
    /// its return value.
    fn run_sub(&mut self, sub: &SubStatement) -> Result<Option<f64>, EvalError> {
        match self.exec_block(&sub.body)? {
            Flow::Return(label, value) => {
                trace!(%label, "return");
                return Ok(value);
            }
            Flow::Completed => (),
            flow => warn!(sub = %sub.label, flow = flow.name(),
                          "loop control reached the end of a subroutine, ignored"),
        }
        match &sub.tail_return {
            Some(expr) => self.eval_expr(expr).map(Some)
                              .map_err(|errtype| EvalError { lineno: sub.end_lineno, errtype }),
            None => Ok(None),
        }
    }

    // -- expressions

    /// Evaluate an expression.  The only available type is a floating-point number.
    fn eval_expr(&mut self, expr: &Expr) -> Result<f64, ErrType> {
        Ok(match expr {
            Expr::Number(value) => *value,
            Expr::NumVar(_) | Expr::NameVar(_) => {
                let param = self.param_of(expr)?;
                self.read_var(&param)?
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                binary_op(*op, left, right)?
            }
            Expr::Assign(target, value) => {
                let value = self.eval_expr(value)?;
                if !target.is_variable() {
                    return Err(ErrType::InvalidAssignTarget(target.to_string()));
                }
                let param = self.param_of(target)?;
                self.write_var(param, value)?;
                value
            }
            Expr::Call(name, args) => self.eval_call(name, args)?,
        })
    }

    fn eval_call(&mut self, name: &str, args: &[Expr]) -> Result<f64, ErrType> {
        let func: Builtin = name.parse().map_err(|_| ErrType::UnknownFunction(name.into()))?;
        if args.len() != func.arity() {
            return Err(ErrType::WrongArgCount(func, func.arity(), args.len()));
        }
        // EXISTS looks at the parameter itself, not at its value
        if func == Builtin::Exists {
            if !args[0].is_variable() {
                return Err(ErrType::ExistsNeedsParameter);
            }
            let param = self.param_of(&args[0])?;
            return Ok(if self.lookup(&param).is_some() { 1.0 } else { 0.0 });
        }
        let arg = self.eval_expr(&args[0])?;
        Ok(match func {
            Builtin::Atan => {
                let arg_x = self.eval_expr(&args[1])?;
                arg.atan2(arg_x).to_degrees()
            }
            Builtin::Abs   => arg.abs(),
            Builtin::Acos  => arg.acos().to_degrees(),
            Builtin::Asin  => arg.asin().to_degrees(),
            Builtin::Cos   => arg.to_radians().cos(),
            Builtin::Exp   => arg.exp(),
            Builtin::Fix   => arg.floor(),
            Builtin::Fup   => arg.ceil(),
            Builtin::Round => arg.round(),
            Builtin::Ln    => arg.ln(),
            Builtin::Sin   => arg.to_radians().sin(),
            Builtin::Sqrt  => arg.sqrt(),
            Builtin::Tan   => arg.to_radians().tan(),
            Builtin::Exists => unreachable!("handled above"),
        })
    }
}

fn binary_op(op: Op, left: f64, right: f64) -> Result<f64, ErrType> {
    fn truth(b: bool) -> f64 {
        if b { 1.0 } else { 0.0 }
    }
    Ok(match op {
        Op::Exp => left.powf(right),
        Op::Mul => left * right,
        Op::Div => if right == 0. {
            return Err(ErrType::DivByZero)
        } else { left / right },
        Op::Mod => if right == 0. {
            return Err(ErrType::DivByZero)
        } else { left % right },
        Op::Add => left + right,
        Op::Sub => left - right,
        Op::Eq  => truth(left == right),
        Op::Ne  => truth(left != right),
        Op::Gt  => truth(left > right),
        Op::Ge  => truth(left >= right),
        Op::Lt  => truth(left < right),
        Op::Le  => truth(left <= right),
        Op::And => truth(left != 0. && right != 0.),
        Op::Or  => truth(left != 0. || right != 0.),
        Op::Xor => truth((left != 0.) ^ (right != 0.)),
    })
}

/// Display helper returned by `Evaluator::dump_variables`.
pub struct VariableDump<'a>(&'a Evaluator);

impl fmt::Display for VariableDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn write_scope(f: &mut fmt::Formatter, title: &str, scope: &Scope) -> fmt::Result {
            writeln!(f, "{}:", title)?;
            for (n, value) in scope.nums.iter().sorted_by_key(|&(n, _)| *n) {
                writeln!(f, "  #{} = {}", n, value)?;
            }
            for (name, value) in scope.names.iter().sorted_by_key(|&(name, _)| name) {
                writeln!(f, "  #<{}> = {}", name, value)?;
            }
            Ok(())
        }

        let eval = self.0;
        writeln!(f, "globals:")?;
        for (name, global) in eval.globals.iter().sorted_by_key(|&(name, _)| name) {
            writeln!(f, "  #<{}> = {} ({})", name, global.value, global.tag)?;
        }
        write_scope(f, "normal", &eval.vars)?;
        for (depth, frame) in eval.frames.iter().enumerate() {
            write_scope(f, &format!("call frame {}", depth + 1), frame)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(lineno: usize, kind: StmtKind) -> Statement {
        Statement { lineno, kind }
    }

    fn label() -> Label {
        Label::Number(Expr::Number(1.))
    }

    #[test]
    fn test_break_stops_at_call_boundary() {
        // The parser never lets `break` escape a subroutine body, so build
        // the tree by hand.
        let sub = SubStatement {
            label: label(),
            body: vec![stmt(2, StmtKind::Break(label()))],
            tail_return: Some(Expr::Number(7.)),
            end_lineno: 3,
        };
        let program = Program {
            filename: "test".into(),
            body: vec![
                stmt(1, StmtKind::Sub(sub)),
                stmt(4, StmtKind::Call(CallStatement { label: label(), args: vec![] })),
                stmt(5, StmtKind::Expression(Expr::Assign(
                    Box::new(Expr::NumVar(Box::new(Expr::Number(1.)))),
                    Box::new(Expr::Number(1.))))),
            ],
        };
        let mut eval = Evaluator::new(program);
        eval.process_program().unwrap();
        assert_eq!(eval.has_variable(&Param::Named(RETURN_VALUE.into())), Some(7.));
        assert_eq!(eval.has_variable(&Param::Num(1)), Some(1.));
    }

    #[test]
    fn test_break_leaves_labelled_loop() {
        let num = |n: f64| Label::Number(Expr::Number(n));
        let assign = |lineno, n: f64| stmt(lineno, StmtKind::Expression(Expr::Assign(
            Box::new(Expr::NumVar(Box::new(Expr::Number(n)))), Box::new(Expr::Number(1.)))));
        let inner = WhileStatement {
            label: num(2.),
            test: Expr::Number(1.),
            body: vec![stmt(3, StmtKind::Break(num(1.)))],
        };
        let outer = WhileStatement {
            label: num(1.),
            test: Expr::Number(1.),
            body: vec![stmt(2, StmtKind::While(inner)), assign(5, 1.)],
        };
        let program = Program {
            filename: "test".into(),
            body: vec![stmt(1, StmtKind::While(outer)), assign(7, 2.)],
        };
        let mut eval = Evaluator::new(program);
        eval.process_program().unwrap();
        assert_eq!(eval.has_variable(&Param::Num(1)), None);
        assert_eq!(eval.has_variable(&Param::Num(2)), Some(1.));
    }

    #[test]
    fn test_stray_flow_at_top_level() {
        let program = Program {
            filename: "test".into(),
            body: vec![stmt(1, StmtKind::Break(label()))],
        };
        let err = Evaluator::new(program).process_program().unwrap_err();
        assert_eq!(err.errtype, ErrType::StrayFlow("break"));
    }

    #[test]
    fn test_binary_ops() {
        assert_eq!(binary_op(Op::Exp, 2., 10.), Ok(1024.));
        assert_eq!(binary_op(Op::Mod, 7., 3.), Ok(1.));
        assert_eq!(binary_op(Op::Div, 1., 0.), Err(ErrType::DivByZero));
        assert_eq!(binary_op(Op::Ge, 2., 2.), Ok(1.));
        assert_eq!(binary_op(Op::Xor, 2., 3.), Ok(0.));
        assert_eq!(binary_op(Op::Or, 0., -1.), Ok(1.));
    }

    #[test]
    fn test_dump_lists_scopes() {
        let program = Program { filename: "test".into(), body: vec![] };
        let mut eval = Evaluator::new(program);
        eval.set_variable(Param::Num(3), 1.5).unwrap();
        eval.set_variable(Param::Named("_g".into()), 2.).unwrap();
        let dump = eval.dump_variables().to_string();
        assert!(dump.contains("#<_g> = 2 (Normal)"));
        assert!(dump.contains("#<_value> = 0 (Internal)"));
        assert!(dump.contains("normal:\n  #3 = 1.5\n"));
    }
}
