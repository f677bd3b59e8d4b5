// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use ngc::ast::*;
use ngc::parse::{self, ParseError};

fn num(n: f64) -> Box<Expr> {
    Box::new(Expr::Number(n))
}

fn var(n: f64) -> Box<Expr> {
    Box::new(Expr::NumVar(num(n)))
}

fn expr(src: &str) -> Expr {
    let prog = parse::parse("testfile", src).unwrap();
    match prog.body.into_iter().next().map(|stmt| stmt.kind) {
        Some(StmtKind::Expression(expr)) => expr,
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

fn syntax_error(src: &str) -> String {
    match parse::parse("testfile", src) {
        Err(e @ ParseError::Syntax(_)) => e.message(),
        other => panic!("expected a syntax error, got {:?}", other),
    }
}

#[test]
fn test_parse() {
    let src = r#"(exercise most of the syntax)

G1 X10 Y-2.5 ; move
N10 g0 x[#1+1]
#<My Var> = sin[30] * 2
#[1 + #2] = atan[1]/[-1]
o<loop> while [#<myvar> LT 10]
  #<myvar> = #<myvar> + 1
  o5 if [#<myvar> eq 3]
    o<loop> continue
  o5 elseif [#<myvar> mod 7 == 0 or #1]
    o<loop> break
  o5 endif
o<loop> endwhile
o100 sub
  o100 return [#1 ** 2]
o100 endsub [0]
o100 call [1] [2]
o[#2] repeat [3]
o[#2] endrepeat
"#;

    let parsed = r#"G1 X10 Y[0 - 2.5]
G0 X[#1 + 1]
#<myvar> = [sin[30] * 2]
#[1 + #2] = atan[1]/[0 - 1]
o<loop> while [#<myvar> LT 10]
  #<myvar> = [#<myvar> + 1]
  o5 if [#<myvar> EQ 3]
    o<loop> continue
  o5 elseif [[[#<myvar> MOD 7] EQ 0] OR #1]
    o<loop> break
  o5 endif
o<loop> endwhile
o100 sub
  o100 return [#1 ** 2]
o100 endsub [0]
o100 call [1] [2]
o#2 repeat [3]
o#2 endrepeat
"#;

    let prog = parse::parse("testfile", src).unwrap();

    // make sure we count lines correctly
    assert_eq!(prog.body[0].lineno, 3);
    assert_eq!(prog.body[1].lineno, 4);
    assert_eq!(prog.body[4].lineno, 7);

    assert_eq!(prog.to_string(), parsed);
    // the display form parses back into the same program
    let reparsed = parse::parse("testfile", &prog.to_string()).unwrap();
    assert_eq!(reparsed.to_string(), parsed);
}

#[test]
fn test_precedence() {
    use Expr::*;

    assert_eq!(expr("#1 = 2 + 3 * 4\n"),
               Assign(var(1.), Box::new(Binary(Op::Add, num(2.), Box::new(Binary(Op::Mul, num(3.), num(4.)))))));
    // power is left-associative and binds tighter than multiplication
    assert_eq!(expr("2 * 2 ** 3 ** 2"),
               Binary(Op::Mul, num(2.), Box::new(
                   Binary(Op::Exp, Box::new(Binary(Op::Exp, num(2.), num(3.))), num(2.)))));
    assert_eq!(expr("1 + 2 lt 4 and 1"),
               Binary(Op::And, Box::new(Binary(Op::Lt, Box::new(Binary(Op::Add, num(1.), num(2.))),
                                               num(4.))), num(1.)));
    // assignment is right-associative
    assert_eq!(expr("#1 = #2 = 3"),
               Assign(var(1.), Box::new(Assign(var(2.), num(3.)))));
    assert_eq!(expr("[1 - 2] - 3"),
               Binary(Op::Sub, Box::new(Binary(Op::Sub, num(1.), num(2.))), num(3.)));
}

#[test]
fn test_unary_sign() {
    use Expr::*;

    assert_eq!(expr("#1 = -#2"),
               Assign(var(1.), Box::new(Binary(Op::Sub, num(0.), var(2.)))));
    assert_eq!(expr("+1"), Binary(Op::Add, num(0.), num(1.)));
    assert!(syntax_error("#1 = --1\n").contains("expected an expression"));
}

#[test]
fn test_variables() {
    use Expr::*;

    assert_eq!(expr("##1"), NumVar(var(1.)));
    assert_eq!(expr("#<Some Name>"), NameVar("somename".into()));
    assert_eq!(expr("#[1 + 1]"), NumVar(Box::new(Binary(Op::Add, num(1.), num(1.)))));
    assert_eq!(expr("EXISTS[#<x>]"), Call("exists".into(), vec![NameVar("x".into())]));
    assert_eq!(syntax_error("#1.2 = 3\n"), "variable number must be an integer");
    assert!(syntax_error("#<  > = 3\n").contains("empty variable name"));
    assert!(syntax_error("#1 = atan[1]*[2]\n").contains("expected / between ATAN arguments"));
}

#[test]
fn test_elseif_chain() {
    let src = "o1 if [#1 eq 1]\n#2 = 10\no1 elseif [#1 eq 2]\n#2 = 20\no1 else\n#2 = 30\no1 endif\n";
    let prog = parse::parse("testfile", src).unwrap();
    assert_eq!(prog.body.len(), 1);

    let outer = match &prog.body[0].kind {
        StmtKind::If(stmt) => stmt,
        other => panic!("expected if, got {:?}", other),
    };
    assert_eq!(outer.consequent.len(), 1);
    assert_eq!(outer.alternate.len(), 1);
    assert_eq!(outer.alternate[0].lineno, 3);
    let inner = match &outer.alternate[0].kind {
        StmtKind::If(stmt) => stmt,
        other => panic!("expected nested if, got {:?}", other),
    };
    assert_eq!(inner.label, outer.label);
    assert_eq!(inner.consequent.len(), 1);
    assert_eq!(inner.alternate.len(), 1);
    assert!(matches!(inner.alternate[0].kind, StmtKind::Expression(_)));

    assert_eq!(prog.to_string(), "o1 if [#1 EQ 1]\n  #2 = 10\no1 elseif [#1 EQ 2]\n  #2 = 20\n\
                                  o1 else\n  #2 = 30\no1 endif\n");
}

#[test]
fn test_subroutines() {
    let src = "o<f> sub\n#2 = #1\no<f> endsub\no<F> call [1]\n";
    let prog = parse::parse("testfile", src).unwrap();
    match &prog.body[0].kind {
        StmtKind::Sub(sub) => {
            assert_eq!(sub.label, Label::Name("f".into()));
            assert_eq!(sub.tail_return, None);
            assert_eq!(sub.end_lineno, 3);
        }
        other => panic!("expected sub, got {:?}", other),
    }
    match &prog.body[1].kind {
        StmtKind::Call(call) => assert_eq!(call.args, [Expr::Number(1.)]),
        other => panic!("expected call, got {:?}", other),
    }

    // loops around a definition do not allow break inside it
    assert!(syntax_error("o1 while [1]\no2 sub\no2 break\no2 endsub\no1 endwhile\n")
            .contains("break outside of a while loop"));
    assert!(syntax_error("o1 sub\no2 sub\no2 endsub\no1 endsub\n")
            .contains("cannot be defined inside subroutine o1"));
    assert!(syntax_error("o1 sub\no2 return\no1 endsub\n")
            .contains("does not match subroutine o1"));
}

#[test]
fn test_context_errors() {
    assert_eq!(syntax_error("o1 return [1]\n"), "return outside of a subroutine");
    assert_eq!(syntax_error("o1 break\n"), "break outside of a while loop");
    assert_eq!(syntax_error("o1 continue\n"), "continue outside of a while loop");
    assert_eq!(syntax_error("o1 endif\n"), "endif without matching opening block");
    assert!(syntax_error("o1 while [1]\no2 endwhile\n")
            .contains("label o2 does not match opening label o1"));
    assert!(syntax_error("o1 if [1]\no1 else\no3 endif\n").contains("does not match"));
    assert!(syntax_error("o1 if [1]\nG1\n").contains("unexpected end of input"));
    assert!(syntax_error("G1 #1 = 2\n").contains("expected a command letter"));
}

#[test]
fn test_error_location() {
    let err = parse::parse("prog.ngc", "G1\n\no1 while [1]\no2 endwhile\n").unwrap_err();
    assert_eq!(err.line_col(), (4, 1));
    let text = err.to_string();
    assert!(text.starts_with("syntax error: "));
    assert!(text.contains("prog.ngc"));
}

#[test]
fn test_loop_labels() {
    assert_eq!(syntax_error("o1 while [1]\no9 break\no1 endwhile\n"),
               "break label o9 does not match loop o1");
    assert_eq!(syntax_error("o1 while [1]\no2 while [1]\no1 break\no2 endwhile\no1 endwhile\n"),
               "break label o1 does not match loop o2");
    assert_eq!(syntax_error("o<a> while [1]\no<b> continue\no<a> endwhile\n"),
               "continue label o<b> does not match loop o<a>");

    // a repeat does not count as a loop for break
    let src = "o1 while [1]\no2 while [1]\no2 continue\no2 endwhile\n\
               o3 repeat [2]\no1 break\no3 endrepeat\no1 endwhile\n";
    assert!(parse::parse("testfile", src).is_ok());
}

#[test]
fn test_else_holding_if() {
    let src = "o1 if [#1]\no1 else\no2 if [#3]\no2 endif\no1 endif\n";
    let parsed = "o1 if [#1]\no1 else\n  o2 if [#3]\n  o2 endif\no1 endif\n";
    let prog = parse::parse("testfile", src).unwrap();
    assert_eq!(prog.to_string(), parsed);
    assert_eq!(parse::parse("testfile", parsed).unwrap(), prog);
}

#[test]
fn test_line_numbers() {
    let src = "N10 #1 = 2\nN20 o1 if [1]\nN30 G1 N35\nN40 o1 endif\nN50\n";
    let prog = parse::parse("testfile", src).unwrap();
    assert_eq!(prog.body.len(), 2);
    assert_eq!(prog.body[0].lineno, 1);
    assert!(matches!(prog.body[0].kind, StmtKind::Expression(_)));
    assert_eq!(prog.to_string(), "#1 = 2\no1 if [1]\n  G1\no1 endif\n");
}
