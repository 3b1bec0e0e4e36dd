//! End-to-end tests: source text in, evaluated [`nv_ir::Value`] out,
//! exercising the full lexer/parser/checker/lowering/evaluation chain.

use nv_check::{check_program, Namespace};
use nv_ir::{lower_program, Engine, Value};
use nv_lexer::Lexer;
use nv_parser::Parser;

fn run(src: &str) -> Value {
    let (tokens, imports) = Lexer::new(src, "e2e.rv").tokenize().expect("lex");
    let program = Parser::parse_program(tokens, imports).expect("parse");
    let checked = check_program(program, Namespace::new()).expect("check");
    let module = lower_program(&checked);
    let mut engine = Engine::new();
    engine.add_module(&module).expect("eval").expect("trailing value")
}

#[test]
fn arithmetic_respects_precedence_and_associativity() {
    assert_eq!(run("2 + 3 * 4 - 1;"), Value::Number(13.0));
    assert_eq!(run("2 ** 3 ** 2;"), Value::Number(512.0));
}

#[test]
fn recursive_function_definitions_work_across_statements() {
    let src = r#"
        def fib(n: Int) -> Int {
            if n <= 1 { return n; }
            return fib(n - 1) + fib(n - 2);
        }
        fib(10);
    "#;
    assert_eq!(run(src), Value::Number(55.0));
}

#[test]
fn for_loops_over_ranges_and_lists_both_work() {
    assert_eq!(run("lock total = 0; for i from 1..=5 { total += i; } total;"), Value::Number(15.0));
    assert_eq!(run("lock total = 0; for x from [10, 20, 30] { total += x; } total;"), Value::Number(60.0));
}

#[test]
fn match_with_range_and_wildcard_arms_dispatches_correctly() {
    let src = r#"
        def classify(n: Int) -> String {
            return match n {
                0 => "zero",
                1..10 => "small",
                _ => "large",
            };
        }
        classify(5);
    "#;
    assert_eq!(run(src), Value::String(std::rc::Rc::new("small".to_string())));
}

#[test]
fn type_mismatches_are_rejected_before_evaluation() {
    let (tokens, imports) = Lexer::new("lock x: Bool = 1 + 2;", "bad.rv").tokenize().unwrap();
    let program = Parser::parse_program(tokens, imports).unwrap();
    let result = check_program(program, Namespace::new());
    assert!(result.is_err());
}

#[test]
fn unbound_identifiers_are_caught_at_check_time_not_at_runtime() {
    let (tokens, imports) = Lexer::new("totally_undefined_name + 1;", "bad.rv").tokenize().unwrap();
    let program = Parser::parse_program(tokens, imports).unwrap();
    assert!(check_program(program, Namespace::new()).is_err());
}
