//! # nv_ir
//!
//! The typed low-level representation narval programs are lowered into
//! after type checking, and the embedded evaluator that executes it.
//! `nv_interactive` builds its `JitExecutionEngine` directly on
//! [`eval::Engine`], treating module add/remove and named-symbol execution
//! as the JIT boundary — no machine code is actually emitted here (see
//! the crate's design notes for why).

pub mod eval;
pub mod ir;
pub mod lower;
pub mod value;

pub use eval::Engine;
pub use ir::{IrFunction, IrModule};
pub use lower::lower_program;
pub use value::{Tag, Value};

#[cfg(test)]
mod tests {
    use super::*;
    use nv_check::{check_program, Namespace};
    use nv_lexer::Lexer;
    use nv_parser::Parser;

    fn run(src: &str) -> Option<Value> {
        let (tokens, imports) = Lexer::new(src, "test.rv").tokenize().unwrap();
        let program = Parser::parse_program(tokens, imports).unwrap();
        let checked = check_program(program, Namespace::new()).unwrap();
        let module = lower_program(&checked);
        let mut engine = Engine::new();
        engine.add_module(&module).unwrap()
    }

    #[test]
    fn evaluates_arithmetic_with_correct_precedence() {
        let result = run("1 + 2 * 3;");
        assert_eq!(result, Some(Value::Number(7.0)));
    }

    #[test]
    fn while_loop_accumulates_into_a_lock() {
        let src = "lock total = 0; lock i = 0; while i < 5 { total += i; i += 1; } total;";
        assert_eq!(run(src), Some(Value::Number(10.0)));
    }

    #[test]
    fn for_loop_iterates_a_range() {
        let src = "lock total = 0; for i from 0..5 { total += i; } total;";
        assert_eq!(run(src), Some(Value::Number(10.0)));
    }

    #[test]
    fn function_call_recurses() {
        let src = "def fact(n: Int) -> Int { if n <= 1 { return 1; } return n * fact(n - 1); } fact(5);";
        assert_eq!(run(src), Some(Value::Number(120.0)));
    }

    #[test]
    fn match_expression_picks_the_first_satisfied_arm() {
        let src = "lock n = 7; match n { 0 => \"zero\", 1..10 => \"small\", _ => \"big\" };";
        assert_eq!(run(src), Some(Value::String(std::rc::Rc::new("small".to_string()))));
    }

    #[test]
    fn break_exits_a_loop_immediately() {
        let src = "lock total = 0; for i from 0..100 { if i == 3 { break; } total += i; } total;";
        assert_eq!(run(src), Some(Value::Number(3.0)));
    }

    #[test]
    fn and_short_circuits_without_evaluating_the_right_side() {
        // A right side that would error (unbound) never runs because the
        // left side of `and` is already false.
        let src = "false and undefined_name;";
        assert_eq!(run(src), Some(Value::Bool(false)));
    }

    #[test]
    fn string_concatenation_via_plus() {
        let src = "\"a\" + \"b\";";
        assert_eq!(run(src), Some(Value::String(std::rc::Rc::new("ab".to_string()))));
    }

    #[test]
    fn string_methods_evaluate() {
        assert_eq!(run("\"hi\".toUpperCase();"), Some(Value::String(std::rc::Rc::new("HI".to_string()))));
        assert_eq!(run("\"a,b\".replace(\",\", \"-\");"), Some(Value::String(std::rc::Rc::new("a-b".to_string()))));
        assert_eq!(run("\"hello\".includes(\"ell\");"), Some(Value::Bool(true)));
    }

    #[test]
    fn prefix_and_postfix_inc_dec() {
        assert_eq!(run("lock x = 1; ++x; x;"), Some(Value::Number(2.0)));
        assert_eq!(run("lock x = 1; lock y = x--; y;"), Some(Value::Number(1.0)));
        assert_eq!(run("lock x = 1; x--; x;"), Some(Value::Number(0.0)));
    }

    #[test]
    fn for_loop_runs_else_branch_only_on_an_empty_iterable() {
        let src = "lock ran = false; for x from [] { ran = true; } else { ran = false; } ran;";
        assert_eq!(run(src), Some(Value::Bool(false)));
        let src2 = "lock hit = false; for x from [] { hit = true; } else { hit = true; } hit;";
        assert_eq!(run(src2), Some(Value::Bool(true)));
    }

    #[test]
    fn for_loop_with_two_bindings_yields_index_and_element() {
        let src = "lock total = 0; for i, x from [10, 20, 30] { total += i + x; } total;";
        assert_eq!(run(src), Some(Value::Number(63.0)));
    }

    #[test]
    fn list_comprehension_builds_a_vector() {
        let src = "lock xs = [x * 2 for x in [1, 2, 3]]; xs;";
        assert_eq!(run(src), Some(Value::new_vector(vec![Value::Number(2.0), Value::Number(4.0), Value::Number(6.0)])));
    }

    #[test]
    fn list_comprehension_filters_with_if() {
        let src = "lock xs = [x for x in [1, 2, 3, 4] if x > 2]; xs;";
        assert_eq!(run(src), Some(Value::new_vector(vec![Value::Number(3.0), Value::Number(4.0)])));
    }

    #[test]
    fn array_and_tuple_literals_and_vector_methods() {
        assert_eq!(run("{1, 2, 3};"), Some(Value::new_array(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)])));
        assert_eq!(run("(1, \"a\", true);"), Some(Value::Tuple(std::rc::Rc::new(vec![
            Value::Number(1.0),
            Value::String(std::rc::Rc::new("a".to_string())),
            Value::Bool(true),
        ]))));
        assert_eq!(run("lock xs = [1, 2]; xs.push(3); xs;"), Some(Value::new_vector(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)])));
    }

    #[test]
    fn match_pattern_disjunction_matches_either_literal() {
        let src = "match 2 { 1 || 2 => \"small\", _ => \"big\" };";
        assert_eq!(run(src), Some(Value::String(std::rc::Rc::new("small".to_string()))));
    }
}
