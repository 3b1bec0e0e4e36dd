//! Line-at-a-time interactive execution: one [`Repl::execute_line`] call
//! per fragment, auto-printing a trailing bare expression's value.

use crate::fragment::{IrBuildOptions, IrIncrementalBuilder};
use crate::jit::JitExecutionEngine;
use crate::origin::Origin;
use crate::session::SessionManager;
use nv_lexer::Lexer;
use nv_parser::Parser;
use std::collections::HashSet;

/// The outcome of executing one fragment of source: whether it succeeded,
/// what it printed (its auto-printed trailing value, if any), the error
/// message on failure, and the symbol names it defined or read.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub ok: bool,
    pub output: Option<String>,
    pub error: Option<String>,
    pub defined_symbols: Vec<String>,
    pub used_symbols: Vec<String>,
}

/// A persistent read-eval-print session: every line builds on the symbols
/// every previous line defined.
#[derive(Default)]
pub struct Repl {
    builder: IrIncrementalBuilder,
    jit: JitExecutionEngine,
    session: SessionManager,
    next_line: u64,
}

impl Repl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn execute_line(&mut self, text: &str) -> ExecutionResult {
        let unit_name = format!("repl:{}", self.next_line);
        self.next_line += 1;

        let (tokens, imports) = match Lexer::new(text, &unit_name).tokenize() {
            Ok(t) => t,
            Err(e) => return ExecutionResult { ok: false, error: Some(e.to_string()), ..Default::default() },
        };
        let program = match Parser::parse_program(tokens, imports) {
            Ok(p) => p,
            Err(e) => return ExecutionResult { ok: false, error: Some(e.to_string()), ..Default::default() },
        };

        let build = self.builder.build_fragment(&unit_name, program, IrBuildOptions { auto_print_last_expr: true });
        let (fragment_id, build) = match build {
            Ok(v) => v,
            Err(e) => return ExecutionResult { ok: false, error: Some(e.to_string()), ..Default::default() },
        };

        let fragment = self.builder.get_fragment(fragment_id).expect("fragment just built");
        let defined_symbols: Vec<String> = fragment.defined_symbols.iter().cloned().collect();
        let used_symbols: Vec<String> = fragment.used_symbols.iter().cloned().collect();
        let depends_on: HashSet<String> = fragment.used_symbols.clone();

        let commits: Vec<(String, nv_types::Type, HashSet<String>)> = defined_symbols
            .iter()
            .filter_map(|name| build.defined_types.get(name).map(|ty| (name.clone(), ty.clone(), depends_on.clone())))
            .collect();
        self.session.commit_unit(Origin::repl_step(unit_name.clone()), &commits);

        match self.jit.add_module(fragment_id, build.module) {
            Ok(value) => ExecutionResult {
                ok: true,
                output: value.map(|v| v.to_string()),
                error: None,
                defined_symbols,
                used_symbols,
            },
            Err(e) => ExecutionResult {
                ok: false,
                error: Some(e.to_string()),
                defined_symbols,
                used_symbols,
                ..Default::default()
            },
        }
    }

    /// Names currently defined across every still-active fragment.
    pub fn active_symbols(&self) -> HashSet<String> {
        let mut names = HashSet::new();
        for id in 0..self.next_line {
            if let Some(fragment) = self.builder.get_fragment(id) {
                if fragment.active {
                    names.extend(fragment.defined_symbols.iter().cloned());
                }
            }
        }
        names
    }

    /// Whether `name` still holds a valid, non-stale binding according to
    /// the session's semantic symbol table (`:symbols` style introspection).
    pub fn is_symbol_valid(&self, name: &str) -> bool {
        self.session.is_symbol_valid(name)
    }

    pub fn symbol_origin(&self, name: &str) -> Option<&Origin> {
        self.session.get_origin(name)
    }

    pub fn list_symbols(&self) -> Vec<String> {
        self.session.list_symbols_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executing_a_line_auto_prints_its_trailing_expression() {
        let mut repl = Repl::new();
        let result = repl.execute_line("1 + 2;");
        assert!(result.ok);
        assert_eq!(result.output.as_deref(), Some("3"));
    }

    #[test]
    fn a_later_line_can_reference_an_earlier_lines_binding() {
        let mut repl = Repl::new();
        assert!(repl.execute_line("lock a = 10;").ok);
        let result = repl.execute_line("a + 5;");
        assert!(result.ok);
        assert_eq!(result.output.as_deref(), Some("15"));
    }

    #[test]
    fn redefining_a_binding_invalidates_dependents_in_the_session_table() {
        let mut repl = Repl::new();
        assert!(repl.execute_line("lock a = 1;").ok);
        assert!(repl.execute_line("lock b = a + 1;").ok);
        assert!(repl.is_symbol_valid("b"));

        assert!(repl.execute_line("lock a = true;").ok);
        assert!(!repl.is_symbol_valid("b"));
        assert_eq!(repl.symbol_origin("a").unwrap().id, "repl:2");
    }

    #[test]
    fn a_lexical_error_is_reported_without_panicking() {
        let mut repl = Repl::new();
        let result = repl.execute_line("\"unterminated");
        assert!(!result.ok);
        assert!(result.error.is_some());
    }
}
