//! Execution boundary for incremental fragments.
//!
//! Wraps [`nv_ir::Engine`], the tree-walking evaluator, behind the same
//! add-module / remove-module / call-named-symbol surface a real
//! JIT-compiling backend would expose, so `nv_interactive`'s callers
//! (a REPL or notebook driver) never depend on evaluation being
//! interpreted rather than compiled.

use nv_ir::{Engine, IrModule, Value};
use std::collections::HashMap;

/// Executes committed fragment IR and lets later fragments call symbols
/// defined by earlier ones.
#[derive(Default)]
pub struct JitExecutionEngine {
    engine: Engine,
    modules: HashMap<u64, IrModule>,
}

impl JitExecutionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `module` under `module_id`, running its top-level statements
    /// immediately and returning the value of a trailing bare expression,
    /// if any (the REPL's auto-print value).
    pub fn add_module(&mut self, module_id: u64, module: IrModule) -> nv_base::Result<Option<Value>> {
        let result = self.engine.add_module(&module)?;
        self.modules.insert(module_id, module);
        Ok(result)
    }

    /// Drops a previously added module's functions from the live engine.
    /// Globals it defined are left bound in `globals` until the caller
    /// overwrites them — narval has no notion of "unsetting" a variable,
    /// only redefining it, matching how invalidated fragments behave
    /// until their replacement commits.
    pub fn remove_module(&mut self, module_id: u64) {
        if let Some(module) = self.modules.remove(&module_id) {
            for name in module.functions.keys() {
                self.engine.forget_function(name);
            }
        }
    }

    pub fn call_named(&mut self, name: &str, args: Vec<Value>) -> nv_base::Result<Value> {
        self.engine.call_named(name, args)
    }

    pub fn has_module(&self, module_id: u64) -> bool {
        self.modules.contains_key(&module_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nv_check::{check_program, Namespace};
    use nv_lexer::Lexer;
    use nv_parser::Parser;

    fn build(src: &str) -> IrModule {
        let (tokens, imports) = Lexer::new(src, "test.rv").tokenize().unwrap();
        let program = Parser::parse_program(tokens, imports).unwrap();
        let checked = check_program(program, Namespace::new()).unwrap();
        nv_ir::lower_program(&checked)
    }

    #[test]
    fn a_function_defined_in_one_module_is_callable_from_the_engine_after_adding() {
        let mut jit = JitExecutionEngine::new();
        jit.add_module(0, build("def square(n: Int) -> Int { return n * n; }")).unwrap();
        let result = jit.call_named("square", vec![Value::Number(4.0)]).unwrap();
        assert_eq!(result, Value::Number(16.0));
    }

    #[test]
    fn removing_a_module_forgets_its_functions() {
        let mut jit = JitExecutionEngine::new();
        jit.add_module(0, build("def one() -> Int { return 1; }")).unwrap();
        assert!(jit.call_named("one", vec![]).is_ok());
        jit.remove_module(0);
        assert!(jit.call_named("one", vec![]).is_err());
        assert!(!jit.has_module(0));
    }
}
