//! Incremental IR construction, one fragment (REPL line or notebook cell)
//! at a time.
//!
//! A fragment owns the IR for the symbols it defines. Redefining a name
//! already owned by another fragment invalidates that fragment; rebuilding
//! a fragment recompiles only its own IR and relinks it into the running
//! module, leaving every other fragment's code untouched.

use crate::deps::free_names_in_stmt;
use nv_ast::{Program, Stmt, StmtKind};
use nv_check::{check_program, Namespace};
use nv_ir::{lower_program, IrModule};
use nv_types::{Type, TypeScheme};
use std::collections::{HashMap, HashSet};

/// Whether a fragment rebuild should implicitly print the value of its
/// trailing bare expression, as a REPL does but a script does not.
#[derive(Debug, Clone, Copy, Default)]
pub struct IrBuildOptions {
    pub auto_print_last_expr: bool,
}

#[derive(Debug)]
pub struct IrBuildResult {
    pub module: IrModule,
    pub entry_symbol: Option<String>,
    pub defined_types: HashMap<String, Type>,
}

#[derive(Debug)]
pub struct IrFragment {
    pub id: u64,
    pub active: bool,
    pub unit_name: String,
    pub defined_symbols: HashSet<String>,
    pub used_symbols: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct IrInvalidateResult {
    pub invalidated_fragments: Vec<u64>,
    pub affected_symbols: HashSet<String>,
}

/// Builds and relinks fragment IR incrementally, tracking which fragment
/// produced which symbol so a redefinition can invalidate exactly the
/// fragments that read it.
pub struct IrIncrementalBuilder {
    next_id: u64,
    fragments: HashMap<u64, IrFragment>,
    deps: HashMap<u64, HashSet<u64>>,
    rdeps: HashMap<u64, HashSet<u64>>,
    symbol_producer: HashMap<String, u64>,
    global_types: HashMap<String, Type>,
}

impl Default for IrIncrementalBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IrIncrementalBuilder {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            fragments: HashMap::new(),
            deps: HashMap::new(),
            rdeps: HashMap::new(),
            symbol_producer: HashMap::new(),
            global_types: HashMap::new(),
        }
    }

    /// Type-checks and lowers `source` as a new fragment, wiring it into
    /// the dependency graph by the free names its statements reference.
    pub fn build_fragment(
        &mut self,
        unit_name: &str,
        program: Program,
        options: IrBuildOptions,
    ) -> nv_base::Result<(u64, IrBuildResult)> {
        let mut namespace = Namespace::new();
        for (name, ty) in &self.global_types {
            namespace.insert(name.clone(), TypeScheme::monomorphic(ty.clone()));
        }

        let used = collect_used_names(&program.statements);
        let defined = collect_defined_names(&program.statements);

        let checked = check_program(program, namespace)
            .map_err(|e| nv_base::SpannedError::new(e.to_string(), nv_base::Position::start_of_file()))?;
        for (name, ty) in checked.binding_types.iter().chain(checked.function_types.iter()) {
            self.global_types.insert(name.clone(), ty.clone());
        }
        let defined_types: HashMap<String, Type> = defined
            .iter()
            .filter_map(|name| self.global_types.get(name).map(|ty| (name.clone(), ty.clone())))
            .collect();

        let has_trailing_expr = options.auto_print_last_expr
            && matches!(checked.program.statements.last().map(|s| &s.kind), Some(StmtKind::Expr(_)));

        let module = lower_program(&checked);
        let id = self.next_id;
        self.next_id += 1;

        let mut dep_fragments = HashSet::new();
        for name in &used {
            if let Some(&producer) = self.symbol_producer.get(name) {
                dep_fragments.insert(producer);
            }
        }
        for &dep in &dep_fragments {
            self.rdeps.entry(dep).or_default().insert(id);
        }
        self.deps.insert(id, dep_fragments);

        for name in &defined {
            self.symbol_producer.insert(name.clone(), id);
        }

        self.fragments.insert(
            id,
            IrFragment {
                id,
                active: true,
                unit_name: unit_name.to_string(),
                defined_symbols: defined,
                used_symbols: used,
            },
        );

        let entry_symbol = has_trailing_expr.then(|| format!("__fragment_{}_result", id));
        Ok((id, IrBuildResult { module, entry_symbol, defined_types }))
    }

    /// Invalidates `fragment_id` and every fragment transitively depending
    /// on one of its symbols.
    pub fn invalidate_fragment(&mut self, fragment_id: u64) -> IrInvalidateResult {
        let mut invalidated = Vec::new();
        let mut affected_symbols = HashSet::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(fragment_id);
        let mut seen = HashSet::new();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(fragment) = self.fragments.get_mut(&id) {
                fragment.active = false;
                affected_symbols.extend(fragment.defined_symbols.iter().cloned());
            }
            invalidated.push(id);
            for &dependent in self.rdeps.get(&id).cloned().unwrap_or_default().iter() {
                queue.push_back(dependent);
            }
        }
        IrInvalidateResult { invalidated_fragments: invalidated, affected_symbols }
    }

    pub fn is_fragment_active(&self, fragment_id: u64) -> bool {
        self.fragments.get(&fragment_id).map(|f| f.active).unwrap_or(false)
    }

    pub fn get_fragment(&self, fragment_id: u64) -> Option<&IrFragment> {
        self.fragments.get(&fragment_id)
    }
}

fn collect_used_names(statements: &[Stmt]) -> HashSet<String> {
    let mut out = HashSet::new();
    for stmt in statements {
        free_names_in_stmt(stmt, &mut out);
    }
    // Remove names this very batch of statements also defines locally
    // (e.g. a `lock` used later in the same fragment) — those aren't
    // cross-fragment dependencies.
    let defined = collect_defined_names(statements);
    out.retain(|name| !defined.contains(name));
    out
}

fn collect_defined_names(statements: &[Stmt]) -> HashSet<String> {
    let mut out = HashSet::new();
    for stmt in statements {
        match &stmt.kind {
            StmtKind::Lock { name, .. } => {
                out.insert(name.clone());
            }
            StmtKind::Def(f) => {
                out.insert(f.name.clone());
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use nv_lexer::Lexer;
    use nv_parser::Parser;

    fn parse(src: &str) -> Program {
        let (tokens, imports) = Lexer::new(src, "repl").tokenize().unwrap();
        Parser::parse_program(tokens, imports).unwrap()
    }

    #[test]
    fn a_fragment_using_an_earlier_fragments_symbol_depends_on_it() {
        let mut builder = IrIncrementalBuilder::new();
        let (id_a, _) = builder
            .build_fragment("cell1", parse("lock a = 1;"), IrBuildOptions::default())
            .unwrap();
        let (_id_b, _) = builder
            .build_fragment("cell2", parse("lock b = a + 1;"), IrBuildOptions::default())
            .unwrap();
        assert!(builder.deps[&_id_b].contains(&id_a));
    }

    #[test]
    fn invalidating_a_fragment_cascades_to_its_dependents() {
        let mut builder = IrIncrementalBuilder::new();
        let (id_a, _) = builder
            .build_fragment("cell1", parse("lock a = 1;"), IrBuildOptions::default())
            .unwrap();
        let (id_b, _) = builder
            .build_fragment("cell2", parse("lock b = a + 1;"), IrBuildOptions::default())
            .unwrap();
        let result = builder.invalidate_fragment(id_a);
        assert!(result.invalidated_fragments.contains(&id_a));
        assert!(result.invalidated_fragments.contains(&id_b));
        assert!(!builder.is_fragment_active(id_b));
    }
}
