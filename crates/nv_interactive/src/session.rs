//! Symbol table and dependency graph for the interactive core.
//!
//! Every binding a REPL or notebook cell introduces becomes a
//! [`SessionSymbol`]; [`DependencyGraph`] tracks which symbols reference
//! which, so redefining one symbol can invalidate exactly the set of
//! dependents affected — `O(affected)`, not `O(all symbols)`.

use crate::origin::Origin;
use nv_types::Type;
use std::collections::{HashMap, HashSet, VecDeque};

/// One binding known to the session: its name, type, the unit of source
/// that produced it, whether it is currently valid, and a monotonic
/// version bumped on every redefinition (so stale closures captured
/// before a redefinition can tell they're stale).
#[derive(Debug, Clone)]
pub struct SessionSymbol {
    pub name: String,
    pub ty: Type,
    pub origin: Origin,
    pub valid: bool,
    pub version: u64,
}

/// Tracks "depends on" / "is depended on by" edges between symbol names.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    deps: HashMap<String, HashSet<String>>,
    rdeps: HashMap<String, HashSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces `symbol`'s dependency set, updating the reverse edges to
    /// match. Call this every time a symbol is (re)defined.
    pub fn set_dependencies(&mut self, symbol: &str, depends_on: HashSet<String>) {
        if let Some(old) = self.deps.remove(symbol) {
            for dep in &old {
                if let Some(set) = self.rdeps.get_mut(dep) {
                    set.remove(symbol);
                }
            }
        }
        for dep in &depends_on {
            self.rdeps.entry(dep.clone()).or_default().insert(symbol.to_string());
        }
        self.deps.insert(symbol.to_string(), depends_on);
    }

    /// Removes `symbol` entirely from the graph, in both directions.
    pub fn remove_symbol(&mut self, symbol: &str) {
        if let Some(old) = self.deps.remove(symbol) {
            for dep in &old {
                if let Some(set) = self.rdeps.get_mut(dep) {
                    set.remove(symbol);
                }
            }
        }
        self.rdeps.remove(symbol);
    }

    pub fn dependencies(&self, symbol: &str) -> HashSet<String> {
        self.deps.get(symbol).cloned().unwrap_or_default()
    }

    pub fn dependents(&self, symbol: &str) -> HashSet<String> {
        self.rdeps.get(symbol).cloned().unwrap_or_default()
    }

    /// Every symbol transitively depending on `symbol`, found by BFS over
    /// reverse edges. Does not include `symbol` itself.
    pub fn transitive_dependents(&self, symbol: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(symbol.to_string());
        while let Some(current) = queue.pop_front() {
            for dependent in self.dependents(&current) {
                if seen.insert(dependent.clone()) {
                    queue.push_back(dependent);
                }
            }
        }
        seen
    }
}

#[derive(Debug, Default)]
struct SessionSymbolTable {
    symbols: HashMap<String, SessionSymbol>,
}

impl SessionSymbolTable {
    fn put(&mut self, symbol: SessionSymbol) {
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    fn get(&self, name: &str) -> Option<&SessionSymbol> {
        self.symbols.get(name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut SessionSymbol> {
        self.symbols.get_mut(name)
    }

    fn list_all(&self) -> Vec<String> {
        self.symbols.keys().cloned().collect()
    }

    fn list_valid(&self) -> Vec<String> {
        self.symbols.values().filter(|s| s.valid).map(|s| s.name.clone()).collect()
    }

    fn list_invalid(&self) -> Vec<String> {
        self.symbols.values().filter(|s| !s.valid).map(|s| s.name.clone()).collect()
    }
}

/// The live state of one interactive session: every symbol defined so
/// far, its dependency edges, and the commit protocol that keeps the two
/// in sync as cells are added, redefined, and invalidated.
#[derive(Debug, Default)]
pub struct SessionManager {
    table: SessionSymbolTable,
    graph: DependencyGraph,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.table = SessionSymbolTable::default();
        self.graph = DependencyGraph::default();
    }

    /// Introduces a brand-new symbol. Panics in debug builds would be
    /// wrong here — a caller redefining an existing name should use
    /// [`redefine_symbol`](Self::redefine_symbol) instead, so this simply
    /// overwrites, matching that method's semantics on first use.
    pub fn add_symbol(&mut self, name: &str, ty: Type, origin: Origin, depends_on: HashSet<String>) {
        self.table.put(SessionSymbol {
            name: name.to_string(),
            ty,
            origin,
            valid: true,
            version: 0,
        });
        self.graph.set_dependencies(name, depends_on);
    }

    /// Redefines an existing symbol (or defines a new one), bumping its
    /// version and invalidating every dependent so the caller can decide
    /// what to recompile. If the new type and dependency set are identical
    /// to the previous version, the version does not bump and dependents
    /// are left valid — a no-op re-execution shouldn't cascade invalidation.
    pub fn redefine_symbol(&mut self, name: &str, ty: Type, origin: Origin, depends_on: HashSet<String>) -> HashSet<String> {
        if let Some(existing) = self.table.get(name) {
            if existing.ty == ty && self.graph.dependencies(name) == depends_on {
                return HashSet::new();
            }
        }
        let version = self.table.get(name).map(|s| s.version + 1).unwrap_or(0);
        self.table.put(SessionSymbol {
            name: name.to_string(),
            ty,
            origin,
            valid: true,
            version,
        });
        self.graph.set_dependencies(name, depends_on);
        let affected = self.graph.transitive_dependents(name);
        self.invalidate_dependents_of(name);
        affected
    }

    fn invalidate_dependents_of(&mut self, name: &str) {
        for dependent in self.graph.transitive_dependents(name) {
            if let Some(symbol) = self.table.get_mut(&dependent) {
                symbol.valid = false;
            }
        }
    }

    pub fn invalidate_symbol(&mut self, name: &str) -> HashSet<String> {
        let affected = self.graph.transitive_dependents(name);
        if let Some(symbol) = self.table.get_mut(name) {
            symbol.valid = false;
        }
        self.invalidate_dependents_of(name);
        affected
    }

    pub fn validate_symbol(&mut self, name: &str) {
        if let Some(symbol) = self.table.get_mut(name) {
            symbol.valid = true;
        }
    }

    /// Removes a symbol's definition and every edge pointing to or from
    /// it, invalidating whatever depended on it first.
    pub fn forget_symbol(&mut self, name: &str) -> HashSet<String> {
        let affected = self.invalidate_symbol(name);
        self.table.symbols.remove(name);
        self.graph.remove_symbol(name);
        affected
    }

    /// Commits a unit of work (one REPL line, one notebook cell) that
    /// defines `symbols`, each depending on whatever free names its body
    /// referenced. Returns the set of previously valid symbols this
    /// commit invalidated.
    pub fn commit_unit(&mut self, origin: Origin, symbols: &[(String, Type, HashSet<String>)]) -> HashSet<String> {
        let mut affected = HashSet::new();
        for (name, ty, depends_on) in symbols {
            affected.extend(self.redefine_symbol(name, ty.clone(), origin.clone(), depends_on.clone()));
        }
        affected
    }

    pub fn is_symbol_valid(&self, name: &str) -> bool {
        self.table.get(name).map(|s| s.valid).unwrap_or(false)
    }

    pub fn get_origin(&self, name: &str) -> Option<&Origin> {
        self.table.get(name).map(|s| &s.origin)
    }

    pub fn get_type(&self, name: &str) -> Option<&Type> {
        self.table.get(name).map(|s| &s.ty)
    }

    pub fn get_dependencies(&self, name: &str) -> HashSet<String> {
        self.graph.dependencies(name)
    }

    pub fn get_dependents(&self, name: &str) -> HashSet<String> {
        self.graph.dependents(name)
    }

    pub fn list_symbols_all(&self) -> Vec<String> {
        self.table.list_all()
    }

    pub fn list_symbols_valid(&self) -> Vec<String> {
        self.table.list_valid()
    }

    pub fn list_symbols_invalid(&self) -> Vec<String> {
        self.table.list_invalid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn origin(id: &str) -> Origin {
        Origin::repl_step(id)
    }

    #[test]
    fn redefining_a_symbol_invalidates_its_dependents() {
        let mut session = SessionManager::new();
        session.add_symbol("a", Type::Float, origin("cell1"), deps(&[]));
        session.add_symbol("b", Type::Float, origin("cell2"), deps(&["a"]));
        assert!(session.is_symbol_valid("b"));

        let affected = session.redefine_symbol("a", Type::Bool, origin("cell1"), deps(&[]));
        assert!(affected.contains("b"));
        assert!(!session.is_symbol_valid("b"));
    }

    #[test]
    fn redefining_with_an_identical_type_and_dependency_set_is_a_no_op() {
        let mut session = SessionManager::new();
        session.add_symbol("a", Type::Float, origin("cell1"), deps(&[]));
        session.add_symbol("b", Type::Float, origin("cell2"), deps(&["a"]));

        let affected = session.redefine_symbol("a", Type::Float, origin("cell1"), deps(&[]));
        assert!(affected.is_empty());
        assert!(session.is_symbol_valid("b"));
    }

    #[test]
    fn invalidation_is_transitive() {
        let mut session = SessionManager::new();
        session.add_symbol("a", Type::Float, origin("c1"), deps(&[]));
        session.add_symbol("b", Type::Float, origin("c2"), deps(&["a"]));
        session.add_symbol("c", Type::Float, origin("c3"), deps(&["b"]));

        session.invalidate_symbol("a");
        assert!(!session.is_symbol_valid("b"));
        assert!(!session.is_symbol_valid("c"));
    }

    #[test]
    fn forgetting_a_symbol_removes_it_and_its_edges() {
        let mut session = SessionManager::new();
        session.add_symbol("a", Type::Float, origin("c1"), deps(&[]));
        session.add_symbol("b", Type::Float, origin("c2"), deps(&["a"]));
        session.forget_symbol("a");
        assert!(session.get_type("a").is_none());
        assert!(session.get_dependencies("b").contains("a")); // edge from b unaffected, only a's own edges are removed
    }

    #[test]
    fn unaffected_symbols_stay_valid_across_an_unrelated_redefinition() {
        let mut session = SessionManager::new();
        session.add_symbol("a", Type::Float, origin("c1"), deps(&[]));
        session.add_symbol("x", Type::Float, origin("c2"), deps(&[]));
        session.redefine_symbol("a", Type::Bool, origin("c1"), deps(&[]));
        assert!(session.is_symbol_valid("x"));
    }
}
