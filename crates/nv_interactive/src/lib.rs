//! # nv_interactive
//!
//! The incremental core behind narval's REPL and notebook: a semantic
//! symbol table with dependency-driven invalidation ([`session`]), the
//! per-fragment IR builder that reuses the lexer/parser/checker/lowering
//! pipeline one unit at a time ([`fragment`]), cell-level epoch tracking
//! for notebooks ([`epoch`]), the embedded execution engine both front
//! ends run against ([`jit`]), and the two front ends themselves
//! ([`repl`], [`notebook`]).

pub mod deps;
pub mod epoch;
pub mod fragment;
pub mod jit;
pub mod notebook;
pub mod origin;
pub mod repl;
pub mod session;

pub use epoch::{Epoch, EpochManager};
pub use fragment::{IrBuildOptions, IrBuildResult, IrFragment, IrIncrementalBuilder, IrInvalidateResult};
pub use jit::JitExecutionEngine;
pub use notebook::{Cell, CellKind, Notebook};
pub use origin::{Origin, OriginKind};
pub use repl::{ExecutionResult, Repl};
pub use session::{DependencyGraph, SessionManager, SessionSymbol};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_repl_session_and_a_notebook_can_both_build_on_the_same_crate_surface() {
        let mut repl = Repl::new();
        assert!(repl.execute_line("lock x = 41;").ok);
        assert_eq!(repl.execute_line("x + 1;").output.as_deref(), Some("42"));

        let mut notebook = Notebook::new("scratch");
        let cell = notebook.create_cell(CellKind::Code, "lock y = 10;");
        assert!(notebook.execute_cell(cell).ok);
    }
}
