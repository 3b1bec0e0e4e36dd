//! A notebook of re-executable cells, each producing its own epoch on
//! every execution so re-running an earlier cell can invalidate the
//! cells that read what it defined.

use crate::epoch::EpochManager;
use crate::fragment::{IrBuildOptions, IrIncrementalBuilder};
use crate::jit::JitExecutionEngine;
use crate::origin::Origin;
use crate::repl::ExecutionResult;
use crate::session::SessionManager;
use nv_lexer::Lexer;
use nv_parser::Parser;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Code,
    Markdown,
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellKind::Code => write!(f, "code"),
            CellKind::Markdown => write!(f, "markdown"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub id: usize,
    pub kind: CellKind,
    pub content: String,
    pub epoch: Option<i32>,
}

/// An interactive document of cells executed against one shared, growing
/// set of symbols. Markdown cells are no-ops — `execute_cell` on one
/// always succeeds trivially, producing no IR and no epoch.
#[derive(Default)]
pub struct Notebook {
    pub title: String,
    cells: Vec<Cell>,
    epochs: EpochManager,
    builder: IrIncrementalBuilder,
    jit: JitExecutionEngine,
    session: SessionManager,
}

impl Notebook {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Default::default() }
    }

    pub fn create_cell(&mut self, kind: CellKind, content: impl Into<String>) -> usize {
        let id = self.cells.len();
        self.cells.push(Cell { id, kind, content: content.into(), epoch: None });
        id
    }

    pub fn cell(&self, cell_id: usize) -> Option<&Cell> {
        self.cells.get(cell_id)
    }

    /// Re-runs `cell_id` against the notebook's current state. A markdown
    /// cell always succeeds without touching the epoch graph. A code cell
    /// that references a symbol whose producing epoch is currently invalid
    /// fails with a diagnostic naming it, rather than silently running
    /// against stale IR.
    pub fn execute_cell(&mut self, cell_id: usize) -> ExecutionResult {
        let cell = match self.cells.get(cell_id) {
            Some(c) => c.clone(),
            None => {
                return ExecutionResult {
                    ok: false,
                    error: Some(format!("no such cell {}", cell_id)),
                    ..Default::default()
                }
            }
        };

        if cell.kind == CellKind::Markdown {
            return ExecutionResult { ok: true, ..Default::default() };
        }

        let unit_name = format!("cell:{}", cell_id);
        let (tokens, imports) = match Lexer::new(&cell.content, &unit_name).tokenize() {
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
        let invalid_deps: Vec<String> = fragment
            .used_symbols
            .iter()
            .filter(|name| !self.symbol_is_usable(name))
            .cloned()
            .collect();
        if !invalid_deps.is_empty() {
            return ExecutionResult {
                ok: false,
                error: Some(format!("invalidated symbol(s) used: {}", invalid_deps.join(", "))),
                defined_symbols: fragment.defined_symbols.iter().cloned().collect(),
                used_symbols: fragment.used_symbols.iter().cloned().collect(),
                ..Default::default()
            };
        }

        let defined_symbols: Vec<String> = fragment.defined_symbols.iter().cloned().collect();
        let used_symbols: Vec<String> = fragment.used_symbols.iter().cloned().collect();
        let depends_on: HashSet<String> = fragment.used_symbols.clone();

        let commits: Vec<(String, nv_types::Type, HashSet<String>)> = defined_symbols
            .iter()
            .filter_map(|name| build.defined_types.get(name).map(|ty| (name.clone(), ty.clone(), depends_on.clone())))
            .collect();
        self.session.commit_unit(Origin::notebook_cell(cell_id.to_string()), &commits);

        let epoch_id = self.epochs.create_epoch_for_cell(
            cell_id,
            defined_symbols.iter().cloned().collect(),
            used_symbols.iter().cloned().collect(),
        );

        let result = match self.jit.add_module(fragment_id, build.module) {
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
        };

        self.epochs.commit_epoch(epoch_id);
        self.cells[cell_id].epoch = Some(epoch_id);
        result
    }

    fn symbol_is_usable(&self, name: &str) -> bool {
        match self.epochs.producer_epoch_of(name) {
            Some(epoch_id) => self.epochs.is_epoch_valid(epoch_id),
            None => true,
        }
    }

    /// Marks `cell_id`'s current epoch and every epoch downstream of it
    /// invalid, returning the cell ids affected. Re-running a cell already
    /// does this implicitly for whatever it replaces; this is for manually
    /// flagging a cell's output as stale without re-running it.
    pub fn invalidate_dependents_of(&mut self, cell_id: usize) -> Vec<usize> {
        match self.cells.get(cell_id).and_then(|c| c.epoch) {
            Some(epoch_id) => self.epochs.invalidate_epoch(epoch_id),
            None => Vec::new(),
        }
    }

    pub fn is_cell_valid(&self, cell_id: usize) -> bool {
        match self.cells.get(cell_id).and_then(|c| c.epoch) {
            Some(epoch_id) => self.epochs.is_epoch_valid(epoch_id),
            None => true,
        }
    }

    /// Textual notebook format: a `# title` header, then one `## <id>
    /// (code|markdown) epoch=N valid=true|false` section per cell followed
    /// by its raw content.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut out = String::new();
        out.push_str(&format!("# {}\n", self.title));
        for cell in &self.cells {
            let epoch = cell.epoch.unwrap_or(-1);
            let valid = cell.epoch.map(|e| self.epochs.is_epoch_valid(e)).unwrap_or(true);
            out.push_str(&format!("## {} ({}) epoch={} valid={}\n", cell.id, cell.kind, epoch, valid));
            out.push_str(&cell.content);
            if !cell.content.ends_with('\n') {
                out.push('\n');
            }
        }
        fs::write(path, out)
    }

    /// The documented inverse of [`save_to_file`](Self::save_to_file):
    /// reconstructs cells and their recorded epoch/validity from the
    /// textual format, but does not re-execute them — the loaded notebook
    /// starts with an empty execution engine, matching how a freshly
    /// opened notebook shows prior output without having re-run any cell.
    pub fn load_from_file(path: impl AsRef<Path>) -> std::io::Result<Notebook> {
        let text = fs::read_to_string(path)?;
        let mut lines = text.lines();
        let title = lines
            .next()
            .and_then(|l| l.strip_prefix("# "))
            .unwrap_or("untitled")
            .to_string();

        let mut notebook = Notebook::new(title);
        let mut current: Option<(CellKind, Vec<String>)> = None;

        let flush = |notebook: &mut Notebook, current: Option<(CellKind, Vec<String>)>| {
            if let Some((kind, content_lines)) = current {
                notebook.create_cell(kind, content_lines.join("\n"));
            }
        };

        for line in lines {
            if let Some(rest) = line.strip_prefix("## ") {
                flush(&mut notebook, current.take());
                let kind = if rest.contains("(code)") { CellKind::Code } else { CellKind::Markdown };
                current = Some((kind, Vec::new()));
            } else if let Some((_, content_lines)) = current.as_mut() {
                content_lines.push(line.to_string());
            }
        }
        flush(&mut notebook, current.take());

        Ok(notebook)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Whether `name` still holds a valid binding according to the
    /// notebook's semantic symbol table, independent of epoch tracking.
    pub fn is_symbol_valid(&self, name: &str) -> bool {
        self.session.is_symbol_valid(name)
    }

    pub fn symbol_origin(&self, name: &str) -> Option<&Origin> {
        self.session.get_origin(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn re_executing_a_cell_invalidates_a_downstream_dependent() {
        let mut nb = Notebook::new("demo");
        let a = nb.create_cell(CellKind::Code, "lock a = 1;");
        let b = nb.create_cell(CellKind::Code, "lock b = a + 1;");
        assert!(nb.execute_cell(a).ok);
        assert!(nb.execute_cell(b).ok);

        nb.invalidate_dependents_of(a);
        assert!(!nb.is_cell_valid(b));
    }

    #[test]
    fn re_executing_a_cell_with_a_different_type_invalidates_the_session_symbol() {
        let mut nb = Notebook::new("demo");
        let a = nb.create_cell(CellKind::Code, "lock a = 1;");
        let b = nb.create_cell(CellKind::Code, "lock b = a + 1;");
        assert!(nb.execute_cell(a).ok);
        assert!(nb.execute_cell(b).ok);
        assert!(nb.is_symbol_valid("b"));
        assert_eq!(nb.symbol_origin("a").unwrap().id, a.to_string());

        nb.cells[a].content = "lock a = true;".to_string();
        assert!(nb.execute_cell(a).ok);
        assert!(!nb.is_symbol_valid("b"));
    }

    #[test]
    fn markdown_cells_always_succeed_and_do_not_affect_epochs() {
        let mut nb = Notebook::new("demo");
        let m = nb.create_cell(CellKind::Markdown, "# notes");
        let result = nb.execute_cell(m);
        assert!(result.ok);
        assert!(nb.cell(m).unwrap().epoch.is_none());
    }

    #[test]
    fn save_then_load_round_trips_titles_and_cell_bodies() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nb.txt");

        let mut nb = Notebook::new("my notebook");
        nb.create_cell(CellKind::Code, "lock a = 1;");
        nb.create_cell(CellKind::Markdown, "notes here");
        nb.execute_cell(0);
        nb.save_to_file(&path).unwrap();

        let loaded = Notebook::load_from_file(&path).unwrap();
        assert_eq!(loaded.title, "my notebook");
        assert_eq!(loaded.cells().len(), 2);
        assert_eq!(loaded.cells()[0].content, "lock a = 1;");
        assert_eq!(loaded.cells()[1].kind, CellKind::Markdown);
    }
}
