//! End-to-end tests for the REPL and notebook front ends, matching the
//! invalidation scenarios a real session would hit.

use nv_interactive::{CellKind, Notebook, Repl};

#[test]
fn repl_session_carries_bindings_across_lines() {
    let mut repl = Repl::new();
    assert!(repl.execute_line("lock a = 2;").ok);
    assert!(repl.execute_line("lock b = a * 10;").ok);
    let result = repl.execute_line("b + 1;");
    assert!(result.ok);
    assert_eq!(result.output.as_deref(), Some("21"));
}

#[test]
fn notebook_reexecution_invalidates_downstream_cells_until_rerun() {
    let mut notebook = Notebook::new("demo");
    let a = notebook.create_cell(CellKind::Code, "lock a = 1;");
    let b = notebook.create_cell(CellKind::Code, "lock b = a + 1;");
    let c = notebook.create_cell(CellKind::Code, "b + 1;");

    assert!(notebook.execute_cell(a).ok);
    assert!(notebook.execute_cell(b).ok);
    let c_result = notebook.execute_cell(c);
    assert!(c_result.ok);
    assert_eq!(c_result.output.as_deref(), Some("3"));

    // Re-running `a` invalidates `b` and `c`'s dependency on it.
    assert!(notebook.execute_cell(a).ok);
    assert!(!notebook.is_cell_valid(b));

    // Re-running `b` brings it current again.
    assert!(notebook.execute_cell(b).ok);
    assert!(notebook.is_cell_valid(b));
}

#[test]
fn notebook_round_trips_through_its_textual_save_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nb.txt");

    let mut notebook = Notebook::new("roundtrip");
    notebook.create_cell(CellKind::Code, "lock x = 1;");
    notebook.create_cell(CellKind::Markdown, "# a heading");
    notebook.execute_cell(0);

    notebook.save_to_file(&path).unwrap();
    let loaded = Notebook::load_from_file(&path).unwrap();
    assert_eq!(loaded.title, "roundtrip");
    assert_eq!(loaded.cells().len(), 2);
}
