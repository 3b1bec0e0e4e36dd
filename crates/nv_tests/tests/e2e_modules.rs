//! End-to-end tests for cross-file module resolution via `nv_modules`.

use nv_modules::ModuleManager;
use std::fs;
use tempfile::tempdir;

#[test]
fn a_program_split_across_two_files_type_checks_as_one_unit() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("math.rv"),
        "def double(n: Int) -> Int { return n * 2; }\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("main.rv"),
        "from \"math\" import double;\ndouble(21);\n",
    )
    .unwrap();

    let mut manager = ModuleManager::new();
    manager.load(&dir.path().join("main.rv")).expect("load");
    let checked = manager.check_all().expect("check");
    assert_eq!(checked.len(), 2);
}

#[test]
fn a_cyclic_import_is_rejected_with_a_diagnostic() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.rv"), "from \"b\" import thing;\n").unwrap();
    fs::write(dir.path().join("b.rv"), "from \"a\" import thing;\n").unwrap();

    let mut manager = ModuleManager::new();
    let result = manager.load(&dir.path().join("a.rv"));
    assert!(result.is_err());
    assert!(result.unwrap_err().message.contains("cycle"));
}
