//! # nv_modules
//!
//! Loads a narval source file and every file it (transitively) imports,
//! lexing, parsing, and type-checking each one in dependency order, and
//! detecting import cycles along the way.
//!
//! A module's on-disk path is `{base_directory}/{module_path}.rv`, where
//! `module_path` is the string literal written after `from` in an import
//! statement (e.g. `from "math" import sqrt;` loads `math.rv` next to the
//! importing file).

use nv_ast::Program;
use nv_base::{Position, Result, SpannedError};
use nv_check::{check_program, CheckedProgram, Namespace};
use nv_lexer::Lexer;
use nv_parser::Parser;
use nv_types::{Type, TypeScheme};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// One loaded, parsed compilation unit.
#[derive(Debug)]
pub struct Module {
    pub name: String,
    pub path: PathBuf,
    pub source: String,
    pub dependencies: Vec<String>,
    pub program: Program,
}

/// Loads, parses, and orders narval modules by dependency.
///
/// Mirrors the load→resolve→combine pipeline of a conventional module
/// system: each file is read and parsed exactly once (`canonical_names`
/// caches by absolute path), cycles are rejected with the import chain
/// that produced them, and the final combined AST lists modules in an
/// order where every dependency precedes its dependents.
pub struct ModuleManager {
    modules: HashMap<String, Module>,
    canonical_names: HashMap<PathBuf, String>,
    order: Vec<String>,
}

impl Default for ModuleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleManager {
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
            canonical_names: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn modules(&self) -> &HashMap<String, Module> {
        &self.modules
    }

    /// The combined AST across every loaded module, each module's
    /// statements in turn, ordered so dependencies precede dependents.
    pub fn combined_statements(&self) -> Vec<&nv_ast::Stmt> {
        self.order
            .iter()
            .flat_map(|name| self.modules[name].program.statements.iter())
            .collect()
    }

    /// Loads `entry_path` and everything it transitively imports.
    pub fn load(&mut self, entry_path: impl AsRef<Path>) -> Result<()> {
        let mut visiting = HashSet::new();
        self.load_module(entry_path.as_ref(), &mut visiting, Position::start_of_file())
            .map(|_| ())
    }

    fn load_module(&mut self, path: &Path, visiting: &mut HashSet<PathBuf>, position: Position) -> Result<String> {
        let canonical = canonicalize(path);
        if let Some(name) = self.canonical_names.get(&canonical) {
            return Ok(name.clone());
        }
        if visiting.contains(&canonical) {
            return Err(SpannedError::new(
                format!("import cycle detected at '{}'", path.display()),
                position,
            ));
        }
        visiting.insert(canonical.clone());

        let source = std::fs::read_to_string(path).map_err(|e| {
            SpannedError::new(format!("cannot read module '{}': {}", path.display(), e), position)
        })?;
        let name = module_name(path);
        let filename = path.display().to_string();
        let (tokens, imports) = Lexer::new(&source, filename.clone())
            .tokenize()
            .map_err(|e| SpannedError::new(format!("in {}: {}", filename, e.message), e.position))?;
        let program = Parser::parse_program(tokens, imports.clone())
            .map_err(|e| SpannedError::new(format!("in {}: {}", filename, e.message), e.position))?;

        let directory = path.parent().unwrap_or_else(|| Path::new("."));
        let mut dependencies = Vec::new();
        for import in &imports {
            let dep_path = directory.join(format!("{}.rv", import.module_path));
            let dep_name = self.load_module(&dep_path, visiting, import.position)?;
            dependencies.push(dep_name);
        }

        visiting.remove(&canonical);
        self.canonical_names.insert(canonical, name.clone());
        self.modules.insert(
            name.clone(),
            Module {
                name: name.clone(),
                path: path.to_path_buf(),
                source,
                dependencies,
                program,
            },
        );
        self.order.push(name.clone());
        Ok(name)
    }

    /// Type-checks every loaded module in dependency order, threading each
    /// module's top-level `def` signatures into its dependents' namespace
    /// so imported functions type-check like locally defined ones.
    pub fn check_all(&self) -> std::result::Result<HashMap<String, CheckedProgram>, nv_types::TypeError> {
        let mut checked = HashMap::new();
        let mut exported: HashMap<String, HashMap<String, Type>> = HashMap::new();

        for name in &self.order {
            let module = &self.modules[name];
            let mut namespace = Namespace::new();
            for dep in &module.dependencies {
                if let Some(functions) = exported.get(dep) {
                    for (fn_name, ty) in functions {
                        namespace.insert(fn_name.clone(), TypeScheme::monomorphic(ty.clone()));
                    }
                }
            }
            let result = check_program(module.program.clone(), namespace)?;
            exported.insert(name.clone(), result.function_types.clone());
            checked.insert(name.clone(), result);
        }
        Ok(checked)
    }
}

fn canonicalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn module_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_module(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(format!("{}.rv", name));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_a_single_module_with_no_imports() {
        let dir = tempdir().unwrap();
        let entry = write_module(dir.path(), "main", "lock x = 1;");
        let mut manager = ModuleManager::new();
        manager.load(&entry).unwrap();
        assert_eq!(manager.modules().len(), 1);
    }

    #[test]
    fn resolves_a_single_level_dependency() {
        let dir = tempdir().unwrap();
        write_module(dir.path(), "math", "def square(n: Int) -> Int { return n * n; }");
        let entry = write_module(
            dir.path(),
            "main",
            "from \"math\" import square; lock x = square(3);",
        );
        let mut manager = ModuleManager::new();
        manager.load(&entry).unwrap();
        assert_eq!(manager.modules().len(), 2);
        let checked = manager.check_all().unwrap();
        assert_eq!(checked["main"].binding_types["x"], Type::Float);
    }

    #[test]
    fn detects_a_direct_import_cycle() {
        let dir = tempdir().unwrap();
        write_module(dir.path(), "a", "from \"b\" import nothing_real;");
        write_module(dir.path(), "b", "from \"a\" import nothing_real;");
        let entry = dir.path().join("a.rv");
        let mut manager = ModuleManager::new();
        let err = manager.load(&entry).unwrap_err();
        assert!(err.message.contains("cycle"));
    }

    #[test]
    fn a_module_imported_twice_is_loaded_once() {
        let dir = tempdir().unwrap();
        write_module(dir.path(), "shared", "lock s = 1;");
        write_module(dir.path(), "left", "from \"shared\" import s;");
        let entry = write_module(
            dir.path(),
            "main",
            "from \"shared\" import s; from \"left\" import s;",
        );
        let mut manager = ModuleManager::new();
        manager.load(&entry).unwrap();
        assert_eq!(manager.modules().len(), 3);
    }
}
