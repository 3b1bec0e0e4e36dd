//! Command-line argument parsing and dispatch for `narval`.
//!
//! Built on [`clap`] with derive macros. There is no project manifest or
//! package registry here — every subcommand operates directly on a
//! source file path.

use clap::{Parser, Subcommand};
use nv_check::{check_program, Namespace};
use nv_ir::{lower_program, Engine};
use nv_lexer::Lexer;
use nv_modules::ModuleManager;
use nv_parser::Parser as NvParser;
use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

/// Command-line interface for the narval compiler and interactive shell.
#[derive(Parser)]
#[command(name = "narval")]
#[command(about = "Compiler and interactive environment for narval", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Type-check a source file and every module it imports, without
    /// running it.
    Check {
        /// Path to the entry source file.
        path: PathBuf,
    },

    /// Type-check and evaluate a source file via the tree-walking engine.
    ///
    /// This is the "interpret" path — there is no object-file emission in
    /// this build, so `run` always interprets rather than AOT-compiling.
    Run {
        /// Path to the entry source file.
        path: PathBuf,
    },

    /// Start an interactive read-eval-print session.
    Repl,

    /// Execute a saved notebook file non-interactively, cell by cell, and
    /// print each cell's output.
    Notebook {
        /// Path to a notebook file in the textual save format.
        path: PathBuf,
    },
}

pub fn run_cli() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Check { path } => cmd_check(&path),
        Commands::Run { path } => cmd_run(&path),
        Commands::Repl => cmd_repl(),
        Commands::Notebook { path } => cmd_notebook(&path),
    }
}

fn cmd_check(path: &PathBuf) -> Result<(), Box<dyn Error>> {
    let mut manager = ModuleManager::new();
    manager.load(path)?;
    manager.check_all().map_err(|e| e.to_string())?;
    println!("check passed: {}", path.display());
    Ok(())
}

fn cmd_run(path: &PathBuf) -> Result<(), Box<dyn Error>> {
    let source = fs::read_to_string(path)?;
    let filename = path.display().to_string();
    let (tokens, imports) = Lexer::new(&source, filename.clone()).tokenize()?;
    let program = NvParser::parse_program(tokens, imports)?;
    let checked = check_program(program, Namespace::new()).map_err(|e| e.to_string())?;
    let module = lower_program(&checked);
    let mut engine = Engine::new();
    if let Some(value) = engine.add_module(&module)? {
        println!("{}", value);
    }
    Ok(())
}

fn cmd_repl() -> Result<(), Box<dyn Error>> {
    println!("narval interactive session. Ctrl-D to exit.");
    let mut repl = nv_interactive::Repl::new();
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            println!();
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let result = repl.execute_line(line);
        if let Some(output) = result.output {
            println!("{}", output);
        }
        if let Some(error) = result.error {
            eprintln!("error: {}", error);
        }
    }
    Ok(())
}

fn cmd_notebook(path: &PathBuf) -> Result<(), Box<dyn Error>> {
    let mut notebook = nv_interactive::Notebook::load_from_file(path)?;
    let cell_ids: Vec<usize> = notebook.cells().iter().map(|c| c.id).collect();
    for id in cell_ids {
        let result = notebook.execute_cell(id);
        if let Some(output) = &result.output {
            println!("[{}] {}", id, output);
        }
        if let Some(error) = &result.error {
            eprintln!("[{}] error: {}", id, error);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn check_succeeds_on_a_well_typed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("main.rv");
        fs::write(&path, "lock x = 1 + 2;").unwrap();
        assert!(cmd_check(&path).is_ok());
    }

    #[test]
    fn check_fails_on_a_type_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("main.rv");
        fs::write(&path, "lock x: Bool = 1 + 2;").unwrap();
        assert!(cmd_check(&path).is_err());
    }

    #[test]
    fn run_evaluates_and_prints_a_trailing_expression() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("main.rv");
        fs::write(&path, "1 + 2;").unwrap();
        assert!(cmd_run(&path).is_ok());
    }
}
