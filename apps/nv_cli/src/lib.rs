//! `narval` command-line driver: AOT-style `check`/`run` subcommands plus
//! the `repl` and `notebook` interactive front ends.

pub mod cli;

pub use cli::run_cli;
