//! # nv_base
//!
//! Pure structural atoms shared by every stage of the narval pipeline:
//! source positions, spanned errors, and rendered diagnostics.
//!
//! This crate has no knowledge of tokens, the AST, or types — it provides
//! only the generic, reusable infrastructure that the lexer, parser,
//! checker, module manager, and IR lowering build on top of.

pub mod diagnostic;
pub mod error;
pub mod position;

pub use diagnostic::{Diagnostic, Severity};
pub use error::{Result, SpannedError};
pub use position::Position;
