//! Structured recording of `from "path" import ...` statements.
//!
//! The lexer recognizes the whole `from "path" import a [as b], ...;` form
//! as a single [`TokenKind::Import`](crate::token::TokenKind) token and, at
//! the same time, records an [`ImportInfo`] with per-item positions so
//! later diagnostics (e.g. "symbol not found in module") can point at the
//! exact item or alias the user wrote.

use nv_base::Position;

/// One `name [as alias]` entry inside an import statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedItem {
    pub name: String,
    pub alias: Option<String>,
    pub line: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl ImportedItem {
    /// The name this item is bound under in the importing scope.
    pub fn bound_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// One `from "path" import ...;` statement, recorded alongside the token
/// stream so diagnostics never need to re-lex import syntax.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportInfo {
    pub module_path: String,
    pub items: Vec<ImportedItem>,
    pub position: Position,
}
