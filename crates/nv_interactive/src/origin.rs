//! Where a symbol came from: a REPL line or a notebook cell. Carried on
//! every [`crate::session::SessionSymbol`] so diagnostics and `:symbols`
//! style introspection can point back at the fragment that defined a name.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginKind {
    ReplStep,
    NotebookCell,
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginKind::ReplStep => write!(f, "repl"),
            OriginKind::NotebookCell => write!(f, "notebook_cell"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub kind: OriginKind,
    pub id: String,
}

impl Origin {
    pub fn repl_step(id: impl Into<String>) -> Self {
        Self { kind: OriginKind::ReplStep, id: id.into() }
    }

    pub fn notebook_cell(id: impl Into<String>) -> Self {
        Self { kind: OriginKind::NotebookCell, id: id.into() }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
