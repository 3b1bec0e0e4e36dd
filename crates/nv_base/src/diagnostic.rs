//! User-facing diagnostics with source-line context.
//!
//! A [`Diagnostic`] is the unit every subsystem (lexer, parser, checker,
//! module manager, IR lowering) reports through. Rendering is separated
//! from detection: `Diagnostic::render` reads the offending line out of the
//! original source text on demand and underlines the faulting columns,
//! matching the parser's error-context format described in spec §4.2.

use crate::position::Position;
use std::fmt;

/// Severity of a reported diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

/// A single diagnostic: what went wrong, where, and in which file.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub file: String,
    pub position: Position,
    pub message: String,
}

impl Diagnostic {
    pub fn error(file: impl Into<String>, position: Position, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            file: file.into(),
            position,
            message: message.into(),
        }
    }

    pub fn warning(file: impl Into<String>, position: Position, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            file: file.into(),
            position,
            message: message.into(),
        }
    }

    /// The dedup key used by the checker/module manager to avoid reporting
    /// the same diagnostic twice: `file:line:col:message`.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.file, self.position.line, self.position.col_start, self.message
        )
    }

    /// Renders `file:line:col, SEVERITY, message` followed by the offending
    /// source line with `[col_start, col_end)` underlined with carets.
    pub fn render(&self, source: &str) -> String {
        let mut out = format!(
            "{}:{}:{}: {}: {}\n",
            self.file, self.position.line, self.position.col_start, self.severity, self.message
        );
        if let Some(line_text) = source.lines().nth(self.position.line.saturating_sub(1)) {
            out.push_str(line_text);
            out.push('\n');
            let start = self.position.col_start.saturating_sub(1);
            let width = self
                .position
                .col_end
                .saturating_sub(self.position.col_start)
                .max(1);
            out.push_str(&" ".repeat(start));
            out.push_str(&"^".repeat(width));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file, self.position.line, self.position.col_start, self.severity, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_underlines_the_faulting_columns() {
        let source = "x: int = 1 +;\n";
        let diag = Diagnostic::error("main.nv", Position::new(1, 13, 14, 12, 13), "unexpected token ';'");
        let rendered = diag.render(source);
        assert!(rendered.contains("main.nv:1:13"));
        assert!(rendered.contains("x: int = 1 +;"));
        assert!(rendered.ends_with('^'));
    }

    #[test]
    fn dedup_key_distinguishes_by_position_and_message() {
        let a = Diagnostic::error("a.nv", Position::new(1, 1, 2, 0, 1), "m");
        let b = Diagnostic::error("a.nv", Position::new(2, 1, 2, 0, 1), "m");
        assert_ne!(a.dedup_key(), b.dedup_key());
    }
}
