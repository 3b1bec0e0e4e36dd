//! Error types with source location tracking.
//!
//! Every error produced below the CLI boundary carries a [`Position`] so
//! the front-end can point at the exact source location.

use crate::position::Position;
use std::fmt;

/// An error annotated with the source location it was detected at.
#[derive(Debug, Clone)]
pub struct SpannedError {
    pub message: String,
    pub position: Position,
}

impl SpannedError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for SpannedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.position)
    }
}

impl std::error::Error for SpannedError {}

/// Alias for `std::result::Result<T, SpannedError>`.
pub type Result<T> = std::result::Result<T, SpannedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spanned_error_display_includes_position() {
        let err = SpannedError::new("unterminated string", Position::new(4, 1, 1, 30, 30));
        let shown = err.to_string();
        assert!(shown.contains("unterminated string"));
        assert!(shown.contains("4:1"));
    }
}
