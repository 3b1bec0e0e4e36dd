//! No library surface of its own — this crate exists to host `tests/`
//! integration tests that exercise the full lexer → parser → checker →
//! IR pipeline across crate boundaries.
