//! # nv_lexer
//!
//! Converts narval source text into a token stream, plus a side channel of
//! structured `from ... import ...;` records consumed later by the module
//! manager. The lexer never fails to terminate: on unrecognized input it
//! emits [`token::TokenKind::Unknown`] rather than aborting, leaving the
//! parser to report a syntax error with full context. Malformed literals
//! (unterminated strings, ill-formed numbers) are the only lexical errors.

pub mod import_info;
pub mod lexer;
pub mod token;

pub use import_info::{ImportInfo, ImportedItem};
pub use lexer::Lexer;
pub use token::{keyword_kind, Token, TokenKind};

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (tokens, _) = Lexer::new(src, "test.rv").tokenize().unwrap();
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn skips_whitespace_and_comments() {
        assert_eq!(
            kinds("  # a comment\n  true  "),
            vec![TokenKind::True, TokenKind::Eof]
        );
    }

    #[test]
    fn keywords_take_priority_over_identifiers() {
        assert_eq!(kinds("if else loop"), vec![TokenKind::If, TokenKind::Else, TokenKind::Loop, TokenKind::Eof]);
    }

    #[test]
    fn underscore_is_a_plain_identifier() {
        let (tokens, _) = Lexer::new("_", "test.rv").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].lexeme, "_");
    }

    #[test]
    fn integer_bases_are_lexed_as_single_number_tokens() {
        for src in ["0b10", "0o17", "0xFF"] {
            let (tokens, _) = Lexer::new(src, "test.rv").tokenize().unwrap();
            assert_eq!(tokens[0].kind, TokenKind::Number);
            assert_eq!(tokens[0].lexeme, src);
        }
    }

    #[test]
    fn scientific_notation_is_one_token() {
        let (tokens, _) = Lexer::new("1e2", "test.rv").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].lexeme, "1e2");
    }

    #[test]
    fn leading_minus_is_never_part_of_a_number() {
        let (tokens, _) = Lexer::new("-1", "test.rv").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Minus);
        assert_eq!(tokens[1].kind, TokenKind::Number);
        assert_eq!(tokens[1].lexeme, "1");
    }

    #[test]
    fn string_literal_decodes_escapes() {
        let (tokens, _) = Lexer::new(r#""a\nb""#, "test.rv").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, "a\nb");
    }

    #[test]
    fn unterminated_string_is_a_lexical_error() {
        let result = Lexer::new("\"abc", "test.rv").tokenize();
        assert!(result.is_err());
    }

    #[test]
    fn newline_inside_string_is_a_lexical_error() {
        let result = Lexer::new("\"abc\ndef\"", "test.rv").tokenize();
        assert!(result.is_err());
    }

    #[test]
    fn longest_match_operators_win() {
        assert_eq!(
            kinds("...=..=... =="),
            vec![
                TokenKind::Ellipsis,
                TokenKind::Assign,
                TokenKind::RangeInclusive,
                TokenKind::Ellipsis,
                TokenKind::Eq,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn compound_assignment_operators() {
        assert_eq!(
            kinds("+= -= *= /= //= **= %="),
            vec![
                TokenKind::PlusAssign,
                TokenKind::MinusAssign,
                TokenKind::StarAssign,
                TokenKind::SlashAssign,
                TokenKind::SlashSlashAssign,
                TokenKind::PowerAssign,
                TokenKind::PercentAssign,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn import_statement_emits_single_token_and_import_info() {
        let src = r#"from "math" import sqrt, pow as power;"#;
        let (tokens, imports) = Lexer::new(src, "test.rv").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Import);
        assert_eq!(tokens[1].kind, TokenKind::Eof);
        assert_eq!(imports.len(), 1);
        let info = &imports[0];
        assert_eq!(info.module_path, "math");
        assert_eq!(info.items.len(), 2);
        assert_eq!(info.items[0].name, "sqrt");
        assert_eq!(info.items[0].bound_name(), "sqrt");
        assert_eq!(info.items[1].name, "pow");
        assert_eq!(info.items[1].alias.as_deref(), Some("power"));
        assert_eq!(info.items[1].bound_name(), "power");
    }

    #[test]
    fn every_input_byte_produces_some_token_or_trivia() {
        // Lexer totality: no input panics or gets silently dropped, and
        // unrecognized characters surface as Unknown rather than erroring.
        let src = "@ $ ` ~";
        let (tokens, _) = Lexer::new(src, "test.rv").tokenize().unwrap();
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Unknown || t.kind == TokenKind::Eof));
    }

    #[test]
    fn unknown_ampersand_and_pipe_require_doubling() {
        assert_eq!(kinds("& |"), vec![TokenKind::Unknown, TokenKind::Unknown, TokenKind::Eof]);
        assert_eq!(kinds("&& ||"), vec![TokenKind::And, TokenKind::Or, TokenKind::Eof]);
    }

    #[test]
    fn arrow_and_fat_arrow() {
        assert_eq!(kinds("-> =>"), vec![TokenKind::Arrow, TokenKind::FatArrow, TokenKind::Eof]);
    }

    #[test]
    fn increment_decrement() {
        assert_eq!(kinds("++ --"), vec![TokenKind::Increment, TokenKind::Decrement, TokenKind::Eof]);
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let (tokens, _) = Lexer::new("true\n  false", "test.rv").tokenize().unwrap();
        assert_eq!(tokens[0].position.line, 1);
        assert_eq!(tokens[0].position.col_start, 1);
        assert_eq!(tokens[1].position.line, 2);
        assert_eq!(tokens[1].position.col_start, 3);
    }
}
