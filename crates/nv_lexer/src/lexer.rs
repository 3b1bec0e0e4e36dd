//! Hand-written scanner for narval source text.
//!
//! `Lexer::tokenize` turns a UTF-8 source string into a token stream plus a
//! side list of [`ImportInfo`] records (one per `from "path" import ...;`
//! statement). See spec §4.1 for the scanning decision order this mirrors.

use crate::import_info::{ImportInfo, ImportedItem};
use crate::token::{keyword_kind, Token, TokenKind};
use nv_base::{Position, Result, SpannedError};

/// Scans a source string into tokens and import records.
pub struct Lexer<'a> {
    source: &'a [u8],
    chars: Vec<char>,
    filename: String,
    pos: usize, // index into `chars`
    byte: usize,
    line: usize,
    col: usize,
    imports: Vec<ImportInfo>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, filename: impl Into<String>) -> Self {
        Self {
            source: source.as_bytes(),
            chars: source.chars().collect(),
            filename: filename.into(),
            pos: 0,
            byte: 0,
            line: 1,
            col: 1,
            imports: Vec::new(),
        }
    }

    /// Runs the scanner to completion, returning the token stream (always
    /// terminated by `Eof`) and the import records gathered along the way.
    pub fn tokenize(mut self) -> Result<(Vec<Token>, Vec<ImportInfo>)> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            if self.is_at_end() {
                tokens.push(Token::new(TokenKind::Eof, "", self.here()));
                break;
            }
            tokens.push(self.next_token()?);
        }
        Ok((tokens, self.imports))
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> char {
        *self.chars.get(self.pos).unwrap_or(&'\0')
    }

    fn peek_at(&self, offset: usize) -> char {
        *self.chars.get(self.pos + offset).unwrap_or(&'\0')
    }

    fn here(&self) -> Position {
        Position::new(self.line, self.col, self.col, self.byte, self.byte)
    }

    fn advance(&mut self) -> char {
        let c = self.peek();
        self.pos += 1;
        self.byte += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        c
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '#' => {
                    while !self.is_at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> SpannedError {
        SpannedError::new(message, self.here())
    }

    fn next_token(&mut self) -> Result<Token> {
        let c = self.peek();
        if c == '\'' || c == '"' {
            return self.scan_string();
        }
        if c.is_ascii_digit() {
            return self.scan_number();
        }
        if c.is_alphabetic() || c == '_' {
            return self.scan_identifier_or_import();
        }
        self.scan_operator()
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    fn scan_string(&mut self) -> Result<Token> {
        let start = self.here();
        let quote = self.advance();
        let mut value = String::new();
        loop {
            if self.is_at_end() {
                return Err(self.error("unterminated string literal"));
            }
            let c = self.peek();
            if c == '\n' {
                return Err(self.error("newline inside string literal"));
            }
            if c == quote {
                self.advance();
                break;
            }
            if c == '\\' {
                self.advance();
                let escaped = self.peek();
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '\\' => value.push('\\'),
                    '\'' => value.push('\''),
                    '"' => value.push('"'),
                    _ => {
                        value.push('\\');
                        value.push(escaped);
                    }
                }
                self.advance();
                continue;
            }
            value.push(c);
            self.advance();
        }
        let end = self.here();
        Ok(Token::new(
            TokenKind::String,
            value,
            Position::new(start.line, start.col_start, end.col_start, start.byte_start, end.byte_start),
        ))
    }

    // ------------------------------------------------------------------
    // Numbers
    // ------------------------------------------------------------------

    fn scan_number(&mut self) -> Result<Token> {
        let start = self.here();
        let mut lexeme = String::new();

        if self.peek() == '0' && matches!(self.peek_at(1), 'b' | 'o' | 'x') {
            let base_char = self.peek_at(1);
            lexeme.push(self.advance()); // '0'
            lexeme.push(self.advance()); // base marker
            let valid_digit: fn(char) -> bool = match base_char {
                'b' => |c: char| c == '0' || c == '1',
                'o' => |c: char| ('0'..='7').contains(&c),
                _ => |c: char| c.is_ascii_hexdigit(),
            };
            let mut saw_digit = false;
            while valid_digit(self.peek()) {
                lexeme.push(self.advance());
                saw_digit = true;
            }
            if !saw_digit || self.peek().is_alphanumeric() {
                return Err(self.error(format!("malformed {} literal", match base_char {
                    'b' => "binary",
                    'o' => "octal",
                    _ => "hex",
                })));
            }
            let end = self.here();
            return Ok(Token::new(
                TokenKind::Number,
                lexeme,
                Position::new(start.line, start.col_start, end.col_start, start.byte_start, end.byte_start),
            ));
        }

        while self.peek().is_ascii_digit() {
            lexeme.push(self.advance());
        }
        if self.peek() == '.' && self.peek_at(1).is_ascii_digit() {
            lexeme.push(self.advance());
            while self.peek().is_ascii_digit() {
                lexeme.push(self.advance());
            }
        }
        if matches!(self.peek(), 'e' | 'E') {
            let mark = (self.pos, self.byte, self.line, self.col);
            let mut exp = String::new();
            exp.push(self.advance());
            if matches!(self.peek(), '+' | '-') {
                exp.push(self.advance());
            }
            let mut saw_digit = false;
            while self.peek().is_ascii_digit() {
                exp.push(self.advance());
                saw_digit = true;
            }
            if !saw_digit {
                // Not a valid exponent; rewind — the 'e' belongs to whatever
                // follows (e.g. a trailing identifier), which the caller
                // will tokenize next.
                self.pos = mark.0;
                self.byte = mark.1;
                self.line = mark.2;
                self.col = mark.3;
            } else {
                lexeme.push_str(&exp);
            }
        }
        if self.peek().is_alphabetic() {
            return Err(self.error("malformed numeric literal"));
        }
        let end = self.here();
        Ok(Token::new(
            TokenKind::Number,
            lexeme,
            Position::new(start.line, start.col_start, end.col_start, start.byte_start, end.byte_start),
        ))
    }

    // ------------------------------------------------------------------
    // Identifiers, keywords, and the `from ... import ...;` form
    // ------------------------------------------------------------------

    fn scan_word(&mut self) -> (String, Position) {
        let start = self.here();
        let mut word = String::new();
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            word.push(self.advance());
        }
        let end = self.here();
        (
            word,
            Position::new(start.line, start.col_start, end.col_start, start.byte_start, end.byte_start),
        )
    }

    fn scan_identifier_or_import(&mut self) -> Result<Token> {
        let (word, position) = self.scan_word();
        if word == "from" {
            return self.scan_import_statement(position);
        }
        if let Some(kind) = keyword_kind(&word) {
            return Ok(Token::new(kind, word, position));
        }
        Ok(Token::new(TokenKind::Identifier, word, position))
    }

    /// Consumes `"path" import name [as alias] {, name [as alias]} ;`
    /// after the leading `from` keyword has already been scanned, emitting
    /// one summarizing `Import` token and recording an [`ImportInfo`].
    fn scan_import_statement(&mut self, from_position: Position) -> Result<Token> {
        self.skip_trivia();
        if self.peek() != '"' && self.peek() != '\'' {
            return Err(self.error("expected a module path string after 'from'"));
        }
        let path_tok = self.scan_string()?;
        let module_path = path_tok.lexeme.clone();

        self.skip_trivia();
        let (import_word, _) = self.scan_word();
        if import_word != "import" {
            return Err(self.error("expected 'import' after module path"));
        }

        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if !(self.peek().is_alphabetic() || self.peek() == '_') {
                return Err(self.error("expected an imported item name"));
            }
            let (name, name_pos) = self.scan_word();
            let mut col_start = name_pos.col_start;
            let mut col_end = name_pos.col_end;
            let mut alias = None;

            self.skip_trivia();
            if self.peek().is_alphabetic() {
                let save = (self.pos, self.byte, self.line, self.col);
                let (maybe_as, _) = self.scan_word();
                if maybe_as == "as" {
                    self.skip_trivia();
                    let (alias_name, alias_pos) = self.scan_word();
                    alias = Some(alias_name);
                    col_start = alias_pos.col_start;
                    col_end = alias_pos.col_end;
                } else {
                    self.pos = save.0;
                    self.byte = save.1;
                    self.line = save.2;
                    self.col = save.3;
                }
            }

            items.push(ImportedItem {
                name,
                alias,
                line: name_pos.line,
                col_start,
                col_end,
            });

            self.skip_trivia();
            if self.peek() == ',' {
                self.advance();
                continue;
            }
            break;
        }

        self.skip_trivia();
        if self.peek() != ';' {
            return Err(self.error("expected ';' to terminate import statement"));
        }
        let semi_pos = self.here();
        self.advance();

        let whole = Position::new(
            from_position.line,
            from_position.col_start,
            semi_pos.col_end,
            from_position.byte_start,
            semi_pos.byte_end,
        );
        let lexeme = format!(
            "from {} import {}",
            module_path,
            items
                .iter()
                .map(|i| match &i.alias {
                    Some(a) => format!("{} as {}", i.name, a),
                    None => i.name.clone(),
                })
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.imports.push(ImportInfo {
            module_path,
            items,
            position: whole,
        });
        Ok(Token::new(TokenKind::Import, lexeme, whole))
    }

    // ------------------------------------------------------------------
    // Operators and punctuation
    // ------------------------------------------------------------------

    fn scan_operator(&mut self) -> Result<Token> {
        let start = self.here();
        let c = self.advance();
        macro_rules! two {
            ($second:expr, $kind2:expr, $kind1:expr) => {{
                if self.peek() == $second {
                    self.advance();
                    $kind2
                } else {
                    $kind1
                }
            }};
        }
        let kind = match c {
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            '(' => TokenKind::OParen,
            ')' => TokenKind::CParen,
            '{' => TokenKind::OBrace,
            '}' => TokenKind::CBrace,
            '[' => TokenKind::OBracket,
            ']' => TokenKind::CBracket,
            '.' => {
                if self.peek() == '.' {
                    self.advance();
                    if self.peek() == '.' {
                        self.advance();
                        TokenKind::Ellipsis
                    } else if self.peek() == '=' {
                        self.advance();
                        TokenKind::RangeInclusive
                    } else {
                        TokenKind::Range
                    }
                } else {
                    TokenKind::Dot
                }
            }
            '+' => {
                if self.peek() == '+' {
                    self.advance();
                    TokenKind::Increment
                } else {
                    two!('=', TokenKind::PlusAssign, TokenKind::Plus)
                }
            }
            '-' => {
                if self.peek() == '-' {
                    self.advance();
                    TokenKind::Decrement
                } else if self.peek() == '>' {
                    self.advance();
                    TokenKind::Arrow
                } else {
                    two!('=', TokenKind::MinusAssign, TokenKind::Minus)
                }
            }
            '*' => {
                if self.peek() == '*' {
                    self.advance();
                    two!('=', TokenKind::PowerAssign, TokenKind::Power)
                } else {
                    two!('=', TokenKind::StarAssign, TokenKind::Star)
                }
            }
            '/' => {
                if self.peek() == '/' {
                    self.advance();
                    two!('=', TokenKind::SlashSlashAssign, TokenKind::SlashSlash)
                } else {
                    two!('=', TokenKind::SlashAssign, TokenKind::Slash)
                }
            }
            '%' => two!('=', TokenKind::PercentAssign, TokenKind::Percent),
            '=' => {
                if self.peek() == '=' {
                    self.advance();
                    TokenKind::Eq
                } else if self.peek() == '>' {
                    self.advance();
                    TokenKind::FatArrow
                } else {
                    TokenKind::Assign
                }
            }
            '!' => two!('=', TokenKind::NotEq, TokenKind::Not),
            '<' => two!('=', TokenKind::LtEq, TokenKind::Lt),
            '>' => two!('=', TokenKind::GtEq, TokenKind::Gt),
            '&' => {
                if self.peek() == '&' {
                    self.advance();
                    TokenKind::And
                } else {
                    TokenKind::Unknown
                }
            }
            '|' => {
                if self.peek() == '|' {
                    self.advance();
                    TokenKind::Or
                } else {
                    TokenKind::Unknown
                }
            }
            _ => TokenKind::Unknown,
        };
        let end = self.here();
        let text = self.slice_source(start, end);
        Ok(Token::new(
            kind,
            text,
            Position::new(start.line, start.col_start, end.col_start, start.byte_start, end.byte_start),
        ))
    }

    fn slice_source(&self, start: Position, end: Position) -> String {
        std::str::from_utf8(&self.source[start.byte_start..end.byte_start])
            .unwrap_or("")
            .to_string()
    }
}
