use std::sync::Arc;

use crate::{Dialect, Pos, SourcePath, Token, TokenKind, keywords};

/// Cursor-style lexer over one source buffer.
///
/// The scanner is plain data: cloning it is the supported look-ahead
/// mechanism, and a clone shares nothing mutable with the original. The
/// parser reads the current token through the accessors and advances
/// explicitly.
///
/// Tokens tile the input, so the stop position of every token equals the
/// start position of the next one and the raw text of a token is exactly the
/// input slice between its byte offsets.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    dialect: Dialect,
    file: Option<Arc<SourcePath>>,
    src: &'a str,
    invalid_utf8: bool,
    utf8_reported: bool,
    cursor: usize,
    line: u32,
    col: u32,
    start_of_line: bool,
    after_separator: bool,
    kind: TokenKind,
    reserved: Option<&'static str>,
    tok_start: usize,
    tok_start_line: u32,
    tok_start_col: u32,
}

impl<'a> Scanner<'a> {
    /// Positions the scanner on the first token of `input`. Bytes beyond the
    /// longest valid UTF-8 prefix yield a single [`TokenKind::NotUtf8`] token
    /// once the prefix is exhausted.
    pub fn new(dialect: Dialect, file: Option<Arc<SourcePath>>, input: &'a [u8]) -> Self {
        let (src, invalid_utf8) = match std::str::from_utf8(input) {
            Ok(text) => (text, false),
            Err(error) => {
                let prefix =
                    std::str::from_utf8(&input[..error.valid_up_to()]).unwrap_or_default();
                (prefix, true)
            }
        };

        let mut scanner = Self {
            dialect,
            file,
            src,
            invalid_utf8,
            utf8_reported: false,
            cursor: 0,
            line: 1,
            col: 1,
            start_of_line: true,
            after_separator: false,
            kind: TokenKind::Eof,
            reserved: None,
            tok_start: 0,
            tok_start_line: 1,
            tok_start_col: 1,
        };
        scanner.advance();
        scanner
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[must_use]
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.src[self.tok_start..self.cursor]
    }

    #[must_use]
    pub fn lowercase_text(&self) -> String {
        self.text().to_ascii_lowercase()
    }

    /// Canonical lowercase spelling when the current token is a reserved
    /// word.
    #[must_use]
    pub fn reserved(&self) -> Option<&'static str> {
        self.reserved
    }

    #[must_use]
    pub fn start(&self) -> Pos {
        Pos::new(self.file.clone(), self.tok_start_line, self.tok_start_col)
    }

    #[must_use]
    pub fn stop(&self) -> Pos {
        Pos::new(self.file.clone(), self.line, self.col)
    }

    #[must_use]
    pub fn start_offset(&self) -> usize {
        self.tok_start
    }

    #[must_use]
    pub fn stop_offset(&self) -> usize {
        self.cursor
    }

    /// Materializes the current token.
    #[must_use]
    pub fn token(&self) -> Token {
        Token {
            kind: self.kind,
            raw: self.text().to_string(),
            start: self.start(),
            stop: self.stop(),
        }
    }

    /// Advances to the next token.
    pub fn advance(&mut self) {
        self.reserved = None;
        self.tok_start = self.cursor;
        self.tok_start_line = self.line;
        self.tok_start_col = self.col;

        if self.cursor >= self.src.len() {
            self.kind = if self.invalid_utf8 && !self.utf8_reported {
                self.utf8_reported = true;
                TokenKind::NotUtf8
            } else {
                TokenKind::Eof
            };
            return;
        }

        self.kind = self.scan_token();
        self.update_position();
        self.apply_batch_rules();
    }

    /// Advances past the next token and any whitespace following it.
    pub fn advance_skip_ws(&mut self) {
        self.advance();
        while self.kind == TokenKind::Whitespace {
            self.advance();
        }
    }

    /// Advances past the next token and any whitespace, comments, and
    /// pragmas following it.
    pub fn advance_significant(&mut self) {
        self.advance();
        while self.kind.is_trivia() {
            self.advance();
        }
    }

    fn scan_token(&mut self) -> TokenKind {
        let b = self.src.as_bytes()[self.cursor];
        match b {
            b' ' | b'\t' | b'\r' | b'\n' => self.scan_whitespace(),
            b'(' => self.single(TokenKind::LeftParen),
            b')' => self.single(TokenKind::RightParen),
            b';' => self.single(TokenKind::Semicolon),
            b'=' => self.single(TokenKind::Equals),
            b',' => self.single(TokenKind::Comma),
            b'.' => self.single(TokenKind::Dot),
            b'-' => {
                if self.peek_byte(1) == Some(b'-') {
                    self.scan_line_comment()
                } else if self.peek_byte(1).is_some_and(|next| next.is_ascii_digit()) {
                    self.scan_number()
                } else {
                    self.single(TokenKind::Other)
                }
            }
            b'+' => {
                if self.peek_byte(1).is_some_and(|next| next.is_ascii_digit()) {
                    self.scan_number()
                } else {
                    self.single(TokenKind::Other)
                }
            }
            b'/' => {
                if self.peek_byte(1) == Some(b'*') {
                    self.scan_multiline_comment()
                } else {
                    self.single(TokenKind::Other)
                }
            }
            b'\'' => self.scan_string(),
            b'[' => self.scan_quoted(b']', TokenKind::QuotedIdentifier),
            b'"' => match self.dialect {
                Dialect::Mssql => self.single(TokenKind::UnsupportedDoubleQuote),
                Dialect::Postgres => self.scan_quoted(b'"', TokenKind::QuotedIdentifier),
            },
            b'$' if self.dialect == Dialect::Postgres => self.scan_dollar_string(),
            b'0'..=b'9' => self.scan_number(),
            _ => {
                let ch = self.current_char();
                if ch.is_whitespace() {
                    self.scan_whitespace()
                } else if is_identifier_start(ch) {
                    self.scan_identifier()
                } else {
                    self.cursor += ch.len_utf8();
                    TokenKind::Other
                }
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.cursor += 1;
        kind
    }

    fn current_char(&self) -> char {
        self.src[self.cursor..].chars().next().unwrap_or('\0')
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.src.as_bytes().get(self.cursor + ahead).copied()
    }

    fn scan_whitespace(&mut self) -> TokenKind {
        while let Some(ch) = self.src[self.cursor..].chars().next() {
            if !ch.is_whitespace() {
                break;
            }
            self.cursor += ch.len_utf8();
        }
        TokenKind::Whitespace
    }

    fn scan_line_comment(&mut self) -> TokenKind {
        self.cursor += 2;
        let bytes = self.src.as_bytes();
        while self.cursor < bytes.len() && bytes[self.cursor] != b'\n' {
            self.cursor += 1;
        }
        let content = &self.src[self.tok_start + 2..self.cursor];
        if content.starts_with("sqlcode:") {
            TokenKind::Pragma
        } else {
            TokenKind::SingleLineComment
        }
    }

    fn scan_multiline_comment(&mut self) -> TokenKind {
        let bytes = self.src.as_bytes();
        self.cursor += 2;
        let mut depth = 1usize;
        while self.cursor < bytes.len() && depth > 0 {
            if bytes[self.cursor] == b'/' && self.peek_byte(1) == Some(b'*') {
                depth += 1;
                self.cursor += 2;
            } else if bytes[self.cursor] == b'*' && self.peek_byte(1) == Some(b'/') {
                depth -= 1;
                self.cursor += 2;
            } else {
                self.cursor += 1;
            }
        }
        TokenKind::MultiLineComment
    }

    fn scan_string(&mut self) -> TokenKind {
        let terminated = self.scan_delimited(b'\'');
        if !terminated {
            return TokenKind::UnterminatedString;
        }
        match self.dialect {
            Dialect::Mssql => TokenKind::MssqlString,
            Dialect::Postgres => TokenKind::PgString,
        }
    }

    fn scan_quoted(&mut self, close: u8, kind: TokenKind) -> TokenKind {
        if self.scan_delimited(close) {
            kind
        } else {
            TokenKind::UnterminatedIdentifier
        }
    }

    /// Consumes a run delimited by `close`, where a doubled `close` is an
    /// escape. Returns false (with the cursor at end of input) when the run
    /// never terminates.
    fn scan_delimited(&mut self, close: u8) -> bool {
        let bytes = self.src.as_bytes();
        self.cursor += 1;
        loop {
            while self.cursor < bytes.len() && bytes[self.cursor] != close {
                self.cursor += 1;
            }
            if self.cursor >= bytes.len() {
                return false;
            }
            if self.peek_byte(1) == Some(close) {
                self.cursor += 2;
                continue;
            }
            self.cursor += 1;
            return true;
        }
    }

    fn scan_dollar_string(&mut self) -> TokenKind {
        let mut tag_end = self.cursor + 1;
        while let Some(ch) = self.src[tag_end..].chars().next() {
            if !is_identifier_continue(ch) {
                break;
            }
            tag_end += ch.len_utf8();
        }
        if self.src.as_bytes().get(tag_end) != Some(&b'$') {
            return self.single(TokenKind::Other);
        }

        let delimiter = &self.src[self.cursor..=tag_end];
        let body_start = tag_end + 1;
        match self.src[body_start..].find(delimiter) {
            Some(found) => {
                self.cursor = body_start + found + delimiter.len();
                TokenKind::PgDollarString
            }
            None => {
                self.cursor = self.src.len();
                TokenKind::UnterminatedString
            }
        }
    }

    fn scan_number(&mut self) -> TokenKind {
        let bytes = self.src.as_bytes();
        if matches!(bytes[self.cursor], b'+' | b'-') {
            self.cursor += 1;
        }
        self.consume_digits();
        if self.peek_byte(0) == Some(b'.') && self.peek_byte(1).is_some_and(|b| b.is_ascii_digit())
        {
            self.cursor += 1;
            self.consume_digits();
        }
        if matches!(self.peek_byte(0), Some(b'e' | b'E')) {
            let after_sign = matches!(self.peek_byte(1), Some(b'+' | b'-'));
            let digit_at = if after_sign { 2 } else { 1 };
            if self.peek_byte(digit_at).is_some_and(|b| b.is_ascii_digit()) {
                self.cursor += digit_at;
                self.consume_digits();
            }
        }
        TokenKind::Number
    }

    fn consume_digits(&mut self) {
        let bytes = self.src.as_bytes();
        while self.cursor < bytes.len() && bytes[self.cursor].is_ascii_digit() {
            self.cursor += 1;
        }
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let first = self.current_char();
        self.cursor += first.len_utf8();
        while let Some(ch) = self.src[self.cursor..].chars().next() {
            if !is_identifier_continue(ch) {
                break;
            }
            self.cursor += ch.len_utf8();
        }

        let text = self.text();
        if text.starts_with('@') {
            return TokenKind::VariableIdentifier;
        }
        match keywords::lookup(&text.to_ascii_lowercase()) {
            Some(word) => {
                self.reserved = Some(word);
                TokenKind::ReservedWord
            }
            None => TokenKind::UnquotedIdentifier,
        }
    }

    fn update_position(&mut self) {
        let text = &self.src[self.tok_start..self.cursor];
        match text.rfind('\n') {
            Some(last) => {
                self.line += text.bytes().filter(|&b| b == b'\n').count() as u32;
                self.col = (text.len() - last) as u32;
            }
            None => self.col += text.len() as u32,
        }
    }

    /// Batch-separator recognition is stateful across tokens: a `go`
    /// identifier at start of line becomes a separator, and anything but
    /// whitespace on the rest of that line is reclassified as malformed.
    /// Tokens inside strings, quoted identifiers, and comments never reach
    /// this point as `go` because they are consumed as single tokens.
    fn apply_batch_rules(&mut self) {
        if self.kind == TokenKind::Whitespace {
            if self.text().contains('\n') {
                self.start_of_line = true;
                self.after_separator = false;
            }
            return;
        }

        if self.after_separator {
            self.kind = TokenKind::MalformedBatchSeparator;
            self.reserved = None;
            self.start_of_line = false;
            return;
        }

        if self.kind == TokenKind::UnquotedIdentifier
            && self.start_of_line
            && self.text().eq_ignore_ascii_case("go")
        {
            self.kind = TokenKind::BatchSeparator;
            self.after_separator = true;
            self.start_of_line = false;
            return;
        }

        match self.kind {
            TokenKind::SingleLineComment | TokenKind::Pragma => {}
            TokenKind::MultiLineComment => {
                if self.text().contains('\n') {
                    self.start_of_line = true;
                }
            }
            _ => self.start_of_line = false,
        }
    }
}

fn is_identifier_start(ch: char) -> bool {
    unicode_ident::is_xid_start(ch) || matches!(ch, '@' | '_' | '#' | '\u{ff3f}')
}

fn is_identifier_continue(ch: char) -> bool {
    unicode_ident::is_xid_continue(ch) || matches!(ch, '@' | '_' | '#' | '\u{ff3f}')
}
