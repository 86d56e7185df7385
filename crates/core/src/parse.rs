use std::sync::Arc;

use crate::{
    Create, CreateKind, Declare, DeclareType, DependencyRef, Dialect, Document, Issue, Pos,
    Scanner, SourcePath, Token, TokenKind, TypeArg, document,
};

const ALONE_IN_BATCH: &str =
    "a procedure/function must be alone in a batch; use 'go' to split batches";

pub(crate) fn parse_source(
    dialect: Dialect,
    file: Option<Arc<SourcePath>>,
    input: &[u8],
) -> Document {
    let mut parser = Parser {
        scanner: Scanner::new(dialect, file, input),
        dialect,
        document: Document::new(dialect),
        pending: Vec::new(),
        pending_blank: false,
        pending_blocked: false,
        header_done: false,
    };
    parser.run();
    parser.document
}

/// Recursive-descent parser over a [`Scanner`]. Problems are collected on
/// the document and recovery skips to the dialect's statement-start set, so
/// one bad statement never hides the rest of a file.
struct Parser<'a> {
    scanner: Scanner<'a>,
    dialect: Dialect,
    document: Document,
    /// Single-line comments that will become the next create's docstring.
    pending: Vec<Token>,
    pending_blank: bool,
    pending_blocked: bool,
    header_done: bool,
}

#[derive(Default)]
struct BatchState {
    creates: usize,
    saw_routine: bool,
    declare_mode: bool,
    alone_reported: bool,
    mixed_reported: bool,
}

impl Parser<'_> {
    fn run(&mut self) {
        let mut first = true;
        while self.parse_batch(first) {
            first = false;
        }
    }

    /// Parses one batch. Returns true when a separator was consumed and
    /// another batch follows.
    fn parse_batch(&mut self, first: bool) -> bool {
        let mut batch = BatchState::default();
        loop {
            self.skip_trivia();
            if self.scanner.kind() != TokenKind::Eof {
                self.header_done = true;
            }
            match self.scanner.kind() {
                TokenKind::Eof => return false,
                TokenKind::BatchSeparator => {
                    self.reset_docstring();
                    self.scanner.advance();
                    return true;
                }
                TokenKind::ReservedWord => match self.scanner.reserved() {
                    Some("declare") => self.parse_declare_statement(first, &mut batch),
                    Some("create") => self.parse_create_statement(&mut batch),
                    _ => self.unexpected_token(),
                },
                _ => self.unexpected_token(),
            }
        }
    }

    /// Skips whitespace, comments, pragmas, and error tokens while
    /// maintaining the docstring state described in the parser contract: a
    /// single trailing newline keeps the pending comment run, one blank line
    /// is tolerated once, and a multi-line comment discards the run unless
    /// the statement follows it directly.
    fn skip_trivia(&mut self) {
        loop {
            match self.scanner.kind() {
                TokenKind::Whitespace => {
                    self.note_whitespace();
                    self.scanner.advance();
                }
                TokenKind::SingleLineComment => {
                    self.note_comment();
                    self.scanner.advance();
                }
                TokenKind::MultiLineComment => {
                    if !self.pending.is_empty() {
                        self.pending_blocked = true;
                    }
                    self.scanner.advance();
                }
                TokenKind::Pragma => self.handle_pragma(),
                TokenKind::MalformedBatchSeparator => {
                    self.reset_docstring();
                    self.error_here(
                        "unexpected text after 'go'; a batch separator must be alone on its line",
                    );
                    self.scanner.advance();
                }
                kind if kind.is_error() => {
                    self.reset_docstring();
                    self.error_here(scan_error_message(kind));
                    self.scanner.advance();
                }
                _ => return,
            }
        }
    }

    fn note_whitespace(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let newlines = self.scanner.text().bytes().filter(|&b| b == b'\n').count();
        if self.pending_blocked && newlines > 0 {
            self.reset_docstring();
            return;
        }
        match newlines {
            0 | 1 => {}
            2 if !self.pending_blank => self.pending_blank = true,
            _ => self.reset_docstring(),
        }
    }

    fn note_comment(&mut self) {
        if self.pending_blocked {
            self.reset_docstring();
        }
        self.pending.push(self.scanner.token());
    }

    fn reset_docstring(&mut self) {
        self.pending.clear();
        self.pending_blank = false;
        self.pending_blocked = false;
    }

    fn handle_pragma(&mut self) {
        self.reset_docstring();
        if self.header_done {
            self.error_here("pragma comments are only recognized at the start of a file");
            self.scanner.advance();
            return;
        }

        let text = self.scanner.text().to_string();
        let directive = text
            .strip_prefix("--")
            .and_then(|rest| rest.strip_prefix("sqlcode:"))
            .unwrap_or_default()
            .trim();
        let mut parts = directive.splitn(2, char::is_whitespace);
        let word = parts.next().unwrap_or_default();
        let args = parts.next().unwrap_or_default().trim();

        if word != "include-if" {
            self.error_here(format!(
                "malformed pragma '{word}'; expected 'include-if <tags>'"
            ));
        } else if args.is_empty() {
            self.error_here("include-if requires at least one tag");
        } else {
            for tag in args.split(',') {
                let tag = tag.trim();
                if !tag.is_empty() && !self.document.include_if.iter().any(|have| have == tag) {
                    self.document.include_if.push(tag.to_string());
                }
            }
        }
        self.scanner.advance();
    }

    fn parse_declare_statement(&mut self, first: bool, batch: &mut BatchState) {
        self.reset_docstring();
        if !first {
            self.error_here("declare statements are only allowed in the first batch of a file");
            self.recover();
            return;
        }
        if batch.creates > 0 {
            self.error_here("declare statements must come before any create in the batch");
            self.recover();
            return;
        }
        batch.declare_mode = true;
        self.scanner.advance_significant();
        self.parse_declare_run();
    }

    /// Consumes a comma-, semicolon-, or adjacent-separated run of
    /// declarations until a batch separator or another statement keyword.
    fn parse_declare_run(&mut self) {
        loop {
            match self.scanner.kind() {
                TokenKind::VariableIdentifier => {
                    if !self.parse_declaration() {
                        return;
                    }
                }
                TokenKind::Eof | TokenKind::BatchSeparator => return,
                TokenKind::ReservedWord if self.scanner.reserved() == Some("declare") => {
                    self.scanner.advance_significant();
                }
                TokenKind::ReservedWord
                    if self
                        .scanner
                        .reserved()
                        .is_some_and(|word| self.dialect.statement_starts().contains(&word)) =>
                {
                    return;
                }
                _ => {
                    let text = self.scanner.text().to_string();
                    self.error_here(format!("expected a constant declaration, found '{text}'"));
                    self.recover();
                    return;
                }
            }
        }
    }

    /// Parses one `@name type [= literal]`. Returns false when the run
    /// should stop.
    fn parse_declaration(&mut self) -> bool {
        let name = self.scanner.text().to_string();
        let start = self.scanner.start();
        if !document::is_declare_name(&name) {
            self.error_at(
                start.clone(),
                format!(
                    "unknown constant prefix: {name}; constants must start with @Enum, @Const, or @Global"
                ),
            );
        }
        self.scanner.advance_significant();

        if self.scanner.kind() == TokenKind::Equals {
            self.error_at(
                start,
                format!("constant {name} is assigned without an explicit type"),
            );
            self.scanner.advance_significant();
            if self.scanner.kind() == TokenKind::Number || self.scanner.kind().is_string() {
                self.scanner.advance_significant();
            }
        } else {
            let Some(ty) = self.parse_declare_type() else {
                return false;
            };
            let mut literal = None;
            if self.scanner.kind() == TokenKind::Equals {
                self.scanner.advance_significant();
                if self.scanner.kind() == TokenKind::Number || self.scanner.kind().is_string() {
                    literal = Some(self.scanner.token());
                    self.scanner.advance_significant();
                } else {
                    let text = self.scanner.text().to_string();
                    self.error_here(format!(
                        "expected a number or string constant, found '{text}'"
                    ));
                }
            }
            let stop = self.scanner.start();
            self.document.declares.push(Declare {
                name,
                ty,
                literal,
                start,
                stop,
            });
        }

        if matches!(self.scanner.kind(), TokenKind::Comma | TokenKind::Semicolon) {
            self.scanner.advance_significant();
        }
        true
    }

    fn parse_declare_type(&mut self) -> Option<DeclareType> {
        let base = match self.scanner.kind() {
            TokenKind::UnquotedIdentifier | TokenKind::ReservedWord => {
                self.scanner.text().to_string()
            }
            _ => {
                let text = self.scanner.text().to_string();
                self.error_here(format!("expected a type name, found '{text}'"));
                self.recover();
                return None;
            }
        };
        self.scanner.advance_significant();

        let mut args = Vec::new();
        if self.scanner.kind() == TokenKind::LeftParen {
            self.scanner.advance_significant();
            loop {
                match self.scanner.kind() {
                    TokenKind::Number => {
                        args.push(TypeArg::Number(self.scanner.text().to_string()));
                        self.scanner.advance_significant();
                    }
                    TokenKind::UnquotedIdentifier
                        if self.scanner.text().eq_ignore_ascii_case("max") =>
                    {
                        args.push(TypeArg::Max);
                        self.scanner.advance_significant();
                    }
                    TokenKind::Comma => self.scanner.advance_significant(),
                    TokenKind::RightParen => {
                        self.scanner.advance_significant();
                        break;
                    }
                    _ => {
                        self.error_here("expected a number or 'max' in type arguments");
                        self.recover();
                        return None;
                    }
                }
            }
        }
        Some(DeclareType { base, args })
    }

    fn parse_create_statement(&mut self, batch: &mut BatchState) {
        if batch.declare_mode && !batch.mixed_reported {
            batch.mixed_reported = true;
            self.error_here(
                "only constant declarations are allowed in a declare batch; use 'go' to start a new batch",
            );
        }

        let docstring = std::mem::take(&mut self.pending);
        self.pending_blank = false;
        self.pending_blocked = false;
        let yaml = self.extract_yaml(&docstring);

        let create_pos = self.scanner.start();
        let mut body = vec![self.scanner.token()];
        self.scanner.advance();
        self.copy_trivia(&mut body);

        let kind = match self.scanner.kind() {
            TokenKind::ReservedWord if self.scanner.reserved() == Some("procedure") => {
                CreateKind::Procedure
            }
            TokenKind::ReservedWord if self.scanner.reserved() == Some("function") => {
                CreateKind::Function
            }
            TokenKind::UnquotedIdentifier if self.scanner.text().eq_ignore_ascii_case("type") => {
                CreateKind::Type
            }
            _ => {
                let text = self.scanner.text().to_string();
                self.error_here(format!(
                    "create of unsupported object kind '{text}'; only procedure, function, and type are managed"
                ));
                self.recover();
                return;
            }
        };

        if self.dialect.routine_alone_in_batch()
            && batch.creates > 0
            && (batch.saw_routine || kind != CreateKind::Type)
            && !batch.alone_reported
        {
            batch.alone_reported = true;
            self.error_at(create_pos, ALONE_IN_BATCH);
        }

        body.push(self.scanner.token());
        self.scanner.advance();
        self.copy_trivia(&mut body);

        if !(self.scanner.kind() == TokenKind::QuotedIdentifier
            && document::is_virtual_schema(self.scanner.text()))
        {
            self.error_here("create must target the virtual schema [code]");
            self.recover();
            return;
        }
        body.push(self.scanner.token());
        self.scanner.advance();
        self.copy_trivia(&mut body);

        if self.scanner.kind() != TokenKind::Dot {
            self.error_here("expected '.' between [code] and the routine name");
            self.recover();
            return;
        }
        body.push(self.scanner.token());
        self.scanner.advance();
        self.copy_trivia(&mut body);

        let quoted_name = match self.scanner.kind() {
            TokenKind::QuotedIdentifier => normalize_quoted(self.scanner.text()),
            TokenKind::UnquotedIdentifier => format!("[{}]", self.scanner.text()),
            _ => {
                self.error_here("expected a routine name after [code].");
                self.recover();
                return;
            }
        };
        body.push(self.scanner.token());
        self.scanner.advance();

        batch.creates += 1;
        if kind != CreateKind::Type {
            batch.saw_routine = true;
        }

        let mut deps = Vec::new();
        self.copy_body(&mut body, &mut deps, kind, batch);

        deps.sort_by(|a, b| a.name.cmp(&b.name));
        deps.dedup_by(|later, earlier| earlier.name == later.name);

        self.document.creates.push(Create {
            kind,
            quoted_name,
            body,
            deps,
            docstring,
            yaml,
            dialect: self.dialect,
        });
    }

    /// Copies body tokens until the batch ends, collecting `[code].name`
    /// references as dependencies. Inside a `create type`, a top-level
    /// `create` hands control back so the next statement in the batch can
    /// parse; inside a routine body an inner `create procedure/function/type`
    /// is the alone-in-batch violation, while `create index` and
    /// `create table` are copied through.
    fn copy_body(
        &mut self,
        body: &mut Vec<Token>,
        deps: &mut Vec<DependencyRef>,
        kind: CreateKind,
        batch: &mut BatchState,
    ) {
        loop {
            match self.scanner.kind() {
                TokenKind::Eof | TokenKind::BatchSeparator => return,
                TokenKind::QuotedIdentifier if document::is_virtual_schema(self.scanner.text()) => {
                    body.push(self.scanner.token());
                    self.scanner.advance();
                    self.copy_trivia(body);
                    if self.scanner.kind() != TokenKind::Dot {
                        continue;
                    }
                    body.push(self.scanner.token());
                    self.scanner.advance();
                    self.copy_trivia(body);
                    let name = match self.scanner.kind() {
                        TokenKind::QuotedIdentifier => normalize_quoted(self.scanner.text()),
                        TokenKind::UnquotedIdentifier => format!("[{}]", self.scanner.text()),
                        _ => continue,
                    };
                    deps.push(DependencyRef {
                        name,
                        pos: self.scanner.start(),
                    });
                    body.push(self.scanner.token());
                    self.scanner.advance();
                }
                TokenKind::ReservedWord if self.scanner.reserved() == Some("create") => {
                    if kind == CreateKind::Type || !self.dialect.routine_alone_in_batch() {
                        return;
                    }
                    let mut look = self.scanner.clone();
                    look.advance_significant();
                    let starts_statement = matches!(look.reserved(), Some("procedure" | "function"))
                        || (look.kind() == TokenKind::UnquotedIdentifier
                            && look.text().eq_ignore_ascii_case("type"));
                    if starts_statement && !batch.alone_reported {
                        batch.alone_reported = true;
                        self.error_here(ALONE_IN_BATCH);
                    }
                    body.push(self.scanner.token());
                    self.scanner.advance();
                }
                other if other.is_error() => {
                    self.error_here(scan_error_message(other));
                    body.push(self.scanner.token());
                    self.scanner.advance();
                }
                _ => {
                    body.push(self.scanner.token());
                    self.scanner.advance();
                }
            }
        }
    }

    fn copy_trivia(&mut self, body: &mut Vec<Token>) {
        while self.scanner.kind().is_trivia() {
            body.push(self.scanner.token());
            self.scanner.advance();
        }
    }

    /// Extracts the `--! ` YAML block embedded in a docstring. Once started
    /// the block must continue uninterrupted until the create statement.
    fn extract_yaml(&mut self, docstring: &[Token]) -> String {
        let mut yaml = String::new();
        let mut in_block = false;
        for token in docstring {
            let content = token.raw.strip_prefix("--").unwrap_or(&token.raw);
            if let Some(line) = content.strip_prefix("! ") {
                in_block = true;
                yaml.push_str(line);
                yaml.push('\n');
            } else if content.starts_with('!') {
                in_block = true;
                self.error_at(token.start.clone(), "expected a space after '--!'");
            } else if in_block {
                self.error_at(
                    token.start.clone(),
                    "plain comment inside a '--!' block; the block must continue to the create statement",
                );
            }
        }
        yaml
    }

    fn unexpected_token(&mut self) {
        self.reset_docstring();
        let message = if self.scanner.kind().is_error() {
            scan_error_message(self.scanner.kind()).to_string()
        } else {
            format!("unexpected token '{}'", self.scanner.text())
        };
        self.error_here(message);
        self.recover();
    }

    /// Skips past the offending token, then forward to the next
    /// statement-start reserved word, batch separator, or end of input.
    fn recover(&mut self) {
        self.scanner.advance();
        loop {
            match self.scanner.kind() {
                TokenKind::Eof | TokenKind::BatchSeparator => return,
                TokenKind::ReservedWord
                    if self
                        .scanner
                        .reserved()
                        .is_some_and(|word| self.dialect.statement_starts().contains(&word)) =>
                {
                    return;
                }
                _ => self.scanner.advance(),
            }
        }
    }

    fn error_here(&mut self, message: impl Into<String>) {
        let pos = self.scanner.start();
        self.error_at(pos, message);
    }

    fn error_at(&mut self, pos: Pos, message: impl Into<String>) {
        self.document.errors.push(Issue::new(pos, message));
    }
}

/// Normalizes a quoted identifier to the bracket form used for comparisons.
fn normalize_quoted(text: &str) -> String {
    if text.starts_with('[') {
        return text.to_string();
    }
    if let Some(inner) = text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        return format!("[{}]", inner.replace("\"\"", "\""));
    }
    format!("[{text}]")
}

fn scan_error_message(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::NotUtf8 => "input is not valid UTF-8",
        TokenKind::UnterminatedString => "unterminated string literal",
        TokenKind::UnterminatedIdentifier => "unterminated quoted identifier",
        TokenKind::UnsupportedDoubleQuote => {
            "double-quoted identifiers are not supported; use [brackets]"
        }
        _ => "unexpected token",
    }
}
