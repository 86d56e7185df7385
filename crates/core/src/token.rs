use crate::Pos;

/// Discriminants are partitioned so dialect-specific kinds never collide with
/// the shared kinds: shared kinds occupy 0.., the T-dialect range starts at
/// [`TokenKind::MSSQL_BASE`] and the P-dialect range at
/// [`TokenKind::POSTGRES_BASE`]. Common code matches on [`TokenKind::shared`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TokenKind {
    Whitespace = 0,
    LeftParen,
    RightParen,
    Semicolon,
    Equals,
    Comma,
    Dot,
    Number,
    /// Projection target for the dialect string kinds; never produced by the
    /// scanner directly.
    StringLiteral,
    QuotedIdentifier,
    UnquotedIdentifier,
    VariableIdentifier,
    ReservedWord,
    SingleLineComment,
    MultiLineComment,
    Pragma,
    BatchSeparator,
    MalformedBatchSeparator,
    /// A single code point the dialect has no rule for (operators such as
    /// `+ * < >` inside routine bodies). Copied through verbatim.
    Other,
    Eof,
    NotUtf8,
    UnterminatedString,
    UnterminatedIdentifier,
    UnsupportedDoubleQuote,

    MssqlString = 64,

    PgString = 128,
    PgDollarString,
}

impl TokenKind {
    pub const MSSQL_BASE: u16 = 64;
    pub const POSTGRES_BASE: u16 = 128;

    /// Projects a dialect-specific kind onto the shared kind space.
    #[must_use]
    pub fn shared(self) -> TokenKind {
        match self {
            TokenKind::MssqlString | TokenKind::PgString | TokenKind::PgDollarString => {
                TokenKind::StringLiteral
            }
            other => other,
        }
    }

    #[must_use]
    pub fn is_comment(self) -> bool {
        matches!(
            self,
            TokenKind::SingleLineComment | TokenKind::MultiLineComment
        )
    }

    /// Whitespace, comments, and pragmas: everything the parser skips when it
    /// looks for the next significant token.
    #[must_use]
    pub fn is_trivia(self) -> bool {
        self == TokenKind::Whitespace || self == TokenKind::Pragma || self.is_comment()
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(
            self,
            TokenKind::NotUtf8
                | TokenKind::UnterminatedString
                | TokenKind::UnterminatedIdentifier
                | TokenKind::UnsupportedDoubleQuote
        )
    }

    #[must_use]
    pub fn is_string(self) -> bool {
        self.shared() == TokenKind::StringLiteral
    }
}

/// Tokens tile the input: every byte of the source belongs to exactly one
/// token, so `raw` equals the input slice between the start and stop offsets
/// and `stop` equals the start of the following token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub raw: String,
    pub start: Pos,
    pub stop: Pos,
}

impl Token {
    #[must_use]
    pub fn is_trivia(&self) -> bool {
        self.kind.is_trivia()
    }
}
