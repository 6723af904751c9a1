use internet_object_core::{ErrorInfo, PositionRange, Value};

/// The coarse classification of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// A string in any surface form (see [`TokenSubtype`]).
    String,
    /// An IEEE-754 number, in any base, including `Inf` and `NaN`.
    Number,
    /// An arbitrary-precision integer (`…n`).
    BigInt,
    /// An exact decimal (`…m`).
    Decimal,
    /// Bytes from a `b'…'` literal.
    Binary,
    /// A `d'…'`, `t'…'` or `dt'…'` literal.
    DateTime,
    /// `true`, `false`, `T` or `F`.
    Boolean,
    /// `null` or `N`.
    Null,
    /// `{`
    CurlyOpen,
    /// `}`
    CurlyClose,
    /// `[`
    BracketOpen,
    /// `]`
    BracketClose,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `~` introducing a collection row or header row.
    CollectionStart,
    /// `---`
    SectionSep,
    /// The name in a section header line.
    SectionName,
    /// The `$schema` reference in a section header line.
    SectionSchema,
    /// A recovered lexical error; the error itself is on the token.
    Error,
}

/// Finer classification within a [`TokenType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSubtype {
    /// A `"…"` or `'…'` string.
    RegularString,
    /// An unquoted string.
    OpenString,
    /// An `r'…'` string.
    RawString,
    /// A `b'…'` string.
    BinaryString,
    /// A `0x…` number.
    Hex,
    /// A `0o…` number.
    Octal,
    /// A `0b…` number.
    Binary,
    /// A `d'…'` literal.
    Date,
    /// A `t'…'` literal.
    Time,
    /// A `dt'…'` literal.
    DateTime,
}

/// One lexeme: its classification, the exact source text it covers, and
/// the decoded value it stands for.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Coarse classification.
    pub token_type: TokenType,
    /// Finer classification, when one applies.
    pub subtype: Option<TokenSubtype>,
    /// The exact source substring: `source[range.start.pos..range.end.pos]`.
    pub raw: String,
    /// The decoded value (escapes applied, whitespace collapsed, digits
    /// parsed, and so on).
    pub value: Value,
    /// Where in the source this token sits.
    pub range: PositionRange,
    /// The lexical error, for [`TokenType::Error`] tokens.
    pub error: Option<ErrorInfo>,
}

impl Token {
    /// Whether this token is a string of any subtype.
    pub fn is_string(&self) -> bool {
        self.token_type == TokenType::String
    }

    /// The decoded text, when the value is a string.
    pub fn text(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// Whether this is a scalar value token (something that can stand in a
    /// value slot on its own).
    pub fn is_value(&self) -> bool {
        matches!(
            self.token_type,
            TokenType::String
                | TokenType::Number
                | TokenType::BigInt
                | TokenType::Decimal
                | TokenType::Binary
                | TokenType::DateTime
                | TokenType::Boolean
                | TokenType::Null
        )
    }
}
