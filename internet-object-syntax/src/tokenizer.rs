//! Text to token stream. The scanner walks the source once, emitting a
//! token per lexeme; in recovery mode (the default) a lexical failure
//! becomes an ERROR token carrying the failure and whatever content was
//! decoded before it, and scanning resumes at the next boundary. In
//! strict mode the first failure is returned as an error instead.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, space0},
    combinator::{all_consuming, map, opt, recognize},
    multi::many0,
    sequence::{pair, preceded, tuple},
    IResult,
};
use unicode_normalization::UnicodeNormalization;

use internet_object_core::{
    datetime, ErrorCode, ErrorInfo, ParseOptions, Position, PositionRange, TemporalKind,
    TemporalValue, Value,
};

use crate::token::{Token, TokenSubtype, TokenType};

mod number;

type Res<T, U> = IResult<T, U, nom::error::VerboseError<T>>;

/// Characters that end an open string (and bound error recovery).
const OPEN_STRING_TERMINATORS: &[char] =
    &[',', ':', '{', '}', '[', ']', '"', '\'', '#', '~'];

/// The whitespace set skipped between tokens: ASCII whitespace plus the
/// Unicode space characters the format recognises.
fn is_io_whitespace(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t'
            | '\n'
            | '\r'
            | '\x0b'
            | '\x0c'
            | '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | '\u{FEFF}'
    )
}

/// Tokenizes the whole source. In recovery mode the result always covers
/// the full input (errors appear as ERROR tokens); in strict mode the
/// first lexical error is returned.
pub fn tokenize(source: &str, options: &ParseOptions) -> Result<Vec<Token>, ErrorInfo> {
    tracing::debug!(bytes = source.len(), strict = options.strict, "tokenizing");
    Tokenizer {
        source,
        offset: 0,
        row: 1,
        col: 1,
        strict: options.strict,
        tokens: Vec::new(),
    }
    .run()
}

struct Tokenizer<'t> {
    source: &'t str,
    offset: usize,
    row: usize,
    col: usize,
    strict: bool,
    tokens: Vec<Token>,
}

impl<'t> Tokenizer<'t> {
    fn run(mut self) -> Result<Vec<Token>, ErrorInfo> {
        loop {
            self.skip_trivia();
            let Some(c) = self.peek() else { break };
            match c {
                '{' => self.symbol(TokenType::CurlyOpen),
                '}' => self.symbol(TokenType::CurlyClose),
                '[' => self.symbol(TokenType::BracketOpen),
                ']' => self.symbol(TokenType::BracketClose),
                ',' => self.symbol(TokenType::Comma),
                ':' => self.symbol(TokenType::Colon),
                '~' => self.symbol(TokenType::CollectionStart),
                '-' if self.rest().starts_with("---") => self.section_separator(),
                '"' | '\'' => self.regular_string()?,
                _ => {
                    if let Some((letters, quote)) = annotation_prefix(self.rest()) {
                        self.annotated_string(letters, quote)?;
                    } else if !self.try_number() && !self.try_keyword() {
                        self.open_string()?;
                    }
                }
            }
        }
        Ok(self.tokens)
    }

    fn rest(&self) -> &'t str {
        &self.source[self.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.row += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn advance_bytes(&mut self, n: usize) {
        let target = self.offset + n;
        while self.offset < target {
            if self.bump().is_none() {
                break;
            }
        }
    }

    fn position(&self) -> Position {
        Position::new(self.offset, self.row, self.col)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if is_io_whitespace(c) => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn push_token(
        &mut self,
        token_type: TokenType,
        subtype: Option<TokenSubtype>,
        start: Position,
        value: Value,
    ) {
        let raw = self.source[start.pos..self.offset].to_string();
        self.tokens.push(Token {
            token_type,
            subtype,
            raw,
            value,
            range: PositionRange::new(start, self.position()),
            error: None,
        });
    }

    /// In strict mode a lexical error aborts; otherwise it becomes an
    /// ERROR token preserving whatever content was decoded.
    fn emit_lexical_error(
        &mut self,
        error: ErrorInfo,
        start: Position,
        subtype: Option<TokenSubtype>,
        value: Value,
    ) -> Result<(), ErrorInfo> {
        if self.strict {
            return Err(error);
        }
        tracing::trace!(%error, "recovered lexical error");
        let raw = self.source[start.pos..self.offset].to_string();
        self.tokens.push(Token {
            token_type: TokenType::Error,
            subtype,
            raw,
            value,
            range: PositionRange::new(start, self.position()),
            error: Some(error),
        });
        Ok(())
    }

    fn symbol(&mut self, token_type: TokenType) {
        let start = self.position();
        self.bump();
        self.push_token(token_type, None, start, Value::Null);
    }

    /// `---`, optionally followed on the same line by `name`,
    /// `name: $schema` or `$schema`. A trailing line that does not shape
    /// up as a header is left for normal tokenization (it is data).
    fn section_separator(&mut self) {
        let start = self.position();
        self.advance_bytes(3);
        self.push_token(TokenType::SectionSep, None, start, Value::Null);

        while matches!(self.peek(), Some(c) if is_io_whitespace(c) && c != '\n') {
            self.bump();
        }
        let line_end = self
            .rest()
            .find('\n')
            .map(|i| self.offset + i)
            .unwrap_or(self.source.len());
        let mut line = &self.source[self.offset..line_end];
        if let Some(hash) = line.find('#') {
            line = &line[..hash];
        }
        let line = line.trim_end_matches(is_io_whitespace);
        if line.is_empty() {
            return;
        }
        let Ok((_, (name, schema))) = section_header(line) else {
            return;
        };
        if let Some(name) = name {
            let name_offset = name.as_ptr() as usize - self.source.as_ptr() as usize;
            self.advance_bytes(name_offset - self.offset);
            let start = self.position();
            self.advance_bytes(name.len());
            self.push_token(
                TokenType::SectionName,
                None,
                start,
                Value::String(name.to_string()),
            );
        }
        if let Some(schema) = schema {
            // The identifier starts after the `$`; the token includes it.
            let sigil_offset = schema.as_ptr() as usize - self.source.as_ptr() as usize - 1;
            self.advance_bytes(sigil_offset - self.offset);
            let start = self.position();
            self.advance_bytes(schema.len() + 1);
            self.push_token(
                TokenType::SectionSchema,
                None,
                start,
                Value::String(format!("${schema}")),
            );
        }
    }

    fn regular_string(&mut self) -> Result<(), ErrorInfo> {
        let start = self.position();
        let Some(quote) = self.bump() else {
            return Ok(());
        };
        let mut value = String::new();
        let mut used_unicode = false;
        let mut error: Option<ErrorInfo> = None;
        loop {
            match self.peek() {
                None => {
                    let unterminated = ErrorInfo::new(
                        ErrorCode::StringNotClosed,
                        format!("string opened at {start} is never closed"),
                    )
                    .with_position(PositionRange::new(start, self.position()));
                    return self.emit_lexical_error(
                        unterminated,
                        start,
                        Some(TokenSubtype::RegularString),
                        Value::String(value),
                    );
                }
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    match self.read_escape(&mut used_unicode) {
                        Ok(c) => value.push(c),
                        Err(escape_error) => {
                            error.get_or_insert(escape_error);
                        }
                    }
                }
                Some(c) if is_io_whitespace(c) => {
                    // Collapse the unescaped run to a single space.
                    while matches!(self.peek(), Some(c) if is_io_whitespace(c)) {
                        self.bump();
                    }
                    value.push(' ');
                }
                Some(c) => {
                    self.bump();
                    value.push(c);
                }
            }
        }
        if used_unicode {
            value = value.nfc().collect();
        }
        match error {
            Some(error) => self.emit_lexical_error(
                error,
                start,
                Some(TokenSubtype::RegularString),
                Value::String(value),
            ),
            None => {
                self.push_token(
                    TokenType::String,
                    Some(TokenSubtype::RegularString),
                    start,
                    Value::String(value),
                );
                Ok(())
            }
        }
    }

    /// Decodes the character after a consumed backslash. `\uXXXX` pairs of
    /// surrogates combine into one character; unknown escapes fall through
    /// as the literal character.
    fn read_escape(&mut self, used_unicode: &mut bool) -> Result<char, ErrorInfo> {
        let at = self.position();
        let Some(c) = self.bump() else {
            return Err(ErrorInfo::new(
                ErrorCode::InvalidEscapeSequence,
                "escape at end of input",
            )
            .with_position(PositionRange::at(at)));
        };
        match c {
            'b' => Ok('\u{8}'),
            'f' => Ok('\u{c}'),
            'n' => Ok('\n'),
            'r' => Ok('\r'),
            't' => Ok('\t'),
            'u' => {
                *used_unicode = true;
                let high = self.read_hex_digits(4, at)?;
                if (0xD800..0xDC00).contains(&high) {
                    if self.rest().starts_with("\\u") {
                        self.bump();
                        self.bump();
                        let low = self.read_hex_digits(4, at)?;
                        if (0xDC00..0xE000).contains(&low) {
                            let combined =
                                0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                            return std::char::from_u32(combined).ok_or_else(|| {
                                invalid_escape(at, self.position())
                            });
                        }
                    }
                    return Err(invalid_escape(at, self.position()));
                }
                std::char::from_u32(high).ok_or_else(|| invalid_escape(at, self.position()))
            }
            'x' => {
                *used_unicode = true;
                let code = self.read_hex_digits(2, at)?;
                std::char::from_u32(code).ok_or_else(|| invalid_escape(at, self.position()))
            }
            other => Ok(other),
        }
    }

    fn read_hex_digits(&mut self, count: usize, from: Position) -> Result<u32, ErrorInfo> {
        let mut value = 0u32;
        for _ in 0..count {
            let digit = self
                .peek()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| invalid_escape(from, self.position()))?;
            self.bump();
            value = value * 16 + digit;
        }
        Ok(value)
    }

    fn annotated_string(&mut self, letters: usize, quote: char) -> Result<(), ErrorInfo> {
        let start = self.position();
        let annotation = self.source[self.offset..self.offset + letters].to_string();
        self.advance_bytes(letters);
        self.bump(); // the opening quote

        if annotation == "r" {
            return self.raw_string(start, quote);
        }
        let content = match self.scan_to_quote(quote) {
            Ok(content) => content,
            Err(value) => {
                let unterminated = ErrorInfo::new(
                    ErrorCode::StringNotClosed,
                    format!("string opened at {start} is never closed"),
                )
                .with_position(PositionRange::new(start, self.position()));
                return self.emit_lexical_error(unterminated, start, None, Value::String(value));
            }
        };
        match annotation.as_str() {
            "b" => match base64::decode(content.trim()) {
                Ok(bytes) => {
                    self.push_token(
                        TokenType::Binary,
                        Some(TokenSubtype::BinaryString),
                        start,
                        Value::Bytes(bytes),
                    );
                    Ok(())
                }
                Err(decode_error) => {
                    let error = ErrorInfo::new(
                        ErrorCode::InvalidBase64,
                        format!("invalid base64 payload: {decode_error}"),
                    )
                    .with_position(PositionRange::new(start, self.position()));
                    self.emit_lexical_error(
                        error,
                        start,
                        Some(TokenSubtype::BinaryString),
                        Value::String(content),
                    )
                }
            },
            "d" | "t" | "dt" => {
                let (kind, subtype, parsed) = match annotation.as_str() {
                    "d" => (
                        TemporalKind::Date,
                        TokenSubtype::Date,
                        datetime::parse_date(&content),
                    ),
                    "t" => (
                        TemporalKind::Time,
                        TokenSubtype::Time,
                        datetime::parse_time(&content),
                    ),
                    _ => (
                        TemporalKind::DateTime,
                        TokenSubtype::DateTime,
                        datetime::parse_date_time(&content),
                    ),
                };
                match parsed {
                    Some(when) => {
                        self.push_token(
                            TokenType::DateTime,
                            Some(subtype),
                            start,
                            Value::Temporal(TemporalValue::new(kind, when)),
                        );
                        Ok(())
                    }
                    None => {
                        let error = ErrorInfo::new(
                            ErrorCode::InvalidDatetime,
                            format!("\"{content}\" is not a valid {annotation}'…' value"),
                        )
                        .with_position(PositionRange::new(start, self.position()));
                        self.emit_lexical_error(
                            error,
                            start,
                            Some(subtype),
                            Value::String(content),
                        )
                    }
                }
            }
            _ => {
                let error = ErrorInfo::new(
                    ErrorCode::UnsupportedAnnotation,
                    format!("\"{annotation}\" is not a supported string annotation"),
                )
                .with_position(PositionRange::new(start, self.position()));
                self.emit_lexical_error(error, start, None, Value::String(content))
            }
        }
    }

    /// `r'…'`: verbatim contents, the quote itself escaped by doubling.
    fn raw_string(&mut self, start: Position, quote: char) -> Result<(), ErrorInfo> {
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    let unterminated = ErrorInfo::new(
                        ErrorCode::StringNotClosed,
                        format!("string opened at {start} is never closed"),
                    )
                    .with_position(PositionRange::new(start, self.position()));
                    return self.emit_lexical_error(
                        unterminated,
                        start,
                        Some(TokenSubtype::RawString),
                        Value::String(value),
                    );
                }
                Some(c) if c == quote => {
                    self.bump();
                    if self.peek() == Some(quote) {
                        self.bump();
                        value.push(quote);
                        continue;
                    }
                    break;
                }
                Some(_) => {
                    let c = self.bump().unwrap_or_default();
                    value.push(c);
                }
            }
        }
        let value = normalize_newlines(value);
        self.push_token(
            TokenType::String,
            Some(TokenSubtype::RawString),
            start,
            Value::String(value),
        );
        Ok(())
    }

    /// Scans to the closing quote with no escape handling. On EOF the
    /// content so far comes back as the error payload.
    fn scan_to_quote(&mut self, quote: char) -> Result<String, String> {
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(value),
                Some(c) if c == quote => {
                    self.bump();
                    return Ok(normalize_newlines(value));
                }
                Some(_) => {
                    let c = self.bump().unwrap_or_default();
                    value.push(c);
                }
            }
        }
    }

    fn try_number(&mut self) -> bool {
        let Ok((remaining, literal)) = number::number_literal(self.rest()) else {
            return false;
        };
        if !at_boundary(remaining) {
            return false;
        }
        let Some((token_type, subtype, value)) = number::decode(&literal) else {
            return false;
        };
        let start = self.position();
        self.advance_bytes(literal.raw.len());
        self.push_token(token_type, subtype, start, value);
        true
    }

    fn try_keyword(&mut self) -> bool {
        const KEYWORDS: &[(&str, TokenType)] = &[
            ("true", TokenType::Boolean),
            ("false", TokenType::Boolean),
            ("null", TokenType::Null),
            ("T", TokenType::Boolean),
            ("F", TokenType::Boolean),
            ("N", TokenType::Null),
        ];
        for (keyword, token_type) in KEYWORDS {
            if self.rest().starts_with(keyword) && at_boundary(&self.rest()[keyword.len()..]) {
                let value = match *token_type {
                    TokenType::Boolean => Value::Bool(keyword.starts_with(['t', 'T'])),
                    _ => Value::Null,
                };
                let start = self.position();
                self.advance_bytes(keyword.len());
                self.push_token(*token_type, None, start, value);
                return true;
            }
        }
        false
    }

    fn open_string(&mut self) -> Result<(), ErrorInfo> {
        let start = self.position();
        let mut value = String::new();
        // Everything up to here survives the trailing-whitespace trim;
        // escaped characters push it forward.
        let mut protected = 0usize;
        let mut used_unicode = false;
        let mut error: Option<ErrorInfo> = None;
        loop {
            match self.peek() {
                None => break,
                Some(c) if OPEN_STRING_TERMINATORS.contains(&c) => break,
                Some('-') if self.rest().starts_with("---") => break,
                Some('\\') => {
                    self.bump();
                    match self.read_escape(&mut used_unicode) {
                        Ok(c) => {
                            value.push(c);
                            protected = value.len();
                        }
                        Err(escape_error) => {
                            error.get_or_insert(escape_error);
                        }
                    }
                }
                Some('\r') => {
                    self.bump();
                    if self.peek() == Some('\n') {
                        self.bump();
                    }
                    value.push('\n');
                }
                Some(c) => {
                    self.bump();
                    value.push(c);
                }
            }
        }
        let tail = &value[protected..];
        let trimmed_len = tail.trim_end_matches(is_io_whitespace).len();
        value.truncate(protected + trimmed_len);
        if used_unicode {
            value = value.nfc().collect();
        }
        match error {
            Some(error) => self.emit_lexical_error(
                error,
                start,
                Some(TokenSubtype::OpenString),
                Value::String(value),
            ),
            None => {
                self.push_token(
                    TokenType::String,
                    Some(TokenSubtype::OpenString),
                    start,
                    Value::String(value),
                );
                Ok(())
            }
        }
    }
}

fn invalid_escape(from: Position, to: Position) -> ErrorInfo {
    ErrorInfo::new(
        ErrorCode::InvalidEscapeSequence,
        "invalid escape sequence",
    )
    .with_position(PositionRange::new(from, to))
}

fn normalize_newlines(value: String) -> String {
    if value.contains('\r') {
        value.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        value
    }
}

/// Whether the text after a number or keyword lets it stand as its own
/// token; anything else re-scans the whole run as an open string.
fn at_boundary(remaining: &str) -> bool {
    match remaining.chars().next() {
        None => true,
        Some(c) if is_io_whitespace(c) => true,
        Some(c) if OPEN_STRING_TERMINATORS.contains(&c) => true,
        Some('-') => remaining.starts_with("---"),
        _ => false,
    }
}

/// `1..=4` ASCII letters directly followed by a quote: the shape of an
/// annotated string.
fn annotation_prefix(rest: &str) -> Option<(usize, char)> {
    let mut letters = 0usize;
    for (count, c) in rest.chars().enumerate() {
        match c {
            '\'' | '"' if count > 0 => return Some((letters, c)),
            c if c.is_ascii_alphabetic() && count < 4 => letters += c.len_utf8(),
            _ => return None,
        }
    }
    None
}

fn ident(s: &str) -> Res<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_"), tag("-")))),
    ))(s)
}

/// `name`, `name: $schema` or `$schema` on the line after `---`.
fn section_header(s: &str) -> Res<&str, (Option<&str>, Option<&str>)> {
    all_consuming(alt((
        map(preceded(char('$'), ident), |schema| (None, Some(schema))),
        map(
            pair(
                ident,
                opt(preceded(
                    tuple((space0, char(':'), space0, char('$'))),
                    ident,
                )),
            ),
            |(name, schema)| (Some(name), schema),
        ),
    )))(s)
}

#[cfg(test)]
mod tests;
