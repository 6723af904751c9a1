use std::fmt::Display;

use crate::position::PositionRange;

/// Machine-readable identifiers for every failure the pipeline can report.
///
/// The `Display` form is the kebab-case code carried on the wire and in
/// JSON error envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Lexical
    /// A quoted string reached the end of input without its closing quote.
    StringNotClosed,
    /// A `\u`/`\x` escape was malformed.
    InvalidEscapeSequence,
    /// An annotated string used an annotation other than `r`, `b`, `d`, `t` or `dt`.
    UnsupportedAnnotation,
    /// A `d'…'`, `t'…'` or `dt'…'` literal was not valid ISO-8601.
    InvalidDatetime,
    /// A `b'…'` literal did not hold valid base64.
    InvalidBase64,

    // Syntactic
    /// A token appeared where the grammar does not allow it.
    UnexpectedToken,
    /// An open bracket was never matched by its closing bracket.
    ExpectingBracket,
    /// A positional member appeared where only keyed members are allowed.
    UnexpectedPositionalMember,
    /// A member key was not a string.
    InvalidKey,
    /// A section referenced a schema but none is in scope.
    SchemaMissing,
    /// A header definition row could not be interpreted.
    InvalidDefinition,

    // Schema
    /// The schema source is structurally invalid.
    InvalidSchema,
    /// A `$name` reference points at a definition that is not a schema.
    SchemaNotFound,
    /// A `$name` reference points at no definition at all.
    SchemaNotDefined,
    /// A schema or member name is not a legal identifier.
    InvalidSchemaName,
    /// A member definition was empty.
    EmptyMemberdef,
    /// A member definition is malformed or uses an unknown option.
    InvalidMemberdef,
    /// A member definition names a type that is not registered.
    InvalidType,

    // Validation
    /// A required member had no value.
    ValueRequired,
    /// A value was not the object the schema requires.
    InvalidObject,
    /// A keyed member is not part of a closed schema.
    UnknownMember,
    /// The same key appeared twice in one object.
    DuplicateMember,
    /// A row carried more positional values than the schema has members.
    AdditionalValuesNotAllowed,
    /// An array value failed validation.
    InvalidArray,
    /// A value was not an array.
    NotAnArray,
    /// A value was not a string.
    NotAString,
    /// A string failed email validation.
    InvalidEmail,
    /// A string failed URL validation.
    InvalidUrl,
    /// A length constraint was violated.
    InvalidLength,
    /// A `minLength` constraint was violated.
    InvalidMinLength,
    /// A `maxLength` constraint was violated.
    InvalidMaxLength,
    /// A `pattern` constraint was violated.
    InvalidPattern,
    /// A value was not a number.
    NotANumber,
    /// A value was not an integer where one was required.
    NotAnInteger,
    /// A value was not a bigint.
    NotABigint,
    /// A value was not a decimal.
    NotADecimal,
    /// A value was not a datetime.
    NotADatetime,
    /// A value was not a date.
    NotADate,
    /// A value was not a time.
    NotATime,
    /// A numeric value fell outside `min`/`max` or the target width.
    OutOfRange,
    /// A `min`/`max` pair (or precision/scale pair) is itself inconsistent.
    InvalidRange,
    /// A value was not a boolean.
    NotABool,
    /// A value was not one of the permitted `choices`.
    InvalidChoice,
    /// An `@name` reference points at no definition.
    VariableNotDefined,
    /// A null value reached a member that does not allow null.
    NullNotAllowed,
    /// A numeric value had a representation the target type cannot hold.
    UnsupportedNumberType,
    /// A positional member followed a keyed member in the same row.
    PositionalAfterKeyword,
    /// Schema references form a cycle with no optional or array break.
    CircularReference,
}

impl ErrorCode {
    /// The kebab-case wire form of this code.
    pub fn as_str(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            StringNotClosed => "string-not-closed",
            InvalidEscapeSequence => "invalid-escape-sequence",
            UnsupportedAnnotation => "unsupported-annotation",
            InvalidDatetime => "invalid-datetime",
            InvalidBase64 => "invalid-base64",
            UnexpectedToken => "unexpected-token",
            ExpectingBracket => "expecting-bracket",
            UnexpectedPositionalMember => "unexpected-positional-member",
            InvalidKey => "invalid-key",
            SchemaMissing => "schema-missing",
            InvalidDefinition => "invalid-definition",
            InvalidSchema => "invalid-schema",
            SchemaNotFound => "schema-not-found",
            SchemaNotDefined => "schema-not-defined",
            InvalidSchemaName => "invalid-schema-name",
            EmptyMemberdef => "empty-memberdef",
            InvalidMemberdef => "invalid-memberdef",
            InvalidType => "invalid-type",
            ValueRequired => "value-required",
            InvalidObject => "invalid-object",
            UnknownMember => "unknown-member",
            DuplicateMember => "duplicate-member",
            AdditionalValuesNotAllowed => "additional-values-not-allowed",
            InvalidArray => "invalid-array",
            NotAnArray => "not-an-array",
            NotAString => "not-a-string",
            InvalidEmail => "invalid-email",
            InvalidUrl => "invalid-url",
            InvalidLength => "invalid-length",
            InvalidMinLength => "invalid-min-length",
            InvalidMaxLength => "invalid-max-length",
            InvalidPattern => "invalid-pattern",
            NotANumber => "not-a-number",
            NotAnInteger => "not-an-integer",
            NotABigint => "not-a-bigint",
            NotADecimal => "not-a-decimal",
            NotADatetime => "not-a-datetime",
            NotADate => "not-a-date",
            NotATime => "not-a-time",
            OutOfRange => "out-of-range",
            InvalidRange => "invalid-range",
            NotABool => "not-a-bool",
            InvalidChoice => "invalid-choice",
            VariableNotDefined => "variable-not-defined",
            NullNotAllowed => "null-not-allowed",
            UnsupportedNumberType => "unsupported-number-type",
            PositionalAfterKeyword => "positional-after-keyword",
            CircularReference => "circular-reference",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A structured error: code, human message, and where in the source (or in
/// which collection row) it arose.
///
/// Lexical errors are embedded in ERROR tokens, syntactic errors in error
/// nodes, and validation errors are raised from member parsing and caught
/// at collection boundaries; all of them travel as this one envelope.
#[derive(Debug, Clone, PartialEq, thiserror::Error, serde::Serialize)]
#[error("{code}: {message}")]
pub struct ErrorInfo {
    /// The machine-readable code.
    pub code: ErrorCode,
    /// A human-readable description of the failure.
    pub message: String,
    /// The source span the error points at, when one is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionRange>,
    /// The member path (`a.b.c`) the error applies to, when one is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// The row index within the owning collection, when the error was
    /// captured at a collection boundary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_index: Option<usize>,
}

impl ErrorInfo {
    /// Constructs an error with no position attached yet.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ErrorInfo {
            code,
            message: message.into(),
            position: None,
            path: None,
            collection_index: None,
        }
    }

    /// Attaches a source span.
    pub fn with_position(mut self, position: PositionRange) -> Self {
        self.position = Some(position);
        self
    }

    /// Attaches a source span only if none is present yet.
    pub fn or_position(mut self, position: PositionRange) -> Self {
        self.position.get_or_insert(position);
        self
    }

    /// Attaches a member path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Annotates the error with the collection row it belongs to.
    pub fn with_index(mut self, index: usize) -> Self {
        self.collection_index = Some(index);
        self
    }

    /// The `{ "__error": true, … }` envelope used when an error is rendered
    /// inside a collection's JSON form.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("__error".into(), serde_json::Value::Bool(true));
        map.insert("message".into(), self.message.clone().into());
        map.insert("code".into(), self.code.as_str().into());
        if let Some(path) = &self.path {
            map.insert("path".into(), path.clone().into());
        }
        if let Some(position) = &self.position {
            map.insert(
                "position".into(),
                serde_json::json!({
                    "pos": position.start.pos,
                    "row": position.start.row,
                    "col": position.start.col,
                }),
            );
        }
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    #[test]
    fn codes_render_kebab_case() {
        assert_eq!(ErrorCode::StringNotClosed.to_string(), "string-not-closed");
        assert_eq!(
            ErrorCode::AdditionalValuesNotAllowed.to_string(),
            "additional-values-not-allowed"
        );
        assert_eq!(
            ErrorCode::PositionalAfterKeyword.to_string(),
            "positional-after-keyword"
        );
    }

    #[test]
    fn envelope_shape() {
        let err = ErrorInfo::new(ErrorCode::NotANumber, "x is not a number")
            .with_position(PositionRange::at(Position::new(4, 1, 5)))
            .with_path("a.b");
        let json = err.to_json();
        assert_eq!(json["__error"], serde_json::json!(true));
        assert_eq!(json["code"], serde_json::json!("not-a-number"));
        assert_eq!(json["path"], serde_json::json!("a.b"));
        assert_eq!(json["position"]["row"], serde_json::json!(1));
    }

    #[test]
    fn or_position_keeps_existing() {
        let first = PositionRange::at(Position::new(0, 1, 1));
        let second = PositionRange::at(Position::new(9, 2, 1));
        let err = ErrorInfo::new(ErrorCode::ValueRequired, "missing")
            .with_position(first)
            .or_position(second);
        assert_eq!(err.position, Some(first));
    }
}
