use internet_object_core::{ErrorCode, ParseOptions, TemporalKind, Value};
use pretty_assertions::assert_eq;

use super::{annotation_prefix, at_boundary, section_header, tokenize};
use crate::token::{TokenSubtype, TokenType};

fn lex(source: &str) -> Vec<super::Token> {
    tokenize(source, &ParseOptions::default()).expect("recovery mode never errors")
}

fn types(source: &str) -> Vec<TokenType> {
    lex(source).iter().map(|t| t.token_type).collect()
}

#[test]
fn structural_symbols() {
    assert_eq!(
        types("{ } [ ] , :"),
        vec![
            TokenType::CurlyOpen,
            TokenType::CurlyClose,
            TokenType::BracketOpen,
            TokenType::BracketClose,
            TokenType::Comma,
            TokenType::Colon,
        ]
    );
}

#[test]
fn position_fidelity() {
    let source = "hello, {a: 25, b: \"x  y\"}\n~ 1, 2";
    for token in lex(source) {
        let span = &source[token.range.start.pos..token.range.end.pos];
        assert_eq!(span, token.raw, "token {:?}", token.token_type);
    }
}

#[test]
fn open_strings_trim_trailing_whitespace_only() {
    let tokens = lex("hello world  ,");
    assert_eq!(tokens[0].token_type, TokenType::String);
    assert_eq!(tokens[0].subtype, Some(TokenSubtype::OpenString));
    assert_eq!(tokens[0].value, Value::from("hello world"));
}

#[test]
fn open_string_escapes_protect_trailing_characters() {
    let tokens = lex(r"hello\,there");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].value, Value::from("hello,there"));
    // An escaped trailing space survives the trim.
    let tokens = lex("abc\\ ,");
    assert_eq!(tokens[0].value, Value::from("abc "));
}

#[test]
fn at_sign_does_not_terminate_open_strings() {
    let tokens = lex("user@example.com,");
    assert_eq!(tokens[0].value, Value::from("user@example.com"));
}

#[test]
fn regular_strings_collapse_whitespace() {
    let tokens = lex("\"a   b\n\t c\"");
    assert_eq!(tokens[0].value, Value::from("a b c"));
    assert_eq!(tokens[0].subtype, Some(TokenSubtype::RegularString));
}

#[test]
fn regular_string_escapes() {
    let tokens = lex(r#""a\tbA\x42""#);
    assert_eq!(tokens[0].value, Value::from("a\tbAB"));
    // Unknown escapes fall through as the literal character.
    let tokens = lex(r#""a\qb""#);
    assert_eq!(tokens[0].value, Value::from("aqb"));
}

#[test]
fn surrogate_pair_escapes_combine() {
    let tokens = lex("\"\\uD83D\\uDE00\"");
    assert_eq!(tokens[0].value, Value::from("\u{1F600}"));
}

#[test]
fn invalid_escape_recovers_with_error_token() {
    let tokens = lex(r#""bad \u12 escape""#);
    assert_eq!(tokens[0].token_type, TokenType::Error);
    assert_eq!(
        tokens[0].error.as_ref().unwrap().code,
        ErrorCode::InvalidEscapeSequence
    );
    // Content is preserved and scanning continued to the close quote.
    assert_eq!(tokens.len(), 1);
}

#[test]
fn strict_mode_raises_instead() {
    let options = ParseOptions {
        strict: true,
        ..ParseOptions::default()
    };
    let error = tokenize("\"never closed", &options).unwrap_err();
    assert_eq!(error.code, ErrorCode::StringNotClosed);
}

#[test]
fn unterminated_string_is_an_error_token() {
    let tokens = lex("\"never closed");
    assert_eq!(tokens[0].token_type, TokenType::Error);
    assert_eq!(
        tokens[0].error.as_ref().unwrap().code,
        ErrorCode::StringNotClosed
    );
}

#[test]
fn raw_strings_are_verbatim() {
    let tokens = lex("r'a  \\n  b'");
    assert_eq!(tokens[0].value, Value::from("a  \\n  b"));
    assert_eq!(tokens[0].subtype, Some(TokenSubtype::RawString));
    // Doubled quote is the quote itself.
    let tokens = lex("r'it''s'");
    assert_eq!(tokens[0].value, Value::from("it's"));
}

#[test]
fn binary_strings_decode_base64() {
    let tokens = lex("b'aGVsbG8='");
    assert_eq!(tokens[0].token_type, TokenType::Binary);
    assert_eq!(tokens[0].value, Value::Bytes(b"hello".to_vec()));

    let tokens = lex("b'!!!'");
    assert_eq!(tokens[0].token_type, TokenType::Error);
    assert_eq!(
        tokens[0].error.as_ref().unwrap().code,
        ErrorCode::InvalidBase64
    );
}

#[test]
fn temporal_annotations() {
    let tokens = lex("dt'2020-04-12T08:43:46.619Z' d'2020-04-12' t'08:43:46'");
    assert_eq!(tokens[0].token_type, TokenType::DateTime);
    assert_eq!(tokens[0].subtype, Some(TokenSubtype::DateTime));
    assert_eq!(tokens[1].subtype, Some(TokenSubtype::Date));
    assert_eq!(tokens[2].subtype, Some(TokenSubtype::Time));
    match &tokens[0].value {
        Value::Temporal(t) => assert_eq!(t.kind, TemporalKind::DateTime),
        other => panic!("expected temporal, got {other:?}"),
    }

    let tokens = lex("dt'not a date'");
    assert_eq!(
        tokens[0].error.as_ref().unwrap().code,
        ErrorCode::InvalidDatetime
    );
}

#[test]
fn unsupported_annotations_error() {
    let tokens = lex("xyz'content'");
    assert_eq!(tokens[0].token_type, TokenType::Error);
    assert_eq!(
        tokens[0].error.as_ref().unwrap().code,
        ErrorCode::UnsupportedAnnotation
    );
}

#[test]
fn numbers_in_four_bases() {
    let tokens = lex("25, -1.5e2, 0x1F, 0o17, 0b101");
    assert_eq!(tokens[0].value, Value::Number(25.0));
    assert_eq!(tokens[2].value, Value::Number(-150.0));
    assert_eq!(tokens[4].value, Value::Number(31.0));
    assert_eq!(tokens[4].subtype, Some(TokenSubtype::Hex));
    assert_eq!(tokens[6].value, Value::Number(15.0));
    assert_eq!(tokens[8].value, Value::Number(5.0));
}

#[test]
fn bigint_and_decimal_suffixes() {
    let tokens = lex("123n, -1.25m, 0xFFn");
    assert_eq!(tokens[0].token_type, TokenType::BigInt);
    assert_eq!(tokens[0].value, Value::BigInt(123.into()));
    assert_eq!(tokens[2].token_type, TokenType::Decimal);
    assert_eq!(tokens[2].raw, "-1.25m");
    assert_eq!(tokens[4].value, Value::BigInt(255.into()));
}

#[test]
fn special_number_literals() {
    let tokens = lex("Inf, +Inf, -Inf, NaN");
    assert_eq!(tokens[0].value, Value::Number(f64::INFINITY));
    assert_eq!(tokens[2].value, Value::Number(f64::INFINITY));
    assert_eq!(tokens[4].value, Value::Number(f64::NEG_INFINITY));
    assert!(matches!(tokens[6].value, Value::Number(n) if n.is_nan()));
}

#[test]
fn trailing_garbage_merges_into_open_string() {
    let tokens = lex("2abc,");
    assert_eq!(tokens[0].token_type, TokenType::String);
    assert_eq!(tokens[0].value, Value::from("2abc"));
    let tokens = lex("Infinity,");
    assert_eq!(tokens[0].value, Value::from("Infinity"));
    let tokens = lex("1.5n,");
    assert_eq!(tokens[0].value, Value::from("1.5n"));
}

#[test]
fn boolean_and_null_keywords() {
    let tokens = lex("true, false, T, F, null, N");
    assert_eq!(tokens[0].value, Value::Bool(true));
    assert_eq!(tokens[2].value, Value::Bool(false));
    assert_eq!(tokens[4].value, Value::Bool(true));
    assert_eq!(tokens[6].value, Value::Bool(false));
    assert_eq!(tokens[8].token_type, TokenType::Null);
    assert_eq!(tokens[10].token_type, TokenType::Null);
    // Followed by more letters they are open strings again.
    let tokens = lex("truely");
    assert_eq!(tokens[0].token_type, TokenType::String);
}

#[test]
fn comments_run_to_end_of_line() {
    let tokens = lex("1 # a comment, with: everything\n2");
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[1].value, Value::Number(2.0));
}

#[test]
fn section_separator_and_headers() {
    assert_eq!(
        types("---\na"),
        vec![TokenType::SectionSep, TokenType::String]
    );
    let tokens = lex("--- people: $person\n~ a");
    assert_eq!(tokens[0].token_type, TokenType::SectionSep);
    assert_eq!(tokens[1].token_type, TokenType::SectionName);
    assert_eq!(tokens[1].value, Value::from("people"));
    assert_eq!(tokens[2].token_type, TokenType::SectionSchema);
    assert_eq!(tokens[2].value, Value::from("$person"));
    assert_eq!(tokens[3].token_type, TokenType::CollectionStart);

    let tokens = lex("--- $person\n");
    assert_eq!(tokens[1].token_type, TokenType::SectionSchema);
    assert_eq!(tokens[1].value, Value::from("$person"));
}

#[test]
fn separator_terminates_open_strings() {
    let tokens = lex("name---");
    assert_eq!(tokens[0].value, Value::from("name"));
    assert_eq!(tokens[1].token_type, TokenType::SectionSep);
}

#[test]
fn collection_rows() {
    let tokens = lex("~ one, 1\n~ two, 2");
    let starts: Vec<_> = tokens
        .iter()
        .filter(|t| t.token_type == TokenType::CollectionStart)
        .collect();
    assert_eq!(starts.len(), 2);
}

#[test]
fn unicode_whitespace_is_skipped() {
    let tokens = lex("\u{00A0}\u{3000}42\u{FEFF}");
    assert_eq!(tokens[0].value, Value::Number(42.0));
}

#[test]
fn annotation_prefix_shapes() {
    assert_eq!(annotation_prefix("r'x'"), Some((1, '\'')));
    assert_eq!(annotation_prefix("dt\"x\""), Some((2, '"')));
    assert_eq!(annotation_prefix("abcd'x'"), Some((4, '\'')));
    assert_eq!(annotation_prefix("abcde'x'"), None);
    assert_eq!(annotation_prefix("'x'"), None);
    assert_eq!(annotation_prefix("r2'x'"), None);
}

#[test]
fn boundary_rules() {
    assert!(at_boundary(""));
    assert!(at_boundary(" x"));
    assert!(at_boundary(",x"));
    assert!(at_boundary("---"));
    assert!(!at_boundary("-x"));
    assert!(!at_boundary("abc"));
}

#[test]
fn rows_and_columns_are_one_based() {
    let tokens = lex("a, b,\n  c: 1");
    assert_eq!((tokens[0].range.start.row, tokens[0].range.start.col), (1, 1));
    // "b" sits at column 4 of line 1.
    assert_eq!((tokens[2].range.start.row, tokens[2].range.start.col), (1, 4));
    // "c" sits at column 3 of line 2, behind the indent.
    assert_eq!((tokens[4].range.start.row, tokens[4].range.start.col), (2, 3));
    let one = tokens.last().unwrap();
    assert_eq!(one.value, Value::Number(1.0));
    assert_eq!(one.range.start.row, 2);
}

#[test]
fn escaped_tilde_stays_in_the_string() {
    let tokens = lex("approx \\~5,");
    assert_eq!(tokens[0].value, Value::from("approx ~5"));
    // Unescaped it terminates the string instead.
    let tokens = lex("approx ~5");
    assert_eq!(tokens[0].value, Value::from("approx"));
    assert_eq!(tokens[1].token_type, TokenType::CollectionStart);
}

#[test]
fn open_strings_span_lines_until_a_terminator() {
    let tokens = lex("first line\nsecond line,");
    assert_eq!(tokens[0].value, Value::from("first line\nsecond line"));
}

#[test]
fn annotated_strings_accept_double_quotes() {
    let tokens = lex("b\"aGk=\" dt\"2020-04-12\"");
    assert_eq!(tokens[0].value, Value::Bytes(b"hi".to_vec()));
    assert_eq!(tokens[1].token_type, TokenType::DateTime);
}

#[test]
fn based_bigints() {
    let tokens = lex("0o17n, 0b101n");
    assert_eq!(tokens[0].value, Value::BigInt(15.into()));
    assert_eq!(tokens[0].subtype, Some(TokenSubtype::Octal));
    assert_eq!(tokens[2].value, Value::BigInt(5.into()));
}

#[test]
fn section_header_grammar() {
    assert_eq!(section_header("people").unwrap().1, (Some("people"), None));
    assert_eq!(
        section_header("people: $person").unwrap().1,
        (Some("people"), Some("person"))
    );
    assert_eq!(section_header("$person").unwrap().1, (None, Some("person")));
    assert!(section_header("1, 2, 3").is_err());
}
