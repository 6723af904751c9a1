//! The numeric literal sub-grammar: optional sign, then a based
//! (`0x`/`0o`/`0b`) or plain decimal body, then an optional `n` (bigint)
//! or `m` (decimal) suffix. `Inf` and `NaN` parse here too so the sign
//! handling stays in one place.

use nom::{
    branch::alt,
    bytes::complete::{is_a, tag},
    character::complete::{char, digit1, hex_digit1, one_of},
    combinator::{consumed, map, opt},
    sequence::{preceded, tuple},
    IResult,
};

use internet_object_core::{Decimal, Value};
use num_bigint::BigInt;

use crate::token::{TokenSubtype, TokenType};

type Res<T, U> = IResult<T, U, nom::error::VerboseError<T>>;

/// Which prefixed base a literal used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Base {
    Hex,
    Octal,
    Binary,
}

impl Base {
    fn radix(self) -> u32 {
        match self {
            Base::Hex => 16,
            Base::Octal => 8,
            Base::Binary => 2,
        }
    }

    fn subtype(self) -> TokenSubtype {
        match self {
            Base::Hex => TokenSubtype::Hex,
            Base::Octal => TokenSubtype::Octal,
            Base::Binary => TokenSubtype::Binary,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NumberBody<'t> {
    Based { base: Base, digits: &'t str },
    Plain { body: &'t str, integral: bool },
    Infinity,
    NotANumber,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NumberLiteral<'t> {
    pub raw: &'t str,
    pub negative: bool,
    pub body: NumberBody<'t>,
    pub suffix: Option<char>,
}

fn based(s: &str) -> Res<&str, NumberBody<'_>> {
    alt((
        map(
            preceded(alt((tag("0x"), tag("0X"))), hex_digit1),
            |digits| NumberBody::Based {
                base: Base::Hex,
                digits,
            },
        ),
        map(
            preceded(alt((tag("0o"), tag("0O"))), is_a("01234567")),
            |digits| NumberBody::Based {
                base: Base::Octal,
                digits,
            },
        ),
        map(preceded(alt((tag("0b"), tag("0B"))), is_a("01")), |digits| {
            NumberBody::Based {
                base: Base::Binary,
                digits,
            }
        }),
    ))(s)
}

fn plain(s: &str) -> Res<&str, NumberBody<'_>> {
    map(
        consumed(tuple((
            digit1,
            opt(preceded(char('.'), digit1)),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |(body, (_, fraction, exponent)): (&str, _)| NumberBody::Plain {
            body,
            integral: fraction.is_none() && exponent.is_none(),
        },
    )(s)
}

/// Recognises one numeric literal at the head of `s`, without deciding
/// whether what follows it lets it stand as a number token.
pub(crate) fn number_literal(s: &str) -> Res<&str, NumberLiteral<'_>> {
    map(
        consumed(tuple((
            opt(one_of("+-")),
            alt((
                based,
                map(tag("Inf"), |_| NumberBody::Infinity),
                map(tag("NaN"), |_| NumberBody::NotANumber),
                plain,
            )),
            opt(one_of("nm")),
        ))),
        |(raw, (sign, body, suffix))| NumberLiteral {
            raw,
            negative: sign == Some('-'),
            body,
            suffix,
        },
    )(s)
}

/// Decodes a recognised literal into its token classification and value.
/// Returns `None` for combinations the grammar cannot type (for example a
/// fractional bigint), which sends the text down the open-string path.
pub(crate) fn decode(literal: &NumberLiteral<'_>) -> Option<(TokenType, Option<TokenSubtype>, Value)> {
    let signed = |value: BigInt| if literal.negative { -value } else { value };
    match (&literal.body, literal.suffix) {
        (NumberBody::Based { base, digits }, None) => {
            let value = signed(BigInt::parse_bytes(digits.as_bytes(), base.radix())?);
            Some((
                TokenType::Number,
                Some(base.subtype()),
                Value::Number(bigint_to_f64(&value)),
            ))
        }
        (NumberBody::Based { base, digits }, Some('n')) => {
            let value = signed(BigInt::parse_bytes(digits.as_bytes(), base.radix())?);
            Some((TokenType::BigInt, Some(base.subtype()), Value::BigInt(value)))
        }
        (NumberBody::Plain { body, .. }, None) => {
            let magnitude: f64 = body.parse().ok()?;
            let value = if literal.negative { -magnitude } else { magnitude };
            Some((TokenType::Number, None, Value::Number(value)))
        }
        (NumberBody::Plain { body, integral: true }, Some('n')) => {
            let value = signed(BigInt::parse_bytes(body.as_bytes(), 10)?);
            Some((TokenType::BigInt, None, Value::BigInt(value)))
        }
        (NumberBody::Plain { body, .. }, Some('m')) => {
            let text = if literal.negative {
                format!("-{body}")
            } else {
                (*body).to_string()
            };
            let value = Decimal::parse(&text).ok()?;
            Some((TokenType::Decimal, None, Value::Decimal(value)))
        }
        (NumberBody::Infinity, None) => {
            let value = if literal.negative {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            };
            Some((TokenType::Number, None, Value::Number(value)))
        }
        (NumberBody::NotANumber, None) => Some((TokenType::Number, None, Value::Number(f64::NAN))),
        _ => None,
    }
}

fn bigint_to_f64(value: &BigInt) -> f64 {
    match i64::try_from(value.clone()) {
        Ok(n) => n as f64,
        Err(_) => value.to_string().parse().unwrap_or(f64::INFINITY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> (NumberLiteral<'_>, &str) {
        let (rest, literal) = number_literal(s).unwrap();
        (literal, rest)
    }

    #[test]
    fn plain_forms() {
        let (literal, rest) = parse("25,");
        assert_eq!(literal.raw, "25");
        assert_eq!(rest, ",");
        let (literal, _) = parse("-1.5e+3");
        assert!(literal.negative);
        assert!(matches!(
            literal.body,
            NumberBody::Plain {
                integral: false,
                ..
            }
        ));
    }

    #[test]
    fn based_forms() {
        let (literal, _) = parse("0x1F");
        assert!(matches!(
            literal.body,
            NumberBody::Based {
                base: Base::Hex,
                digits: "1F",
            }
        ));
        let (decoded_type, subtype, value) = decode(&literal).unwrap();
        assert_eq!(decoded_type, TokenType::Number);
        assert_eq!(subtype, Some(TokenSubtype::Hex));
        assert_eq!(value, Value::Number(31.0));
    }

    #[test]
    fn suffixes() {
        let (literal, _) = parse("123n");
        let (decoded_type, _, value) = decode(&literal).unwrap();
        assert_eq!(decoded_type, TokenType::BigInt);
        assert_eq!(value, Value::BigInt(123.into()));

        let (literal, _) = parse("-1.25m");
        let (decoded_type, _, value) = decode(&literal).unwrap();
        assert_eq!(decoded_type, TokenType::Decimal);
        assert_eq!(value.to_string(), "-1.25");

        // A fractional bigint has no decoding.
        let (literal, _) = parse("1.5n");
        assert!(decode(&literal).is_none());
    }

    #[test]
    fn special_values() {
        let (literal, _) = parse("-Inf");
        let (_, _, value) = decode(&literal).unwrap();
        assert_eq!(value, Value::Number(f64::NEG_INFINITY));
        let (literal, _) = parse("NaN");
        let (_, _, value) = decode(&literal).unwrap();
        assert!(matches!(value, Value::Number(n) if n.is_nan()));
    }

    #[test]
    fn a_bare_sign_is_not_a_number() {
        assert!(number_literal("-abc").is_err());
        assert!(number_literal("---").is_err());
    }
}
