use std::fmt::Display;

use num_bigint::BigInt;
use time::OffsetDateTime;

use crate::datetime;
use crate::decimal::Decimal;
use crate::object::InternetObject;

/// Which of the three temporal types a [`TemporalValue`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    /// A calendar date.
    Date,
    /// A time of day (anchored to 1900-01-01).
    Time,
    /// A full point in time.
    DateTime,
}

/// A point in time together with the surface type it was parsed as, so the
/// serializer can emit it back through the matching annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalValue {
    /// Date, time or datetime.
    pub kind: TemporalKind,
    /// The instant itself.
    pub when: OffsetDateTime,
}

impl TemporalValue {
    /// Constructs a temporal value.
    pub fn new(kind: TemporalKind, when: OffsetDateTime) -> Self {
        TemporalValue { kind, when }
    }

    /// The canonical hyphenated ISO-8601 rendering for this kind.
    pub fn canonical(&self) -> String {
        match self.kind {
            TemporalKind::Date => datetime::date_to_date_string(&self.when, true),
            TemporalKind::Time => datetime::date_to_time_string(&self.when, true, false),
            TemporalKind::DateTime => datetime::date_to_datetime_string(&self.when, true, false),
        }
    }
}

/// A typed Internet Object value: what the processor produces and the
/// serializer consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The explicit null (`N`).
    Null,
    /// A boolean (`true`, `false`, `T`, `F`).
    Bool(bool),
    /// An IEEE-754 number, including `Inf` and `NaN`.
    Number(f64),
    /// An arbitrary-precision integer (`…n`).
    BigInt(BigInt),
    /// An exact decimal (`…m`).
    Decimal(Decimal),
    /// A string in any of the three surface forms.
    String(String),
    /// Bytes decoded from a `b'…'` literal.
    Bytes(Vec<u8>),
    /// A date, time or datetime.
    Temporal(TemporalValue),
    /// An ordered object.
    Object(InternetObject),
    /// An ordered array.
    Array(Vec<Value>),
}

impl Value {
    /// The registry name of this value's type (`"string"`, `"number"`, …).
    /// Null reports `"any"` since it carries no type of its own.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "any",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Bytes(_) => "binary",
            Value::Temporal(t) => match t.kind {
                TemporalKind::Date => "date",
                TemporalKind::Time => "time",
                TemporalKind::DateTime => "datetime",
            },
            Value::Object(_) => "object",
            Value::Array(_) => "array",
        }
    }

    /// Whether this is the null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The numeric payload as `f64`, converting bigint and decimal lossily.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::BigInt(b) => Some(bigint_to_f64(b)),
            Value::Decimal(d) => Some(d.to_f64()),
            _ => None,
        }
    }

    /// The object payload, if this is an object.
    pub fn as_object(&self) -> Option<&InternetObject> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The array payload, if this is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Renders this value as `serde_json::Value`. Values JSON cannot hold
    /// natively (non-finite numbers, wide bigints, decimals, bytes,
    /// temporals) are rendered as strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => match serde_json::Number::from_f64(*n) {
                Some(number) => serde_json::Value::Number(number),
                None if n.is_nan() => serde_json::Value::String("NaN".into()),
                None if *n > 0.0 => serde_json::Value::String("Inf".into()),
                None => serde_json::Value::String("-Inf".into()),
            },
            Value::BigInt(b) => match i64::try_from(b.clone()) {
                Ok(n) => serde_json::Value::Number(n.into()),
                Err(_) => serde_json::Value::String(b.to_string()),
            },
            Value::Decimal(d) => serde_json::Value::String(d.to_string()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(bytes) => serde_json::Value::String(base64::encode(bytes)),
            Value::Temporal(t) => serde_json::Value::String(t.canonical()),
            Value::Object(object) => object.to_json(),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }
}

fn bigint_to_f64(value: &BigInt) -> f64 {
    // Exact for anything that fits an i64; wide values go through text.
    match i64::try_from(value.clone()) {
        Ok(n) => n as f64,
        Err(_) => value.to_string().parse().unwrap_or(f64::INFINITY),
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::BigInt(b) => write!(f, "{b}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::String(s) => f.write_str(s),
            Value::Bytes(bytes) => f.write_str(&base64::encode(bytes)),
            Value::Temporal(t) => f.write_str(&t.canonical()),
            Value::Object(_) | Value::Array(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Self {
        Value::BigInt(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<InternetObject> for Value {
    fn from(value: InternetObject) -> Self {
        Value::Object(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                let mut object = InternetObject::new();
                for (key, item) in map {
                    object.set(key, Value::from(item));
                }
                Value::Object(object)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        assert_eq!(Value::Number(1.0).type_name(), "number");
        assert_eq!(Value::from("x").type_name(), "string");
        assert_eq!(Value::Null.type_name(), "any");
    }

    #[test]
    fn json_handles_nonfinite_numbers() {
        assert_eq!(
            Value::Number(f64::INFINITY).to_json(),
            serde_json::json!("Inf")
        );
        assert_eq!(
            Value::Number(f64::NEG_INFINITY).to_json(),
            serde_json::json!("-Inf")
        );
        assert_eq!(Value::Number(f64::NAN).to_json(), serde_json::json!("NaN"));
        assert_eq!(Value::Number(2.5).to_json(), serde_json::json!(2.5));
    }

    #[test]
    fn json_round_trip_for_objects() {
        let source = serde_json::json!({"a": 1, "b": [true, null]});
        let value = Value::from(source.clone());
        assert_eq!(value.to_json(), source);
    }

    #[test]
    fn wide_bigint_renders_as_string() {
        let wide: BigInt = "123456789012345678901234567890".parse().unwrap();
        assert_eq!(
            Value::BigInt(wide).to_json(),
            serde_json::json!("123456789012345678901234567890")
        );
    }
}
