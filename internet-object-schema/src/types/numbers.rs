use internet_object_core::{Decimal, ErrorCode, ErrorInfo, Value};
use num_bigint::BigInt;

use crate::memberdef::MemberDef;
use crate::processor::{ProcessContext, Source};
use crate::types::{check_choices, compare_numeric, resolve_option, TypeDef};

#[derive(Debug, Clone, Copy)]
enum NumberKind {
    Float,
    Int,
    Big,
    Exact,
}

/// `number`, `int`, `bigint` and `decimal`.
pub(super) struct NumberType {
    kind: NumberKind,
}

impl NumberType {
    pub(super) fn float() -> Self {
        NumberType {
            kind: NumberKind::Float,
        }
    }

    pub(super) fn int() -> Self {
        NumberType {
            kind: NumberKind::Int,
        }
    }

    pub(super) fn bigint() -> Self {
        NumberType {
            kind: NumberKind::Big,
        }
    }

    pub(super) fn decimal() -> Self {
        NumberType {
            kind: NumberKind::Exact,
        }
    }
}

impl NumberType {
    fn coerce(&self, scalar: &Value) -> Result<Value, ErrorInfo> {
        match (self.kind, scalar) {
            (NumberKind::Float, Value::Number(n)) => Ok(Value::Number(*n)),
            (NumberKind::Float, Value::BigInt(_) | Value::Decimal(_)) => {
                Ok(Value::Number(scalar.as_f64().unwrap_or(f64::NAN)))
            }
            (NumberKind::Float, other) => Err(mismatch(ErrorCode::NotANumber, "number", other)),

            // Integer-only is a constraint, not a coercion; parse()
            // applies it after choices and range.
            (NumberKind::Int, Value::Number(n)) => Ok(Value::Number(*n)),
            (NumberKind::Int, Value::BigInt(b)) => Ok(Value::Number(
                Value::BigInt(b.clone()).as_f64().unwrap_or(f64::NAN),
            )),
            (NumberKind::Int, other) => Err(mismatch(ErrorCode::NotAnInteger, "int", other)),

            (NumberKind::Big, Value::BigInt(b)) => Ok(Value::BigInt(b.clone())),
            (NumberKind::Big, Value::Number(n)) => {
                if !n.is_finite() {
                    return Err(ErrorInfo::new(
                        ErrorCode::UnsupportedNumberType,
                        format!("{n} cannot be represented as a bigint"),
                    ));
                }
                if n.fract() != 0.0 {
                    return Err(ErrorInfo::new(
                        ErrorCode::NotABigint,
                        format!("{n} is not an integer"),
                    ));
                }
                Ok(Value::BigInt(BigInt::from(*n as i64)))
            }
            (NumberKind::Big, Value::Decimal(d)) if d.scale() == 0 => {
                Ok(Value::BigInt(d.coefficient().clone()))
            }
            (NumberKind::Big, other) => Err(mismatch(ErrorCode::NotABigint, "bigint", other)),

            (NumberKind::Exact, Value::Decimal(d)) => Ok(Value::Decimal(d.clone())),
            (NumberKind::Exact, Value::BigInt(b)) => {
                Ok(Value::Decimal(Decimal::new(b.clone(), 0)))
            }
            (NumberKind::Exact, Value::Number(n)) => {
                if !n.is_finite() {
                    return Err(ErrorInfo::new(
                        ErrorCode::UnsupportedNumberType,
                        format!("{n} cannot be represented as a decimal"),
                    ));
                }
                Decimal::parse(&n.to_string()).map(Value::Decimal)
            }
            (NumberKind::Exact, other) => Err(mismatch(ErrorCode::NotADecimal, "decimal", other)),
        }
    }
}

fn mismatch(code: ErrorCode, wanted: &str, found: &Value) -> ErrorInfo {
    ErrorInfo::new(
        code,
        format!("expected a {wanted}, found {}", found.type_name()),
    )
}

impl TypeDef for NumberType {
    fn option_keys(&self) -> &'static [&'static str] {
        &["default", "choices", "null", "optional", "min", "max"]
    }

    fn parse(
        &self,
        source: Source<'_>,
        member: &MemberDef,
        ctx: &ProcessContext<'_>,
    ) -> Result<Value, ErrorInfo> {
        let scalar = source.scalar().ok_or_else(|| {
            ErrorInfo::new(ErrorCode::NotANumber, "expected a number, found a container")
        })?;
        let value = self.coerce(scalar)?;

        check_choices(&value, member, ctx)?;

        let min = member
            .min
            .as_ref()
            .map(|m| resolve_option(m, ctx))
            .transpose()?;
        let max = member
            .max
            .as_ref()
            .map(|m| resolve_option(m, ctx))
            .transpose()?;
        if let (Some(min), Some(max)) = (&min, &max) {
            if compare_numeric(min, max) == Some(std::cmp::Ordering::Greater) {
                return Err(ErrorInfo::new(
                    ErrorCode::InvalidRange,
                    format!("min {min} exceeds max {max}"),
                ));
            }
        }
        if let Some(min) = &min {
            if compare_numeric(&value, min) == Some(std::cmp::Ordering::Less) {
                return Err(ErrorInfo::new(
                    ErrorCode::OutOfRange,
                    format!("{value} is below the minimum {min}"),
                ));
            }
        }
        if let Some(max) = &max {
            if compare_numeric(&value, max) == Some(std::cmp::Ordering::Greater) {
                return Err(ErrorInfo::new(
                    ErrorCode::OutOfRange,
                    format!("{value} is above the maximum {max}"),
                ));
            }
        }
        if let (NumberKind::Int, Value::Number(n)) = (self.kind, &value) {
            if !n.is_finite() || n.fract() != 0.0 {
                return Err(ErrorInfo::new(
                    ErrorCode::NotAnInteger,
                    format!("{n} is not an integer"),
                ));
            }
        }
        Ok(value)
    }
}
