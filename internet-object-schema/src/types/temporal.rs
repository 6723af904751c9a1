use internet_object_core::{
    datetime, ErrorCode, ErrorInfo, TemporalKind, TemporalValue, Value,
};
use time::OffsetDateTime;

use crate::memberdef::MemberDef;
use crate::processor::{ProcessContext, Source};
use crate::types::{check_choices, resolve_option, TypeDef};

/// `date`, `time` and `datetime`. Each accepts its own annotated literal
/// (or an already-typed temporal of the same kind) and, for convenience
/// with positional rows, a string in the matching ISO-8601 grammar.
pub(super) struct TemporalType {
    kind: TemporalKind,
}

impl TemporalType {
    pub(super) fn date() -> Self {
        TemporalType {
            kind: TemporalKind::Date,
        }
    }

    pub(super) fn time() -> Self {
        TemporalType {
            kind: TemporalKind::Time,
        }
    }

    pub(super) fn datetime() -> Self {
        TemporalType {
            kind: TemporalKind::DateTime,
        }
    }

    fn mismatch(&self, found: &str) -> ErrorInfo {
        let (code, wanted) = match self.kind {
            TemporalKind::Date => (ErrorCode::NotADate, "date"),
            TemporalKind::Time => (ErrorCode::NotATime, "time"),
            TemporalKind::DateTime => (ErrorCode::NotADatetime, "datetime"),
        };
        ErrorInfo::new(code, format!("expected a {wanted}, found {found}"))
    }

    fn parse_text(&self, text: &str) -> Option<OffsetDateTime> {
        match self.kind {
            TemporalKind::Date => datetime::parse_date(text),
            TemporalKind::Time => datetime::parse_time(text),
            TemporalKind::DateTime => datetime::parse_date_time(text),
        }
    }

    fn coerce(&self, scalar: &Value) -> Result<TemporalValue, ErrorInfo> {
        match scalar {
            Value::Temporal(temporal) if temporal.kind == self.kind => Ok(*temporal),
            Value::Temporal(temporal) => Err(self.mismatch(scalar_kind_name(temporal.kind))),
            Value::String(text) => self
                .parse_text(text)
                .map(|when| TemporalValue::new(self.kind, when))
                .ok_or_else(|| self.mismatch(&format!("\"{text}\""))),
            other => Err(self.mismatch(other.type_name())),
        }
    }
}

fn scalar_kind_name(kind: TemporalKind) -> &'static str {
    match kind {
        TemporalKind::Date => "date",
        TemporalKind::Time => "time",
        TemporalKind::DateTime => "datetime",
    }
}

impl TypeDef for TemporalType {
    fn option_keys(&self) -> &'static [&'static str] {
        &["default", "choices", "null", "optional", "min", "max"]
    }

    fn parse(
        &self,
        source: Source<'_>,
        member: &MemberDef,
        ctx: &ProcessContext<'_>,
    ) -> Result<Value, ErrorInfo> {
        let scalar = source
            .scalar()
            .ok_or_else(|| self.mismatch("a container"))?;
        let temporal = self.coerce(scalar)?;
        let value = Value::Temporal(temporal);

        check_choices(&value, member, ctx)?;

        if let Some(min) = &member.min {
            let min = self.option_instant(min, ctx)?;
            if temporal.when < min {
                return Err(ErrorInfo::new(
                    ErrorCode::OutOfRange,
                    format!("{} is before the minimum", temporal.canonical()),
                ));
            }
        }
        if let Some(max) = &member.max {
            let max = self.option_instant(max, ctx)?;
            if temporal.when > max {
                return Err(ErrorInfo::new(
                    ErrorCode::OutOfRange,
                    format!("{} is after the maximum", temporal.canonical()),
                ));
            }
        }
        Ok(value)
    }
}

impl TemporalType {
    fn option_instant(
        &self,
        option: &Value,
        ctx: &ProcessContext<'_>,
    ) -> Result<OffsetDateTime, ErrorInfo> {
        match resolve_option(option, ctx)? {
            Value::Temporal(temporal) => Ok(temporal.when),
            Value::String(text) => self.parse_text(&text).ok_or_else(|| {
                ErrorInfo::new(
                    ErrorCode::InvalidMemberdef,
                    format!("\"{text}\" is not a valid bound for this member"),
                )
            }),
            other => Err(ErrorInfo::new(
                ErrorCode::InvalidMemberdef,
                format!("\"{other}\" is not a valid bound for this member"),
            )),
        }
    }
}
