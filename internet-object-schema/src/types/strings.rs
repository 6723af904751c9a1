use addr::parse_email_address;
use internet_object_core::{ErrorCode, ErrorInfo, Value};
use lazy_static::lazy_static;
use regex::Regex;

use crate::memberdef::MemberDef;
use crate::processor::{ProcessContext, Source};
use crate::types::{check_choices, option_usize, resolve_option, TypeDef};

lazy_static! {
    static ref ID_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("is a valid regex");
}

#[derive(Debug, Clone, Copy)]
enum StringKind {
    Plain,
    Email,
    Url,
    Id,
}

/// `string` and its format-checked flavours `email`, `url` and `id`.
pub(super) struct StringType {
    kind: StringKind,
}

impl StringType {
    pub(super) fn plain() -> Self {
        StringType {
            kind: StringKind::Plain,
        }
    }

    pub(super) fn email() -> Self {
        StringType {
            kind: StringKind::Email,
        }
    }

    pub(super) fn url() -> Self {
        StringType {
            kind: StringKind::Url,
        }
    }

    pub(super) fn id() -> Self {
        StringType {
            kind: StringKind::Id,
        }
    }
}

impl TypeDef for StringType {
    fn option_keys(&self) -> &'static [&'static str] {
        &[
            "default", "choices", "null", "optional", "minLength", "maxLength", "pattern",
        ]
    }

    fn parse(
        &self,
        source: Source<'_>,
        member: &MemberDef,
        ctx: &ProcessContext<'_>,
    ) -> Result<Value, ErrorInfo> {
        let text = match source.scalar() {
            Some(Value::String(text)) => text.clone(),
            Some(other) => {
                return Err(ErrorInfo::new(
                    ErrorCode::NotAString,
                    format!("expected a string, found {}", other.type_name()),
                ));
            }
            None => {
                return Err(ErrorInfo::new(
                    ErrorCode::NotAString,
                    "expected a string, found a container",
                ));
            }
        };
        let value = Value::String(text.clone());
        check_choices(&value, member, ctx)?;

        let length = text.chars().count();
        if let Some(min) = &member.min_length {
            let min = option_usize(min, "minLength", ctx)?;
            if length < min {
                return Err(ErrorInfo::new(
                    ErrorCode::InvalidMinLength,
                    format!("\"{text}\" is shorter than the minimum length {min}"),
                ));
            }
        }
        if let Some(max) = &member.max_length {
            let max = option_usize(max, "maxLength", ctx)?;
            if length > max {
                return Err(ErrorInfo::new(
                    ErrorCode::InvalidMaxLength,
                    format!("\"{text}\" is longer than the maximum length {max}"),
                ));
            }
        }
        if let Some(pattern_option) = &member.pattern {
            let matched = match &member.compiled_pattern {
                Some(pattern) => pattern.is_match(&text),
                None => {
                    // The pattern was an @variable; compile it now.
                    let resolved = resolve_option(pattern_option, ctx)?;
                    let Value::String(pattern) = resolved else {
                        return Err(ErrorInfo::new(
                            ErrorCode::InvalidMemberdef,
                            "\"pattern\" must be a string",
                        ));
                    };
                    Regex::new(&format!("^(?:{pattern})$"))
                        .map_err(|e| {
                            ErrorInfo::new(
                                ErrorCode::InvalidMemberdef,
                                format!("\"{pattern}\" is not a valid pattern: {e}"),
                            )
                        })?
                        .is_match(&text)
                }
            };
            if !matched {
                return Err(ErrorInfo::new(
                    ErrorCode::InvalidPattern,
                    format!("\"{text}\" does not match the required pattern"),
                ));
            }
        }

        match self.kind {
            StringKind::Plain => {}
            StringKind::Email => {
                if parse_email_address(&text).is_err() {
                    return Err(ErrorInfo::new(
                        ErrorCode::InvalidEmail,
                        format!("\"{text}\" is not a valid email address"),
                    ));
                }
            }
            StringKind::Url => {
                if url::Url::parse(&text).is_err() {
                    return Err(ErrorInfo::new(
                        ErrorCode::InvalidUrl,
                        format!("\"{text}\" is not a valid URL"),
                    ));
                }
            }
            StringKind::Id => {
                if !ID_RE.is_match(&text) {
                    return Err(ErrorInfo::new(
                        ErrorCode::InvalidPattern,
                        format!("\"{text}\" is not a valid identifier"),
                    ));
                }
            }
        }
        Ok(value)
    }
}
