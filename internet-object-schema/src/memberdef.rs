use std::sync::Arc;

use internet_object_core::Value;
use regex::Regex;

use crate::model::Schema;

/// The compiled description of one schema member: its type plus every
/// constraint the schema source attached to it.
///
/// Constraint fields hold [`Value`]s rather than native numbers because a
/// schema option may be an `@variable` reference, resolved only when the
/// member is processed.
#[derive(Debug, Clone, Default)]
pub struct MemberDef {
    /// The registered type name (`"string"`, `"number"`, …).
    pub type_name: String,
    /// The member's path within the root schema (`a.b.c`), used to anchor
    /// validation errors.
    pub path: String,
    /// `name?` — the member may be absent.
    pub optional: bool,
    /// `name*` — the member may be null.
    pub nullable: bool,
    /// The `default` option.
    pub default_value: Option<Value>,
    /// The `choices` option.
    pub choices: Option<Vec<Value>>,
    /// The `min` option (numbers, temporals).
    pub min: Option<Value>,
    /// The `max` option (numbers, temporals).
    pub max: Option<Value>,
    /// The `minLength` option (strings, arrays).
    pub min_length: Option<Value>,
    /// The `maxLength` option (strings, arrays).
    pub max_length: Option<Value>,
    /// The `pattern` option, as written.
    pub pattern: Option<Value>,
    /// `pattern` compiled ahead of time when it was a literal string.
    pub compiled_pattern: Option<Regex>,
    /// The nested schema, for `object` members with an inline schema.
    pub schema: Option<Arc<Schema>>,
    /// The element definition, for `array` members.
    pub of: Option<Box<MemberDef>>,
    /// A deferred `$name` reference, resolved against the definitions
    /// store at processing time.
    pub schema_ref: Option<String>,
}

impl MemberDef {
    /// A bare definition of the given type with no constraints.
    pub fn new(type_name: impl Into<String>) -> Self {
        MemberDef {
            type_name: type_name.into(),
            ..MemberDef::default()
        }
    }

    /// The `any` definition used for unconstrained open-schema members.
    pub fn any() -> Self {
        MemberDef::new("any")
    }

    /// Whether this member's type is one of the three temporal types.
    pub fn is_temporal(&self) -> bool {
        matches!(self.type_name.as_str(), "date" | "time" | "datetime")
    }
}

// `compiled_pattern` is a cache of `pattern`; two defs are structurally
// equal when every observable field matches.
impl PartialEq for MemberDef {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
            && self.path == other.path
            && self.optional == other.optional
            && self.nullable == other.nullable
            && self.default_value == other.default_value
            && self.choices == other.choices
            && self.min == other.min
            && self.max == other.max
            && self.min_length == other.min_length
            && self.max_length == other.max_length
            && self.pattern == other.pattern
            && self.schema == other.schema
            && self.of == other.of
            && self.schema_ref == other.schema_ref
    }
}
