//! The registry of leaf and container types. Every type implements one
//! uniform contract: coerce a present, non-null, already-dereferenced
//! value into its canonical host representation, then apply the
//! constraints its member definition carries, in the documented order.
//!
//! The earlier steps of the contract (missing values, defaults, null
//! handling, `@`/`$` reference resolution) are shared and live in the
//! processor's front door, so individual types never see them.

use std::cmp::Ordering;

use indexmap::IndexMap;
use internet_object_core::{ErrorCode, ErrorInfo, Value};

use crate::definitions::DefValue;
use crate::memberdef::MemberDef;
use crate::processor::{ProcessContext, Source};

mod boolean;
mod containers;
mod numbers;
mod strings;
mod temporal;

/// One registered type: its options vocabulary and its parse step.
pub trait TypeDef: Send + Sync {
    /// The option keys this type's options object accepts.
    fn option_keys(&self) -> &'static [&'static str];

    /// Coerces `source` to this type's canonical value and applies the
    /// member's constraints. `source` is never missing, never null, and
    /// never an unresolved reference.
    fn parse(
        &self,
        source: Source<'_>,
        member: &MemberDef,
        ctx: &ProcessContext<'_>,
    ) -> Result<Value, ErrorInfo>;
}

/// The closed set of named types a schema may use. Registered once at
/// startup and read-only afterwards, so a registry can be shared freely.
pub struct TypeRegistry {
    types: IndexMap<&'static str, Box<dyn TypeDef>>,
}

impl TypeRegistry {
    /// The standard registry with every built-in type.
    pub fn standard() -> Self {
        let mut registry = TypeRegistry {
            types: IndexMap::new(),
        };
        registry.register("any", Box::new(containers::AnyType));
        registry.register("string", Box::new(strings::StringType::plain()));
        registry.register("email", Box::new(strings::StringType::email()));
        registry.register("url", Box::new(strings::StringType::url()));
        registry.register("id", Box::new(strings::StringType::id()));
        registry.register("number", Box::new(numbers::NumberType::float()));
        registry.register("int", Box::new(numbers::NumberType::int()));
        registry.register("bigint", Box::new(numbers::NumberType::bigint()));
        registry.register("decimal", Box::new(numbers::NumberType::decimal()));
        registry.register("bool", Box::new(boolean::BoolType));
        registry.register("date", Box::new(temporal::TemporalType::date()));
        registry.register("time", Box::new(temporal::TemporalType::time()));
        registry.register("datetime", Box::new(temporal::TemporalType::datetime()));
        registry.register("array", Box::new(containers::ArrayType));
        registry.register("object", Box::new(containers::ObjectType));
        registry
    }

    /// Registers (or replaces) a type.
    pub fn register(&mut self, name: &'static str, def: Box<dyn TypeDef>) {
        self.types.insert(name, def);
    }

    /// The type registered under `name`.
    pub fn get(&self, name: &str) -> Option<&dyn TypeDef> {
        self.types.get(name).map(|def| def.as_ref())
    }

    /// Whether `name` is a registered type.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered type names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().copied()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}

// Constraint plumbing shared by the type implementations.

/// Resolves an option value that may be an `@variable` reference.
pub(crate) fn resolve_option(value: &Value, ctx: &ProcessContext<'_>) -> Result<Value, ErrorInfo> {
    if let Value::String(text) = value {
        if text.starts_with('@') || text.starts_with('$') {
            return match ctx.defs().get_v(text)? {
                DefValue::Value(resolved) => Ok(resolved.clone()),
                DefValue::Schema(_) => Err(ErrorInfo::new(
                    ErrorCode::InvalidDefinition,
                    format!("\"{text}\" names a schema where a value is required"),
                )),
            };
        }
    }
    Ok(value.clone())
}

/// Numeric comparison across the three numeric representations.
pub(crate) fn compare_numeric(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y),
        (Value::BigInt(x), Value::BigInt(y)) => Some(x.cmp(y)),
        (Value::Decimal(x), Value::Decimal(y)) => Some(x.cmp(y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    compare_numeric(a, b) == Some(Ordering::Equal)
}

/// Enforces the `choices` constraint, resolving `@variable` entries.
pub(crate) fn check_choices(
    value: &Value,
    member: &MemberDef,
    ctx: &ProcessContext<'_>,
) -> Result<(), ErrorInfo> {
    let Some(choices) = &member.choices else {
        return Ok(());
    };
    for choice in choices {
        if values_equal(&resolve_option(choice, ctx)?, value) {
            return Ok(());
        }
    }
    Err(ErrorInfo::new(
        ErrorCode::InvalidChoice,
        format!("\"{value}\" is not one of the permitted choices"),
    ))
}

/// Reads a length option (`minLength`/`maxLength`) as a count.
pub(crate) fn option_usize(
    value: &Value,
    key: &str,
    ctx: &ProcessContext<'_>,
) -> Result<usize, ErrorInfo> {
    match resolve_option(value, ctx)? {
        Value::Number(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as usize),
        other => Err(ErrorInfo::new(
            ErrorCode::InvalidMemberdef,
            format!("\"{key}\" must be a non-negative integer, not \"{other}\""),
        )),
    }
}
