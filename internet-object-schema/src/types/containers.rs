use std::sync::Arc;

use internet_object_core::{ErrorCode, ErrorInfo, Value};
use internet_object_syntax::Node;

use crate::memberdef::MemberDef;
use crate::model::Schema;
use crate::processor::{
    self, node_to_value, parse_member_value, ProcessContext, Source,
};
use crate::types::{check_choices, option_usize, TypeDef};

/// `any`: the value passes through untyped, with variables resolved.
pub(super) struct AnyType;

impl TypeDef for AnyType {
    fn option_keys(&self) -> &'static [&'static str] {
        &["default", "choices", "null", "optional"]
    }

    fn parse(
        &self,
        source: Source<'_>,
        member: &MemberDef,
        ctx: &ProcessContext<'_>,
    ) -> Result<Value, ErrorInfo> {
        let value = match source {
            Source::Node(node) => node_to_value(node, ctx)?,
            Source::Value(value) => value.clone(),
        };
        check_choices(&value, member, ctx)?;
        Ok(value)
    }
}

/// `array`: element-wise parse under `of`, then the length constraints.
pub(super) struct ArrayType;

impl TypeDef for ArrayType {
    fn option_keys(&self) -> &'static [&'static str] {
        &["default", "null", "optional", "of", "minLength", "maxLength"]
    }

    fn parse(
        &self,
        source: Source<'_>,
        member: &MemberDef,
        ctx: &ProcessContext<'_>,
    ) -> Result<Value, ErrorInfo> {
        let fallback;
        let of = match &member.of {
            Some(of) => of.as_ref(),
            None => {
                fallback = MemberDef::any();
                &fallback
            }
        };

        let mut items = Vec::new();
        match source {
            Source::Node(Node::Array(array)) => {
                for element in &array.elements {
                    let parsed =
                        parse_member_value(Some(Source::Node(element)), of, ctx, element.range())?;
                    items.push(parsed.unwrap_or(Value::Null));
                }
            }
            Source::Node(_) => {
                return Err(ErrorInfo::new(
                    ErrorCode::NotAnArray,
                    "expected an array",
                ));
            }
            Source::Value(Value::Array(values)) => {
                for value in values {
                    let parsed = parse_member_value(
                        Some(Source::Value(value)),
                        of,
                        ctx,
                        Default::default(),
                    )?;
                    items.push(parsed.unwrap_or(Value::Null));
                }
            }
            Source::Value(other) => {
                return Err(ErrorInfo::new(
                    ErrorCode::NotAnArray,
                    format!("expected an array, found {}", other.type_name()),
                ));
            }
        }

        if let Some(min) = &member.min_length {
            let min = option_usize(min, "minLength", ctx)?;
            if items.len() < min {
                return Err(ErrorInfo::new(
                    ErrorCode::InvalidLength,
                    format!("array has {} elements, minimum is {min}", items.len()),
                ));
            }
        }
        if let Some(max) = &member.max_length {
            let max = option_usize(max, "maxLength", ctx)?;
            if items.len() > max {
                return Err(ErrorInfo::new(
                    ErrorCode::InvalidLength,
                    format!("array has {} elements, maximum is {max}", items.len()),
                ));
            }
        }
        Ok(Value::Array(items))
    }
}

/// `object`: recursive processing under the member's inline schema, a
/// deferred `$name` reference, or (with neither) a fully open schema.
pub(super) struct ObjectType;

impl TypeDef for ObjectType {
    fn option_keys(&self) -> &'static [&'static str] {
        &["default", "null", "optional"]
    }

    fn parse(
        &self,
        source: Source<'_>,
        member: &MemberDef,
        ctx: &ProcessContext<'_>,
    ) -> Result<Value, ErrorInfo> {
        // The depth guard is what turns an unbounded `$self` recursion
        // into an `invalid-schema` failure instead of a stack overflow.
        let _guard = ctx.enter()?;
        let schema: Arc<Schema> = match (&member.schema, &member.schema_ref) {
            (Some(schema), _) => Arc::clone(schema),
            (None, Some(reference)) => processor::resolve_schema(reference, ctx)?,
            (None, None) => Arc::new(Schema::any(member.path.clone())),
        };
        match source {
            Source::Node(Node::Object(object)) => {
                processor::process_object(object, &schema, ctx).map(Value::Object)
            }
            Source::Node(_) => Err(ErrorInfo::new(
                ErrorCode::InvalidObject,
                "expected an object",
            )),
            Source::Value(Value::Object(object)) => {
                processor::process_host_object(object, &schema, ctx).map(Value::Object)
            }
            Source::Value(other) => Err(ErrorInfo::new(
                ErrorCode::InvalidObject,
                format!("expected an object, found {}", other.type_name()),
            )),
        }
    }
}
