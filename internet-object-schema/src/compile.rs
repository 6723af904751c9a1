//! Schema source (an object literal in the format's own syntax) to the
//! immutable [`Schema`] model. Member keys carry `?`/`*` suffixes, values
//! name a type, defer to a `$schema` reference, open a nested schema, or
//! wrap a type with an options object; a trailing bare `*` opens the
//! schema to extra members.

use std::sync::Arc;

use internet_object_core::{ErrorCode, ErrorInfo, Value};
use internet_object_syntax::{MemberNode, Node, ObjectNode};
use regex::Regex;

use crate::memberdef::MemberDef;
use crate::model::{Open, Schema};
use crate::types::{TypeDef, TypeRegistry};

/// Compiles a schema object into the frozen model.
pub fn compile_schema(
    name: &str,
    node: &ObjectNode,
    registry: &TypeRegistry,
) -> Result<Arc<Schema>, ErrorInfo> {
    compile_schema_at(name, "", node, registry)
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn compile_schema_at(
    name: &str,
    path: &str,
    node: &ObjectNode,
    registry: &TypeRegistry,
) -> Result<Arc<Schema>, ErrorInfo> {
    let mut builder = Schema::builder(name);
    if node.is_empty() {
        builder.set_open(Open::Any);
        return Ok(Arc::new(builder.build()));
    }
    let last = node.members.len() - 1;
    for (index, member) in node.members.iter().enumerate() {
        // The open marker, bare or constrained, must close the schema.
        if let Some(open) = open_marker(member, path, registry)? {
            if index != last {
                return Err(ErrorInfo::new(
                    ErrorCode::InvalidSchema,
                    "\"*\" must be the final member of a schema",
                )
                .with_position(member.range));
            }
            builder.set_open(open);
            continue;
        }
        let (member_name, def) = compile_member(member, path, registry)?;
        builder.add(member_name, def).map_err(|e| e.or_position(member.range))?;
    }
    Ok(Arc::new(builder.build()))
}

fn open_marker(
    member: &MemberNode,
    path: &str,
    registry: &TypeRegistry,
) -> Result<Option<Open>, ErrorInfo> {
    match (&member.key, &member.value) {
        (None, Some(Node::Token(token))) if token.text() == Some("*") => Ok(Some(Open::Any)),
        (Some(key), value) if key.text() == Some("*") => {
            let Some(value) = value else {
                return Err(ErrorInfo::new(
                    ErrorCode::EmptyMemberdef,
                    "\"*:\" needs a member definition",
                )
                .with_position(member.range));
            };
            let def = compile_member_def(&join_path(path, "*"), value, registry)?;
            Ok(Some(Open::Constrained(Box::new(def))))
        }
        _ => Ok(None),
    }
}

fn compile_member(
    member: &MemberNode,
    path: &str,
    registry: &TypeRegistry,
) -> Result<(String, MemberDef), ErrorInfo> {
    match &member.key {
        Some(key) => {
            let raw = key.text().unwrap_or_default();
            let (name, optional, nullable) = member_name(raw)
                .ok_or_else(|| {
                    ErrorInfo::new(
                        ErrorCode::InvalidSchemaName,
                        format!("\"{raw}\" is not a valid member name"),
                    )
                    .with_position(key.range)
                })?;
            let Some(value) = &member.value else {
                return Err(ErrorInfo::new(
                    ErrorCode::EmptyMemberdef,
                    format!("member \"{name}\" has no definition"),
                )
                .with_position(member.range));
            };
            let mut def = compile_member_def(&join_path(path, &name), value, registry)
                .map_err(|e| e.or_position(member.range))?;
            def.optional |= optional;
            def.nullable |= nullable;
            Ok((name, def))
        }
        None => {
            // A keyless string is a member name with the default type.
            let text = member
                .value
                .as_ref()
                .and_then(Node::as_token)
                .filter(|t| t.is_string())
                .and_then(|t| t.text());
            let Some(text) = text else {
                return Err(ErrorInfo::new(
                    ErrorCode::InvalidSchema,
                    "schema members must be named",
                )
                .with_position(member.range));
            };
            let (name, optional, nullable) = member_name(text).ok_or_else(|| {
                ErrorInfo::new(
                    ErrorCode::InvalidSchemaName,
                    format!("\"{text}\" is not a valid member name"),
                )
                .with_position(member.range)
            })?;
            let mut def = MemberDef::any();
            def.path = join_path(path, &name);
            def.optional = optional;
            def.nullable = nullable;
            Ok((name, def))
        }
    }
}

/// Splits the `?`/`*` suffixes off a member name.
fn member_name(raw: &str) -> Option<(String, bool, bool)> {
    let mut name = raw;
    let mut optional = false;
    let mut nullable = false;
    loop {
        if let Some(rest) = name.strip_suffix('?') {
            if optional {
                return None;
            }
            optional = true;
            name = rest;
        } else if let Some(rest) = name.strip_suffix('*') {
            if nullable {
                return None;
            }
            nullable = true;
            name = rest;
        } else {
            break;
        }
    }
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some((name.to_string(), optional, nullable))
}

/// Compiles a single member definition from its value node. This is also
/// the entry point for array element definitions.
pub fn compile_member_def(
    path: &str,
    node: &Node,
    registry: &TypeRegistry,
) -> Result<MemberDef, ErrorInfo> {
    match node {
        Node::Token(token) if token.is_string() => {
            let text = token.text().unwrap_or_default();
            if text.starts_with('$') {
                let mut def = MemberDef::new("object");
                def.path = path.to_string();
                def.schema_ref = Some(text.to_string());
                return Ok(def);
            }
            if registry.contains(text) {
                let mut def = MemberDef::new(text);
                def.path = path.to_string();
                return Ok(def);
            }
            Err(ErrorInfo::new(
                ErrorCode::InvalidType,
                format!("\"{text}\" is not a registered type"),
            )
            .with_position(token.range))
        }
        Node::Token(token) => Err(ErrorInfo::new(
            ErrorCode::InvalidMemberdef,
            format!("\"{}\" cannot define a member", token.raw),
        )
        .with_position(token.range)),
        Node::Object(object) => compile_object_def(path, object, registry),
        Node::Array(array) => {
            let mut def = MemberDef::new("array");
            def.path = path.to_string();
            match array.elements.len() {
                0 => {
                    let mut element = MemberDef::any();
                    element.path = path.to_string();
                    element.optional = true;
                    element.nullable = true;
                    def.of = Some(Box::new(element));
                }
                1 => {
                    let element = compile_member_def(path, &array.elements[0], registry)?;
                    def.of = Some(Box::new(element));
                }
                _ => {
                    return Err(ErrorInfo::new(
                        ErrorCode::InvalidSchema,
                        "an array definition takes at most one element definition",
                    )
                    .with_position(array.range));
                }
            }
            Ok(def)
        }
        Node::Error(error) => Err(error.error.clone()),
    }
}

fn compile_object_def(
    path: &str,
    object: &ObjectNode,
    registry: &TypeRegistry,
) -> Result<MemberDef, ErrorInfo> {
    if object.is_empty() {
        let mut def = MemberDef::new("object");
        def.path = path.to_string();
        def.schema = Some(Arc::new(Schema::any(path)));
        return Ok(def);
    }

    // `{string, …}` / `{$ref, …}`: the first keyless string opens the
    // type-with-options form.
    let leading = object.members.first().and_then(|m| match (&m.key, &m.value) {
        (None, Some(Node::Token(token))) if token.is_string() => token.text(),
        _ => None,
    });
    if let Some(text) = leading {
        if let Some(base) = type_with_options_base(path, text, registry) {
            return apply_options(base, &object.members[1..], path, registry);
        }
    }

    // `{type: string, …}` names the type through a keyed member.
    let type_member = object.members.iter().position(|m| {
        m.key.as_ref().and_then(|k| k.text()) == Some("type")
            && matches!(&m.value, Some(Node::Token(t)) if t.is_string())
    });
    if let Some(at) = type_member {
        let text = object.members[at]
            .value
            .as_ref()
            .and_then(Node::as_token)
            .and_then(|t| t.text())
            .unwrap_or_default();
        if let Some(base) = type_with_options_base(path, text, registry) {
            let rest: Vec<&MemberNode> = object
                .members
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != at)
                .map(|(_, m)| m)
                .collect();
            return apply_options_ref(base, &rest, path, registry);
        }
    }

    // Otherwise it is a nested schema.
    let schema = compile_schema_at(path, path, object, registry)?;
    let mut def = MemberDef::new("object");
    def.path = path.to_string();
    def.schema = Some(schema);
    Ok(def)
}

fn type_with_options_base(path: &str, text: &str, registry: &TypeRegistry) -> Option<MemberDef> {
    if text.starts_with('$') {
        let mut def = MemberDef::new("object");
        def.path = path.to_string();
        def.schema_ref = Some(text.to_string());
        return Some(def);
    }
    if registry.contains(text) {
        let mut def = MemberDef::new(text);
        def.path = path.to_string();
        return Some(def);
    }
    None
}

fn apply_options(
    def: MemberDef,
    members: &[MemberNode],
    path: &str,
    registry: &TypeRegistry,
) -> Result<MemberDef, ErrorInfo> {
    let refs: Vec<&MemberNode> = members.iter().collect();
    apply_options_ref(def, &refs, path, registry)
}

fn apply_options_ref(
    mut def: MemberDef,
    members: &[&MemberNode],
    path: &str,
    registry: &TypeRegistry,
) -> Result<MemberDef, ErrorInfo> {
    let type_def = registry.get(&def.type_name).ok_or_else(|| {
        ErrorInfo::new(
            ErrorCode::InvalidType,
            format!("\"{}\" is not a registered type", def.type_name),
        )
    })?;
    for member in members {
        let Some(key) = member.key.as_ref().and_then(|k| k.text()) else {
            return Err(ErrorInfo::new(
                ErrorCode::InvalidMemberdef,
                "type options must be keyed",
            )
            .with_position(member.range));
        };
        if !type_def.option_keys().contains(&key) {
            return Err(ErrorInfo::new(
                ErrorCode::InvalidMemberdef,
                format!(
                    "type \"{}\" does not accept the option \"{key}\"",
                    def.type_name
                ),
            )
            .with_position(member.range));
        }
        let Some(value) = &member.value else {
            return Err(ErrorInfo::new(
                ErrorCode::InvalidMemberdef,
                format!("option \"{key}\" has no value"),
            )
            .with_position(member.range));
        };
        match key {
            "optional" => def.optional = expect_bool(key, value)?,
            "null" => def.nullable = expect_bool(key, value)?,
            "default" => def.default_value = Some(option_value(value)?),
            "choices" => {
                let Node::Array(array) = value else {
                    return Err(ErrorInfo::new(
                        ErrorCode::InvalidMemberdef,
                        "\"choices\" takes an array",
                    )
                    .with_position(value.range()));
                };
                let mut choices = Vec::with_capacity(array.elements.len());
                for element in &array.elements {
                    choices.push(option_value(element)?);
                }
                def.choices = Some(choices);
            }
            "min" => def.min = Some(option_value(value)?),
            "max" => def.max = Some(option_value(value)?),
            "minLength" => def.min_length = Some(option_value(value)?),
            "maxLength" => def.max_length = Some(option_value(value)?),
            "pattern" => def.pattern = Some(option_value(value)?),
            "of" => {
                def.of = Some(Box::new(compile_member_def(path, value, registry)?));
            }
            _ => {
                return Err(ErrorInfo::new(
                    ErrorCode::InvalidMemberdef,
                    format!("unsupported option \"{key}\""),
                )
                .with_position(member.range));
            }
        }
    }
    if let Some(Value::String(pattern)) = &def.pattern {
        // Anchor so the whole value must match, as constraint patterns do.
        def.compiled_pattern = Some(Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            ErrorInfo::new(
                ErrorCode::InvalidMemberdef,
                format!("\"{pattern}\" is not a valid pattern: {e}"),
            )
        })?);
    }
    Ok(def)
}

fn expect_bool(key: &str, node: &Node) -> Result<bool, ErrorInfo> {
    match node {
        Node::Token(token) => {
            if let Value::Bool(flag) = token.value {
                return Ok(flag);
            }
            Err(ErrorInfo::new(
                ErrorCode::InvalidMemberdef,
                format!("option \"{key}\" takes true or false"),
            )
            .with_position(token.range))
        }
        other => Err(ErrorInfo::new(
            ErrorCode::InvalidMemberdef,
            format!("option \"{key}\" takes true or false"),
        )
        .with_position(other.range())),
    }
}

/// A literal option value: token values pass through, arrays and objects
/// convert member-wise. `@variable` references stay textual for the
/// processor to resolve.
fn option_value(node: &Node) -> Result<Value, ErrorInfo> {
    match node {
        Node::Token(token) => Ok(token.value.clone()),
        Node::Array(array) => {
            let mut items = Vec::with_capacity(array.elements.len());
            for element in &array.elements {
                items.push(option_value(element)?);
            }
            Ok(Value::Array(items))
        }
        Node::Object(object) => {
            let mut result = internet_object_core::InternetObject::new();
            for member in &object.members {
                let value = match &member.value {
                    Some(value) => option_value(value)?,
                    None => Value::Null,
                };
                match member.key.as_ref().and_then(|k| k.text()) {
                    Some(key) => result.set(key, value),
                    None => result.push(value),
                }
            }
            Ok(Value::Object(result))
        }
        Node::Error(error) => Err(error.error.clone()),
    }
}
