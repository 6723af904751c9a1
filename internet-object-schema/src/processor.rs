//! Applies a compiled schema to parsed data (or to a host value) and
//! yields typed objects and collections. Member binding runs in three
//! passes — positional, keyed, missing — and every validation failure is
//! a structured error carrying the source position it arose at.

use std::cell::Cell;
use std::collections::HashSet;
use std::sync::Arc;

use internet_object_core::{
    Collection, ErrorCode, ErrorInfo, InternetObject, ParseOptions, PositionRange, TemporalKind,
    TemporalValue, Value,
};
use internet_object_syntax::{
    CollectionNode, Node, ObjectNode, SectionContentNode, Token, TokenSubtype,
};
use time::OffsetDateTime;

use crate::definitions::{DefValue, Definitions};
use crate::memberdef::MemberDef;
use crate::model::{Open, Schema};
use crate::types::{resolve_option, TypeRegistry};

/// Everything member parsing needs to see: the type registry, the
/// definitions in scope, the options, and the per-row resolution depth.
pub struct ProcessContext<'a> {
    registry: &'a TypeRegistry,
    defs: &'a Definitions,
    options: &'a ParseOptions,
    depth: Cell<usize>,
}

impl<'a> ProcessContext<'a> {
    /// Builds a context over the given registry and definitions.
    pub fn new(
        registry: &'a TypeRegistry,
        defs: &'a Definitions,
        options: &'a ParseOptions,
    ) -> Self {
        ProcessContext {
            registry,
            defs,
            options,
            depth: Cell::new(0),
        }
    }

    /// The type registry in scope.
    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    /// The definitions in scope.
    pub fn defs(&self) -> &'a Definitions {
        self.defs
    }

    /// The options in scope.
    pub fn options(&self) -> &'a ParseOptions {
        self.options
    }

    /// Steps one level deeper into schema/variable resolution. Fails once
    /// the per-row depth limit is exceeded, which is how unbounded
    /// `$self`-style recursion surfaces.
    pub(crate) fn enter(&self) -> Result<DepthGuard<'_>, ErrorInfo> {
        let depth = self.depth.get() + 1;
        if depth > self.options.max_schema_depth {
            return Err(ErrorInfo::new(
                ErrorCode::InvalidSchema,
                "schema references recurse without an optional or array break",
            ));
        }
        self.depth.set(depth);
        Ok(DepthGuard { depth: &self.depth })
    }
}

pub(crate) struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

/// Where a member's value comes from: a parsed AST node, or a host value
/// being validated directly. Wrapping host primitives here plays the role
/// of the synthetic token nodes the AST path produces.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// A node out of the parsed tree.
    Node(&'a Node),
    /// A host value.
    Value(&'a Value),
}

impl<'a> Source<'a> {
    /// The source span, when this source points into parsed text.
    pub fn position(&self) -> Option<PositionRange> {
        match self {
            Source::Node(node) => Some(node.range()),
            Source::Value(_) => None,
        }
    }

    /// The leaf value, when this source is not a container node.
    pub fn scalar(&self) -> Option<&'a Value> {
        match *self {
            Source::Node(Node::Token(token)) => Some(&token.value),
            Source::Node(_) => None,
            Source::Value(value) => Some(value),
        }
    }

    /// Whether `@`/`$` reference resolution applies. Only token sources
    /// resolve — raw strings are verbatim by definition, and host values
    /// pass through untouched — so a reference resolves exactly once.
    fn allows_reference(&self) -> bool {
        match self {
            Source::Node(Node::Token(token)) => {
                token.subtype != Some(TokenSubtype::RawString)
            }
            Source::Node(_) => false,
            Source::Value(_) => false,
        }
    }
}

/// The uniform front door for one member: handles missing values and
/// defaults, null, reference resolution, and then hands over to the
/// member's type. Returns `Ok(None)` for an optional member with no
/// value — the member is omitted from the result.
pub fn parse_member_value(
    source: Option<Source<'_>>,
    member: &MemberDef,
    ctx: &ProcessContext<'_>,
    anchor: PositionRange,
) -> Result<Option<Value>, ErrorInfo> {
    let position = source.and_then(|s| s.position()).unwrap_or(anchor);
    parse_inner(source, member, ctx).map_err(|error| {
        let error = error.or_position(position);
        if error.path.is_none() {
            error.with_path(member.path.clone())
        } else {
            error
        }
    })
}

fn parse_inner(
    source: Option<Source<'_>>,
    member: &MemberDef,
    ctx: &ProcessContext<'_>,
) -> Result<Option<Value>, ErrorInfo> {
    let Some(source) = source else {
        return parse_missing(member, ctx);
    };
    if let Source::Node(Node::Error(error_node)) = source {
        return Err(error_node.error.clone());
    }
    if matches!(source.scalar(), Some(Value::Null)) {
        return if member.nullable {
            Ok(Some(Value::Null))
        } else {
            Err(ErrorInfo::new(
                ErrorCode::NullNotAllowed,
                format!("\"{}\" does not allow null", member.path),
            ))
        };
    }
    if let Some(Value::String(text)) = source.scalar() {
        if (text.starts_with('@') || text.starts_with('$')) && source.allows_reference() {
            let _guard = ctx.enter()?;
            return match ctx.defs().get_v(text)? {
                DefValue::Value(resolved) => {
                    parse_inner(Some(Source::Value(resolved)), member, ctx)
                }
                DefValue::Schema(_) => Err(ErrorInfo::new(
                    ErrorCode::InvalidDefinition,
                    format!("\"{text}\" names a schema where a value is required"),
                )),
            };
        }
    }
    let type_def = ctx.registry().get(&member.type_name).ok_or_else(|| {
        ErrorInfo::new(
            ErrorCode::InvalidType,
            format!("\"{}\" is not a registered type", member.type_name),
        )
    })?;
    type_def.parse(source, member, ctx).map(Some)
}

fn parse_missing(
    member: &MemberDef,
    ctx: &ProcessContext<'_>,
) -> Result<Option<Value>, ErrorInfo> {
    if let Some(default) = &member.default_value {
        if member.is_temporal() && default.as_str() == Some("now") {
            let kind = match member.type_name.as_str() {
                "date" => TemporalKind::Date,
                "time" => TemporalKind::Time,
                _ => TemporalKind::DateTime,
            };
            return Ok(Some(Value::Temporal(TemporalValue::new(
                kind,
                OffsetDateTime::now_utc(),
            ))));
        }
        let resolved = resolve_option(default, ctx)?;
        if resolved.is_null() {
            return if member.nullable {
                Ok(Some(Value::Null))
            } else {
                Err(ErrorInfo::new(
                    ErrorCode::NullNotAllowed,
                    format!("\"{}\" does not allow null", member.path),
                ))
            };
        }
        // Defaults go through the member's type so its constraints hold
        // for synthesized values too.
        let type_def = ctx.registry().get(&member.type_name).ok_or_else(|| {
            ErrorInfo::new(
                ErrorCode::InvalidType,
                format!("\"{}\" is not a registered type", member.type_name),
            )
        })?;
        return type_def.parse(Source::Value(&resolved), member, ctx).map(Some);
    }
    if member.optional {
        return Ok(None);
    }
    Err(ErrorInfo::new(
        ErrorCode::ValueRequired,
        format!("\"{}\" requires a value", member.path),
    ))
}

fn open_member_def(open: &Open, key: Option<&str>) -> MemberDef {
    let mut def = match open {
        Open::Constrained(def) => (**def).clone(),
        _ => MemberDef::any(),
    };
    if let Some(key) = key {
        def.path = key.to_string();
    }
    def
}

/// Processes one object row against a schema: the positional pass binds
/// unkeyed members to the schema's names in order, the keyed pass binds
/// the rest by name, and the missing pass fills defaults and enforces
/// required members.
pub fn process_object(
    node: &ObjectNode,
    schema: &Schema,
    ctx: &ProcessContext<'_>,
) -> Result<InternetObject, ErrorInfo> {
    tracing::trace!(schema = schema.name(), members = node.members.len(), "processing object");
    let names = schema.names();
    let mut values: Vec<(String, Value)> = Vec::new();
    let mut extras: Vec<(Option<String>, Value)> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    // Positional pass: up to the first keyed member.
    let mut index = 0;
    while index < node.members.len() && index < names.len() {
        let member_node = &node.members[index];
        if member_node.key.is_some() {
            break;
        }
        let name = &names[index];
        let def = schema.get(name).expect("names track defs");
        let source = member_node.value.as_ref().map(Source::Node);
        if let Some(value) = parse_member_value(source, def, ctx, member_node.range)? {
            values.push((name.clone(), value));
        }
        seen.insert(name.clone());
        index += 1;
    }

    // Keyed pass, which also owns the extra-positional policy.
    let mut keyed_seen = false;
    for member_node in &node.members[index..] {
        match &member_node.key {
            None => {
                if keyed_seen {
                    return Err(ErrorInfo::new(
                        ErrorCode::PositionalAfterKeyword,
                        "positional member appears after a keyed member",
                    )
                    .with_position(member_node.range));
                }
                if !schema.open().accepts_extras() {
                    return Err(ErrorInfo::new(
                        ErrorCode::AdditionalValuesNotAllowed,
                        format!("the schema takes at most {} positional values", names.len()),
                    )
                    .with_position(member_node.range));
                }
                let def = open_member_def(schema.open(), None);
                let source = member_node.value.as_ref().map(Source::Node);
                if let Some(value) = parse_member_value(source, &def, ctx, member_node.range)? {
                    extras.push((None, value));
                }
            }
            Some(key_token) => {
                keyed_seen = true;
                let key = key_value(key_token)?;
                if !seen.insert(key.clone()) {
                    return Err(ErrorInfo::new(
                        ErrorCode::DuplicateMember,
                        format!("member \"{key}\" appears twice"),
                    )
                    .with_position(key_token.range));
                }
                let source = member_node.value.as_ref().map(Source::Node);
                if let Some(def) = schema.get(&key) {
                    if let Some(value) =
                        parse_member_value(source, def, ctx, member_node.range)?
                    {
                        values.push((key, value));
                    }
                } else {
                    if !schema.open().accepts_extras() {
                        return Err(ErrorInfo::new(
                            ErrorCode::UnknownMember,
                            format!("\"{key}\" is not a member of schema \"{}\"", schema.name()),
                        )
                        .with_position(key_token.range));
                    }
                    let def = open_member_def(schema.open(), Some(&key));
                    if let Some(value) =
                        parse_member_value(source, &def, ctx, member_node.range)?
                    {
                        extras.push((Some(key), value));
                    }
                }
            }
        }
    }

    // Missing pass: defaults, optionals and required members, with errors
    // re-anchored to the row when the source has nothing to point at.
    for name in names {
        if seen.contains(name) {
            continue;
        }
        let def = schema.get(name).expect("names track defs");
        match parse_member_value(None, def, ctx, node.range) {
            Ok(Some(value)) => values.push((name.clone(), value)),
            Ok(None) => {}
            Err(error) => return Err(error.or_position(node.range)),
        }
    }

    // Assemble in schema order, extras after in source order.
    let mut result = InternetObject::new();
    for name in names {
        if let Some(at) = values.iter().position(|(n, _)| n == name) {
            let (name, value) = values.swap_remove(at);
            result.set(name, value);
        }
    }
    for (key, value) in extras {
        match key {
            Some(key) => result.set(key, value),
            None => result.push(value),
        }
    }
    Ok(result)
}

fn key_value(token: &Token) -> Result<String, ErrorInfo> {
    token
        .text()
        .map(str::to_string)
        .ok_or_else(|| {
            ErrorInfo::new(
                ErrorCode::InvalidKey,
                format!("\"{}\" cannot be used as a member key", token.raw),
            )
            .with_position(token.range)
        })
}

/// Validates a host object (already-typed values) against a schema.
pub fn process_host_object(
    object: &InternetObject,
    schema: &Schema,
    ctx: &ProcessContext<'_>,
) -> Result<InternetObject, ErrorInfo> {
    let names = schema.names();
    let mut by_name: Vec<(&str, &Value)> = Vec::new();
    let mut extra: Vec<(Option<&str>, &Value)> = Vec::new();
    let mut positional = 0usize;
    for (key, value) in object.iter() {
        match key {
            Some(key) if schema.has(key) => by_name.push((key, value)),
            Some(key) => extra.push((Some(key), value)),
            None if positional < names.len() => {
                by_name.push((names[positional].as_str(), value));
                positional += 1;
            }
            None => extra.push((None, value)),
        }
    }

    let mut result = InternetObject::new();
    for name in names {
        let def = schema.get(name).expect("names track defs");
        let source = by_name
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| Source::Value(v));
        if let Some(value) = parse_member_value(source, def, ctx, PositionRange::default())? {
            result.set(name.clone(), value);
        }
    }
    for (key, value) in extra {
        if !schema.open().accepts_extras() {
            return match key {
                Some(key) => Err(ErrorInfo::new(
                    ErrorCode::UnknownMember,
                    format!("\"{key}\" is not a member of schema \"{}\"", schema.name()),
                )),
                None => Err(ErrorInfo::new(
                    ErrorCode::AdditionalValuesNotAllowed,
                    format!("the schema takes at most {} positional values", names.len()),
                )),
            };
        }
        let def = open_member_def(schema.open(), key);
        if let Some(value) =
            parse_member_value(Some(Source::Value(value)), &def, ctx, PositionRange::default())?
        {
            match key {
                Some(key) => result.set(key, value),
                None => result.push(value),
            }
        }
    }
    Ok(result)
}

/// Processes a run of `~` rows. Row failures never abort the collection:
/// each failed row becomes an error entry annotated with its index.
pub fn process_collection(
    node: &CollectionNode,
    schema: Option<&Schema>,
    ctx: &ProcessContext<'_>,
) -> Collection {
    let mut collection = Collection::new();
    for row in &node.rows {
        let outcome = match row {
            Node::Error(error_node) => Err(error_node.error.clone()),
            Node::Object(object) => match schema {
                Some(schema) => process_object(object, schema, ctx).map(Value::Object),
                None => untyped_row_value(object, ctx),
            },
            other => node_to_value(other, ctx),
        };
        match outcome {
            Ok(value) => collection.push_value(value),
            Err(error) => {
                tracing::debug!(%error, "collection row failed");
                collection.push_error(error.or_position(row.range()));
            }
        }
    }
    collection
}

/// The result of processing one section's content.
#[derive(Debug, Clone, PartialEq)]
pub enum Processed {
    /// A single-object (or single-value) section.
    Single(Value),
    /// A collection section.
    Collection(Collection),
}

/// Dispatches on the shape of a section body.
pub fn process_content(
    content: &SectionContentNode,
    schema: Option<&Schema>,
    ctx: &ProcessContext<'_>,
) -> Result<Processed, ErrorInfo> {
    match content {
        SectionContentNode::Collection(collection) => Ok(Processed::Collection(
            process_collection(collection, schema, ctx),
        )),
        SectionContentNode::Object(object) => match schema {
            Some(schema) => process_object(object, schema, ctx)
                .map(|o| Processed::Single(Value::Object(o)))
                .map_err(|e| e.or_position(object.range)),
            None => untyped_row_value(object, ctx).map(Processed::Single),
        },
    }
}

/// A schemaless row: a single positional value stands for itself, while
/// anything else stays an object.
fn untyped_row_value(
    object: &ObjectNode,
    ctx: &ProcessContext<'_>,
) -> Result<Value, ErrorInfo> {
    if object.members.len() == 1 {
        let member = &object.members[0];
        if member.key.is_none() {
            if let Some(value) = &member.value {
                return node_to_value(value, ctx);
            }
        }
    }
    object_node_value(object, ctx)
}

/// Resolves a `$name` reference against the definitions in scope.
pub fn resolve_schema(
    reference: &str,
    ctx: &ProcessContext<'_>,
) -> Result<Arc<Schema>, ErrorInfo> {
    let Some(entry) = ctx.defs().get(reference) else {
        return Err(ErrorInfo::new(
            ErrorCode::SchemaNotDefined,
            format!("schema \"{reference}\" is not defined"),
        ));
    };
    match &entry.value {
        DefValue::Schema(schema) => Ok(Arc::clone(schema)),
        DefValue::Value(_) => Err(ErrorInfo::new(
            ErrorCode::SchemaNotFound,
            format!("\"{reference}\" does not name a schema"),
        )),
    }
}

/// The host-level value of a node, used wherever a slot is typed `any`.
/// Variables resolve; error nodes propagate their error.
pub fn node_to_value(node: &Node, ctx: &ProcessContext<'_>) -> Result<Value, ErrorInfo> {
    match node {
        Node::Token(token) => token_value(token, ctx),
        Node::Object(object) => object_node_value(object, ctx),
        Node::Array(array) => {
            let mut items = Vec::with_capacity(array.elements.len());
            for element in &array.elements {
                items.push(node_to_value(element, ctx)?);
            }
            Ok(Value::Array(items))
        }
        Node::Error(error_node) => Err(error_node.error.clone()),
    }
}

fn object_node_value(
    object: &ObjectNode,
    ctx: &ProcessContext<'_>,
) -> Result<Value, ErrorInfo> {
    let mut result = InternetObject::new();
    for member in &object.members {
        let value = match &member.value {
            Some(node) => node_to_value(node, ctx)?,
            None => continue,
        };
        match member.key.as_ref().and_then(|k| k.text()) {
            Some(key) => result.set(key, value),
            None => result.push(value),
        }
    }
    Ok(Value::Object(result))
}

fn token_value(token: &Token, ctx: &ProcessContext<'_>) -> Result<Value, ErrorInfo> {
    if let Some(error) = &token.error {
        return Err(error.clone());
    }
    if token.subtype != Some(TokenSubtype::RawString) {
        if let Value::String(text) = &token.value {
            if text.starts_with('@') || text.starts_with('$') {
                let _guard = ctx.enter()?;
                return match ctx.defs().get_v(text) {
                    Ok(DefValue::Value(value)) => Ok(value.clone()),
                    Ok(DefValue::Schema(_)) => Err(ErrorInfo::new(
                        ErrorCode::InvalidDefinition,
                        format!("\"{text}\" names a schema where a value is required"),
                    )
                    .with_position(token.range)),
                    Err(error) => Err(error.with_position(token.range)),
                };
            }
        }
    }
    Ok(token.value.clone())
}

#[cfg(test)]
mod tests;
