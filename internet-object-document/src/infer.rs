//! Host value → schema set. The inferrer walks the value collecting
//! every object instance under a base name derived from its owning
//! property (singularized for arrays), resolves naming conflicts
//! path-aware, then merges each name's instances member-wise under the
//! widening rules: a member missing from some instance becomes optional,
//! a null occurrence becomes nullable, and disagreeing types widen to
//! `any`.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use internet_object_core::{ErrorCode, ErrorInfo, InternetObject, TemporalKind, Value};
use internet_object_schema::{DefValue, Definitions, MemberDef, Schema};

use crate::singular::singularize;

/// The outcome of inference: the definitions carrying every named schema
/// (the root registered last, as `$schema`), plus the root itself.
#[derive(Debug, Clone)]
pub struct InferredSchemas {
    /// `$name` entries for every discovered schema; `$schema` is the root
    /// and the store's default.
    pub definitions: Definitions,
    /// The root schema.
    pub root: Arc<Schema>,
}

/// Infers a schema set from a host value: an object, or an array of
/// objects (the collection case).
pub fn infer_schema(value: &Value) -> Result<InferredSchemas, ErrorInfo> {
    let roots = root_instances(value)?;

    // Phase 1: collect object instances by base name.
    let mut groups: IndexMap<String, Vec<Instance<'_>>> = IndexMap::new();
    for root in roots.iter().copied() {
        walk(root, "", &mut groups);
    }

    // Phase 2: resolve names path-aware.
    let mut used: HashSet<String> = HashSet::new();
    used.insert("schema".to_string());
    let mut assignments: IndexMap<String, Assignment> = IndexMap::new();
    for (base, instances) in &groups {
        assign_names(base, instances, &mut assignments, &mut used);
    }

    // Phase 3: merge instances per resolved name.
    let mut by_name: IndexMap<String, Vec<&Instance<'_>>> = IndexMap::new();
    for instances in groups.values() {
        for instance in instances {
            if let Some(Assignment::Named(name)) = assignments.get(&instance.path) {
                by_name.entry(name.clone()).or_default().push(instance);
            }
        }
    }

    // Phase 4: attach everything to definitions; the root goes last.
    let mut definitions = Definitions::new();
    for (name, instances) in &by_name {
        let objects: Vec<&InternetObject> = instances.iter().map(|i| i.object).collect();
        let paths: Vec<&str> = instances.iter().map(|i| i.path.as_str()).collect();
        let schema = merge_instances(name, &objects, &paths, &assignments);
        definitions.set(&format!("${name}"), DefValue::Schema(Arc::new(schema)));
    }
    let root_paths: Vec<&str> = roots.iter().map(|_| "").collect();
    let root = Arc::new(merge_instances("schema", &roots, &root_paths, &assignments));
    definitions.set("$schema", DefValue::Schema(Arc::clone(&root)));

    Ok(InferredSchemas { definitions, root })
}

fn root_instances(value: &Value) -> Result<Vec<&InternetObject>, ErrorInfo> {
    match value {
        Value::Object(object) => Ok(vec![object]),
        Value::Array(items) => {
            let objects: Vec<&InternetObject> = items
                .iter()
                .filter_map(Value::as_object)
                .collect();
            if objects.is_empty() {
                return Err(ErrorInfo::new(
                    ErrorCode::InvalidObject,
                    "cannot infer a schema from an array with no objects",
                ));
            }
            Ok(objects)
        }
        other => Err(ErrorInfo::new(
            ErrorCode::InvalidObject,
            format!("cannot infer a schema from a {}", other.type_name()),
        )),
    }
}

#[derive(Debug)]
struct Instance<'v> {
    path: String,
    object: &'v InternetObject,
}

#[derive(Debug, Clone, PartialEq)]
enum Assignment {
    Named(String),
    Conflicted,
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn walk<'v>(
    object: &'v InternetObject,
    path: &str,
    groups: &mut IndexMap<String, Vec<Instance<'v>>>,
) {
    for (key, value) in object.entries() {
        match value {
            Value::Object(child) => {
                let child_path = join_path(path, key);
                groups.entry(key.to_string()).or_default().push(Instance {
                    path: child_path.clone(),
                    object: child,
                });
                walk(child, &child_path, groups);
            }
            Value::Array(items) => {
                let base = singularize(key);
                let child_path = join_path(path, key);
                collect_array(items, &base, &child_path, groups);
            }
            _ => {}
        }
    }
}

// Arrays of arrays contribute instances under the same property path, so
// the rules apply at every collected depth.
fn collect_array<'v>(
    items: &'v [Value],
    base: &str,
    path: &str,
    groups: &mut IndexMap<String, Vec<Instance<'v>>>,
) {
    for item in items {
        match item {
            Value::Object(child) => {
                groups.entry(base.to_string()).or_default().push(Instance {
                    path: path.to_string(),
                    object: child,
                });
                walk(child, path, groups);
            }
            Value::Array(nested) => collect_array(nested, base, path, groups),
            _ => {}
        }
    }
}

/// A structural signature: the sorted `key:type` list of one instance.
fn signature(object: &InternetObject) -> Vec<String> {
    let mut keys: Vec<String> = object
        .entries()
        .map(|(key, value)| format!("{key}:{}", value.type_name()))
        .collect();
    keys.sort();
    keys
}

fn key_set(object: &InternetObject) -> HashSet<&str> {
    object.entries().map(|(key, _)| key).collect()
}

fn assign_names(
    base: &str,
    instances: &[Instance<'_>],
    assignments: &mut IndexMap<String, Assignment>,
    used: &mut HashSet<String>,
) {
    let mut paths: IndexMap<&str, Vec<&Instance<'_>>> = IndexMap::new();
    for instance in instances {
        paths.entry(instance.path.as_str()).or_default().push(instance);
    }

    if paths.len() == 1 {
        let name = unique_name(base, used);
        for path in paths.keys() {
            assignments.insert((*path).to_string(), Assignment::Named(name.clone()));
        }
        return;
    }

    // One structural signature across every path keeps one shared name.
    let mut signatures = instances.iter().map(|i| signature(i.object));
    let first = signatures.next().expect("groups are never empty");
    if signatures.all(|s| s == first) {
        let name = unique_name(base, used);
        for path in paths.keys() {
            assignments.insert((*path).to_string(), Assignment::Named(name.clone()));
        }
        return;
    }

    // No common key anywhere means these are unrelated shapes that happen
    // to share a property name.
    let mut common: Option<HashSet<&str>> = None;
    for instance in instances {
        let keys = key_set(instance.object);
        common = Some(match common {
            None => keys,
            Some(prior) => prior.intersection(&keys).copied().collect(),
        });
    }
    if common.map(|c| c.is_empty()).unwrap_or(true) {
        for path in paths.keys() {
            assignments.insert((*path).to_string(), Assignment::Conflicted);
        }
        return;
    }

    // Related shapes: the shortest path keeps the base name, deeper paths
    // get ancestor-qualified camel-case names.
    let mut ordered: Vec<&str> = paths.keys().copied().collect();
    ordered.sort_by_key(|path| path.split('.').count());
    for (index, path) in ordered.iter().enumerate() {
        let name = if index == 0 {
            unique_name(base, used)
        } else {
            unique_name(&camel_name(path), used)
        };
        assignments.insert((*path).to_string(), Assignment::Named(name));
    }
}

fn unique_name(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_string()) {
        return base.to_string();
    }
    let mut counter = 2usize;
    loop {
        let candidate = format!("{base}{counter}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

fn camel_name(path: &str) -> String {
    let mut out = String::new();
    for (index, segment) in path.split('.').enumerate() {
        if index == 0 {
            out.push_str(segment);
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Merges an instance list into one schema under the widening rules.
fn merge_instances(
    name: &str,
    instances: &[&InternetObject],
    paths: &[&str],
    assignments: &IndexMap<String, Assignment>,
) -> Schema {
    let mut fields: IndexMap<String, MemberDef> = IndexMap::new();
    for (index, (instance, path)) in instances.iter().zip(paths.iter().copied()).enumerate() {
        for (key, value) in instance.entries() {
            let incoming = member_for_value(key, value, path, assignments);
            match fields.get_mut(key) {
                None => {
                    let mut def = incoming;
                    if index > 0 {
                        // A member first appearing mid-stream was missing
                        // from everything before it.
                        def.optional = true;
                    }
                    fields.insert(key.to_string(), def);
                }
                Some(existing) => widen(existing, value, incoming),
            }
        }
        if index > 0 {
            for (key, def) in fields.iter_mut() {
                if !instance.has(key) {
                    def.optional = true;
                }
            }
        }
    }

    let mut builder = Schema::builder(name);
    for (field_name, def) in fields {
        builder
            .add(field_name, def)
            .expect("field names are unique by construction");
    }
    builder.build()
}

/// Applies the later-instance widening rules to an existing member.
fn widen(existing: &mut MemberDef, value: &Value, incoming: MemberDef) {
    if value.is_null() {
        existing.nullable = true;
        return;
    }
    if incoming.nullable {
        existing.nullable = true;
    }
    if existing.type_name != incoming.type_name {
        existing.type_name = "any".to_string();
        existing.schema_ref = None;
        existing.of = None;
        return;
    }
    if existing.type_name == "array" {
        let differs = match (&existing.of, &incoming.of) {
            (Some(a), Some(b)) => a.type_name != b.type_name,
            (None, None) => false,
            _ => true,
        };
        if differs {
            let mut any = MemberDef::any();
            any.optional = true;
            any.nullable = true;
            existing.of = Some(Box::new(any));
        }
    }
}

fn member_for_value(
    key: &str,
    value: &Value,
    parent_path: &str,
    assignments: &IndexMap<String, Assignment>,
) -> MemberDef {
    match value {
        Value::Null => {
            let mut def = MemberDef::any();
            def.nullable = true;
            def
        }
        Value::Object(_) => {
            let path = join_path(parent_path, key);
            match assignments.get(&path) {
                Some(Assignment::Named(name)) => {
                    let mut def = MemberDef::new("object");
                    def.schema_ref = Some(format!("${name}"));
                    def
                }
                Some(Assignment::Conflicted) | None => MemberDef::new("object"),
            }
        }
        Value::Array(items) => {
            let mut def = MemberDef::new("array");
            def.of = Some(Box::new(element_def(items, key, parent_path, assignments)));
            def
        }
        other => MemberDef::new(scalar_type(other)),
    }
}

fn element_def(
    items: &[Value],
    key: &str,
    parent_path: &str,
    assignments: &IndexMap<String, Assignment>,
) -> MemberDef {
    let mut merged: Option<MemberDef> = None;
    let mut saw_null = false;
    for item in items {
        if item.is_null() {
            saw_null = true;
            continue;
        }
        let def = member_for_value(key, item, parent_path, assignments);
        merged = Some(match merged {
            None => def,
            Some(mut prior) => {
                if prior.type_name != def.type_name {
                    prior.type_name = "any".to_string();
                    prior.schema_ref = None;
                    prior.of = None;
                }
                prior
            }
        });
    }
    let mut def = merged.unwrap_or_else(|| {
        let mut any = MemberDef::any();
        any.optional = true;
        any
    });
    def.nullable |= saw_null;
    def
}

fn scalar_type(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::BigInt(_) => "bigint",
        Value::Decimal(_) => "decimal",
        Value::String(_) => "string",
        Value::Temporal(t) => match t.kind {
            TemporalKind::Date => "date",
            TemporalKind::Time => "time",
            TemporalKind::DateTime => "datetime",
        },
        _ => "any",
    }
}
