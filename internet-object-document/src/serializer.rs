//! Document → text. For every value the serializer picks the most
//! compact surface form that parses back to the same value: open strings
//! wherever safe, quoting only when the literal would be ambiguous, raw
//! strings for content the other forms would mangle, and positional rows
//! wherever a schema gives the member order.

use internet_object_core::{datetime, Collection, InternetObject, TemporalKind, Value};
use internet_object_schema::{DefValue, MemberDef, Open, Schema};
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;

use crate::document::Document;
use crate::section::{Section, SectionContent};

/// Literals an open string must not collide with.
const AMBIGUOUS: &[&str] = &[
    "null", "N", "true", "T", "false", "F", "Inf", "+Inf", "-Inf", "NaN", "undefined",
];

/// Characters that end (or structure) an open string.
const STRUCTURAL: &[char] = &[
    '{', '}', '[', ']', ':', ',', '#', '"', '\'', '\\', '~',
];

lazy_static! {
    static ref NUMBER_LIKE_RE: Regex = Regex::new(
        r"^[+-]?(?:\d+(?:\.\d+)?(?:[eE][+-]?\d+)?|0[xX][0-9a-fA-F]+|0[oO][0-7]+|0[bB][01]+)[nm]?$"
    )
    .expect("is a valid regex");
}

/// Renders one value in its minimal lossless textual form.
pub fn serialize_value(value: &Value) -> String {
    match value {
        Value::Null => "N".into(),
        Value::Bool(true) => "true".into(),
        Value::Bool(false) => "false".into(),
        Value::Number(n) => {
            if n.is_nan() {
                "NaN".into()
            } else if n.is_infinite() {
                if *n > 0.0 { "Inf".into() } else { "-Inf".into() }
            } else {
                n.to_string()
            }
        }
        Value::BigInt(b) => format!("{b}n"),
        Value::Decimal(d) => format!("{d}m"),
        Value::String(text) => string_form(text),
        Value::Bytes(bytes) => format!("b'{}'", base64::encode(bytes)),
        Value::Temporal(temporal) => match temporal.kind {
            TemporalKind::Date => {
                format!("d'{}'", datetime::date_to_date_string(&temporal.when, true))
            }
            TemporalKind::Time => format!(
                "t'{}'",
                datetime::date_to_time_string(&temporal.when, true, false)
            ),
            TemporalKind::DateTime => format!(
                "dt'{}'",
                datetime::date_to_datetime_string(&temporal.when, true, false)
            ),
        },
        Value::Object(object) => format!("{{{}}}", object_members(object, None)),
        Value::Array(items) => {
            format!("[{}]", items.iter().map(serialize_value).join(", "))
        }
    }
}

/// Picks the string surface form: quoted when the literal is ambiguous,
/// escaped-open when it holds structural characters, raw when it holds
/// whitespace the open form would not survive, bare-open otherwise.
fn string_form(text: &str) -> String {
    if text.is_empty() {
        return "\"\"".into();
    }
    if is_ambiguous(text) {
        return quoted(text);
    }
    if text.contains('\r') {
        // Raw strings normalise \r away, so only the quoted form holds it.
        return quoted(text);
    }
    if text.contains(STRUCTURAL) {
        return open_escaped(text);
    }
    if needs_raw(text) {
        let doubled = text.replace('"', "\"\"");
        return format!("r\"{doubled}\"");
    }
    text.into()
}

fn is_ambiguous(text: &str) -> bool {
    AMBIGUOUS.contains(&text)
        || NUMBER_LIKE_RE.is_match(text)
        || datetime::parse_date_time(text).is_some()
        || datetime::parse_time(text).is_some()
}

/// Whitespace an open string cannot round-trip unescaped: control
/// whitespace, or whitespace at either edge of the value.
fn needs_raw(text: &str) -> bool {
    text.contains('\n')
        || text.contains('\t')
        || text.starts_with(char::is_whitespace)
        || text.ends_with(char::is_whitespace)
}

fn quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // Escaped characters never join a collapse run, so escaping
            // every space keeps runs intact inside the quoted form.
            ' ' => out.push_str("\\ "),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Open form with structural characters escaped. Edge whitespace is
/// escaped as well: escaped characters survive the reader's leading skip
/// and trailing trim.
fn open_escaped(text: &str) -> String {
    let leading_end = text.len() - text.trim_start_matches(char::is_whitespace).len();
    let trailing_start = text.trim_end_matches(char::is_whitespace).len();
    let mut out = String::with_capacity(text.len());
    for (at, c) in text.char_indices() {
        if STRUCTURAL.contains(&c)
            || (c.is_whitespace() && (at < leading_end || at >= trailing_start))
        {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A member key in its surface form.
fn key_form(key: &str) -> String {
    string_form(key)
}

fn object_members(object: &InternetObject, schema: Option<&Schema>) -> String {
    match schema {
        Some(schema) => {
            let mut parts: Vec<String> = Vec::new();
            let mut slots: Vec<Option<&Value>> = schema
                .names()
                .iter()
                .map(|name| object.get(name))
                .collect();
            // Trailing absent members are simply omitted.
            while matches!(slots.last(), Some(None)) {
                slots.pop();
            }
            for slot in slots {
                parts.push(match slot {
                    Some(value) => serialize_value(value),
                    None => String::new(),
                });
            }
            for (key, value) in object.entries() {
                if !schema.has(key) {
                    parts.push(format!("{}: {}", key_form(key), serialize_value(value)));
                }
            }
            parts.join(", ")
        }
        None => object
            .iter()
            .map(|(key, value)| match key {
                Some(key) => format!("{}: {}", key_form(key), serialize_value(value)),
                None => serialize_value(value),
            })
            .join(", "),
    }
}

/// Renders a schema back to its source form.
pub fn serialize_schema(schema: &Schema) -> String {
    let mut parts: Vec<String> = Vec::new();
    for name in schema.names() {
        let def = schema.get(name).expect("names track defs");
        let suffix = member_suffix(def);
        let body = member_def_text(def);
        if body.is_empty() {
            parts.push(format!("{name}{suffix}"));
        } else {
            parts.push(format!("{name}{suffix}: {body}"));
        }
    }
    match schema.open() {
        Open::Closed => {}
        Open::Any => parts.push("*".into()),
        Open::Constrained(def) => parts.push(format!("*: {}", member_def_text(def))),
    }
    parts.join(", ")
}

fn member_suffix(def: &MemberDef) -> &'static str {
    match (def.optional, def.nullable) {
        (true, true) => "?*",
        (true, false) => "?",
        (false, true) => "*",
        (false, false) => "",
    }
}

fn member_def_text(def: &MemberDef) -> String {
    let mut options: Vec<String> = Vec::new();
    if let Some(default) = &def.default_value {
        options.push(format!("default: {}", serialize_value(default)));
    }
    if let Some(choices) = &def.choices {
        options.push(format!(
            "choices: [{}]",
            choices.iter().map(serialize_value).join(", ")
        ));
    }
    if let Some(min) = &def.min {
        options.push(format!("min: {}", serialize_value(min)));
    }
    if let Some(max) = &def.max {
        options.push(format!("max: {}", serialize_value(max)));
    }
    if let Some(min) = &def.min_length {
        options.push(format!("minLength: {}", serialize_value(min)));
    }
    if let Some(max) = &def.max_length {
        options.push(format!("maxLength: {}", serialize_value(max)));
    }
    if let Some(Value::String(pattern)) = &def.pattern {
        options.push(format!("pattern: {}", quoted(pattern)));
    }
    if def.type_name == "array" && !options.is_empty() {
        if let Some(of) = &def.of {
            let element = member_def_text(of);
            if !element.is_empty() {
                options.insert(0, format!("of: {element}"));
            }
        }
    }

    let base = if let Some(reference) = &def.schema_ref {
        reference.clone()
    } else if let Some(nested) = &def.schema {
        // Inline schemas carry their constraints inside themselves.
        return format!("{{{}}}", serialize_schema(nested));
    } else if def.type_name == "array" && options.is_empty() {
        let element = def
            .of
            .as_ref()
            .map(|of| member_def_text(of))
            .unwrap_or_default();
        return format!("[{element}]");
    } else if def.type_name == "any" {
        if options.is_empty() {
            return String::new();
        }
        "any".into()
    } else {
        def.type_name.clone()
    };

    if options.is_empty() {
        base
    } else {
        format!("{{{base}, {}}}", options.join(", "))
    }
}

/// Renders a whole document: the header (definitions and `$schema`) on
/// `~` lines when requested, then each section behind its `---` line.
pub fn serialize_document(document: &Document, include_header: bool) -> String {
    let mut out = String::new();
    let defs = document.header.definitions();
    let mut wrote_header = false;

    if include_header {
        for (key, entry) in defs.entries() {
            match &entry.value {
                DefValue::Schema(schema) => {
                    out.push_str(&format!("~ ${key}: {{{}}}\n", serialize_schema(schema)));
                }
                DefValue::Value(value) => {
                    let sigil = if entry.is_variable { "@" } else { "" };
                    out.push_str(&format!(
                        "~ {sigil}{key}: {}\n",
                        serialize_value(value)
                    ));
                }
            }
            wrote_header = true;
        }
    }

    for (index, section) in document.sections.iter().enumerate() {
        let needs_separator = wrote_header
            || index > 0
            || section.name.is_some()
            || section.schema_ref.is_some();
        if needs_separator {
            out.push_str("---");
            match (&section.name, &section.schema_ref) {
                (Some(name), Some(schema)) => out.push_str(&format!(" {name}: {schema}")),
                (Some(name), None) => out.push_str(&format!(" {name}")),
                (None, Some(schema)) => out.push_str(&format!(" {schema}")),
                (None, None) => {}
            }
            out.push('\n');
        }
        write_section(&mut out, section, section_schema(document, section));
    }
    out
}

fn section_schema<'a>(document: &'a Document, section: &Section) -> Option<&'a Schema> {
    match &section.schema_ref {
        Some(reference) => match document.header.definitions().get(reference) {
            Some(entry) => match &entry.value {
                DefValue::Schema(schema) => Some(schema),
                DefValue::Value(_) => None,
            },
            None => None,
        },
        None => document.header.default_schema().map(|s| s.as_ref()),
    }
}

fn write_section(out: &mut String, section: &Section, schema: Option<&Schema>) {
    match &section.content {
        SectionContent::Empty => {}
        SectionContent::Single(value) => {
            out.push_str(&row_text(value, schema));
            out.push('\n');
        }
        SectionContent::Collection(collection) => write_collection(out, collection, schema),
    }
}

fn write_collection(out: &mut String, collection: &Collection, schema: Option<&Schema>) {
    for item in collection.iter() {
        // Failed rows have no value to re-emit; their errors remain on
        // the document.
        if let Some(value) = item.value() {
            out.push_str("~ ");
            out.push_str(&row_text(value, schema));
            out.push('\n');
        }
    }
}

fn row_text(value: &Value, schema: Option<&Schema>) -> String {
    match value {
        Value::Object(object) => object_members(object, schema),
        other => serialize_value(other),
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&serialize_document(self, true))
    }
}
