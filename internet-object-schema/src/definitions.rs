use std::sync::Arc;

use indexmap::IndexMap;
use internet_object_core::{ErrorCode, ErrorInfo, Value};

use crate::model::Schema;

/// What a definition entry holds.
#[derive(Debug, Clone, PartialEq)]
pub enum DefValue {
    /// A compiled schema (`$name` entries and `$schema`).
    Schema(Arc<Schema>),
    /// A plain value (`@variables` and unsigiled keys).
    Value(Value),
}

/// One entry of the definitions store.
#[derive(Debug, Clone, PartialEq)]
pub struct DefEntry {
    /// The key carried a `$` sigil.
    pub is_schema: bool,
    /// The key carried an `@` sigil.
    pub is_variable: bool,
    /// The stored value.
    pub value: DefValue,
}

/// The ordered store of named entries a document header introduces:
/// variables (`@name`), schemas (`$name`), the default schema (`$schema`)
/// and plain keys. Later entries may reference earlier ones; lookups never
/// see entries added after them because evaluation happens in insertion
/// order.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    entries: IndexMap<String, DefEntry>,
    default_schema: Option<Arc<Schema>>,
}

/// Splits `@name` / `$name` / `name` into the bare name and its sigil
/// classification.
fn classify(key: &str) -> (&str, bool, bool) {
    if let Some(name) = key.strip_prefix('@') {
        (name, true, false)
    } else if let Some(name) = key.strip_prefix('$') {
        (name, false, true)
    } else {
        (key, false, false)
    }
}

impl Definitions {
    /// Constructs an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sets an entry. The key may carry its sigil; `$schema` additionally
    /// becomes the default schema when it holds one.
    pub fn set(&mut self, key: &str, value: DefValue) {
        let (name, is_variable, is_schema) = classify(key);
        if is_schema && name == "schema" {
            if let DefValue::Schema(schema) = &value {
                self.default_schema = Some(Arc::clone(schema));
            }
        }
        self.entries.insert(
            name.to_string(),
            DefEntry {
                is_schema,
                is_variable,
                value,
            },
        );
    }

    /// Looks up an entry; the key may carry its sigil.
    pub fn get(&self, key: &str) -> Option<&DefEntry> {
        self.entries.get(classify(key).0)
    }

    /// Resolves a reference: the key must carry an `@` or `$` sigil, and
    /// the named entry must exist.
    pub fn get_v(&self, key: &str) -> Result<&DefValue, ErrorInfo> {
        let (name, is_variable, is_schema) = classify(key);
        if !is_variable && !is_schema {
            return Err(ErrorInfo::new(
                ErrorCode::VariableNotDefined,
                format!("\"{key}\" is not an @variable or $schema reference"),
            ));
        }
        self.entries.get(name).map(|e| &e.value).ok_or_else(|| {
            ErrorInfo::new(
                ErrorCode::VariableNotDefined,
                format!("\"{key}\" is not defined"),
            )
        })
    }

    /// Removes an entry. Removing `$schema` clears the default schema.
    pub fn delete(&mut self, key: &str) {
        let (name, _, is_schema) = classify(key);
        if is_schema && name == "schema" {
            self.default_schema = None;
        }
        self.entries.shift_remove(name);
    }

    /// Copies `other`'s entries into this store. Existing keys are kept
    /// unless `override_existing` is set.
    pub fn merge(&mut self, other: &Definitions, override_existing: bool) {
        for (key, entry) in &other.entries {
            if override_existing || !self.entries.contains_key(key) {
                self.entries.insert(key.clone(), entry.clone());
            }
        }
        if override_existing || self.default_schema.is_none() {
            if let Some(schema) = &other.default_schema {
                self.default_schema = Some(Arc::clone(schema));
            }
        }
    }

    /// Iterates entry keys (bare, without sigils) in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &DefEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// The schema `$schema` designates, if one was set.
    pub fn default_schema(&self) -> Option<&Arc<Schema>> {
        self.default_schema.as_ref()
    }

    /// Designates the default schema directly.
    pub fn set_default_schema(&mut self, schema: Arc<Schema>) {
        self.default_schema = Some(schema);
    }

    /// Renders the plain entries only; variables and schemas are working
    /// state, not data.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (key, entry) in &self.entries {
            if entry.is_schema || entry.is_variable {
                continue;
            }
            if let DefValue::Value(value) = &entry.value {
                map.insert(key.clone(), value.to_json());
            }
        }
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigils_classify_entries() {
        let mut defs = Definitions::new();
        defs.set("@color", DefValue::Value(Value::from("red")));
        defs.set("$person", DefValue::Schema(Arc::new(Schema::any("person"))));
        defs.set("note", DefValue::Value(Value::from("plain")));

        assert!(defs.get("color").unwrap().is_variable);
        assert!(defs.get("$person").unwrap().is_schema);
        let entry = defs.get("note").unwrap();
        assert!(!entry.is_schema && !entry.is_variable);
    }

    #[test]
    fn get_v_requires_a_sigil() {
        let mut defs = Definitions::new();
        defs.set("@color", DefValue::Value(Value::from("red")));
        assert!(defs.get_v("@color").is_ok());
        assert!(defs.get_v("color").is_err());
        let error = defs.get_v("@missing").unwrap_err();
        assert_eq!(error.code, ErrorCode::VariableNotDefined);
    }

    #[test]
    fn plain_entries_resolve_through_either_sigil() {
        // `~ a: 1` followed by a `$a` reference in data.
        let mut defs = Definitions::new();
        defs.set("a", DefValue::Value(Value::Number(1.0)));
        assert_eq!(
            defs.get_v("$a").unwrap(),
            &DefValue::Value(Value::Number(1.0))
        );
    }

    #[test]
    fn schema_key_tracks_default_schema() {
        let mut defs = Definitions::new();
        defs.set("$schema", DefValue::Schema(Arc::new(Schema::any("schema"))));
        assert!(defs.default_schema().is_some());
        defs.delete("$schema");
        assert!(defs.default_schema().is_none());
    }

    #[test]
    fn merge_respects_override_flag() {
        let mut base = Definitions::new();
        base.set("@x", DefValue::Value(Value::from("base")));
        let mut layer = Definitions::new();
        layer.set("@x", DefValue::Value(Value::from("layer")));
        layer.set("@y", DefValue::Value(Value::from("new")));

        let mut merged = base.clone();
        merged.merge(&layer, false);
        assert_eq!(
            merged.get_v("@x").unwrap(),
            &DefValue::Value(Value::from("base"))
        );
        assert!(merged.get_v("@y").is_ok());

        merged.merge(&layer, true);
        assert_eq!(
            merged.get_v("@x").unwrap(),
            &DefValue::Value(Value::from("layer"))
        );
    }

    #[test]
    fn json_omits_working_entries() {
        let mut defs = Definitions::new();
        defs.set("@v", DefValue::Value(Value::Number(1.0)));
        defs.set("$s", DefValue::Schema(Arc::new(Schema::any("s"))));
        defs.set("title", DefValue::Value(Value::from("doc")));
        assert_eq!(defs.to_json(), serde_json::json!({"title": "doc"}));
    }
}
