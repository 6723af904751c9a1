use crate::value::Value;

/// The typed object a processed row yields: an insertion-ordered list of
/// members, each keyed or positional.
///
/// Keyed lookups walk the member list; objects in this format are small
/// (they mirror one schema's members), so the linear scan beats carrying a
/// second index around.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InternetObject {
    members: Vec<(Option<String>, Value)>,
}

impl InternetObject {
    /// Constructs an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of members, keyed and positional.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the object has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Appends a positional (keyless) member.
    pub fn push(&mut self, value: Value) {
        self.members.push((None, value));
    }

    /// Sets a keyed member, replacing the value if the key already exists.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self
            .members
            .iter_mut()
            .find(|(k, _)| k.as_deref() == Some(key.as_str()))
        {
            Some((_, slot)) => *slot = value,
            None => self.members.push((Some(key), value)),
        }
    }

    /// Looks up a member by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.members
            .iter()
            .find(|(k, _)| k.as_deref() == Some(key))
            .map(|(_, v)| v)
    }

    /// Looks up a member by position.
    pub fn get_at(&self, index: usize) -> Option<&Value> {
        self.members.get(index).map(|(_, v)| v)
    }

    /// Whether a keyed member exists.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterates members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &Value)> {
        self.members.iter().map(|(k, v)| (k.as_deref(), v))
    }

    /// Iterates only the keyed members.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.members
            .iter()
            .filter_map(|(k, v)| k.as_deref().map(|k| (k, v)))
    }

    /// Renders the object as a JSON object. Positional members (possible
    /// only in schemaless rows) are keyed by their index.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (index, (key, value)) in self.members.iter().enumerate() {
            let key = match key {
                Some(key) => key.clone(),
                None => index.to_string(),
            };
            map.insert(key, value.to_json());
        }
        serde_json::Value::Object(map)
    }
}

impl FromIterator<(String, Value)> for InternetObject {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut object = InternetObject::new();
        for (key, value) in iter {
            object.set(key, value);
        }
        object
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let mut object = InternetObject::new();
        object.set("b", Value::from(1.0));
        object.set("a", Value::from(2.0));
        let keys: Vec<_> = object.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn set_replaces_in_place() {
        let mut object = InternetObject::new();
        object.set("a", Value::from(1.0));
        object.set("a", Value::from(3.0));
        assert_eq!(object.len(), 1);
        assert_eq!(object.get("a"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn positional_members_render_by_index() {
        let mut object = InternetObject::new();
        object.push(Value::from("x"));
        object.set("k", Value::Bool(true));
        assert_eq!(
            object.to_json(),
            serde_json::json!({"0": "x", "k": true})
        );
        assert_eq!(object.get_at(0), Some(&Value::String("x".into())));
    }
}
