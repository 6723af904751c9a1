use std::sync::Arc;

use internet_object_schema::{Definitions, Schema};

/// The document header: a definitions store plus an independently
/// settable default-schema pointer. Setting `$schema` through the
/// definitions writes the pointer; an explicit [`Header::set_schema`]
/// overrides it for subsequent lookups.
#[derive(Debug, Clone, Default)]
pub struct Header {
    definitions: Definitions,
    schema: Option<Arc<Schema>>,
}

impl Header {
    /// An empty header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing definitions store.
    pub fn from_definitions(definitions: Definitions) -> Self {
        Header {
            definitions,
            schema: None,
        }
    }

    /// The definitions in scope.
    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    /// Mutable access to the definitions.
    pub fn definitions_mut(&mut self) -> &mut Definitions {
        &mut self.definitions
    }

    /// The schema applied to data sections that do not name their own:
    /// the explicit override if set, else whatever `$schema` designated.
    pub fn default_schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref().or_else(|| self.definitions.default_schema())
    }

    /// Overrides the default schema without touching the definitions.
    pub fn set_schema(&mut self, schema: Arc<Schema>) {
        self.schema = Some(schema);
    }

    /// Merges another header's definitions into this one.
    pub fn merge(&mut self, other: &Header, override_existing: bool) {
        self.definitions.merge(other.definitions(), override_existing);
    }
}
