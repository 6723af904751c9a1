use indexmap::IndexMap;
use internet_object_core::{ErrorCode, ErrorInfo};

use crate::memberdef::MemberDef;

/// What a schema does with members beyond the ones it names.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Open {
    /// Extra members are rejected (`unknown-member`).
    #[default]
    Closed,
    /// A trailing `*`: extra members are accepted as `any`.
    Any,
    /// A keyed `*`: extra members are accepted but must satisfy this
    /// definition.
    Constrained(Box<MemberDef>),
}

impl Open {
    /// Whether extra members are accepted at all.
    pub fn accepts_extras(&self) -> bool {
        !matches!(self, Open::Closed)
    }
}

/// An immutable, ordered schema: named member definitions plus the open
/// marker. `names` is the positional order used when a data row omits
/// keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    names: Vec<String>,
    defs: IndexMap<String, MemberDef>,
    open: Open,
}

impl Schema {
    /// Starts building a schema with the given name.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            defs: IndexMap::new(),
            open: Open::Closed,
        }
    }

    /// An empty, fully open schema (`{}` in schema source).
    pub fn any(name: impl Into<String>) -> Schema {
        Schema {
            name: name.into(),
            names: Vec::new(),
            defs: IndexMap::new(),
            open: Open::Any,
        }
    }

    /// The schema's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member names in positional order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The member definitions, keyed by name, in the same order as
    /// [`Schema::names`].
    pub fn defs(&self) -> &IndexMap<String, MemberDef> {
        &self.defs
    }

    /// The open marker.
    pub fn open(&self) -> &Open {
        &self.open
    }

    /// Number of named members.
    pub fn member_count(&self) -> usize {
        self.names.len()
    }

    /// Whether a member of this name exists.
    pub fn has(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// The definition of the named member.
    pub fn get(&self, name: &str) -> Option<&MemberDef> {
        self.defs.get(name)
    }
}

/// Accumulates member definitions and freezes them into a [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    defs: IndexMap<String, MemberDef>,
    open: Open,
}

impl SchemaBuilder {
    /// Adds a member. A duplicate name is an `invalid-schema` error.
    pub fn add(&mut self, name: impl Into<String>, def: MemberDef) -> Result<(), ErrorInfo> {
        let name = name.into();
        if self.defs.contains_key(&name) {
            return Err(ErrorInfo::new(
                ErrorCode::InvalidSchema,
                format!("member \"{name}\" is defined twice in schema \"{}\"", self.name),
            ));
        }
        let mut def = def;
        if def.path.is_empty() {
            def.path = name.clone();
        }
        self.defs.insert(name, def);
        Ok(())
    }

    /// Sets the open marker.
    pub fn set_open(&mut self, open: Open) {
        self.open = open;
    }

    /// Freezes the accumulated members.
    pub fn build(self) -> Schema {
        let names = self.defs.keys().cloned().collect();
        Schema {
            name: self.name,
            names,
            defs: self.defs,
            open: self.open,
        }
    }
}
