use internet_object_core::ErrorInfo;

use crate::header::Header;
use crate::section::Section;

/// A fully processed document: the header that was in scope, the data
/// sections in source order, and every error the pipeline recovered from
/// (lexical, syntactic and row-level validation errors alike).
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// The header (definitions plus default schema).
    pub header: Header,
    /// The data sections in source order.
    pub sections: Vec<Section>,
    /// All errors, in source order; collection row errors carry their
    /// `collection_index`.
    pub errors: Vec<ErrorInfo>,
}

impl Document {
    /// Whether any stage reported an error.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The first section, which is where a sectionless document's data
    /// lands.
    pub fn first_section(&self) -> Option<&Section> {
        self.sections.first()
    }

    /// The section with the given name.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name.as_deref() == Some(name))
    }

    /// Renders the document as JSON: a lone unnamed section renders as its
    /// content, anything else as an object keyed by section name (or
    /// index, for unnamed sections).
    pub fn to_json(&self) -> serde_json::Value {
        if self.sections.len() == 1 && self.sections[0].name.is_none() {
            return self.sections[0].to_json();
        }
        let mut map = serde_json::Map::new();
        for (index, section) in self.sections.iter().enumerate() {
            let key = section
                .name
                .clone()
                .unwrap_or_else(|| index.to_string());
            map.insert(key, section.to_json());
        }
        serde_json::Value::Object(map)
    }
}
