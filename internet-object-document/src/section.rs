use internet_object_core::{Collection, ErrorInfo, Value};

/// The processed body of one section.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SectionContent {
    /// The section had no data rows.
    #[default]
    Empty,
    /// A single object (or single value) section.
    Single(Value),
    /// A `~`-row collection.
    Collection(Collection),
}

/// One processed data section: its name and schema reference from the
/// `---` line, its typed content, and the errors its rows produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Section {
    /// The section name, when the header line gave one.
    pub name: Option<String>,
    /// The `$name` schema reference, sigil included, when given.
    pub schema_ref: Option<String>,
    /// The processed body.
    pub content: SectionContent,
    /// Errors raised while processing this section's rows.
    pub errors: Vec<ErrorInfo>,
}

impl Section {
    /// The single value, when this section holds one.
    pub fn value(&self) -> Option<&Value> {
        match &self.content {
            SectionContent::Single(value) => Some(value),
            _ => None,
        }
    }

    /// The collection, when this section holds one.
    pub fn collection(&self) -> Option<&Collection> {
        match &self.content {
            SectionContent::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    /// Renders this section's content as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        match &self.content {
            SectionContent::Empty => serde_json::Value::Null,
            SectionContent::Single(value) => value.to_json(),
            SectionContent::Collection(collection) => collection.to_json(),
        }
    }
}
