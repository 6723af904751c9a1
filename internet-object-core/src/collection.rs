use crate::error::ErrorInfo;
use crate::value::Value;

/// One row of a [`Collection`]: a typed value, or the error that row
/// produced instead.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionItem {
    /// The row processed cleanly.
    Value(Value),
    /// The row failed; the error stands in for it so row indexes stay
    /// aligned with the source.
    Error(ErrorInfo),
}

impl CollectionItem {
    /// The value, if this row processed cleanly.
    pub fn value(&self) -> Option<&Value> {
        match self {
            CollectionItem::Value(value) => Some(value),
            CollectionItem::Error(_) => None,
        }
    }

    /// The error, if this row failed.
    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            CollectionItem::Value(_) => None,
            CollectionItem::Error(error) => Some(error),
        }
    }
}

/// An ordered run of `~` rows processed under one schema.
///
/// Errors stay inline (so the caller sees which row failed) and are also
/// mirrored into [`Collection::errors`] annotated with the row index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Collection {
    items: Vec<CollectionItem>,
    errors: Vec<ErrorInfo>,
}

impl Collection {
    /// Constructs an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows, including failed ones.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection has no rows.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends a successfully processed row.
    pub fn push_value(&mut self, value: Value) {
        self.items.push(CollectionItem::Value(value));
    }

    /// Appends a failed row, annotating the error with its index here.
    pub fn push_error(&mut self, error: ErrorInfo) {
        let error = error.with_index(self.items.len());
        self.items.push(CollectionItem::Error(error.clone()));
        self.errors.push(error);
    }

    /// The row at `index`.
    pub fn get(&self, index: usize) -> Option<&CollectionItem> {
        self.items.get(index)
    }

    /// Iterates rows in order.
    pub fn iter(&self) -> impl Iterator<Item = &CollectionItem> {
        self.items.iter()
    }

    /// The errors captured at this collection's boundary, in row order.
    pub fn errors(&self) -> &[ErrorInfo] {
        &self.errors
    }

    /// Renders the collection as a JSON array; failed rows become
    /// `{ "__error": true, … }` envelopes.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.items
                .iter()
                .map(|item| match item {
                    CollectionItem::Value(value) => value.to_json(),
                    CollectionItem::Error(error) => error.to_json(),
                })
                .collect(),
        )
    }
}

impl FromIterator<Value> for Collection {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        let mut collection = Collection::new();
        for value in iter {
            collection.push_value(value);
        }
        collection
    }
}
