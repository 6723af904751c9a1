//! Document-level assembly for the Internet Object format: the header
//! (definitions plus default schema), sections and their processed
//! content, the text → document pipeline, the serializer that renders a
//! document back to minimal lossless text, and the schema inferrer that
//! derives a schema set from a host value.
#![warn(missing_docs)]

mod document;
mod header;
mod infer;
mod parse;
mod section;
mod serializer;
mod singular;

pub use document::Document;
pub use header::Header;
pub use infer::{infer_schema, InferredSchemas};
pub use parse::parse_document;
pub use section::{Section, SectionContent};
pub use serializer::{serialize_document, serialize_schema, serialize_value};
pub use singular::singularize;
