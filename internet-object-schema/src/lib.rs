//! The schema side of the Internet Object pipeline: the immutable schema
//! model and its builder, the compiler that turns schema source (written
//! in the format's own syntax) into that model, the registry of leaf
//! types, the ordered definitions store (`@variables`, `$schemas`, plain
//! keys), and the processor that applies a compiled schema to parsed data.
#![warn(missing_docs)]

mod compile;
mod definitions;
mod memberdef;
mod model;
mod processor;
mod types;

pub use compile::{compile_member_def, compile_schema};
pub use definitions::{DefEntry, DefValue, Definitions};
pub use memberdef::MemberDef;
pub use model::{Open, Schema, SchemaBuilder};
pub use processor::{
    node_to_value, parse_member_value, process_collection, process_content, process_host_object,
    process_object, resolve_schema, Processed, ProcessContext, Source,
};
pub use types::{TypeDef, TypeRegistry};
