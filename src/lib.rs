//! Internet Object is a compact, schema-driven textual data format: a
//! CSV-like positional syntax with JSON-like composability, a first-class
//! schema language written in the format's own syntax, variables, and
//! multi-section documents.
//!
//! This crate wires the pipeline together and re-exports the pieces:
//! tokenizer and parser from `internet-object-syntax`, the schema model,
//! compiler, type registry and processor from `internet-object-schema`,
//! and document assembly, serialization and inference from
//! `internet-object-document`.
//!
//! ```
//! let document = internet_object::parse("
//! ~ $schema: {name: string, age: number}
//! ---
//! ~ Spiderman, 25
//! ~ Batman, 32
//! ")?;
//!
//! let people = document.first_section().unwrap().collection().unwrap();
//! assert_eq!(people.len(), 2);
//! # Ok::<(), anyhow::Error>(())
//! ```
#![warn(missing_docs)]

pub use internet_object_core::{
    datetime, decimal, Collection, CollectionItem, Decimal, ErrorCode, ErrorInfo, InternetObject,
    ParseOptions, Position, PositionRange, TemporalKind, TemporalValue, Value,
};
pub use internet_object_document::{
    infer_schema, serialize_document, serialize_schema, serialize_value, singularize, Document,
    Header, InferredSchemas, Section, SectionContent,
};
pub use internet_object_schema::{
    compile_schema, DefValue, Definitions, MemberDef, Open, ProcessContext, Schema, TypeDef,
    TypeRegistry,
};
pub use internet_object_syntax::{parse_tokens, tokenize, DocumentNode, Token, TokenType};

/// Parses a document with the default options and the standard type
/// registry. Lexical and syntactic failures are recovered into
/// [`Document::errors`]; only strict-mode lexing fails outright.
pub fn parse(text: &str) -> Result<Document, ErrorInfo> {
    let registry = TypeRegistry::standard();
    internet_object_document::parse_document(text, &ParseOptions::default(), &registry)
}

/// Parses a document with explicit options (strict lexing, resolution
/// depth) against the standard type registry.
pub fn parse_with_options(text: &str, options: &ParseOptions) -> Result<Document, ErrorInfo> {
    let registry = TypeRegistry::standard();
    internet_object_document::parse_document(text, options, &registry)
}

/// Compiles standalone schema source (`name: string, age: number`) into a
/// schema, without any surrounding document.
pub fn parse_schema(text: &str) -> Result<std::sync::Arc<Schema>, ErrorInfo> {
    let registry = TypeRegistry::standard();
    let options = ParseOptions::default();
    let tokens = tokenize(text, &options)?;
    let tree = parse_tokens(&tokens);
    if let Some(error) = tree.errors.first() {
        return Err(error.clone());
    }
    let object = tree
        .sections
        .first()
        .and_then(|section| section.content.as_ref())
        .and_then(|content| match content {
            internet_object_syntax::SectionContentNode::Object(object) => Some(object),
            _ => None,
        })
        .ok_or_else(|| {
            ErrorInfo::new(ErrorCode::InvalidSchema, "schema source must be an object")
        })?;
    compile_schema("schema", object, &registry)
}

/// Parses standalone definition rows (`~ @var: …`, `~ $name: {…}`,
/// `~ key: value`) into a definitions store, without any data sections.
pub fn parse_definitions(text: &str) -> Result<Definitions, ErrorInfo> {
    // A trailing separator makes the rows a header rather than data.
    let document = parse(&format!("{text}\n---"))?;
    if let Some(error) = document.errors.first() {
        return Err(error.clone());
    }
    Ok(document.header.definitions().clone())
}

/// Validates a host value against a compiled schema, yielding the typed
/// object. This is the same processor the text pipeline uses, fed from
/// the value instead of a parse tree.
pub fn load_object(value: &Value, schema: &Schema) -> Result<InternetObject, ErrorInfo> {
    let registry = TypeRegistry::standard();
    let defs = Definitions::new();
    let options = ParseOptions::default();
    let ctx = ProcessContext::new(&registry, &defs, &options);
    match value {
        Value::Object(object) => {
            internet_object_schema::process_host_object(object, schema, &ctx)
        }
        other => Err(ErrorInfo::new(
            ErrorCode::InvalidObject,
            format!("expected an object, found {}", other.type_name()),
        )),
    }
}

/// Renders a document back to Internet Object text, header included.
pub fn serialize(document: &Document) -> String {
    serialize_document(document, true)
}
