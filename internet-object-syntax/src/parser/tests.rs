use internet_object_core::{ErrorCode, ParseOptions, Value};
use pretty_assertions::assert_eq;

use crate::ast::{HeaderNode, Node, SectionContentNode};
use crate::parser::parse_tokens;
use crate::tokenizer::tokenize;

fn parse(source: &str) -> crate::ast::DocumentNode {
    let tokens = tokenize(source, &ParseOptions::default()).expect("recovery mode never errors");
    parse_tokens(&tokens)
}

#[test]
fn bare_object_document() {
    let document = parse("Spiderman, 25, M");
    assert!(document.header.is_none());
    assert_eq!(document.sections.len(), 1);
    let Some(SectionContentNode::Object(object)) = &document.sections[0].content else {
        panic!("expected an object section");
    };
    assert_eq!(object.members.len(), 3);
    assert!(object.members.iter().all(|m| m.key.is_none()));
}

#[test]
fn keyed_and_positional_members() {
    let document = parse("Spiderman, age: 25");
    let Some(SectionContentNode::Object(object)) = &document.sections[0].content else {
        panic!("expected an object section");
    };
    assert!(object.members[0].key.is_none());
    let key = object.members[1].key.as_ref().expect("keyed member");
    assert_eq!(key.text(), Some("age"));
}

#[test]
fn elided_positional_slots() {
    let document = parse(",,0");
    let Some(SectionContentNode::Object(object)) = &document.sections[0].content else {
        panic!("expected an object section");
    };
    assert_eq!(object.members.len(), 3);
    assert!(object.members[0].value.is_none());
    assert!(object.members[1].value.is_none());
    let Some(Node::Token(token)) = &object.members[2].value else {
        panic!("expected a token value");
    };
    assert_eq!(token.value, Value::Number(0.0));
}

#[test]
fn nested_objects_and_arrays() {
    let document = parse("{a: {b: [1, 2, {c: 3}]}}");
    let Some(SectionContentNode::Object(object)) = &document.sections[0].content else {
        panic!("expected an object section");
    };
    let Some(Node::Object(outer)) = &object.members[0].value else {
        panic!("expected the braced object");
    };
    let Some(Node::Object(inner)) = &outer.members[0].value else {
        panic!("expected nested object");
    };
    let Some(Node::Array(array)) = &inner.members[0].value else {
        panic!("expected array");
    };
    assert_eq!(array.elements.len(), 3);
}

#[test]
fn schema_header_before_separator() {
    let document = parse("name, age, gender\n---\nSpiderman, 25, M");
    let Some(HeaderNode::Schema(schema)) = &document.header else {
        panic!("expected a schema header");
    };
    assert_eq!(schema.members.len(), 3);
    assert_eq!(document.sections.len(), 1);
}

#[test]
fn definition_rows_header() {
    let document = parse("~ a: 1\n~ $schema: {x: number}\n---\n1");
    let Some(HeaderNode::Definitions(members)) = &document.header else {
        panic!("expected definition rows");
    };
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].key.as_ref().unwrap().text(), Some("a"));
    assert_eq!(members[1].key.as_ref().unwrap().text(), Some("$schema"));
}

#[test]
fn collections_group_consecutive_rows() {
    let document = parse("~ a, 1\n~ b, 2\n~ c, 3");
    let Some(SectionContentNode::Collection(collection)) = &document.sections[0].content else {
        panic!("expected a collection");
    };
    assert_eq!(collection.rows.len(), 3);
}

#[test]
fn named_sections_with_schema_refs() {
    let document = parse("~ x: 1\n--- people: $person\n~ a\n--- $pet\n~ b");
    assert_eq!(document.sections.len(), 2);
    assert_eq!(document.sections[0].name.as_deref(), Some("people"));
    assert_eq!(document.sections[0].schema_ref.as_deref(), Some("$person"));
    assert_eq!(document.sections[1].name, None);
    assert_eq!(document.sections[1].schema_ref.as_deref(), Some("$pet"));
}

#[test]
fn empty_sections() {
    let document = parse("~ a: 1\n---\n--- two\n");
    assert_eq!(document.sections.len(), 2);
    assert!(document.sections[0].content.is_none());
    assert!(document.sections[1].content.is_none());
    assert_eq!(document.sections[1].name.as_deref(), Some("two"));
}

#[test]
fn missing_close_brace_reports_the_opener() {
    let document = parse("{a: 1");
    assert!(!document.errors.is_empty());
    let error = &document.errors[0];
    assert_eq!(error.code, ErrorCode::ExpectingBracket);
    assert_eq!(error.position.unwrap().start.col, 1);
    // The partial object is still in the tree.
    let Some(SectionContentNode::Object(object)) = &document.sections[0].content else {
        panic!("expected an object section");
    };
    let Some(Node::Object(inner)) = &object.members[0].value else {
        panic!("expected the partial object");
    };
    assert!(inner.members.iter().any(|m| m
        .value
        .as_ref()
        .map(|v| v.is_error())
        .unwrap_or(false)));
}

#[test]
fn error_nodes_do_not_abort_the_row() {
    let document = parse("a: 1, : :, b: 2");
    let Some(SectionContentNode::Object(object)) = &document.sections[0].content else {
        panic!("expected an object section");
    };
    assert!(!document.errors.is_empty());
    // The members before and after the error both survive.
    let keys: Vec<_> = object
        .members
        .iter()
        .filter_map(|m| m.key.as_ref().and_then(|k| k.text()))
        .collect();
    assert!(keys.contains(&"a"));
    assert!(keys.contains(&"b"));
}

#[test]
fn invalid_keys_are_structured_errors() {
    let document = parse("25: x, b: 2");
    assert!(document
        .errors
        .iter()
        .any(|e| e.code == ErrorCode::InvalidKey));
    let Some(SectionContentNode::Object(object)) = &document.sections[0].content else {
        panic!("expected an object section");
    };
    let keys: Vec<_> = object
        .members
        .iter()
        .filter_map(|m| m.key.as_ref().and_then(|k| k.text()))
        .collect();
    assert_eq!(keys, ["b"]);
}

#[test]
fn lexical_error_tokens_surface_in_document_errors() {
    let document = parse("a: xyz'oops'");
    assert!(document
        .errors
        .iter()
        .any(|e| e.code == ErrorCode::UnsupportedAnnotation));
}

#[test]
fn empty_collection_rows_are_empty_objects() {
    let document = parse("~\n~ a");
    let Some(SectionContentNode::Collection(collection)) = &document.sections[0].content else {
        panic!("expected a collection");
    };
    assert_eq!(collection.rows.len(), 2);
    let Node::Object(first) = &collection.rows[0] else {
        panic!("expected an object row");
    };
    assert!(first.is_empty());
}
