use std::sync::Arc;

use internet_object_core::{ErrorCode, ParseOptions, Value};
use internet_object_syntax::{
    parse_tokens, tokenize, CollectionNode, ObjectNode, SectionContentNode,
};
use pretty_assertions::assert_eq;

use crate::compile::compile_schema;
use crate::definitions::{DefValue, Definitions};
use crate::model::Schema;
use crate::processor::{process_collection, process_object, ProcessContext};
use crate::types::TypeRegistry;

fn object_node(source: &str) -> ObjectNode {
    let tokens = tokenize(source, &ParseOptions::default()).expect("lexes");
    let document = parse_tokens(&tokens);
    match document.sections.into_iter().next().and_then(|s| s.content) {
        Some(SectionContentNode::Object(object)) => object,
        other => panic!("expected an object section, got {other:?}"),
    }
}

fn collection_node(source: &str) -> CollectionNode {
    let tokens = tokenize(source, &ParseOptions::default()).expect("lexes");
    let document = parse_tokens(&tokens);
    match document.sections.into_iter().next().and_then(|s| s.content) {
        Some(SectionContentNode::Collection(collection)) => collection,
        other => panic!("expected a collection section, got {other:?}"),
    }
}

fn compile(source: &str) -> Arc<Schema> {
    compile_schema("test", &object_node(source), &TypeRegistry::standard()).expect("compiles")
}

struct Fixture {
    registry: TypeRegistry,
    defs: Definitions,
    options: ParseOptions,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            registry: TypeRegistry::standard(),
            defs: Definitions::new(),
            options: ParseOptions::default(),
        }
    }

    fn ctx(&self) -> ProcessContext<'_> {
        ProcessContext::new(&self.registry, &self.defs, &self.options)
    }
}

#[test]
fn positional_binding_in_schema_order() {
    let fixture = Fixture::new();
    let schema = compile("name: string, age: number, gender: string");
    let object = process_object(&object_node("Spiderman, 25, M"), &schema, &fixture.ctx()).unwrap();
    assert_eq!(object.get("name"), Some(&Value::from("Spiderman")));
    assert_eq!(object.get("age"), Some(&Value::Number(25.0)));
    assert_eq!(object.get("gender"), Some(&Value::from("M")));
}

#[test]
fn positional_after_keyword_fails() {
    let fixture = Fixture::new();
    let schema = compile("name: string, age: number, gender: string");
    let error =
        process_object(&object_node("Spiderman, age: 25, M"), &schema, &fixture.ctx()).unwrap_err();
    assert_eq!(error.code, ErrorCode::PositionalAfterKeyword);
}

#[test]
fn optional_trailing_members() {
    let fixture = Fixture::new();
    let schema = compile("v1?: number, v2?: number, v3?: number");
    let object = process_object(&object_node(",,0"), &schema, &fixture.ctx()).unwrap();
    assert_eq!(object.get("v1"), None);
    assert_eq!(object.get("v2"), None);
    assert_eq!(object.get("v3"), Some(&Value::Number(0.0)));
}

#[test]
fn duplicate_members_fail() {
    let fixture = Fixture::new();
    let schema = compile("a: number, b: number");
    let error = process_object(&object_node("a: 1, a: 2"), &schema, &fixture.ctx()).unwrap_err();
    assert_eq!(error.code, ErrorCode::DuplicateMember);
}

#[test]
fn unknown_members_depend_on_openness() {
    let fixture = Fixture::new();
    let closed = compile("a: number");
    let error = process_object(&object_node("a: 1, b: 2"), &closed, &fixture.ctx()).unwrap_err();
    assert_eq!(error.code, ErrorCode::UnknownMember);

    let open = compile("a: number, *");
    let object = process_object(&object_node("a: 1, b: 2"), &open, &fixture.ctx()).unwrap();
    assert_eq!(object.get("b"), Some(&Value::Number(2.0)));
}

#[test]
fn constrained_open_schemas_type_their_extras() {
    let fixture = Fixture::new();
    let schema = compile("a: number, *: number");
    let error = process_object(&object_node("a: 1, b: x"), &schema, &fixture.ctx()).unwrap_err();
    assert_eq!(error.code, ErrorCode::NotANumber);
}

#[test]
fn additional_positional_values_rejected_when_closed() {
    let fixture = Fixture::new();
    let schema = compile("a: number");
    let error = process_object(&object_node("1, 2"), &schema, &fixture.ctx()).unwrap_err();
    assert_eq!(error.code, ErrorCode::AdditionalValuesNotAllowed);
}

#[test]
fn missing_required_member_fails_with_row_anchor() {
    let fixture = Fixture::new();
    let schema = compile("a: number, b: number");
    let error = process_object(&object_node("1"), &schema, &fixture.ctx()).unwrap_err();
    assert_eq!(error.code, ErrorCode::ValueRequired);
    assert_eq!(error.path.as_deref(), Some("b"));
    assert!(error.position.is_some());
}

#[test]
fn defaults_fill_missing_members() {
    let fixture = Fixture::new();
    let schema = compile("a: number, b: {number, default: 42}");
    let object = process_object(&object_node("1"), &schema, &fixture.ctx()).unwrap();
    assert_eq!(object.get("b"), Some(&Value::Number(42.0)));
}

#[test]
fn null_needs_the_nullable_flag() {
    let fixture = Fixture::new();
    let nullable = compile("a*: number");
    let object = process_object(&object_node("N"), &nullable, &fixture.ctx()).unwrap();
    assert_eq!(object.get("a"), Some(&Value::Null));

    let strict = compile("a: number");
    let error = process_object(&object_node("N"), &strict, &fixture.ctx()).unwrap_err();
    assert_eq!(error.code, ErrorCode::NullNotAllowed);
}

#[test]
fn variables_resolve_in_value_positions() {
    let mut fixture = Fixture::new();
    fixture.defs.set("a", DefValue::Value(Value::Number(1.0)));
    let schema = compile("a: number, b: {number, choices: [1, 2]}");
    let object = process_object(&object_node("$a, 2"), &schema, &fixture.ctx()).unwrap();
    assert_eq!(object.get("a"), Some(&Value::Number(1.0)));
    assert_eq!(object.get("b"), Some(&Value::Number(2.0)));
}

#[test]
fn choices_reject_other_values() {
    let fixture = Fixture::new();
    let schema = compile("a: number, b: {number, choices: [1, 3]}");
    let error = process_object(&object_node("1, 2"), &schema, &fixture.ctx()).unwrap_err();
    assert_eq!(error.code, ErrorCode::InvalidChoice);
}

#[test]
fn variable_options_resolve_at_process_time() {
    let mut fixture = Fixture::new();
    fixture
        .defs
        .set("@minAge", DefValue::Value(Value::Number(18.0)));
    let schema = compile("age: {number, min: @minAge}");
    let ctx = fixture.ctx();
    assert!(process_object(&object_node("21"), &schema, &ctx).is_ok());
    let error = process_object(&object_node("12"), &schema, &ctx).unwrap_err();
    assert_eq!(error.code, ErrorCode::OutOfRange);
}

#[test]
fn undefined_variables_fail() {
    let fixture = Fixture::new();
    let schema = compile("a: number");
    let error = process_object(&object_node("$nope"), &schema, &fixture.ctx()).unwrap_err();
    assert_eq!(error.code, ErrorCode::VariableNotDefined);
}

#[test]
fn variable_resolution_is_single_hop() {
    let mut fixture = Fixture::new();
    // Stored values never re-resolve; a stored "@b" is just text.
    fixture.defs.set("@a", DefValue::Value(Value::from("@b")));
    let schema = compile("x: string");
    let object = process_object(&object_node("@a"), &schema, &fixture.ctx()).unwrap();
    assert_eq!(object.get("x"), Some(&Value::from("@b")));
}

#[test]
fn unbounded_schema_recursion_hits_the_depth_limit() {
    let mut fixture = Fixture::new();
    let node_schema = compile("next: $node");
    fixture.defs.set("$node", DefValue::Schema(node_schema));
    let schema = compile("root: $node");

    // Data nested past the depth limit keeps re-resolving `$node`.
    let mut row = String::from("{next: 1}");
    for _ in 0..70 {
        row = format!("{{next: {row}}}");
    }
    let error = process_object(&object_node(&row), &schema, &fixture.ctx()).unwrap_err();
    assert_eq!(error.code, ErrorCode::InvalidSchema);
}

#[test]
fn schema_references_resolve_through_definitions() {
    let mut fixture = Fixture::new();
    let address = compile("city: string, zip: number");
    fixture.defs.set("$address", DefValue::Schema(address));
    let schema = compile("name: string, home: $address");
    let object = process_object(
        &object_node("Spiderman, {Queens, 11375}"),
        &schema,
        &fixture.ctx(),
    )
    .unwrap();
    let home = object.get("home").and_then(Value::as_object).unwrap();
    assert_eq!(home.get("city"), Some(&Value::from("Queens")));
    assert_eq!(home.get("zip"), Some(&Value::Number(11375.0)));
}

#[test]
fn missing_schema_references_fail() {
    let fixture = Fixture::new();
    let schema = compile("home: $address");
    let error = process_object(&object_node("{Queens}"), &schema, &fixture.ctx()).unwrap_err();
    assert_eq!(error.code, ErrorCode::SchemaNotDefined);
}

#[test]
fn arrays_parse_element_wise() {
    let fixture = Fixture::new();
    let schema = compile("tags: [string]");
    let object = process_object(&object_node("[red, green]"), &schema, &fixture.ctx()).unwrap();
    assert_eq!(
        object.get("tags"),
        Some(&Value::Array(vec![
            Value::from("red"),
            Value::from("green")
        ]))
    );

    let error = process_object(&object_node("[red, 5]"), &schema, &fixture.ctx()).unwrap_err();
    assert_eq!(error.code, ErrorCode::NotAString);
}

#[test]
fn string_length_constraints() {
    let fixture = Fixture::new();
    let schema = compile("name: {string, minLength: 3, maxLength: 5}");
    let ctx = fixture.ctx();
    assert!(process_object(&object_node("abcd"), &schema, &ctx).is_ok());
    let error = process_object(&object_node("ab"), &schema, &ctx).unwrap_err();
    assert_eq!(error.code, ErrorCode::InvalidMinLength);
    let error = process_object(&object_node("abcdef"), &schema, &ctx).unwrap_err();
    assert_eq!(error.code, ErrorCode::InvalidMaxLength);
}

#[test]
fn datetime_strings_parse_in_place() {
    let fixture = Fixture::new();
    let schema = compile("v: datetime");
    let object = process_object(
        &object_node("20200412T084346.619Z"),
        &schema,
        &fixture.ctx(),
    )
    .unwrap();
    let Some(Value::Temporal(temporal)) = object.get("v") else {
        panic!("expected a temporal value");
    };
    assert_eq!(temporal.canonical(), "2020-04-12T08:43:46.619Z");
}

#[test]
fn collections_capture_row_errors_with_indexes() {
    let fixture = Fixture::new();
    let schema = compile("a: number");
    let collection = process_collection(
        &collection_node("~ 1\n~ x\n~ 3"),
        Some(&schema),
        &fixture.ctx(),
    );
    assert_eq!(collection.len(), 3);
    assert_eq!(collection.errors().len(), 1);
    let error = &collection.errors()[0];
    assert_eq!(error.code, ErrorCode::NotANumber);
    assert_eq!(error.collection_index, Some(1));
    assert!(collection.get(0).unwrap().value().is_some());
    assert!(collection.get(2).unwrap().value().is_some());
}

#[test]
fn schemaless_collections_pass_values_through() {
    let fixture = Fixture::new();
    let collection = process_collection(&collection_node("~ 1\n~ two\n~ true"), None, &fixture.ctx());
    assert_eq!(collection.get(0).unwrap().value(), Some(&Value::Number(1.0)));
    assert_eq!(collection.get(1).unwrap().value(), Some(&Value::from("two")));
    assert_eq!(collection.get(2).unwrap().value(), Some(&Value::Bool(true)));
}

#[test]
fn open_schemas_accept_extra_positional_values() {
    let fixture = Fixture::new();
    let schema = compile("a: number, *");
    let object = process_object(&object_node("1, extra, true"), &schema, &fixture.ctx()).unwrap();
    assert_eq!(object.get("a"), Some(&Value::Number(1.0)));
    assert_eq!(object.get_at(1), Some(&Value::from("extra")));
    assert_eq!(object.get_at(2), Some(&Value::Bool(true)));
}

#[test]
fn bool_rejects_lookalikes() {
    let fixture = Fixture::new();
    let schema = compile("flag: bool");
    let ctx = fixture.ctx();
    assert!(process_object(&object_node("true"), &schema, &ctx).is_ok());
    assert!(process_object(&object_node("T"), &schema, &ctx).is_ok());
    let error = process_object(&object_node("yes"), &schema, &ctx).unwrap_err();
    assert_eq!(error.code, ErrorCode::NotABool);
    let error = process_object(&object_node("1"), &schema, &ctx).unwrap_err();
    assert_eq!(error.code, ErrorCode::NotABool);
}

#[test]
fn pattern_constraints_match_the_whole_value() {
    let fixture = Fixture::new();
    let schema = compile("code: {string, pattern: \"[A-Z]{3}\"}");
    let ctx = fixture.ctx();
    assert!(process_object(&object_node("ABC"), &schema, &ctx).is_ok());
    let error = process_object(&object_node("ABCD"), &schema, &ctx).unwrap_err();
    assert_eq!(error.code, ErrorCode::InvalidPattern);
}

#[test]
fn temporal_bounds() {
    let fixture = Fixture::new();
    let schema = compile("day: {date, min: d'2020-01-01', max: d'2020-12-31'}");
    let ctx = fixture.ctx();
    assert!(process_object(&object_node("d'2020-06-15'"), &schema, &ctx).is_ok());
    let error = process_object(&object_node("d'2019-06-15'"), &schema, &ctx).unwrap_err();
    assert_eq!(error.code, ErrorCode::OutOfRange);
}

#[test]
fn temporal_kinds_do_not_cross() {
    let fixture = Fixture::new();
    let schema = compile("day: date");
    let error = process_object(
        &object_node("dt'2020-06-15T10:00:00Z'"),
        &schema,
        &fixture.ctx(),
    )
    .unwrap_err();
    assert_eq!(error.code, ErrorCode::NotADate);
}

#[test]
fn array_length_bounds() {
    let fixture = Fixture::new();
    let schema = compile("tags: {array, of: string, minLength: 1, maxLength: 2}");
    let ctx = fixture.ctx();
    assert!(process_object(&object_node("[a]"), &schema, &ctx).is_ok());
    let error = process_object(&object_node("[]"), &schema, &ctx).unwrap_err();
    assert_eq!(error.code, ErrorCode::InvalidLength);
    let error = process_object(&object_node("[a, b, c]"), &schema, &ctx).unwrap_err();
    assert_eq!(error.code, ErrorCode::InvalidLength);
}

#[test]
fn error_nodes_in_rows_become_row_errors() {
    let fixture = Fixture::new();
    let schema = compile("s: string");
    let collection = process_collection(
        &collection_node("~ ok\n~ xyz'bad'\n~ fine"),
        Some(&schema),
        &fixture.ctx(),
    );
    assert_eq!(collection.len(), 3);
    assert_eq!(collection.errors().len(), 1);
    assert_eq!(
        collection.errors()[0].code,
        ErrorCode::UnsupportedAnnotation
    );
}

#[test]
fn int_constraints_run_in_order() {
    let fixture = Fixture::new();
    let plain = compile("n: int");
    let ctx = fixture.ctx();
    assert!(process_object(&object_node("3"), &plain, &ctx).is_ok());
    let error = process_object(&object_node("3.5"), &plain, &ctx).unwrap_err();
    assert_eq!(error.code, ErrorCode::NotAnInteger);

    // Choices come before the integer-only check.
    let choices = compile("n: {int, choices: [1, 2, 3]}");
    let error = process_object(&object_node("3.5"), &choices, &ctx).unwrap_err();
    assert_eq!(error.code, ErrorCode::InvalidChoice);

    // So does the range.
    let bounded = compile("n: {int, min: 4}");
    let error = process_object(&object_node("3.5"), &bounded, &ctx).unwrap_err();
    assert_eq!(error.code, ErrorCode::OutOfRange);
}

#[test]
fn bigint_coercions() {
    use num_bigint::BigInt;

    let fixture = Fixture::new();
    let schema = compile("n: bigint");
    let ctx = fixture.ctx();
    // A bigint literal and a plain integral number both land as bigint.
    let object = process_object(&object_node("42n"), &schema, &ctx).unwrap();
    assert_eq!(object.get("n"), Some(&Value::BigInt(BigInt::from(42))));
    let object = process_object(&object_node("42"), &schema, &ctx).unwrap();
    assert_eq!(object.get("n"), Some(&Value::BigInt(BigInt::from(42))));

    let error = process_object(&object_node("4.2"), &schema, &ctx).unwrap_err();
    assert_eq!(error.code, ErrorCode::NotABigint);
    let error = process_object(&object_node("Inf"), &schema, &ctx).unwrap_err();
    assert_eq!(error.code, ErrorCode::UnsupportedNumberType);
}

#[test]
fn decimal_coercions_and_bounds() {
    let fixture = Fixture::new();
    let schema = compile("d: {decimal, min: 0.5m, max: 2m}");
    let ctx = fixture.ctx();
    let object = process_object(&object_node("1.50m"), &schema, &ctx).unwrap();
    let Some(Value::Decimal(value)) = object.get("d") else {
        panic!("expected a decimal");
    };
    assert_eq!(value.to_string(), "1.50");

    let error = process_object(&object_node("0.25m"), &schema, &ctx).unwrap_err();
    assert_eq!(error.code, ErrorCode::OutOfRange);
    // Integers widen into decimals exactly.
    assert!(process_object(&object_node("1"), &schema, &ctx).is_ok());
}

#[test]
fn id_and_url_formats() {
    let fixture = Fixture::new();
    let schema = compile("key: id, site: url");
    let ctx = fixture.ctx();
    assert!(process_object(
        &object_node("user_1, \"https://example.org\""),
        &schema,
        &ctx
    )
    .is_ok());
    let error = process_object(
        &object_node("1bad, \"https://example.org\""),
        &schema,
        &ctx,
    )
    .unwrap_err();
    assert_eq!(error.code, ErrorCode::InvalidPattern);
    let error =
        process_object(&object_node("ok, \"not a url\""), &schema, &ctx).unwrap_err();
    assert_eq!(error.code, ErrorCode::InvalidUrl);
}

#[test]
fn defaults_run_through_their_constraints() {
    let fixture = Fixture::new();
    // The synthesized default violates its own choices.
    let schema = compile("c: {string, choices: [a, b], default: z}");
    let error = process_object(&object_node(","), &schema, &fixture.ctx()).unwrap_err();
    assert_eq!(error.code, ErrorCode::InvalidChoice);
}

#[test]
fn temporal_defaults_can_be_now() {
    let fixture = Fixture::new();
    let schema = compile("at: {datetime, default: now}, v: number");
    let object = process_object(&object_node("v: 1"), &schema, &fixture.ctx()).unwrap();
    let Some(Value::Temporal(at)) = object.get("at") else {
        panic!("expected a synthesized timestamp");
    };
    assert!(at.when.year() >= 2024);
}

#[test]
fn nullable_defaults() {
    let fixture = Fixture::new();
    let schema = compile("v*: {number, default: N}, w: number");
    let object = process_object(&object_node("w: 1"), &schema, &fixture.ctx()).unwrap();
    assert_eq!(object.get("v"), Some(&Value::Null));
}

#[test]
fn host_objects_validate_like_rows() {
    use internet_object_core::InternetObject;

    let fixture = Fixture::new();
    let schema = compile("name: string, age: {number, min: 18}");
    let mut host = InternetObject::new();
    host.set("name", Value::from("Bruce"));
    host.set("age", Value::Number(32.0));
    let object =
        crate::processor::process_host_object(&host, &schema, &fixture.ctx()).unwrap();
    assert_eq!(object.get("age"), Some(&Value::Number(32.0)));

    let mut minor = InternetObject::new();
    minor.set("name", Value::from("Damian"));
    minor.set("age", Value::Number(12.0));
    let error =
        crate::processor::process_host_object(&minor, &schema, &fixture.ctx()).unwrap_err();
    assert_eq!(error.code, ErrorCode::OutOfRange);
}
