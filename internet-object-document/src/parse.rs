//! The text → document pipeline: tokenize, parse, compile the header,
//! then process each data section under the schema in scope.

use std::sync::Arc;

use internet_object_core::{ErrorCode, ErrorInfo, ParseOptions};
use internet_object_schema::{
    compile_schema, node_to_value, process_content, DefValue, Definitions, ProcessContext,
    Processed, Schema, TypeRegistry,
};
use internet_object_syntax::{
    parse_tokens, tokenize, HeaderNode, MemberNode, Node, SectionNode,
};

use crate::document::Document;
use crate::header::Header;
use crate::section::{Section, SectionContent};

/// Parses and processes a complete document. In recovery mode (the
/// default) the only fatal failures are strict-mode lexical errors;
/// everything else lands in [`Document::errors`].
pub fn parse_document(
    text: &str,
    options: &ParseOptions,
    registry: &TypeRegistry,
) -> Result<Document, ErrorInfo> {
    let span = tracing::debug_span!("parse_document", bytes = text.len());
    let _span = span.enter();

    let tokens = tokenize(text, options)?;
    let tree = parse_tokens(&tokens);
    let mut errors = tree.errors.clone();

    let mut header = Header::new();
    match &tree.header {
        None => {}
        Some(HeaderNode::Schema(object)) => {
            match compile_schema("schema", object, registry) {
                Ok(schema) => header
                    .definitions_mut()
                    .set("$schema", DefValue::Schema(schema)),
                Err(error) => errors.push(error),
            }
        }
        Some(HeaderNode::Definitions(members)) => {
            for member in members {
                if let Err(error) =
                    apply_definition(member, header.definitions_mut(), registry, options)
                {
                    errors.push(error);
                }
            }
        }
    }

    let mut sections = Vec::new();
    for node in &tree.sections {
        let section = process_section(node, &header, registry, options, &mut errors);
        sections.push(section);
    }

    Ok(Document {
        header,
        sections,
        errors,
    })
}

/// Compiles one `~` header row member into the definitions store. Later
/// rows may reference entries this one introduces; references to entries
/// that do not exist yet fail here, in insertion order.
fn apply_definition(
    member: &MemberNode,
    defs: &mut Definitions,
    registry: &TypeRegistry,
    options: &ParseOptions,
) -> Result<(), ErrorInfo> {
    let Some(key_token) = &member.key else {
        return Err(ErrorInfo::new(
            ErrorCode::InvalidDefinition,
            "definition rows take key: value members",
        )
        .with_position(member.range));
    };
    let key = key_token.text().unwrap_or_default().to_string();
    let Some(value) = &member.value else {
        return Err(ErrorInfo::new(
            ErrorCode::InvalidDefinition,
            format!("definition \"{key}\" has no value"),
        )
        .with_position(member.range));
    };

    if let Some(name) = key.strip_prefix('$') {
        let Node::Object(object) = value else {
            return Err(ErrorInfo::new(
                ErrorCode::InvalidDefinition,
                format!("schema definition \"{key}\" must be an object"),
            )
            .with_position(value.range()));
        };
        let schema = compile_schema(name, object, registry)?;
        defs.set(&key, DefValue::Schema(schema));
        return Ok(());
    }

    let ctx = ProcessContext::new(registry, defs, options);
    let evaluated = node_to_value(value, &ctx)?;
    defs.set(&key, DefValue::Value(evaluated));
    Ok(())
}

fn process_section(
    node: &SectionNode,
    header: &Header,
    registry: &TypeRegistry,
    options: &ParseOptions,
    errors: &mut Vec<ErrorInfo>,
) -> Section {
    let schema: Option<Arc<Schema>> = match &node.schema_ref {
        Some(reference) => {
            let ctx = ProcessContext::new(registry, header.definitions(), options);
            match internet_object_schema::resolve_schema(reference, &ctx) {
                Ok(schema) => Some(schema),
                Err(error) => {
                    let error = error.with_position(node.range);
                    errors.push(error.clone());
                    return Section {
                        name: node.name.clone(),
                        schema_ref: node.schema_ref.clone(),
                        content: SectionContent::Empty,
                        errors: vec![error],
                    };
                }
            }
        }
        None => header.default_schema().cloned(),
    };

    let mut section = Section {
        name: node.name.clone(),
        schema_ref: node.schema_ref.clone(),
        content: SectionContent::Empty,
        errors: Vec::new(),
    };
    let Some(content) = &node.content else {
        return section;
    };

    let ctx = ProcessContext::new(registry, header.definitions(), options);
    match process_content(content, schema.as_deref(), &ctx) {
        Ok(Processed::Single(value)) => section.content = SectionContent::Single(value),
        Ok(Processed::Collection(collection)) => {
            section.errors.extend(collection.errors().iter().cloned());
            errors.extend(collection.errors().iter().cloned());
            section.content = SectionContent::Collection(collection);
        }
        Err(error) => {
            section.errors.push(error.clone());
            errors.push(error);
        }
    }
    section
}
