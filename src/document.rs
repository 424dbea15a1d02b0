//! Document-structure validation for the write path.
//!
//! Every envelope rule runs independently and contributes its violations;
//! no rule short-circuits another, so one pass reports everything a client
//! must fix.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::Violation;
use crate::schema::{ParsedValue, ResourceSchema};
use crate::types::{
    json_type_name, Operation, ValueKind, LINKS_MEMBERS, RESOURCE_MEMBERS, TOP_LEVEL_MEMBERS,
    TOP_LEVEL_PRIMARY,
};

/// Pointer to a named attribute of the primary resource object.
pub fn attribute_pointer(name: &str) -> String {
    format!("/data/attributes/{}", name)
}

/// Pointer to a named relationship of the primary resource object.
pub fn relationship_pointer(name: &str) -> String {
    format!("/data/relationships/{}", name)
}

/// Check an inbound write document against the envelope rules.
///
/// An absent document is valid and is not passed here. Returns every
/// violation found; an empty result means the document is structurally
/// sound and ready for attribute coercion.
pub fn validate_document(document: &Value, operation: Operation) -> Vec<Violation> {
    let mut violations = Vec::new();

    let Some(document) = document.as_object() else {
        violations.push(Violation::at_pointer("/", "A document MUST be a JSON object"));
        return violations;
    };

    valid_top_level_keys(document, &mut violations);
    valid_top_level_required(document, &mut violations);
    valid_top_level_exclusive(document, &mut violations);
    valid_links(document, &mut violations);
    valid_data(document, operation, &mut violations);

    violations
}

fn valid_top_level_keys(document: &Map<String, Value>, violations: &mut Vec<Violation>) {
    for key in document.keys() {
        if !TOP_LEVEL_MEMBERS.contains(&key.as_str()) {
            violations.push(Violation::at_pointer(
                format!("/{}", key),
                "A document may ONLY contain these top-level members: \
                 `data`, `errors`, `meta`, `jsonapi`, `links`, `included`",
            ));
        }
    }
}

fn valid_top_level_required(document: &Map<String, Value>, violations: &mut Vec<Violation>) {
    let has_required = document
        .keys()
        .any(|key| TOP_LEVEL_PRIMARY.contains(&key.as_str()));

    if !has_required {
        violations.push(Violation::at_pointer(
            "/",
            "A document MUST contain at least one of the following top-level members: \
             `data`, `errors`, `meta`",
        ));
    }
}

fn valid_top_level_exclusive(document: &Map<String, Value>, violations: &mut Vec<Violation>) {
    if document.contains_key("data") && document.contains_key("errors") {
        violations.push(Violation::at_pointer(
            "/",
            "The members `data` and `errors` MUST NOT coexist in the same document.",
        ));
    }
}

fn valid_links(document: &Map<String, Value>, violations: &mut Vec<Violation>) {
    let Some(links) = document.get("links") else {
        return;
    };

    let Some(links) = links.as_object() else {
        violations.push(Violation::at_pointer(
            "/links",
            "The value of each links member MUST be an object.",
        ));
        return;
    };

    for key in links.keys() {
        if !LINKS_MEMBERS.contains(&key.as_str()) {
            violations.push(Violation::at_pointer(
                format!("/links/{}", key),
                "The top-level links object MAY contain the following members: \
                 `self`, `related`, pagination links: `first`, `last`, `prev`, `next`",
            ));
        }
    }
}

fn valid_data(document: &Map<String, Value>, operation: Operation, violations: &mut Vec<Violation>) {
    let Some(data) = document.get("data") else {
        return;
    };

    // Write operations target single resources; arrays and null are
    // rejected (null `data` relationship-clearing is not supported).
    let Some(resource) = data.as_object() else {
        violations.push(Violation::at_pointer(
            "/data",
            "Primary data MUST be a single resource object, a single resource identifier \
             object, or null, for requests that target single resources",
        ));
        return;
    };

    for key in resource.keys() {
        if !RESOURCE_MEMBERS.contains(&key.as_str()) {
            violations.push(Violation::at_pointer(
                format!("/data/{}", key),
                "A resource object may only contain these top-level members: \
                 `id`, `type`, `attributes`, `relationships`, `links`, `meta`",
            ));
        }
    }

    let type_member = resource.get("type");
    let id_member = resource.get("id");

    if type_member.is_none() || (id_member.is_none() && !operation.id_optional()) {
        violations.push(Violation::at_pointer(
            "/data",
            "A resource object MUST contain at least the following top-level members: \
             `id`, `type`",
        ));
    }

    if let Some(type_member) = type_member {
        if !type_member.is_string() {
            violations.push(Violation::at_pointer(
                "/data/type",
                "The value of the type member MUST be a string.",
            ));
        }
    }

    if let Some(id_member) = id_member {
        if !id_member.is_string() {
            violations.push(Violation::at_pointer(
                "/data/id",
                "The value of the id member MUST be a string.",
            ));
        }
    }
}

/// Coerce the document's attribute values through the schema's parsers.
///
/// Applied after [`validate_document`] passes. Returns the typed values
/// (`None` for an accepted null) alongside every coercion violation, each
/// located at the offending attribute or relationship pointer.
pub fn coerce_attributes(
    schema: &ResourceSchema,
    document: &Value,
) -> (BTreeMap<String, Option<ParsedValue>>, Vec<Violation>) {
    let mut values = BTreeMap::new();
    let mut violations = Vec::new();

    let data = &document["data"];

    if let Some(attributes) = data.get("attributes") {
        match attributes.as_object() {
            Some(attributes) => {
                for (name, value) in attributes {
                    coerce_attribute(schema, name, value, &mut values, &mut violations);
                }
            }
            None => violations.push(Violation::at_pointer(
                "/data/attributes",
                "The value of the attributes member MUST be an object.",
            )),
        }
    }

    if let Some(relationships) = data.get("relationships") {
        match relationships.as_object() {
            Some(relationships) => {
                for name in relationships.keys() {
                    if !schema.is_related_to(name) {
                        violations.push(Violation::at_pointer(
                            relationship_pointer(name),
                            format!("Unknown relationship: `{}`", name),
                        ));
                    }
                }
            }
            None => violations.push(Violation::at_pointer(
                "/data/relationships",
                "The value of the relationships member MUST be an object.",
            )),
        }
    }

    (values, violations)
}

fn coerce_attribute(
    schema: &ResourceSchema,
    name: &str,
    value: &Value,
    values: &mut BTreeMap<String, Option<ParsedValue>>,
    violations: &mut Vec<Violation>,
) {
    let Some(descriptor) = schema.attribute(name) else {
        violations.push(Violation::at_pointer(
            attribute_pointer(name),
            format!("Unknown attribute: `{}`", name),
        ));
        return;
    };

    if value.is_null() {
        if descriptor.nullable() {
            values.insert(name.to_string(), None);
        } else {
            violations.push(Violation::at_pointer(
                attribute_pointer(name),
                format!("Attribute `{}` may not be null", name),
            ));
        }
        return;
    }

    let parsed = match descriptor.parser() {
        // Parsed kinds arrive as JSON strings.
        Some(parser) => match value.as_str() {
            Some(raw) => match parser(raw) {
                Some(parsed) => Some(parsed),
                None => {
                    log::debug!("error parsing attribute `{}`: `{}`", name, raw);
                    violations.push(Violation::at_pointer(
                        attribute_pointer(name),
                        format!("Invalid value for attribute `{}`: `{}`", name, raw),
                    ));
                    return;
                }
            },
            None => {
                mismatch(name, "string", value, violations);
                return;
            }
        },
        None => match native_value(descriptor.kind(), value) {
            Some(parsed) => Some(parsed),
            None => {
                mismatch(name, expected_word(descriptor.kind()), value, violations);
                return;
            }
        },
    };

    values.insert(name.to_string(), parsed);
}

fn native_value(kind: ValueKind, value: &Value) -> Option<ParsedValue> {
    match kind {
        ValueKind::Integer => value.as_i64().map(ParsedValue::Integer),
        ValueKind::Float => value.as_f64().map(ParsedValue::Float),
        ValueKind::Boolean => value.as_bool().map(ParsedValue::Boolean),
        _ => None,
    }
}

fn expected_word(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Integer => "integer",
        ValueKind::Float => "number",
        ValueKind::Boolean => "boolean",
        _ => "string",
    }
}

fn mismatch(name: &str, expected: &str, value: &Value, violations: &mut Vec<Violation>) {
    violations.push(Violation::at_pointer(
        attribute_pointer(name),
        format!(
            "Invalid value for attribute `{}`: expected {}, got {}",
            name,
            expected,
            json_type_name(value)
        ),
    ));
}
