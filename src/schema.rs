//! Per-type resource schemas: exposed attributes, relationships, and
//! attribute value parsers.
//!
//! A [`ResourceSchema`] is built once per exposed resource type during
//! registry construction and never mutated afterwards. Relationship targets
//! are stored as resource-type names and resolved through the registry at
//! traversal time, so cyclic relationship graphs never require
//! construction-order references.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::types::{Cardinality, Operation, ValueKind};

/// A typed attribute value produced by the write path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParsedValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<FixedOffset>),
}

/// Parses a raw string into a typed attribute value.
///
/// Returns `None` when the raw value cannot be parsed; the caller reports
/// the failure as a violation at the attribute's pointer.
pub type AttributeParser = Arc<dyn Fn(&str) -> Option<ParsedValue> + Send + Sync>;

/// One strategy in the parser-resolution chain, tried in priority order
/// during registry construction. Returns `None` when the strategy does not
/// apply to the attribute.
pub type ParserResolver = fn(name: &str, kind: ValueKind) -> Option<AttributeParser>;

/// A value needs a parser unless its kind is natively JSON-representable.
pub fn parser_required(kind: ValueKind) -> bool {
    !kind.native()
}

/// Default resolver: RFC 3339 parsing for timestamp-kind attributes.
pub fn timestamp_resolver(_name: &str, kind: ValueKind) -> Option<AttributeParser> {
    if kind != ValueKind::Timestamp {
        return None;
    }

    Some(Arc::new(|raw| match DateTime::parse_from_rfc3339(raw) {
        Ok(value) => Some(ParsedValue::Timestamp(value)),
        Err(e) => {
            log::debug!("error parsing timestamp attribute: {}", e);
            None
        }
    }))
}

/// Resolve the parser for one attribute.
///
/// Order: explicitly configured parser, identity for string-kind
/// attributes, then the resolver chain. Returns `None` when no strategy
/// applies; the builder then either disables the attribute's write support
/// or fails construction in strict-parser mode.
pub(crate) fn resolve_parser(
    name: &str,
    kind: ValueKind,
    configured: Option<&AttributeParser>,
    resolvers: &[ParserResolver],
) -> Option<AttributeParser> {
    if let Some(parser) = configured {
        return Some(Arc::clone(parser));
    }

    if kind == ValueKind::String {
        return Some(Arc::new(|raw| Some(ParsedValue::String(raw.to_string()))));
    }

    resolvers.iter().find_map(|resolver| resolver(name, kind))
}

/// Terminal state of parser resolution: always yields no value, disabling
/// the attribute's write support.
pub(crate) fn disabled_parser() -> AttributeParser {
    Arc::new(|_| None)
}

/// An exposed attribute of a resource type.
#[derive(Clone, Serialize)]
pub struct AttributeDescriptor {
    name: String,
    kind: ValueKind,
    nullable: bool,
    #[serde(skip)]
    parser: Option<AttributeParser>,
}

impl AttributeDescriptor {
    pub(crate) fn new(
        name: String,
        kind: ValueKind,
        nullable: bool,
        parser: Option<AttributeParser>,
    ) -> Self {
        AttributeDescriptor {
            name,
            kind,
            nullable,
            parser,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    /// The string parser for this attribute; `None` for natively
    /// JSON-representable kinds, which need no parsing.
    pub fn parser(&self) -> Option<&AttributeParser> {
        self.parser.as_ref()
    }
}

impl std::fmt::Debug for AttributeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("nullable", &self.nullable)
            .field("parser", &self.parser.is_some())
            .finish()
    }
}

/// An exposed relationship of a resource type.
#[derive(Debug, Clone, Serialize)]
pub struct RelationshipDescriptor {
    name: String,
    cardinality: Cardinality,
    /// Exposed resource-type name of the target, resolved through the
    /// registry at traversal time.
    target: String,
}

impl RelationshipDescriptor {
    pub(crate) fn new(name: String, cardinality: Cardinality, target: String) -> Self {
        RelationshipDescriptor {
            name,
            cardinality,
            target,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

/// The schema of one exposed resource type.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceSchema {
    type_name: String,
    id_attribute: String,
    attributes: BTreeMap<String, AttributeDescriptor>,
    relationships: BTreeMap<String, RelationshipDescriptor>,
    operations: BTreeSet<Operation>,
    /// Uniqueness-tuple declarations, stored for the persistence
    /// collaborator; not consulted by validation.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    unique_tuples: BTreeMap<String, BTreeSet<String>>,
}

impl ResourceSchema {
    pub(crate) fn new(
        type_name: String,
        id_attribute: String,
        attributes: BTreeMap<String, AttributeDescriptor>,
        relationships: BTreeMap<String, RelationshipDescriptor>,
        operations: BTreeSet<Operation>,
        unique_tuples: BTreeMap<String, BTreeSet<String>>,
    ) -> Self {
        ResourceSchema {
            type_name,
            id_attribute,
            attributes,
            relationships,
            operations,
            unique_tuples,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Name of the exposed identifier attribute. Never listed in
    /// [`attributes`](Self::attributes).
    pub fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.values()
    }

    pub fn relationships(&self) -> impl Iterator<Item = &RelationshipDescriptor> {
        self.relationships.values()
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.get(name)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn is_related_to(&self, name: &str) -> bool {
        self.relationships.contains_key(name)
    }

    /// A field is an attribute or a relationship.
    pub fn is_field(&self, name: &str) -> bool {
        self.has_attribute(name) || self.is_related_to(name)
    }

    pub fn operation_allowed(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }

    pub fn unique_tuple(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.unique_tuples.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_parser_wins() {
        let configured: AttributeParser = Arc::new(|raw| Some(ParsedValue::Integer(raw.len() as i64)));
        let parser = resolve_parser(
            "code",
            ValueKind::String,
            Some(&configured),
            &[timestamp_resolver],
        )
        .unwrap();

        assert_eq!(parser("abc"), Some(ParsedValue::Integer(3)));
    }

    #[test]
    fn string_kind_gets_identity() {
        let parser = resolve_parser("title", ValueKind::String, None, &[timestamp_resolver]).unwrap();
        assert_eq!(parser("hello"), Some(ParsedValue::String("hello".into())));
    }

    #[test]
    fn timestamp_kind_parses_rfc3339() {
        let parser =
            resolve_parser("publishedAt", ValueKind::Timestamp, None, &[timestamp_resolver]).unwrap();

        let parsed = parser("2021-03-04T05:06:07Z").unwrap();
        assert!(matches!(parsed, ParsedValue::Timestamp(_)));

        assert_eq!(parser("not-a-timestamp"), None);
    }

    #[test]
    fn unresolvable_kind_yields_none() {
        assert!(resolve_parser("blob", ValueKind::Custom, None, &[timestamp_resolver]).is_none());
    }

    #[test]
    fn disabled_parser_never_yields() {
        let parser = disabled_parser();
        assert_eq!(parser("anything"), None);
    }
}
