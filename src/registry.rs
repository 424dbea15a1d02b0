//! Registry construction: declarative per-type configuration applied to
//! backing-model metadata.
//!
//! The registry is written exactly once, during single-threaded
//! initialization, and thereafter only read; any inconsistency found while
//! building is a fatal [`SchemaBuildError`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, SchemaBuildError};
use crate::model::{EntityModel, MemberKind};
use crate::schema::{
    disabled_parser, parser_required, resolve_parser, timestamp_resolver, AttributeDescriptor,
    AttributeParser, ParserResolver, RelationshipDescriptor, ResourceSchema,
};
use crate::types::{Cardinality, Operation, ValueKind};

const ALL_OPERATIONS: &[Operation] = &[
    Operation::Create,
    Operation::Read,
    Operation::Update,
    Operation::Delete,
];

/// Declarative definition of one exposed resource type.
///
/// # Example
///
/// ```
/// use jsonapi_gate::{EntityModel, Operation, ResourceType, ValueKind};
///
/// let posts = ResourceType::define(
///     "posts",
///     EntityModel::new("Post", "id")
///         .basic("title", ValueKind::String)
///         .many("comments", "Comment"),
/// )
/// .operations([Operation::Create, Operation::Read]);
/// ```
#[derive(Clone)]
pub struct ResourceType {
    name: String,
    model: EntityModel,
    operations: BTreeSet<Operation>,
    /// Relationship allow-list; `None` exposes every association whose
    /// target is itself an exposed type.
    relationships: Option<BTreeSet<String>>,
    exposed_id: Option<String>,
    readers: BTreeMap<String, AttributeParser>,
    unique_tuples: BTreeMap<String, BTreeSet<String>>,
}

impl std::fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceType")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("operations", &self.operations)
            .field("relationships", &self.relationships)
            .field("exposed_id", &self.exposed_id)
            .field("readers", &self.readers.keys().collect::<Vec<_>>())
            .field("unique_tuples", &self.unique_tuples)
            .finish()
    }
}

impl ResourceType {
    /// Start a definition exposing `name` backed by `model`, with all
    /// operations allowed.
    pub fn define(name: impl Into<String>, model: EntityModel) -> Self {
        ResourceType {
            name: name.into(),
            model,
            operations: ALL_OPERATIONS.iter().copied().collect(),
            relationships: None,
            exposed_id: None,
            readers: BTreeMap::new(),
            unique_tuples: BTreeMap::new(),
        }
    }

    /// Restrict the allowed operations.
    pub fn operations(mut self, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.operations = operations.into_iter().collect();
        self
    }

    /// Restrict the exposed relationships to an allow-list.
    pub fn relationships<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relationships = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Expose a non-identifier member as the resource id.
    pub fn exposed_id(mut self, member: impl Into<String>) -> Self {
        self.exposed_id = Some(member.into());
        self
    }

    /// Configure a custom parser for one attribute. Takes precedence over
    /// every other resolution strategy.
    pub fn reader(mut self, attribute: impl Into<String>, parser: AttributeParser) -> Self {
        self.readers.insert(attribute.into(), parser);
        self
    }

    /// Declare a named uniqueness tuple, stored for the persistence
    /// collaborator.
    pub fn unique<I, S>(mut self, name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_tuples
            .insert(name.into(), members.into_iter().map(Into::into).collect());
        self
    }
}

/// Builds a [`SchemaRegistry`] from resource-type definitions.
pub struct RegistryBuilder {
    types: Vec<ResourceType>,
    resolvers: Vec<ParserResolver>,
    strict_parsers: bool,
}

impl RegistryBuilder {
    fn new() -> Self {
        RegistryBuilder {
            types: Vec::new(),
            resolvers: vec![timestamp_resolver],
            strict_parsers: false,
        }
    }

    /// Add a resource-type definition.
    pub fn resource(mut self, definition: ResourceType) -> Self {
        self.types.push(definition);
        self
    }

    /// Add a parser-resolution strategy, tried before the default chain.
    pub fn resolver(mut self, resolver: ParserResolver) -> Self {
        self.resolvers.insert(0, resolver);
        self
    }

    /// When set, an attribute whose parser cannot be resolved fails the
    /// build instead of having its write support disabled.
    pub fn strict_parsers(mut self, strict: bool) -> Self {
        self.strict_parsers = strict;
        self
    }

    /// Build every schema, failing on the first configuration defect.
    pub fn build(self) -> Result<SchemaRegistry, SchemaBuildError> {
        let mut exposed_entities: BTreeMap<&str, &str> = BTreeMap::new();

        for definition in &self.types {
            exposed_entities
                .entry(definition.model.name.as_str())
                .or_insert(definition.name.as_str());
        }

        let mut schemas = BTreeMap::new();

        for definition in &self.types {
            if schemas.contains_key(&definition.name) {
                return Err(SchemaBuildError::DuplicateType {
                    name: definition.name.clone(),
                });
            }

            let schema = self.build_schema(definition, &exposed_entities)?;
            schemas.insert(definition.name.clone(), schema);
        }

        Ok(SchemaRegistry { schemas })
    }

    fn build_schema(
        &self,
        definition: &ResourceType,
        exposed_entities: &BTreeMap<&str, &str>,
    ) -> Result<ResourceSchema, SchemaBuildError> {
        let model = &definition.model;

        let id_attribute = match &definition.exposed_id {
            Some(member) => {
                match model.member(member) {
                    Some(found) if found.is_association() => {
                        return Err(SchemaBuildError::InvalidIdMember {
                            type_name: definition.name.clone(),
                            member: member.clone(),
                        })
                    }
                    Some(_) => {}
                    None => {
                        return Err(SchemaBuildError::UnknownIdMember {
                            type_name: definition.name.clone(),
                            member: member.clone(),
                            entity: model.name.clone(),
                        })
                    }
                }
                member.clone()
            }
            None => model.id.clone(),
        };

        if let Some(allowed) = &definition.relationships {
            for name in allowed {
                if !model.member(name).is_some_and(|m| m.is_association()) {
                    return Err(SchemaBuildError::UnknownRelationship {
                        type_name: definition.name.clone(),
                        name: name.clone(),
                        entity: model.name.clone(),
                    });
                }
            }
        }

        let mut attributes = BTreeMap::new();
        let mut relationships = BTreeMap::new();

        for member in &model.members {
            match &member.kind {
                MemberKind::Basic { kind, nullable } => {
                    if member.name == model.id || member.name == id_attribute {
                        continue;
                    }

                    let parser =
                        self.attribute_parser(definition, &member.name, *kind)?;
                    attributes.insert(
                        member.name.clone(),
                        AttributeDescriptor::new(member.name.clone(), *kind, *nullable, parser),
                    );
                }
                MemberKind::Association { target, many } => {
                    if let Some(allowed) = &definition.relationships {
                        if !allowed.contains(&member.name) {
                            continue;
                        }
                    }

                    // Only associations to exposed types become relationships.
                    let Some(target_type) = exposed_entities.get(target.as_str()) else {
                        continue;
                    };

                    let cardinality = if *many { Cardinality::Many } else { Cardinality::One };
                    relationships.insert(
                        member.name.clone(),
                        RelationshipDescriptor::new(
                            member.name.clone(),
                            cardinality,
                            (*target_type).to_string(),
                        ),
                    );
                }
            }
        }

        Ok(ResourceSchema::new(
            definition.name.clone(),
            id_attribute,
            attributes,
            relationships,
            definition.operations.clone(),
            definition.unique_tuples.clone(),
        ))
    }

    fn attribute_parser(
        &self,
        definition: &ResourceType,
        name: &str,
        kind: ValueKind,
    ) -> Result<Option<AttributeParser>, SchemaBuildError> {
        if !parser_required(kind) {
            return Ok(None);
        }

        match resolve_parser(name, kind, definition.readers.get(name), &self.resolvers) {
            Some(parser) => Ok(Some(parser)),
            None if self.strict_parsers => Err(SchemaBuildError::ParserUnavailable {
                type_name: definition.name.clone(),
                attribute: name.to_string(),
            }),
            None => Ok(Some(disabled_parser())),
        }
    }
}

/// Immutable map of exposed resource-type names to their schemas.
///
/// Built once at initialization and read concurrently by every request
/// thereafter; there is no update path.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, ResourceSchema>,
}

impl SchemaRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn get(&self, type_name: &str) -> Option<&ResourceSchema> {
        self.schemas.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.schemas.contains_key(type_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceSchema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Schema of the target of `relationship` on `schema`, looked up by
    /// name at traversal time.
    pub fn related<'a>(
        &'a self,
        schema: &ResourceSchema,
        relationship: &str,
    ) -> Option<&'a ResourceSchema> {
        let descriptor = schema.relationship(relationship)?;
        self.get(descriptor.target())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryDescription {
    #[serde(default)]
    strict_parsers: bool,
    types: Vec<TypeDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeDescription {
    name: String,
    model: EntityModel,
    operations: Option<Vec<Operation>>,
    relationships: Option<Vec<String>>,
    exposed_id: Option<String>,
    #[serde(default)]
    unique_tuples: BTreeMap<String, Vec<String>>,
}

impl TypeDescription {
    fn into_resource_type(self) -> ResourceType {
        let mut definition = ResourceType::define(self.name, self.model);

        if let Some(operations) = self.operations {
            definition = definition.operations(operations);
        }
        if let Some(relationships) = self.relationships {
            definition = definition.relationships(relationships);
        }
        if let Some(exposed_id) = self.exposed_id {
            definition = definition.exposed_id(exposed_id);
        }
        for (name, members) in self.unique_tuples {
            definition = definition.unique(name, members);
        }

        definition
    }
}

/// Build a registry from a JSON description file.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// `LoadError::InvalidJson` if it isn't a valid description, or
/// `LoadError::Schema` if registry construction fails.
pub fn load_registry(path: &Path) -> Result<SchemaRegistry, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_registry_str(&content)
}

/// Build a registry from a JSON description string.
pub fn load_registry_str(content: &str) -> Result<SchemaRegistry, LoadError> {
    let description: RegistryDescription =
        serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })?;

    let mut builder = SchemaRegistry::builder().strict_parsers(description.strict_parsers);

    for type_description in description.types {
        builder = builder.resource(type_description.into_resource_type());
    }

    Ok(builder.build()?)
}
