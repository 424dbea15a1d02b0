//! JSON:API request gate
//!
//! Validates JSON:API-style documents and query strings against a
//! reflected schema registry and translates valid read requests into typed
//! [`FetchSpecification`]s for a query executor.
//!
//! The registry is built once at initialization from backing-model
//! metadata plus declarative per-type configuration, and is immutable
//! thereafter. Request-time validation never raises: every rule runs,
//! every failure becomes a [`Violation`] with a precise location (a
//! document pointer or a parameter name), and the whole collection is
//! returned in one pass so a client can fix every problem in a single
//! round trip.
//!
//! # Example
//!
//! ```
//! use jsonapi_gate::{
//!     validate_query, EntityModel, QueryParams, ResourceType, SchemaRegistry, ValueKind,
//! };
//!
//! let registry = SchemaRegistry::builder()
//!     .resource(ResourceType::define(
//!         "posts",
//!         EntityModel::new("Post", "id")
//!             .basic("title", ValueKind::String)
//!             .basic("publishedAt", ValueKind::Timestamp)
//!             .many("comments", "Comment"),
//!     ))
//!     .resource(ResourceType::define(
//!         "comments",
//!         EntityModel::new("Comment", "id")
//!             .basic("text", ValueKind::String)
//!             .one("post", "Post"),
//!     ))
//!     .build()
//!     .unwrap();
//!
//! let params = QueryParams::parse("include=comments&fields[posts]=title,comments");
//! let spec = validate_query(&registry, "posts", None, None, &params).unwrap();
//!
//! assert_eq!(spec.includes, ["comments"]);
//! assert_eq!(spec.fields["posts"], ["title", "comments"]);
//! ```

mod document;
mod error;
mod fetch;
mod model;
mod query;
mod registry;
mod schema;
mod types;

pub use document::{attribute_pointer, coerce_attributes, relationship_pointer, validate_document};
pub use error::{LoadError, QueryError, SchemaBuildError, Violation, ViolationSource};
pub use fetch::{FetchSpecification, FilterPath, FilterPredicate, FilterSegment, Page, SortKey};
pub use model::{EntityMember, EntityModel, MemberKind};
pub use query::{validate_query, QueryParams};
pub use registry::{load_registry, load_registry_str, RegistryBuilder, ResourceType, SchemaRegistry};
pub use schema::{
    parser_required, timestamp_resolver, AttributeDescriptor, AttributeParser, ParsedValue,
    ParserResolver, RelationshipDescriptor, ResourceSchema,
};
pub use types::{json_type_name, Cardinality, Operation, SortDirection, ValueKind};
