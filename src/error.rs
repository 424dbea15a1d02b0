//! Violation reporting and fatal error types.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Where a violation occurred.
///
/// Serializes to the wire-format error `source` object: either
/// `{"pointer": "/data/type"}` or `{"parameter": "sort"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationSource {
    /// JSON Pointer (RFC 6901) into the request document.
    Pointer(String),
    /// Name of the offending query parameter.
    Parameter(String),
}

/// Single failure of a structural or query rule.
///
/// Produced once, never mutated; accumulated into a `Vec` over one full
/// validation pass and handed back read-only. A non-empty collection means
/// the request is rejected as a client error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub source: ViolationSource,
    /// Human-readable error message.
    pub detail: String,
}

impl Violation {
    /// Violation located by a JSON Pointer into the document.
    pub fn at_pointer(pointer: impl Into<String>, detail: impl Into<String>) -> Self {
        Violation {
            source: ViolationSource::Pointer(pointer.into()),
            detail: detail.into(),
        }
    }

    /// Violation located by a query parameter name.
    pub fn at_parameter(parameter: impl Into<String>, detail: impl Into<String>) -> Self {
        Violation {
            source: ViolationSource::Parameter(parameter.into()),
            detail: detail.into(),
        }
    }

    /// The pointer or parameter name, whichever locates this violation.
    pub fn location(&self) -> &str {
        match &self.source {
            ViolationSource::Pointer(pointer) => pointer,
            ViolationSource::Parameter(parameter) => parameter,
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location(), self.detail)
    }
}

/// Fatal errors raised while building a `SchemaRegistry`.
///
/// These represent configuration defects and intentionally halt
/// initialization; they are never produced at request time.
#[derive(Debug, Error)]
pub enum SchemaBuildError {
    #[error("duplicate resource type: {name}")]
    DuplicateType { name: String },

    #[error("resource type {type_name}: id member `{member}` not found in entity {entity}")]
    UnknownIdMember {
        type_name: String,
        member: String,
        entity: String,
    },

    #[error("resource type {type_name}: exposed id member `{member}` is not a basic member")]
    InvalidIdMember { type_name: String, member: String },

    #[error("resource type {type_name}: exposed relationship `{name}` is not an association of entity {entity}")]
    UnknownRelationship {
        type_name: String,
        name: String,
        entity: String,
    },

    #[error("resource type {type_name}: no parser available for attribute `{attribute}`")]
    ParserUnavailable { type_name: String, attribute: String },
}

/// Errors loading a registry description from a file or string.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Schema(#[from] SchemaBuildError),
}

/// Outcome of a failed query validation.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The requested resource type is not in the registry. Maps to the
    /// caller's not-found handling, not to a violation report.
    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    /// The related sub-resource name does not exist on the target type.
    /// Maps to the caller's not-found handling, like `UnknownResourceType`.
    #[error("unknown relationship `{relationship}` on resource type {type_name}")]
    UnknownRelationship {
        type_name: String,
        relationship: String,
    },

    /// One or more query rules failed; all violations found in the pass.
    #[error("query validation failed with {} violation(s)", .0.len())]
    Invalid(Vec<Violation>),
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            LoadError::InvalidJson { .. } | LoadError::Schema(_) => 2,
        }
    }
}

impl QueryError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
