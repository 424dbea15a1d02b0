//! Core vocabulary types shared across the request gate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level members of which at least one must be present.
pub const TOP_LEVEL_PRIMARY: &[&str] = &["data", "errors", "meta"];

/// All members a document may carry at the top level.
pub const TOP_LEVEL_MEMBERS: &[&str] = &["data", "errors", "meta", "jsonapi", "links", "included"];

/// Members permitted inside a top-level `links` object.
pub const LINKS_MEMBERS: &[&str] = &["self", "related", "first", "last", "prev", "next"];

/// Members a resource object may carry.
pub const RESOURCE_MEMBERS: &[&str] = &["id", "type", "attributes", "relationships", "links", "meta"];

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Operation a request performs against a resource type.
///
/// Tested against the schema's allowed-operation set and used to decide
/// whether `id` is optional in a write document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    /// Map an HTTP method name to its operation, case-insensitively.
    ///
    /// Returns `None` for methods with no corresponding operation.
    pub fn from_method(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "POST" => Some(Operation::Create),
            "GET" | "HEAD" => Some(Operation::Read),
            "PATCH" | "PUT" => Some(Operation::Update),
            "DELETE" => Some(Operation::Delete),
            _ => None,
        }
    }

    /// A resource object may omit `id` only when being created.
    pub fn id_optional(&self) -> bool {
        matches!(self, Operation::Create)
    }
}

/// Underlying value type of an exposed attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Custom,
}

impl ValueKind {
    /// Whether JSON carries this kind natively, with no string-parsing step.
    pub fn native(&self) -> bool {
        matches!(self, ValueKind::Integer | ValueKind::Float | ValueKind::Boolean)
    }
}

/// Cardinality of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

/// Direction of a sort key.
///
/// A `-` prefix on the key requests descending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operation_from_method() {
        assert_eq!(Operation::from_method("POST"), Some(Operation::Create));
        assert_eq!(Operation::from_method("get"), Some(Operation::Read));
        assert_eq!(Operation::from_method("Patch"), Some(Operation::Update));
        assert_eq!(Operation::from_method("DELETE"), Some(Operation::Delete));
        assert_eq!(Operation::from_method("TRACE"), None);
    }

    #[test]
    fn operation_id_optional_only_for_create() {
        assert!(Operation::Create.id_optional());
        assert!(!Operation::Read.id_optional());
        assert!(!Operation::Update.id_optional());
        assert!(!Operation::Delete.id_optional());
    }

    #[test]
    fn value_kind_native() {
        assert!(ValueKind::Integer.native());
        assert!(ValueKind::Float.native());
        assert!(ValueKind::Boolean.native());
        assert!(!ValueKind::String.native());
        assert!(!ValueKind::Timestamp.native());
        assert!(!ValueKind::Custom.native());
    }

    #[test]
    fn json_type_names() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!(true)), "boolean");
        assert_eq!(json_type_name(&json!(1)), "number");
        assert_eq!(json_type_name(&json!("a")), "string");
        assert_eq!(json_type_name(&json!([])), "array");
        assert_eq!(json_type_name(&json!({})), "object");
    }
}
