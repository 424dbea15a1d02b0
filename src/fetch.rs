//! The validated, typed fetch description handed to the query executor.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::SortDirection;

/// One relationship step of a filter path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSegment {
    pub relationship: String,
    /// Requested with a `+` prefix: traverse with an outer join so
    /// resources lacking the relationship are not excluded.
    pub outer: bool,
}

/// A dot-separated traversal terminating in an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPath {
    pub segments: Vec<FilterSegment>,
    pub attribute: String,
}

impl std::fmt::Display for FilterPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for segment in &self.segments {
            if segment.outer {
                write!(f, "+")?;
            }
            write!(f, "{}.", segment.relationship)?;
        }
        write!(f, "{}", self.attribute)
    }
}

impl Serialize for FilterPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A validated filter: the resolved path plus the raw predicate string,
/// left for the query executor to interpret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterPredicate {
    pub path: FilterPath,
    pub value: String,
}

/// A validated sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub attribute: String,
    pub direction: SortDirection,
}

/// Pagination, one of the two parameter families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Page {
    Numbered {
        #[serde(skip_serializing_if = "Option::is_none")]
        number: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        size: Option<i64>,
    },
    Offset {
        #[serde(skip_serializing_if = "Option::is_none")]
        offset: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<i64>,
    },
}

/// The validated output of query translation for one read request.
///
/// Invariants, enforced during validation: `sort` and `page` are empty
/// whenever `id` is present, and every entry of `includes` is selected
/// through `fields` for its owning type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchSpecification {
    pub resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Related sub-resource name, for `related` endpoint fetches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    /// Sparse fieldset per type, in client order.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterPredicate>,
    /// Relationship paths to eager-load, in client order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<Page>,
}

impl FetchSpecification {
    pub fn new(
        resource_type: impl Into<String>,
        id: Option<&str>,
        relationship: Option<&str>,
    ) -> Self {
        FetchSpecification {
            resource_type: resource_type.into(),
            id: id.map(String::from),
            relationship: relationship.map(String::from),
            fields: BTreeMap::new(),
            filters: Vec::new(),
            includes: Vec::new(),
            sort: Vec::new(),
            page: None,
        }
    }

    /// Add a name to a type's sparse fieldset, keeping client order and
    /// dropping repeats.
    pub fn add_field(&mut self, resource_type: &str, name: &str) {
        let selected = self.fields.entry(resource_type.to_string()).or_default();
        if !selected.iter().any(|f| f == name) {
            selected.push(name.to_string());
        }
    }

    /// Selected names for a type, if a sparse fieldset was given for it.
    pub fn selected_fields(&self, resource_type: &str) -> Option<&[String]> {
        self.fields.get(resource_type).map(Vec::as_slice)
    }
}
