//! Query-parameter validation and translation.
//!
//! Validation and specification-building are fused into one pass: a dotted
//! relationship path is resolved against the registry exactly once, and the
//! traversal result feeds the executable filter/include/sort structures
//! directly. All rules run without short-circuit and merge their violations
//! into one collection.

use std::collections::BTreeSet;

use crate::error::{QueryError, Violation};
use crate::fetch::{FetchSpecification, FilterPath, FilterPredicate, FilterSegment, Page, SortKey};
use crate::registry::SchemaRegistry;
use crate::schema::ResourceSchema;
use crate::types::SortDirection;

pub const PARAM_INCLUDE: &str = "include";
pub const PARAM_SORT: &str = "sort";
pub const PARAM_PAGE_NUMBER: &str = "page[number]";
pub const PARAM_PAGE_SIZE: &str = "page[size]";
pub const PARAM_PAGE_OFFSET: &str = "page[offset]";
pub const PARAM_PAGE_LIMIT: &str = "page[limit]";

/// Raw, repeatable query parameters in arrival order.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    entries: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        QueryParams::default()
    }

    /// Decode a form-urlencoded query string. A leading `?` is tolerated.
    pub fn parse(query: &str) -> Self {
        let entries = url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        QueryParams { entries }
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    /// Every value given for `name`, in arrival order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Check every query parameter against the schema and translate the
/// request into a [`FetchSpecification`].
///
/// `relationship` names a related sub-resource endpoint; include and sort
/// then resolve against the related type's schema, while filter paths
/// always resolve from the root type.
///
/// # Errors
///
/// `UnknownResourceType` / `UnknownRelationship` map to the caller's
/// not-found handling. `Invalid` carries every violation found in the
/// pass; the specification is withheld.
pub fn validate_query(
    registry: &SchemaRegistry,
    resource_type: &str,
    id: Option<&str>,
    relationship: Option<&str>,
    params: &QueryParams,
) -> Result<FetchSpecification, QueryError> {
    let root = registry
        .get(resource_type)
        .ok_or_else(|| QueryError::UnknownResourceType(resource_type.to_string()))?;

    let effective = match relationship {
        Some(name) => {
            registry
                .related(root, name)
                .ok_or_else(|| QueryError::UnknownRelationship {
                    type_name: resource_type.to_string(),
                    relationship: name.to_string(),
                })?
        }
        None => root,
    };

    let mut spec = FetchSpecification::new(resource_type, id, relationship);
    let mut violations = Vec::new();

    // Fieldsets first: include validation reads the selections.
    validate_fields(registry, params, &mut spec, &mut violations);
    validate_filters(registry, root, params, &mut spec, &mut violations);

    if params.contains(PARAM_INCLUDE) {
        validate_include(registry, effective, params, &mut spec, &mut violations);
    }

    if params.contains(PARAM_SORT) {
        validate_sort(effective, id, params, &mut spec, &mut violations);
    }

    validate_page(id, params, &mut spec, &mut violations);

    if violations.is_empty() {
        Ok(spec)
    } else {
        Err(QueryError::Invalid(violations))
    }
}

fn validate_fields(
    registry: &SchemaRegistry,
    params: &QueryParams,
    spec: &mut FetchSpecification,
    violations: &mut Vec<Violation>,
) {
    for (key, value) in params.entries() {
        let Some(type_name) = bracket_param(key, "fields") else {
            continue;
        };

        let Some(meta) = registry.get(type_name) else {
            violations.push(Violation::at_parameter(
                key,
                format!("Invalid resource type: `{}`", type_name),
            ));
            continue;
        };

        for field in value.split(',') {
            if meta.is_field(field) {
                spec.add_field(type_name, field);
            } else {
                violations.push(Violation::at_parameter(
                    key,
                    format!("Invalid field: `{}`", field),
                ));
            }
        }
    }
}

fn validate_filters(
    registry: &SchemaRegistry,
    root: &ResourceSchema,
    params: &QueryParams,
    spec: &mut FetchSpecification,
    violations: &mut Vec<Violation>,
) {
    for (key, value) in params.entries() {
        let Some(path) = bracket_param(key, "filter") else {
            continue;
        };

        match resolve_filter_path(registry, root, path) {
            Some(resolved) => spec.filters.push(FilterPredicate {
                path: resolved,
                value: value.to_string(),
            }),
            None => violations.push(Violation::at_parameter(
                key,
                format!("Filter path `{}` is not valid", path),
            )),
        }
    }
}

/// Walk a dotted filter path: every non-terminal segment (optionally
/// `+`-prefixed for an outer join) must be a relationship, the terminal
/// segment an attribute or the exposed id of the schema reached.
fn resolve_filter_path(
    registry: &SchemaRegistry,
    root: &ResourceSchema,
    path: &str,
) -> Option<FilterPath> {
    let elements: Vec<&str> = path.split('.').collect();
    let (terminal, steps) = elements.split_last()?;

    let mut meta = root;
    let mut segments = Vec::with_capacity(steps.len());

    for element in steps {
        let (name, outer) = match element.strip_prefix('+') {
            Some(name) => (name, true),
            None => (*element, false),
        };

        meta = registry.related(meta, name)?;
        segments.push(FilterSegment {
            relationship: name.to_string(),
            outer,
        });
    }

    if meta.has_attribute(terminal) || meta.id_attribute() == *terminal {
        Some(FilterPath {
            segments,
            attribute: terminal.to_string(),
        })
    } else {
        None
    }
}

fn validate_include(
    registry: &SchemaRegistry,
    effective: &ResourceSchema,
    params: &QueryParams,
    spec: &mut FetchSpecification,
    violations: &mut Vec<Violation>,
) {
    let values = params.get_all(PARAM_INCLUDE);
    validate_single(PARAM_INCLUDE, values.len(), violations);

    let Some(first) = values.first() else {
        return;
    };

    let mut included: BTreeSet<&str> = BTreeSet::new();

    for entry in first.split(',') {
        if !included.insert(entry) {
            violations.push(Violation::at_parameter(
                PARAM_INCLUDE,
                format!("The relationship path `{}` is listed multiple times.", entry),
            ));
            continue;
        }

        if resolve_include_path(registry, effective, entry, spec, violations) {
            spec.includes.push(entry.to_string());
        }
    }
}

/// Walk a dotted include path from the effective schema. Each segment must
/// be a relationship and, when a sparse fieldset was given for the owning
/// type, must appear in that selection: a relationship cannot be included
/// unless it is also selected as a field.
fn resolve_include_path(
    registry: &SchemaRegistry,
    effective: &ResourceSchema,
    entry: &str,
    spec: &FetchSpecification,
    violations: &mut Vec<Violation>,
) -> bool {
    let mut meta = effective;

    for segment in entry.split('.') {
        let Some(next) = registry.related(meta, segment) else {
            violations.push(Violation::at_parameter(
                PARAM_INCLUDE,
                format!("Invalid relationship: `{}`", entry),
            ));
            return false;
        };

        if let Some(selected) = spec.selected_fields(meta.type_name()) {
            if !selected.iter().any(|field| field == segment) {
                violations.push(Violation::at_parameter(
                    PARAM_INCLUDE,
                    format!(
                        "Cannot include relationship `{}` not selected by parameter `fields[{}]`.",
                        entry,
                        meta.type_name()
                    ),
                ));
                return false;
            }
        }

        meta = next;
    }

    true
}

fn validate_sort(
    effective: &ResourceSchema,
    id: Option<&str>,
    params: &QueryParams,
    spec: &mut FetchSpecification,
    violations: &mut Vec<Violation>,
) {
    if id.is_some() {
        violations.push(Violation::at_parameter(
            PARAM_SORT,
            "Single resource can not be sorted",
        ));
        return;
    }

    let values = params.get_all(PARAM_SORT);
    validate_single(PARAM_SORT, values.len(), violations);

    let Some(first) = values.first() else {
        return;
    };

    for sort in first.split(',') {
        let descending = sort.starts_with('-');
        let attribute = if descending { &sort[1..] } else { sort };

        if effective.has_attribute(attribute) {
            spec.sort.push(SortKey {
                attribute: attribute.to_string(),
                direction: if descending {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                },
            });
        } else {
            log::debug!("invalid sort attribute name: `{}`", attribute);
            violations.push(Violation::at_parameter(
                PARAM_SORT,
                format!("Sort key `{}` is not an attribute", sort),
            ));
        }
    }
}

fn validate_page(
    id: Option<&str>,
    params: &QueryParams,
    spec: &mut FetchSpecification,
    violations: &mut Vec<Violation>,
) {
    let number = validate_page_param(id, PARAM_PAGE_NUMBER, params, violations);
    let size = validate_page_param(id, PARAM_PAGE_SIZE, params, violations);
    let offset = validate_page_param(id, PARAM_PAGE_OFFSET, params, violations);
    let limit = validate_page_param(id, PARAM_PAGE_LIMIT, params, violations);

    if id.is_some() {
        return;
    }

    let numbered_family = params.contains(PARAM_PAGE_NUMBER) || params.contains(PARAM_PAGE_SIZE);
    let offset_family = params.contains(PARAM_PAGE_OFFSET) || params.contains(PARAM_PAGE_LIMIT);

    if numbered_family && offset_family {
        for name in [PARAM_PAGE_OFFSET, PARAM_PAGE_LIMIT] {
            if params.contains(name) {
                violations.push(Violation::at_parameter(
                    name,
                    "Page parameter cannot be combined with `page[number]` or `page[size]`",
                ));
            }
        }
        return;
    }

    if number.is_some() || size.is_some() {
        spec.page = Some(Page::Numbered { number, size });
    } else if offset.is_some() || limit.is_some() {
        spec.page = Some(Page::Offset { offset, limit });
    }
}

fn validate_page_param(
    id: Option<&str>,
    name: &str,
    params: &QueryParams,
    violations: &mut Vec<Violation>,
) -> Option<i64> {
    if !params.contains(name) {
        return None;
    }

    if id.is_some() {
        violations.push(Violation::at_parameter(
            name,
            "Pagination not allowed for single resource requests",
        ));
        return None;
    }

    let values = params.get_all(name);
    validate_single(name, values.len(), violations);

    let first = values.first()?;
    match first.parse::<i64>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::debug!("invalid page parameter: `{}`", first);
            violations.push(Violation::at_parameter(
                name,
                "Page parameter must be an integer",
            ));
            None
        }
    }
}

fn validate_single(name: &str, occurrences: usize, violations: &mut Vec<Violation>) {
    if occurrences > 1 {
        violations.push(Violation::at_parameter(
            name,
            format!("Multiple `{}` parameters are not supported", name),
        ));
    }
}

/// Extract `<name>` from a `family[<name>]` parameter key.
fn bracket_param<'a>(key: &'a str, family: &str) -> Option<&'a str> {
    key.strip_prefix(family)?
        .strip_prefix('[')?
        .strip_suffix(']')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_and_encoded_parameters() {
        let params = QueryParams::parse("?sort=title&sort=-created&filter%5Bname%5D=a%20b");

        assert_eq!(params.get_all("sort"), ["title", "-created"]);
        assert_eq!(params.get_all("filter[name]"), ["a b"]);
        assert!(params.contains("sort"));
        assert!(!params.contains("include"));
    }

    #[test]
    fn parse_empty_query() {
        assert!(QueryParams::parse("").is_empty());
        assert!(QueryParams::parse("?").is_empty());
    }

    #[test]
    fn bracket_param_extraction() {
        assert_eq!(bracket_param("fields[posts]", "fields"), Some("posts"));
        assert_eq!(bracket_param("filter[a.b]", "filter"), Some("a.b"));
        assert_eq!(bracket_param("fields[posts]", "filter"), None);
        assert_eq!(bracket_param("fields", "fields"), None);
        assert_eq!(bracket_param("fields[posts", "fields"), None);
    }

    #[test]
    fn single_occurrence_check() {
        let mut violations = Vec::new();
        validate_single("include", 1, &mut violations);
        assert!(violations.is_empty());

        validate_single("include", 2, &mut violations);
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].detail,
            "Multiple `include` parameters are not supported"
        );
    }
}
