//! Integration tests for document-structure validation.

use jsonapi_gate::{coerce_attributes, validate_document, Operation, Violation};
use serde_json::{json, Value};

fn locations(violations: &[Violation]) -> Vec<&str> {
    violations.iter().map(|v| v.location()).collect()
}

fn count_at(violations: &[Violation], location: &str) -> usize {
    violations.iter().filter(|v| v.location() == location).count()
}

// === Top-Level Rules ===

mod top_level {
    use super::*;

    #[test]
    fn minimal_valid_document() {
        let document = json!({ "data": { "type": "posts", "id": "1" } });
        assert!(validate_document(&document, Operation::Update).is_empty());
    }

    #[test]
    fn meta_only_document_is_valid() {
        let document = json!({ "meta": { "count": 3 } });
        assert!(validate_document(&document, Operation::Update).is_empty());
    }

    #[test]
    fn unknown_key_located_at_key() {
        let document = json!({
            "data": { "type": "posts", "id": "1" },
            "payload": {}
        });
        let violations = validate_document(&document, Operation::Update);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location(), "/payload");
    }

    #[test]
    fn unknown_key_does_not_skip_other_rules() {
        // An unknown key plus a missing required member: both reported.
        let document = json!({ "payload": {} });
        let violations = validate_document(&document, Operation::Update);

        assert_eq!(count_at(&violations, "/payload"), 1);
        assert_eq!(count_at(&violations, "/"), 1);
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn missing_all_primary_members() {
        let document = json!({ "jsonapi": { "version": "1.0" } });
        let violations = validate_document(&document, Operation::Update);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location(), "/");
        assert!(violations[0].detail.contains("at least one"));
    }

    #[test]
    fn data_and_errors_exclusive_regardless_of_values() {
        let document = json!({ "data": null, "errors": null });
        let violations = validate_document(&document, Operation::Update);

        assert!(violations
            .iter()
            .any(|v| v.location() == "/" && v.detail.contains("MUST NOT coexist")));
    }

    #[test]
    fn non_object_document() {
        for document in [json!("text"), json!([1]), json!(null), json!(7)] {
            let violations = validate_document(&document, Operation::Create);
            assert_eq!(violations.len(), 1, "document: {}", document);
            assert_eq!(violations[0].location(), "/");
        }
    }
}

// === Links Rules ===

mod links {
    use super::*;

    #[test]
    fn known_members_accepted() {
        let document = json!({
            "data": { "type": "posts", "id": "1" },
            "links": {
                "self": "/posts/1",
                "related": "/posts/1/comments",
                "first": "a", "last": "b", "prev": "c", "next": "d"
            }
        });
        assert!(validate_document(&document, Operation::Update).is_empty());
    }

    #[test]
    fn non_object_links() {
        let document = json!({
            "data": { "type": "posts", "id": "1" },
            "links": ["/posts/1"]
        });
        let violations = validate_document(&document, Operation::Update);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location(), "/links");
    }

    #[test]
    fn each_disallowed_member_is_its_own_violation() {
        let document = json!({
            "data": { "type": "posts", "id": "1" },
            "links": { "self": "/posts/1", "home": "/", "docs": "/docs" }
        });
        let violations = validate_document(&document, Operation::Update);

        assert_eq!(count_at(&violations, "/links/home"), 1);
        assert_eq!(count_at(&violations, "/links/docs"), 1);
        assert_eq!(violations.len(), 2);
    }
}

// === Resource Object Rules ===

mod data {
    use super::*;

    #[test]
    fn array_data_rejected() {
        let document = json!({ "data": [{ "type": "posts", "id": "1" }] });
        let violations = validate_document(&document, Operation::Update);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location(), "/data");
    }

    #[test]
    fn null_data_rejected() {
        // Relationship clearing via null data is not supported.
        let document = json!({ "data": null });
        let violations = validate_document(&document, Operation::Update);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location(), "/data");
    }

    #[test]
    fn unknown_resource_members() {
        let document = json!({
            "data": { "type": "posts", "id": "1", "title": "inline", "extra": 1 }
        });
        let violations = validate_document(&document, Operation::Update);

        assert_eq!(count_at(&violations, "/data/title"), 1);
        assert_eq!(count_at(&violations, "/data/extra"), 1);
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn create_without_id_is_valid() {
        let document = json!({ "data": { "type": "posts" } });
        assert!(validate_document(&document, Operation::Create).is_empty());
    }

    #[test]
    fn create_without_type_is_invalid() {
        let document = json!({ "data": { "id": "1" } });
        let violations = validate_document(&document, Operation::Create);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location(), "/data");
    }

    #[test]
    fn update_requires_type_and_id() {
        let violations = validate_document(&json!({ "data": { "type": "posts" } }), Operation::Update);
        assert_eq!(locations(&violations), ["/data"]);

        let violations = validate_document(&json!({ "data": { "id": "1" } }), Operation::Update);
        assert_eq!(locations(&violations), ["/data"]);

        let violations = validate_document(&json!({ "data": {} }), Operation::Delete);
        assert_eq!(locations(&violations), ["/data"]);
    }

    #[test]
    fn type_must_be_string() {
        let document = json!({ "data": { "type": 7, "id": "1" } });
        let violations = validate_document(&document, Operation::Update);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location(), "/data/type");
    }

    #[test]
    fn id_must_be_string() {
        let document = json!({ "data": { "type": "posts", "id": 1 } });
        let violations = validate_document(&document, Operation::Update);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location(), "/data/id");
    }

    #[test]
    fn type_and_id_typing_reported_together() {
        let document = json!({ "data": { "type": false, "id": 1 } });
        let violations = validate_document(&document, Operation::Update);

        assert_eq!(count_at(&violations, "/data/type"), 1);
        assert_eq!(count_at(&violations, "/data/id"), 1);
        assert_eq!(violations.len(), 2);
    }
}

// === Write-Path Coercion ===

mod coercion {
    use super::*;
    use jsonapi_gate::{EntityModel, ParsedValue, ResourceType, SchemaRegistry, ValueKind};

    fn registry() -> SchemaRegistry {
        SchemaRegistry::builder()
            .resource(ResourceType::define(
                "posts",
                EntityModel::new("Post", "id")
                    .basic("title", ValueKind::String)
                    .nullable("publishedAt", ValueKind::Timestamp)
                    .basic("views", ValueKind::Integer)
                    .many("comments", "Comment"),
            ))
            .resource(ResourceType::define(
                "comments",
                EntityModel::new("Comment", "id")
                    .basic("text", ValueKind::String)
                    .one("post", "Post"),
            ))
            .build()
            .unwrap()
    }

    fn coerce(document: Value) -> (Vec<(String, Option<ParsedValue>)>, Vec<Violation>) {
        let registry = registry();
        let schema = registry.get("posts").unwrap();
        let (values, violations) = coerce_attributes(schema, &document);
        (values.into_iter().collect(), violations)
    }

    #[test]
    fn valid_document_coerces_cleanly() {
        let (values, violations) = coerce(json!({
            "data": {
                "type": "posts",
                "attributes": {
                    "title": "First",
                    "publishedAt": "2022-01-02T03:04:05+01:00",
                    "views": 12
                },
                "relationships": {
                    "comments": { "data": [] }
                }
            }
        }));

        assert!(violations.is_empty());
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn violations_locate_each_attribute() {
        let (_, violations) = coerce(json!({
            "data": {
                "type": "posts",
                "attributes": {
                    "publishedAt": "not-a-date",
                    "views": true,
                    "secret": "x"
                },
                "relationships": {
                    "likes": { "data": [] }
                }
            }
        }));

        assert_eq!(count_at(&violations, "/data/attributes/publishedAt"), 1);
        assert_eq!(count_at(&violations, "/data/attributes/views"), 1);
        assert_eq!(count_at(&violations, "/data/attributes/secret"), 1);
        assert_eq!(count_at(&violations, "/data/relationships/likes"), 1);
        assert_eq!(violations.len(), 4);
    }

    #[test]
    fn absent_attributes_member_is_fine() {
        let (values, violations) = coerce(json!({ "data": { "type": "posts", "id": "1" } }));
        assert!(values.is_empty());
        assert!(violations.is_empty());
    }
}
