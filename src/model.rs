//! Backing-model metadata consumed at registry construction.
//!
//! An [`EntityModel`] is the reflective description of one backing entity:
//! its name, identifier member, and the flat list of members, each either
//! basic-valued or an association. The backing-model collaborator supplies
//! these directly; the CLI and tests deserialize them from a JSON
//! description.

use serde::Deserialize;

use crate::types::ValueKind;

/// Reflective description of one backing entity.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityModel {
    /// Entity name, used to resolve association targets to exposed types.
    pub name: String,
    /// Name of the identifier member.
    pub id: String,
    #[serde(default)]
    pub members: Vec<EntityMember>,
}

/// One member of an entity.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityMember {
    pub name: String,
    #[serde(flatten)]
    pub kind: MemberKind,
}

/// Whether a member holds a basic value or an association.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "member", rename_all = "lowercase")]
pub enum MemberKind {
    Basic {
        kind: ValueKind,
        #[serde(default)]
        nullable: bool,
    },
    Association {
        /// Entity name of the association target.
        target: String,
        #[serde(default)]
        many: bool,
    },
}

impl EntityModel {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        EntityModel {
            name: name.into(),
            id: id.into(),
            members: Vec::new(),
        }
    }

    /// Add a non-nullable basic member.
    pub fn basic(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.members.push(EntityMember {
            name: name.into(),
            kind: MemberKind::Basic { kind, nullable: false },
        });
        self
    }

    /// Add a nullable basic member.
    pub fn nullable(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.members.push(EntityMember {
            name: name.into(),
            kind: MemberKind::Basic { kind, nullable: true },
        });
        self
    }

    /// Add a to-one association member.
    pub fn one(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.members.push(EntityMember {
            name: name.into(),
            kind: MemberKind::Association {
                target: target.into(),
                many: false,
            },
        });
        self
    }

    /// Add a to-many association member.
    pub fn many(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.members.push(EntityMember {
            name: name.into(),
            kind: MemberKind::Association {
                target: target.into(),
                many: true,
            },
        });
        self
    }

    pub fn member(&self, name: &str) -> Option<&EntityMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

impl EntityMember {
    pub fn is_association(&self) -> bool {
        matches!(self.kind, MemberKind::Association { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_adds_members() {
        let model = EntityModel::new("Post", "id")
            .basic("title", ValueKind::String)
            .nullable("publishedAt", ValueKind::Timestamp)
            .many("comments", "Comment");

        assert_eq!(model.members.len(), 3);
        assert!(!model.member("title").unwrap().is_association());
        assert!(model.member("comments").unwrap().is_association());
        assert!(model.member("missing").is_none());
    }

    #[test]
    fn deserializes_from_description() {
        let model: EntityModel = serde_json::from_str(
            r#"{
                "name": "Post",
                "id": "id",
                "members": [
                    { "name": "title", "member": "basic", "kind": "string" },
                    { "name": "views", "member": "basic", "kind": "integer" },
                    { "name": "comments", "member": "association", "target": "Comment", "many": true },
                    { "name": "author", "member": "association", "target": "Author" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(model.name, "Post");
        assert_eq!(model.id, "id");
        match &model.member("views").unwrap().kind {
            MemberKind::Basic { kind, nullable } => {
                assert_eq!(*kind, ValueKind::Integer);
                assert!(!nullable);
            }
            other => panic!("expected basic member, got {:?}", other),
        }
        match &model.member("author").unwrap().kind {
            MemberKind::Association { target, many } => {
                assert_eq!(target, "Author");
                assert!(!many);
            }
            other => panic!("expected association member, got {:?}", other),
        }
    }
}
