//! Normalization schema registry
//!
//! One definition per entity type, shared by every guard that loads it.
//! Table names here must match the fields of
//! [`EntityState`](crate::state::EntityState).

use remote_dispatch::EntityDef;

/// Users, keyed by login.
pub fn user() -> EntityDef {
    EntityDef::new("users", "login")
}

/// Repositories, keyed by full name, with the owner lifted into the users
/// table.
pub fn repo() -> EntityDef {
    EntityDef::new("repos", "fullName").with_nested("owner", user())
}

/// External url content, keyed by the url itself.
pub fn url_item() -> EntityDef {
    EntityDef::new("url", "url")
}

/// Form definitions, keyed by id.
pub fn form() -> EntityDef {
    EntityDef::new("forms", "id")
}

/// Schema definitions, keyed by name ("Thing", "Person", ...).
pub fn schema_record() -> EntityDef {
    EntityDef::new("schema", "name")
}

/// The session singleton.
pub fn session() -> EntityDef {
    EntityDef::keyed("session", "current")
}

/// Composite key under which a content entity lands in the content table.
pub fn content_key(type_id: &str, entity_id: &str) -> String {
    format!("{}/{}", type_id, entity_id)
}

/// Content entities, keyed by the composite `(typeId, entityId)`.
pub fn content(type_id: &str, entity_id: &str) -> EntityDef {
    EntityDef::keyed("content", content_key(type_id, entity_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_dispatch::{normalize, Schema};
    use serde_json::json;

    #[test]
    fn test_repo_owner_lands_in_users_table() {
        let payload = normalize(
            &json!({
                "fullName": "octocat/Hello-World",
                "owner": { "login": "octocat" }
            }),
            &Schema::Entity(repo()),
        )
        .unwrap();

        assert!(payload.record("repos", "octocat/Hello-World").is_some());
        assert!(payload.record("users", "octocat").is_some());
    }

    #[test]
    fn test_content_composite_key() {
        let payload = normalize(
            &json!({ "title": "About" }),
            &Schema::Entity(content("page", "about")),
        )
        .unwrap();
        assert!(payload.record("content", "page/about").is_some());
    }
}
