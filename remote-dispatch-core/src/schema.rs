//! Response normalization
//!
//! Flattens nested api responses into per-entity-type tables keyed by
//! identifier. A schema describes where a record's identifier comes from and
//! which of its fields hold nested entities; normalizing replaces each nested
//! entity with its identifier and lifts the record into its own table, so
//! reducers only ever merge flat records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::NormalizeError;

/// Where a record's identifier comes from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdSource {
    /// Read the identifier from this field of the record.
    Field(String),
    /// Every record of this schema lands under one fixed key
    /// (singleton resources, composite keys computed by the guard).
    Fixed(String),
}

/// Description of one entity type: its table name, identifier source, and
/// nested entity fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    table: String,
    id: IdSource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    nested: Vec<(String, EntityDef)>,
}

impl EntityDef {
    /// Entity type stored in `table`, identified by `id_field` on the record.
    pub fn new(table: impl Into<String>, id_field: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            id: IdSource::Field(id_field.into()),
            nested: Vec::new(),
        }
    }

    /// Entity type stored in `table` under one fixed `key`.
    pub fn keyed(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            id: IdSource::Fixed(key.into()),
            nested: Vec::new(),
        }
    }

    /// Declare that `field` on this record holds a nested entity.
    pub fn with_nested(mut self, field: impl Into<String>, def: EntityDef) -> Self {
        self.nested.push((field.into(), def));
        self
    }

    /// Table this entity type lives in.
    pub fn table(&self) -> &str {
        &self.table
    }
}

/// Normalization shape of a response: one entity or a list of them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Schema {
    Entity(EntityDef),
    List(EntityDef),
}

/// Entity-table-shaped fragment produced from one response.
///
/// `entities` maps table name to `identifier -> flat record`; `result` keeps
/// the response's own ordering of top-level identifiers. `next_page_url` is
/// the pagination continuation extracted from the response, when any.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPayload {
    #[serde(default)]
    pub entities: BTreeMap<String, BTreeMap<String, Value>>,
    #[serde(default)]
    pub result: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_url: Option<String>,
}

impl NormalizedPayload {
    /// Payload holding a single already-flat record, used when an entity is
    /// injected without a network round trip.
    pub fn single(table: impl Into<String>, id: impl Into<String>, record: Value) -> Self {
        let id = id.into();
        let mut rows = BTreeMap::new();
        rows.insert(id.clone(), record);
        let mut entities = BTreeMap::new();
        entities.insert(table.into(), rows);
        Self {
            entities,
            result: vec![id],
            next_page_url: None,
        }
    }

    /// Look up one normalized record.
    pub fn record(&self, table: &str, id: &str) -> Option<&Value> {
        self.entities.get(table).and_then(|rows| rows.get(id))
    }
}

/// Flatten `value` through `schema` into entity-table fragments.
pub fn normalize(value: &Value, schema: &Schema) -> Result<NormalizedPayload, NormalizeError> {
    let mut payload = NormalizedPayload::default();
    match schema {
        Schema::Entity(def) => {
            let id = visit(value, def, &mut payload)?;
            payload.result.push(id);
        }
        Schema::List(def) => {
            let items = value.as_array().ok_or_else(|| NormalizeError::NotAnArray {
                table: def.table.clone(),
            })?;
            for item in items {
                let id = visit(item, def, &mut payload)?;
                payload.result.push(id);
            }
        }
    }
    Ok(payload)
}

/// Flatten one record: lift nested entities into their own tables, replace
/// them with their identifiers, and insert the record under its own id.
fn visit(
    value: &Value,
    def: &EntityDef,
    payload: &mut NormalizedPayload,
) -> Result<String, NormalizeError> {
    let object = value.as_object().ok_or_else(|| NormalizeError::NotAnObject {
        table: def.table.clone(),
    })?;
    let mut record = object.clone();

    for (field, nested_def) in &def.nested {
        if let Some(nested_value) = record.get(field.as_str()).cloned() {
            if nested_value.is_null() {
                continue;
            }
            let nested_id = visit(&nested_value, nested_def, payload)?;
            record.insert(field.clone(), Value::String(nested_id));
        }
    }

    let id = match &def.id {
        IdSource::Fixed(key) => key.clone(),
        IdSource::Field(field) => match record.get(field.as_str()) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(NormalizeError::MissingId {
                    table: def.table.clone(),
                    field: field.clone(),
                })
            }
        },
    };

    payload
        .entities
        .entry(def.table.clone())
        .or_default()
        .insert(id.clone(), Value::Object(record));
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn repo_def() -> EntityDef {
        EntityDef::new("repos", "fullName").with_nested("owner", EntityDef::new("users", "login"))
    }

    #[test]
    fn test_single_entity() {
        let payload = normalize(
            &json!({"login": "octocat", "name": "The Octocat"}),
            &Schema::Entity(EntityDef::new("users", "login")),
        )
        .unwrap();

        assert_eq!(payload.result, vec!["octocat"]);
        assert_eq!(
            payload.record("users", "octocat"),
            Some(&json!({"login": "octocat", "name": "The Octocat"}))
        );
    }

    #[test]
    fn test_nested_entity_is_lifted_and_replaced() {
        let payload = normalize(
            &json!({
                "fullName": "octocat/Hello-World",
                "stars": 42,
                "owner": {"login": "octocat", "avatar": "x.png"}
            }),
            &Schema::Entity(repo_def()),
        )
        .unwrap();

        let repo = payload.record("repos", "octocat/Hello-World").unwrap();
        assert_eq!(repo["owner"], json!("octocat"));
        assert_eq!(
            payload.record("users", "octocat"),
            Some(&json!({"login": "octocat", "avatar": "x.png"}))
        );
    }

    #[test]
    fn test_list_preserves_response_order() {
        let payload = normalize(
            &json!([
                {"login": "b"},
                {"login": "a"},
            ]),
            &Schema::List(EntityDef::new("users", "login")),
        )
        .unwrap();
        assert_eq!(payload.result, vec!["b", "a"]);
        assert_eq!(payload.entities["users"].len(), 2);
    }

    #[test]
    fn test_numeric_identifier_becomes_string() {
        let payload = normalize(
            &json!({"id": 7, "label": "intro"}),
            &Schema::Entity(EntityDef::new("forms", "id")),
        )
        .unwrap();
        assert!(payload.record("forms", "7").is_some());
    }

    #[test]
    fn test_fixed_key() {
        let payload = normalize(
            &json!({"login": "me"}),
            &Schema::Entity(EntityDef::keyed("session", "current")),
        )
        .unwrap();
        assert!(payload.record("session", "current").is_some());
    }

    #[test]
    fn test_missing_id_is_an_error() {
        let err = normalize(
            &json!({"name": "no id here"}),
            &Schema::Entity(EntityDef::new("users", "login")),
        )
        .unwrap_err();
        assert!(matches!(err, NormalizeError::MissingId { .. }));
    }

    #[test]
    fn test_scalar_where_array_expected() {
        let err = normalize(
            &json!({"login": "octocat"}),
            &Schema::List(EntityDef::new("users", "login")),
        )
        .unwrap_err();
        assert!(matches!(err, NormalizeError::NotAnArray { .. }));
    }

    #[test]
    fn test_null_nested_field_is_kept() {
        let payload = normalize(
            &json!({"fullName": "a/b", "owner": null}),
            &Schema::Entity(repo_def()),
        )
        .unwrap();
        assert_eq!(payload.record("repos", "a/b").unwrap()["owner"], json!(null));
    }
}
