//! Application state - single source of truth
//!
//! One central container holding the normalized entity tables, pagination
//! cursors, the in-flight request set, session status, the history snapshot,
//! and calculated fields. Only reducers mutate it; guards read it. The
//! serialized shape uses camelCase keys so persisted state and
//! caller-supplied initial state stay interchangeable with the wire format.

use std::collections::{HashMap, HashSet};

use remote_dispatch::HistoryEntry;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Identifier-keyed table of flat entity records.
pub type Table = HashMap<String, Value>;

/// The whole application state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppState {
    pub entity: EntityState,
    pub pagination: PaginationState,
    pub inflight: InflightState,
    pub session: SessionState,
    pub history: HistoryState,
    pub db: DbState,
}

impl AppState {
    /// Whether `table` holds a record under `id`.
    pub fn has_entity(&self, table: &str, id: &str) -> bool {
        self.entity
            .table(table)
            .is_some_and(|rows| rows.contains_key(id))
    }

    /// Whether the record under `id` exists and carries every listed field.
    pub fn entity_has_fields(&self, table: &str, id: &str, fields: &[String]) -> bool {
        self.entity
            .table(table)
            .and_then(|rows| rows.get(id))
            .and_then(Value::as_object)
            .is_some_and(|record| fields.iter().all(|field| record.contains_key(field)))
    }
}

/// Normalized entity tables, one per entity type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EntityState {
    pub users: Table,
    pub repos: Table,
    pub url: Table,
    pub forms: Table,
    pub schema: Table,
    pub session: Table,
    pub content: Table,
}

impl EntityState {
    /// Look up a table by its normalized-payload name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        match name {
            "users" => Some(&self.users),
            "repos" => Some(&self.repos),
            "url" => Some(&self.url),
            "forms" => Some(&self.forms),
            "schema" => Some(&self.schema),
            "session" => Some(&self.session),
            "content" => Some(&self.content),
            _ => None,
        }
    }

    /// Mutable variant of [`table`](Self::table).
    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        match name {
            "users" => Some(&mut self.users),
            "repos" => Some(&mut self.repos),
            "url" => Some(&mut self.url),
            "forms" => Some(&mut self.forms),
            "schema" => Some(&mut self.schema),
            "session" => Some(&mut self.session),
            "content" => Some(&mut self.content),
            _ => None,
        }
    }
}

/// Per-parent pagination bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaginationState {
    pub starred_by_user: HashMap<String, Cursor>,
    pub stargazers_by_repo: HashMap<String, Cursor>,
}

/// Where the next page of one paginated resource lives.
///
/// `page_count` increments by exactly one per successful page fetch;
/// `next_page_url` is absent once the last page has been fetched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Cursor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_url: Option<String>,
    pub page_count: u32,
}

/// Requests currently outstanding, keyed by request fingerprint.
///
/// Inserted on REQUEST and cleared on SUCCESS and FAILURE by the reducer, so
/// a failed fetch never suppresses later attempts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InflightState {
    pub pending: HashSet<String>,
}

impl InflightState {
    /// Whether a request with this fingerprint is outstanding.
    pub fn is_pending(&self, fingerprint: &str) -> bool {
        self.pending.contains(fingerprint)
    }
}

/// Session/auth status derived from the session lifecycle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionState {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Navigation snapshot kept in state for the UI.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoryState {
    pub current: HistoryEntry,
    /// View state restored by the last back/forward traversal, for the UI
    /// to apply once and discard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restored_view: Option<Value>,
}

/// Calculated fields computed at store composition time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DbState {
    pub current_year: i32,
}

/// Static default state, the last (winning) source of the startup merge.
///
/// Keep this disjoint from calculated fields: anything listed here overrides
/// both caller-supplied and calculated values.
pub fn default_state() -> Value {
    json!({
        "session": { "authenticated": false },
        "inflight": { "pending": [] },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_camel_case() {
        let mut state = AppState::default();
        state.pagination.starred_by_user.insert(
            "octocat".into(),
            Cursor {
                next_page_url: Some("https://x/starred?page=2".into()),
                page_count: 1,
            },
        );

        let value = serde_json::to_value(&state).unwrap();
        assert!(value["pagination"]["starredByUser"]["octocat"]["nextPageUrl"].is_string());
        assert_eq!(
            value["pagination"]["starredByUser"]["octocat"]["pageCount"],
            json!(1)
        );

        let back: AppState = serde_json::from_value(value).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_partial_initial_state_deserializes() {
        let state: AppState = serde_json::from_value(json!({
            "entity": { "users": { "octocat": { "login": "octocat" } } }
        }))
        .unwrap();
        assert!(state.has_entity("users", "octocat"));
        assert_eq!(state.db.current_year, 0);
    }

    #[test]
    fn test_entity_has_fields() {
        let state: AppState = serde_json::from_value(json!({
            "entity": { "repos": { "a/b": { "fullName": "a/b", "stars": 1 } } }
        }))
        .unwrap();
        assert!(state.entity_has_fields("repos", "a/b", &["stars".into()]));
        assert!(!state.entity_has_fields("repos", "a/b", &["forks".into()]));
        assert!(!state.entity_has_fields("repos", "missing", &[]));
    }
}
