//! Actions and lifecycle labels
//!
//! Every remote resource has one lifecycle label triple; reducers route on
//! these labels, the logger filters on them, and realtime frames carry them
//! unchanged. Api lifecycle events, navigation, and history restoration all
//! flow through the one [`Action`] enum.

use remote_dispatch::{
    ActionSummary, ApiEvent, Broadcast, HistoryEntry, Lifecycle, Method, Navigation,
    NormalizedPayload,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schemas;

pub const USER: Lifecycle = Lifecycle::from_static("USER_REQUEST", "USER_SUCCESS", "USER_FAILURE");
pub const REPO: Lifecycle = Lifecycle::from_static("REPO_REQUEST", "REPO_SUCCESS", "REPO_FAILURE");
pub const STARRED: Lifecycle =
    Lifecycle::from_static("STARRED_REQUEST", "STARRED_SUCCESS", "STARRED_FAILURE");
pub const STARGAZERS: Lifecycle = Lifecycle::from_static(
    "STARGAZERS_REQUEST",
    "STARGAZERS_SUCCESS",
    "STARGAZERS_FAILURE",
);
pub const URL: Lifecycle = Lifecycle::from_static("URL_REQUEST", "URL_SUCCESS", "URL_FAILURE");
pub const FORM: Lifecycle = Lifecycle::from_static("FORM_REQUEST", "FORM_SUCCESS", "FORM_FAILURE");
pub const SESSION: Lifecycle =
    Lifecycle::from_static("SESS_REQUEST", "SESS_SUCCESS", "SESS_FAILURE");
// Schema has its own labels; sharing the session labels would make reducers
// conflate unrelated events.
pub const SCHEMA: Lifecycle =
    Lifecycle::from_static("SCHEMA_REQUEST", "SCHEMA_SUCCESS", "SCHEMA_FAILURE");
pub const CONTENT: Lifecycle =
    Lifecycle::from_static("CONTENT_REQUEST", "CONTENT_SUCCESS", "CONTENT_FAILURE");
pub const CONTENT_SAVE: Lifecycle =
    Lifecycle::from_static("CONTENT_SAVE", "CONTENT_SAVED", "CONTENT_SAVE_ERR");

/// Everything the reducers can observe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Lifecycle event of an api request.
    Api(ApiEvent),
    /// User navigation: update the visible url and title.
    Navigate { url: String, title: String },
    /// Browser back/forward restored a prior entry.
    HistoryRestore {
        entry: HistoryEntry,
        #[serde(default)]
        view_state: Option<Value>,
    },
}

impl Action {
    /// Inject an already-known content entity without a network round trip.
    ///
    /// Synthesizes the content SUCCESS lifecycle action; reducers treat it
    /// exactly like a fetched entity.
    pub fn add_content(type_id: &str, entity_id: &str, entity: Value) -> Self {
        let request = crate::guards::fetch_content(type_id, entity_id);
        let key = schemas::content_key(type_id, entity_id);
        Action::Api(ApiEvent::Succeeded {
            request,
            payload: NormalizedPayload::single("content", key, entity),
        })
    }
}

impl remote_dispatch::Action for Action {
    fn name(&self) -> &str {
        match self {
            Action::Api(event) => event.label(),
            Action::Navigate { .. } => "NAVIGATE",
            Action::HistoryRestore { .. } => "HISTORY_RESTORE",
        }
    }
}

impl ActionSummary for Action {
    fn summary(&self) -> String {
        match self {
            Action::Api(ApiEvent::Requested { request }) => {
                format!("{} {}", request.lifecycle().request(), request.endpoint())
            }
            Action::Api(ApiEvent::Succeeded { request, payload }) => format!(
                "{} {} ({} tables)",
                request.lifecycle().success(),
                request.endpoint(),
                payload.entities.len()
            ),
            Action::Api(ApiEvent::Failed { request, error }) => {
                let message = if error.message.chars().count() > 60 {
                    let short: String = error.message.chars().take(57).collect();
                    format!("{}...", short)
                } else {
                    error.message.clone()
                };
                format!("{} {}", request.lifecycle().failure(), message)
            }
            Action::Navigate { url, .. } => format!("NAVIGATE {}", url),
            Action::HistoryRestore { entry, .. } => format!("HISTORY_RESTORE {}", entry.url),
        }
    }
}

impl From<ApiEvent> for Action {
    fn from(event: ApiEvent) -> Self {
        Action::Api(event)
    }
}

impl Navigation for Action {
    fn navigates(&self) -> Option<HistoryEntry> {
        match self {
            Action::Navigate { url, title } => Some(HistoryEntry::new(url.clone(), title.clone())),
            _ => None,
        }
    }

    fn restore(entry: HistoryEntry, view_state: Option<Value>) -> Self {
        Action::HistoryRestore { entry, view_state }
    }
}

impl Broadcast for Action {
    /// Mutations leave the client so collaborators observe edits; reads and
    /// their completions stay local.
    fn broadcast(&self) -> bool {
        matches!(
            self,
            Action::Api(ApiEvent::Requested { request }) if request.method() != Method::Get
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_dispatch::Action as _;
    use serde_json::json;

    #[test]
    fn test_names_are_lifecycle_labels() {
        let action = Action::Api(ApiEvent::Requested {
            request: crate::guards::fetch_session(),
        });
        assert_eq!(action.name(), "SESS_REQUEST");
    }

    #[test]
    fn test_schema_labels_are_distinct_from_session() {
        assert_ne!(SCHEMA.success(), SESSION.success());
        assert_ne!(SCHEMA.failure(), SESSION.failure());
    }

    #[test]
    fn test_add_content_shapes_like_a_fetch_success() {
        let action = Action::add_content("page", "about", json!({"title": "About"}));
        match &action {
            Action::Api(ApiEvent::Succeeded { payload, .. }) => {
                assert!(payload.record("content", "page/about").is_some());
            }
            other => panic!("unexpected action {:?}", other),
        }
        assert_eq!(action.name(), "CONTENT_SUCCESS");
    }

    #[test]
    fn test_only_mutation_requests_broadcast() {
        let save = Action::Api(ApiEvent::Requested {
            request: crate::guards::save_request("page", "about", &json!({"x": 1})),
        });
        assert!(save.broadcast());

        let read = Action::Api(ApiEvent::Requested {
            request: crate::guards::fetch_session(),
        });
        assert!(!read.broadcast());
    }

    #[test]
    fn test_realtime_frame_round_trip() {
        let action = Action::add_content("page", "about", json!({"title": "About"}));
        let frame = serde_json::to_value(&action).unwrap();
        let back: Action = serde_json::from_value(frame).unwrap();
        assert_eq!(back, action);
    }
}
