//! Reducers - pure functions: (slice, action) -> changed
//!
//! One reducer per state slice, collected in a [`ReducerMap`] and compiled
//! into the root reducer at store composition time. All mutation of entity
//! tables, pagination cursors, and the in-flight set happens here, in
//! response to dispatched actions; guards and middleware only read.

use remote_dispatch::{deep_merge, ApiEvent};
use serde_json::Value;

use crate::action::{Action, SESSION, STARGAZERS, STARRED};
use crate::state::{
    AppState, EntityState, HistoryState, InflightState, PaginationState, SessionState,
};

/// Fixed mapping of state-slice name to its reducer.
///
/// Replacing the map at runtime goes through
/// [`reload_reducers`](crate::store::reload_reducers); existing state is
/// kept, so new reducers must accept state the old ones produced.
#[derive(Clone, Copy)]
pub struct ReducerMap {
    pub entity: fn(&mut EntityState, &Action) -> bool,
    pub pagination: fn(&mut PaginationState, &Action) -> bool,
    pub inflight: fn(&mut InflightState, &Action) -> bool,
    pub session: fn(&mut SessionState, &Action) -> bool,
    pub history: fn(&mut HistoryState, &Action) -> bool,
}

impl Default for ReducerMap {
    fn default() -> Self {
        Self {
            entity,
            pagination,
            inflight,
            session,
            history,
        }
    }
}

impl ReducerMap {
    /// Compile the map into one root reducer over [`AppState`].
    pub fn into_reducer(self) -> impl FnMut(&mut AppState, Action) -> bool + Send + 'static {
        move |state, action| {
            // Every slice sees every action; no short-circuiting.
            (self.entity)(&mut state.entity, &action)
                | (self.pagination)(&mut state.pagination, &action)
                | (self.inflight)(&mut state.inflight, &action)
                | (self.session)(&mut state.session, &action)
                | (self.history)(&mut state.history, &action)
        }
    }
}

/// Merge normalized entity fragments into their tables.
///
/// Records merge field-wise rather than replace, so partial field sets from
/// different endpoints accumulate on the same entity. Rows are never deleted
/// here.
pub fn entity(state: &mut EntityState, action: &Action) -> bool {
    let Action::Api(ApiEvent::Succeeded { payload, .. }) = action else {
        return false;
    };

    let mut changed = false;
    for (table_name, rows) in &payload.entities {
        let Some(table) = state.table_mut(table_name) else {
            tracing::warn!(table = %table_name, "dropping fragment for unknown entity table");
            continue;
        };
        for (id, record) in rows {
            match table.get_mut(id) {
                Some(existing) => deep_merge(existing, record.clone()),
                None => {
                    table.insert(id.clone(), record.clone());
                }
            }
            changed = true;
        }
    }
    changed
}

/// Maintain pagination cursors for the paginated resources.
///
/// A cursor is created on the first load attempt for a parent key;
/// `page_count` increments by exactly one per successful page fetch, and the
/// continuation url tracks what the response advertised.
pub fn pagination(state: &mut PaginationState, action: &Action) -> bool {
    let Action::Api(event) = action else {
        return false;
    };
    let request = event.request();

    let (cursors, key) = if request.lifecycle() == &STARRED {
        (&mut state.starred_by_user, request.meta_str("login"))
    } else if request.lifecycle() == &STARGAZERS {
        (&mut state.stargazers_by_repo, request.meta_str("fullName"))
    } else {
        return false;
    };
    let Some(key) = key else {
        tracing::warn!(label = %event.label(), "paginated lifecycle action without a parent key");
        return false;
    };

    match event {
        ApiEvent::Requested { .. } => {
            if cursors.contains_key(key) {
                false
            } else {
                cursors.entry(key.to_string()).or_default();
                true
            }
        }
        ApiEvent::Succeeded { payload, .. } => {
            let cursor = cursors.entry(key.to_string()).or_default();
            cursor.page_count += 1;
            cursor.next_page_url = payload.next_page_url.clone();
            true
        }
        ApiEvent::Failed { .. } => false,
    }
}

/// Track outstanding requests by fingerprint.
///
/// Set on REQUEST, cleared on SUCCESS and FAILURE, so a request that failed
/// can be attempted again.
pub fn inflight(state: &mut InflightState, action: &Action) -> bool {
    let Action::Api(event) = action else {
        return false;
    };
    match event {
        ApiEvent::Requested { request } => state.pending.insert(request.fingerprint()),
        ApiEvent::Succeeded { request, .. } | ApiEvent::Failed { request, .. } => {
            state.pending.remove(&request.fingerprint())
        }
    }
}

/// Derive auth status from the session lifecycle.
pub fn session(state: &mut SessionState, action: &Action) -> bool {
    let Action::Api(event) = action else {
        return false;
    };
    if event.request().lifecycle() != &SESSION {
        return false;
    }
    match event {
        ApiEvent::Succeeded { payload, .. } => {
            let record = payload.record("session", "current");
            let field = |name: &str| {
                record
                    .and_then(|r| r.get(name))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };
            state.authenticated = true;
            state.login = field("login");
            state.token = field("token");
            true
        }
        ApiEvent::Failed { .. } => {
            let was_authenticated = state.authenticated;
            state.authenticated = false;
            state.login = None;
            state.token = None;
            was_authenticated
        }
        ApiEvent::Requested { .. } => false,
    }
}

/// Keep the navigation snapshot current.
pub fn history(state: &mut HistoryState, action: &Action) -> bool {
    match action {
        Action::Navigate { url, title } => {
            state.current = remote_dispatch::HistoryEntry::new(url.clone(), title.clone());
            state.restored_view = None;
            true
        }
        Action::HistoryRestore { entry, view_state } => {
            state.current = entry.clone();
            state.restored_view = view_state.clone();
            true
        }
        _ => false,
    }
}
