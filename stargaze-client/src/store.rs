//! Store composition
//!
//! Wires the reducer map, the middleware chain, and the startup state merge
//! into one runtime. Middleware order is load-bearing: history sync and
//! session tagging must see the raw envelope before the realtime bridge
//! emits it or the executor consumes it, and the action logger sits outside
//! everything.

use chrono::{Datelike, Utc};
use remote_dispatch::debug::ActionLoggerMiddleware;
use remote_dispatch::{
    merge_all, ApiHosts, ApiMiddleware, ComposeError, HistoryBackend, HistoryCache,
    HistoryEntry, HistoryMiddleware, HistorySync, HttpTransport, MemoryHistory, MiddlewareStack,
    RealtimeMiddleware, Runtime, SessionTagMiddleware, Transport,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::action::Action;
use crate::config;
use crate::reducer::ReducerMap;
use crate::state::{default_state, AppState};

/// Composition inputs. `Default` gives a same-origin client starting at `/`.
pub struct StoreOptions {
    /// Caller-supplied initial state (persisted snapshot, server render).
    pub initial_state: Option<Value>,
    /// Logical target → base url table.
    pub hosts: ApiHosts,
    /// Startup location, captured into the history snapshot.
    pub location: HistoryEntry,
    /// Navigation surface; defaults to the in-memory backend.
    pub history_backend: Option<Box<dyn HistoryBackend>>,
    /// Outbound realtime frame channel; `None` disables the bridge.
    pub outbound: Option<mpsc::UnboundedSender<Value>>,
    /// Install the action logger as the outermost layer.
    pub log_actions: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            initial_state: None,
            hosts: config::default_hosts(),
            location: HistoryEntry::new("/", ""),
            history_backend: None,
            outbound: None,
            log_actions: false,
        }
    }
}

/// The composed store and its history bridge.
pub struct ComposedStore {
    pub runtime: Runtime<AppState, Action>,
    /// Reverse history half: feed browser back/forward traversals here.
    pub history: HistorySync<Action, HistoryCache>,
    /// View-state cache shared with the history middleware.
    pub cache: HistoryCache,
}

/// Compose the store against the production HTTP transport.
pub fn configure_store(options: StoreOptions) -> Result<ComposedStore, ComposeError> {
    let transport = HttpTransport::new(options.hosts.clone());
    configure_store_with(options, transport)
}

/// Compose the store against any transport (tests use a stub).
pub fn configure_store_with<T: Transport>(
    options: StoreOptions,
    transport: T,
) -> Result<ComposedStore, ComposeError> {
    let merged = merge_all([
        options.initial_state.unwrap_or_else(|| json!({})),
        calculated_state(&options.location),
        default_state(),
    ]);
    let state: AppState = serde_json::from_value(merged)?;

    let cache = HistoryCache::new();
    let backend = options
        .history_backend
        .unwrap_or_else(|| Box::new(MemoryHistory::new()));

    let mut middleware = MiddlewareStack::new();
    if options.log_actions {
        middleware.push(ActionLoggerMiddleware::with_default_log());
    }
    middleware.push(
        HistoryMiddleware::new(backend, cache.clone()).starting_at(options.location.url.clone()),
    );
    middleware.push(SessionTagMiddleware::new(session_meta));
    if let Some(outbound) = options.outbound {
        middleware.push(RealtimeMiddleware::new(outbound));
    }
    middleware.push(ApiMiddleware::new(transport));

    let runtime = Runtime::new(state, ReducerMap::default().into_reducer(), middleware);
    let history = HistorySync::new(runtime.action_tx(), cache.clone());
    Ok(ComposedStore {
        runtime,
        history,
        cache,
    })
}

/// Fields computed at composition time, merged between caller-supplied and
/// default state.
fn calculated_state(location: &HistoryEntry) -> Value {
    json!({
        "db": { "currentYear": Utc::now().year() },
        "history": { "current": remote_dispatch::init_state(&location.url, &location.title) },
    })
}

/// Session/auth metadata stamped onto outbound envelopes.
pub fn session_meta(state: &AppState) -> Option<Value> {
    if !state.session.authenticated {
        return None;
    }
    Some(json!({
        "login": state.session.login,
        "token": state.session.token,
    }))
}

/// Administrative reducer reload: swap the map, keep the state.
pub fn reload_reducers(runtime: &mut Runtime<AppState, Action>, map: ReducerMap) {
    runtime.replace_reducer(map.into_reducer());
}
