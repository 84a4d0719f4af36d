//! Two-way history synchronization
//!
//! Forward half: actions exposing a navigation entry make the history
//! backend push that entry (url + title). Reverse half: browser back/forward
//! traversals are translated into restore actions that re-enter the normal
//! dispatch path. A shared cache keyed by url persists ephemeral view state
//! (scroll position and the like) across navigations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::action::Action;
use crate::store::{DispatchContext, Envelope, Middleware, Payload};

/// Envelope meta key under which outgoing view state rides.
pub const VIEW_STATE_META: &str = "viewState";

/// One addressable point in navigation history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub url: String,
    pub title: String,
}

impl HistoryEntry {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }
}

/// Startup history snapshot, merged into calculated initial state.
pub fn init_state(url: &str, title: &str) -> HistoryEntry {
    HistoryEntry::new(url, title)
}

/// The navigation surface (window.history in a browser host).
pub trait HistoryBackend: Send {
    /// Append an entry and make it current.
    fn push(&mut self, entry: &HistoryEntry);
    /// Swap the current entry in place.
    fn replace(&mut self, entry: &HistoryEntry);
}

impl HistoryBackend for Box<dyn HistoryBackend> {
    fn push(&mut self, entry: &HistoryEntry) {
        (**self).push(entry);
    }

    fn replace(&mut self, entry: &HistoryEntry) {
        (**self).replace(entry);
    }
}

/// In-memory backend for tests and non-browser hosts.
///
/// Keeps the full stack with a cursor so tests can drive back/forward
/// traversals through [`HistorySync`].
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Vec<HistoryEntry>,
    index: usize,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current entry, if any.
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.index)
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Move the cursor back, returning the entry now current.
    pub fn back(&mut self) -> Option<HistoryEntry> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        self.current().cloned()
    }

    /// Move the cursor forward, returning the entry now current.
    pub fn forward(&mut self) -> Option<HistoryEntry> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        self.current().cloned()
    }
}

impl HistoryBackend for MemoryHistory {
    fn push(&mut self, entry: &HistoryEntry) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }
        self.entries.push(entry.clone());
        self.index = self.entries.len() - 1;
    }

    fn replace(&mut self, entry: &HistoryEntry) {
        match self.entries.get_mut(self.index) {
            Some(slot) => *slot = entry.clone(),
            None => self.entries.push(entry.clone()),
        }
    }
}

/// Pluggable per-url store for ephemeral view state.
pub trait ViewStateCache: Send {
    fn save(&self, url: &str, state: Value);
    fn restore(&self, url: &str) -> Option<Value>;
}

/// Shared in-memory view-state cache.
///
/// Cloned between the middleware (which saves on navigation) and the
/// [`HistorySync`] handle (which restores on traversal).
#[derive(Clone, Debug, Default)]
pub struct HistoryCache {
    inner: Arc<Mutex<HashMap<String, Value>>>,
}

impl HistoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ViewStateCache for HistoryCache {
    fn save(&self, url: &str, state: Value) {
        self.inner
            .lock()
            .expect("history cache poisoned")
            .insert(url.to_string(), state);
    }

    fn restore(&self, url: &str) -> Option<Value> {
        self.inner
            .lock()
            .expect("history cache poisoned")
            .get(url)
            .cloned()
    }
}

/// How an action type participates in history sync.
pub trait Navigation: Action {
    /// The entry this action pushes, when it navigates.
    fn navigates(&self) -> Option<HistoryEntry> {
        None
    }

    /// Translate a back/forward traversal into an action restoring prior
    /// state, with any cached view state for the destination url.
    fn restore(entry: HistoryEntry, view_state: Option<Value>) -> Self;
}

/// Forward half: pushes navigation entries and saves outgoing view state.
pub struct HistoryMiddleware<C> {
    backend: Box<dyn HistoryBackend>,
    cache: C,
    current_url: Option<String>,
}

impl<C: ViewStateCache> HistoryMiddleware<C> {
    pub fn new(backend: impl HistoryBackend + 'static, cache: C) -> Self {
        Self {
            backend: Box::new(backend),
            cache,
            current_url: None,
        }
    }

    /// Seed the url considered current at startup, so the first navigation
    /// away from it can persist its view state.
    pub fn starting_at(mut self, url: impl Into<String>) -> Self {
        self.current_url = Some(url.into());
        self
    }
}

impl<S, A, C> Middleware<S, A> for HistoryMiddleware<C>
where
    A: Navigation,
    C: ViewStateCache,
{
    fn handle(
        &mut self,
        env: Envelope<A>,
        _ctx: &mut DispatchContext<'_, S, A>,
    ) -> Option<Envelope<A>> {
        if let Payload::Action(action) = &env.payload {
            if let Some(entry) = action.navigates() {
                if let (Some(prev), Some(view_state)) =
                    (&self.current_url, env.meta.get(VIEW_STATE_META))
                {
                    self.cache.save(prev, view_state.clone());
                }
                self.backend.push(&entry);
                tracing::debug!(url = %entry.url, "history push");
                self.current_url = Some(entry.url.clone());
            }
        }
        Some(env)
    }
}

/// Reverse half: turns traversal events into restore-action dispatches.
pub struct HistorySync<A, C> {
    action_tx: mpsc::UnboundedSender<A>,
    cache: C,
}

impl<A, C> HistorySync<A, C>
where
    A: Navigation,
    C: ViewStateCache,
{
    pub fn new(action_tx: mpsc::UnboundedSender<A>, cache: C) -> Self {
        Self { action_tx, cache }
    }

    /// Report that the browser moved to `entry` (back or forward).
    ///
    /// Enqueues the restore action; it is reduced on the runtime's next
    /// turn, indistinguishable from any other dispatched action.
    pub fn navigated(&self, entry: HistoryEntry) {
        let view_state = self.cache.restore(&entry.url);
        let _ = self.action_tx.send(A::restore(entry, view_state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MiddlewareStack, StoreWithMiddleware};
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Visit(String),
        Restore(HistoryEntry, Option<Value>),
        Plain,
    }

    impl Action for TestAction {
        fn name(&self) -> &str {
            match self {
                TestAction::Visit(_) => "Visit",
                TestAction::Restore(..) => "Restore",
                TestAction::Plain => "Plain",
            }
        }
    }

    impl Navigation for TestAction {
        fn navigates(&self) -> Option<HistoryEntry> {
            match self {
                TestAction::Visit(url) => Some(HistoryEntry::new(url.clone(), "t")),
                _ => None,
            }
        }

        fn restore(entry: HistoryEntry, view_state: Option<Value>) -> Self {
            TestAction::Restore(entry, view_state)
        }
    }

    #[derive(Default)]
    struct TestState {
        visited: Vec<String>,
    }

    fn reducer(state: &mut TestState, action: TestAction) -> bool {
        if let TestAction::Visit(url) = action {
            state.visited.push(url);
            return true;
        }
        false
    }

    #[test]
    fn test_memory_history_push_and_traverse() {
        let mut history = MemoryHistory::new();
        history.push(&HistoryEntry::new("/a", "A"));
        history.push(&HistoryEntry::new("/b", "B"));
        assert_eq!(history.current().unwrap().url, "/b");

        let back = history.back().unwrap();
        assert_eq!(back.url, "/a");

        // Pushing from the middle drops the forward tail.
        history.push(&HistoryEntry::new("/c", "C"));
        assert_eq!(history.entries().len(), 2);
        assert!(history.forward().is_none());
    }

    #[test]
    fn test_navigation_actions_push_entries() {
        let cache = HistoryCache::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let stack = MiddlewareStack::new()
            .with(HistoryMiddleware::new(MemoryHistory::new(), cache.clone()));
        let mut store = StoreWithMiddleware::new(TestState::default(), reducer, stack, tx);

        store.dispatch_action(TestAction::Visit("/users/octocat".into()));
        store.dispatch_action(TestAction::Plain);
        assert_eq!(store.state().visited, vec!["/users/octocat"]);
    }

    #[test]
    fn test_view_state_saved_for_outgoing_url() {
        let cache = HistoryCache::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let stack = MiddlewareStack::new().with(
            HistoryMiddleware::new(MemoryHistory::new(), cache.clone()).starting_at("/home"),
        );
        let mut store = StoreWithMiddleware::new(TestState::default(), reducer, stack, tx);

        let mut env = Envelope::action(TestAction::Visit("/next".into()));
        env.meta
            .insert(VIEW_STATE_META.into(), json!({"scroll": 340}));
        store.dispatch(env);

        assert_eq!(cache.restore("/home"), Some(json!({"scroll": 340})));
        assert_eq!(cache.restore("/next"), None);
    }

    #[tokio::test]
    async fn test_traversal_dispatches_restore_with_cached_view_state() {
        let cache = HistoryCache::new();
        cache.save("/home", json!({"scroll": 12}));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let sync = HistorySync::<TestAction, _>::new(tx, cache);
        sync.navigated(HistoryEntry::new("/home", "Home"));

        let action = rx.recv().await.unwrap();
        assert_eq!(
            action,
            TestAction::Restore(HistoryEntry::new("/home", "Home"), Some(json!({"scroll": 12})))
        );
    }
}
