//! Developer-inspection instrumentation
//!
//! An action logger with glob pattern filtering and an in-memory ring
//! buffer, packaged as a middleware layer. Install it as the outermost layer
//! so it observes every envelope exactly as dispatched, before any other
//! layer annotates, emits, or consumes it.

use std::collections::VecDeque;
use std::time::Instant;

use crate::action::ActionSummary;
use crate::store::{DispatchContext, Envelope, Middleware, Payload};

/// Include/exclude glob patterns over action names.
///
/// Patterns support `*` (any sequence) and `?` (any single character):
/// `*_SUCCESS` matches every success label, `STARRED_*` one resource's
/// lifecycle.
#[derive(Clone, Debug, Default)]
pub struct ActionLoggerConfig {
    /// If non-empty, only log actions matching one of these patterns.
    pub include_patterns: Vec<String>,
    /// Exclude actions matching these patterns (applied after include).
    pub exclude_patterns: Vec<String>,
}

impl ActionLoggerConfig {
    /// Build from comma-separated pattern strings.
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        let split = |s: &str| {
            s.split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect()
        };
        Self {
            include_patterns: include.map(split).unwrap_or_default(),
            exclude_patterns: exclude.map(split).unwrap_or_default(),
        }
    }

    /// Whether an action name passes the filter.
    pub fn should_log(&self, action_name: &str) -> bool {
        if !self.include_patterns.is_empty()
            && !self
                .include_patterns
                .iter()
                .any(|p| glob_match(p, action_name))
        {
            return false;
        }
        !self
            .exclude_patterns
            .iter()
            .any(|p| glob_match(p, action_name))
    }
}

/// One logged action.
#[derive(Clone, Debug)]
pub struct ActionLogEntry {
    /// Action name (lifecycle label or variant name).
    pub name: String,
    /// Compact representation from [`ActionSummary`].
    pub summary: String,
    /// When the action was logged.
    pub timestamp: Instant,
    /// Monotonic ordering across the log's lifetime.
    pub sequence: u64,
    /// Whether the reducer changed state (filled in after it ran).
    pub state_changed: Option<bool>,
}

/// Ring buffer of recent actions for inspection overlays and tests.
#[derive(Clone, Debug)]
pub struct ActionLog {
    entries: VecDeque<ActionLogEntry>,
    capacity: usize,
    filter: ActionLoggerConfig,
    next_sequence: u64,
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new(100, ActionLoggerConfig::default())
    }
}

impl ActionLog {
    pub fn new(capacity: usize, filter: ActionLoggerConfig) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            filter,
            next_sequence: 0,
        }
    }

    /// Record an action if it passes the filter.
    pub fn log(&mut self, name: &str, summary: String) -> bool {
        if !self.filter.should_log(name) {
            return false;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(ActionLogEntry {
            name: name.to_string(),
            summary,
            timestamp: Instant::now(),
            sequence: self.next_sequence,
            state_changed: None,
        });
        self.next_sequence += 1;
        true
    }

    /// Fill in the state-change flag after the reducer ran.
    pub fn update_last_state_changed(&mut self, changed: bool) {
        if let Some(entry) = self.entries.back_mut() {
            entry.state_changed = Some(changed);
        }
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter()
    }

    /// The most recent `count` entries, newest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter().rev().take(count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Middleware logging every dispatched envelope.
///
/// Actions go to `tracing` and, when storage is enabled, into the ring
/// buffer. Api call descriptors are traced only; their REQUEST lifecycle
/// action re-enters the chain and gets logged like any other action.
pub struct ActionLoggerMiddleware {
    config: ActionLoggerConfig,
    log: Option<ActionLog>,
    last_action_logged: bool,
}

impl ActionLoggerMiddleware {
    /// Tracing only, no in-memory storage.
    pub fn new(config: ActionLoggerConfig) -> Self {
        Self {
            config,
            log: None,
            last_action_logged: false,
        }
    }

    /// Tracing plus a ring buffer of `capacity` entries.
    pub fn with_log(capacity: usize, config: ActionLoggerConfig) -> Self {
        Self {
            config: config.clone(),
            log: Some(ActionLog::new(capacity, config)),
            last_action_logged: false,
        }
    }

    /// Log everything, with default storage.
    pub fn with_default_log() -> Self {
        Self::with_log(100, ActionLoggerConfig::default())
    }

    /// The ring buffer, when storage is enabled.
    pub fn log(&self) -> Option<&ActionLog> {
        self.log.as_ref()
    }
}

impl<S, A: ActionSummary> Middleware<S, A> for ActionLoggerMiddleware {
    fn handle(
        &mut self,
        env: Envelope<A>,
        _ctx: &mut DispatchContext<'_, S, A>,
    ) -> Option<Envelope<A>> {
        self.last_action_logged = false;
        match &env.payload {
            Payload::Action(action) => {
                let name = action.name().to_string();
                if self.config.should_log(&name) {
                    tracing::debug!(action = %name, "action");
                }
                if let Some(log) = self.log.as_mut() {
                    self.last_action_logged = log.log(&name, action.summary());
                }
            }
            Payload::Call(request) => {
                tracing::debug!(
                    label = %request.lifecycle().request(),
                    endpoint = %request.endpoint(),
                    "api call"
                );
            }
        }
        Some(env)
    }

    fn after(&mut self, _action: &A, state_changed: bool) {
        if self.last_action_logged {
            if let Some(log) = self.log.as_mut() {
                log.update_last_state_changed(state_changed);
            }
        }
    }
}

/// Simple glob pattern matching supporting `*` and `?`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let mut pi = 0;
    let mut ti = 0;
    let mut star_pi = None;
    let mut star_ti = 0;

    while ti < text.len() {
        if pi < pattern.len() && (pattern[pi] == '?' || pattern[pi] == text[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < pattern.len() && pattern[pi] == '*' {
            star_pi = Some(pi);
            star_ti = ti;
            pi += 1;
        } else if let Some(spi) = star_pi {
            pi = spi + 1;
            star_ti += 1;
            ti = star_ti;
        } else {
            return false;
        }
    }

    while pi < pattern.len() && pattern[pi] == '*' {
        pi += 1;
    }

    pi == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::store::{MiddlewareStack, StoreWithMiddleware};
    use tokio::sync::mpsc;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("USER_*", "USER_REQUEST"));
        assert!(glob_match("*_SUCCESS", "STARRED_SUCCESS"));
        assert!(glob_match("*FAIL*", "URL_FAILURE"));
        assert!(glob_match("SESS_?EQUEST", "SESS_REQUEST"));
        assert!(!glob_match("USER_*", "REPO_REQUEST"));
        assert!(!glob_match("USER", "USER_REQUEST"));
    }

    #[test]
    fn test_filter_include_then_exclude() {
        let config = ActionLoggerConfig::new(Some("USER_*,REPO_*"), Some("*_FAILURE"));
        assert!(config.should_log("USER_REQUEST"));
        assert!(config.should_log("REPO_SUCCESS"));
        assert!(!config.should_log("USER_FAILURE"));
        assert!(!config.should_log("STARRED_REQUEST"));
    }

    #[test]
    fn test_log_capacity_and_sequence() {
        let mut log = ActionLog::new(2, ActionLoggerConfig::default());
        log.log("A", "A".into());
        log.log("B", "B".into());
        log.log("C", "C".into());
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries().next().unwrap().sequence, 1);
    }

    #[derive(Clone, Debug)]
    enum TestAction {
        Touch,
        Ignore,
    }

    impl Action for TestAction {
        fn name(&self) -> &str {
            match self {
                TestAction::Touch => "Touch",
                TestAction::Ignore => "Ignore",
            }
        }
    }

    impl ActionSummary for TestAction {}

    #[test]
    fn test_middleware_records_state_changed() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let stack =
            MiddlewareStack::new().with(ActionLoggerMiddleware::with_default_log());
        let mut store = StoreWithMiddleware::new(
            0u32,
            |state: &mut u32, action: TestAction| match action {
                TestAction::Touch => {
                    *state += 1;
                    true
                }
                TestAction::Ignore => false,
            },
            stack,
            tx,
        );

        store.dispatch_action(TestAction::Touch);
        store.dispatch_action(TestAction::Ignore);
        let _ = store;
    }

    #[test]
    fn test_filtered_action_does_not_update_state_changed() {
        let mut log = ActionLog::new(
            10,
            ActionLoggerConfig::new(None, Some("Ignore")),
        );
        assert!(log.log("Touch", "Touch".into()));
        log.update_last_state_changed(true);
        assert!(!log.log("Ignore", "Ignore".into()));

        let entry = log.entries().next().unwrap();
        assert_eq!(entry.state_changed, Some(true));
    }
}
