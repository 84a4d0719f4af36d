//! Action trait for type-safe state mutations

use std::fmt::Debug;

/// Marker trait for actions that can be dispatched to the store
///
/// Actions represent intents to change state. They should be:
/// - Clone: Actions may be logged, replayed, or sent to multiple handlers
/// - Debug: For debugging and logging
/// - Send + 'static: For async dispatch across threads
///
/// `name` returns the action's lifecycle label or variant name for logging
/// and filtering. It is `&str` rather than `&'static str` because lifecycle
/// labels may be owned strings decoded from realtime frames.
pub trait Action: Clone + Debug + Send + 'static {
    /// Get the action name for logging and filtering
    fn name(&self) -> &str;
}

/// Compact one-line representation of an action for log output
///
/// The default implementation falls back to `Debug`. Implement this for
/// actions carrying bulky payloads (normalized entity fragments, response
/// bodies) so log entries stay readable.
pub trait ActionSummary: Action {
    /// One-line summary of the action
    fn summary(&self) -> String {
        format!("{:?}", self)
    }
}
