//! Core traits and types for remote-dispatch
//!
//! This crate provides the foundational abstractions for client apps that
//! synchronize a single state container with remote services, following a
//! Redux-inspired architecture: declarative api request descriptors, an
//! intercepting middleware chain, response normalization into entity tables,
//! and bridges for realtime push and history synchronization.
//!
//! # Core Concepts
//!
//! - **Action**: Events that describe state changes
//! - **ApiRequest**: Immutable descriptor of one asynchronous resource
//!   operation, interpreted by the execution middleware
//! - **Store**: Centralized state container with reducer pattern
//! - **Middleware**: Ordered interceptors between dispatch and the reducers
//! - **Normalization**: Flattening nested responses into identifier-keyed
//!   entity tables
//!
//! # Dispatch pipeline
//!
//! ```ignore
//! use remote_dispatch_core::prelude::*;
//!
//! // A guard decides a fetch is needed and builds a descriptor:
//! let request = ApiRequest::new(
//!     "github",
//!     "repos/octocat/Hello-World",
//!     Schema::Entity(EntityDef::new("repos", "fullName")),
//!     Lifecycle::from_static("REPO_REQUEST", "REPO_SUCCESS", "REPO_FAILURE"),
//! );
//!
//! // Dispatching it runs the middleware chain synchronously: the REQUEST
//! // lifecycle action is reduced before dispatch returns, the network call
//! // runs on a spawned task, and SUCCESS/FAILURE re-enter through the
//! // runtime's completion channel.
//! runtime.dispatch_call(request);
//! runtime.run_until_idle(Duration::from_millis(50)).await;
//! ```
//!
//! Lifecycle actions carry the originating descriptor, so reducers route on
//! its labels and correlation fields without any side channel.

pub mod action;
pub mod debug;
pub mod error;
pub mod executor;
pub mod history;
pub mod http;
pub mod merge;
pub mod realtime;
pub mod request;
pub mod runtime;
pub mod schema;
pub mod store;
pub mod testing;

// Core trait exports
pub use action::{Action, ActionSummary};

// Descriptor exports
pub use request::{ApiRequest, Lifecycle, Meta, Method};

// Normalization exports
pub use schema::{normalize, EntityDef, IdSource, NormalizedPayload, Schema};

// Store exports
pub use store::{
    BoxReducer, DispatchContext, Envelope, Middleware, MiddlewareStack, Payload, Store,
    StoreWithMiddleware,
};

// Execution exports
pub use executor::{ApiEvent, ApiMiddleware, Transport, TransportResponse};
pub use http::{next_link, ApiHosts, HttpTransport};

// Bridge exports
pub use history::{
    init_state, HistoryBackend, HistoryCache, HistoryEntry, HistoryMiddleware, HistorySync,
    MemoryHistory, Navigation, ViewStateCache, VIEW_STATE_META,
};
pub use realtime::{
    spawn_inbound, Broadcast, RealtimeMiddleware, SessionTagMiddleware, SESSION_META,
};

// State composition exports
pub use merge::{deep_merge, merge_all};

// Error exports
pub use error::{ApiError, ComposeError, ErrorDetail, NormalizeError};

// Runtime exports
pub use runtime::Runtime;

// Testing exports
pub use testing::{StubTransport, TestHarness};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{Action, ActionSummary};
    pub use crate::debug::{ActionLog, ActionLoggerConfig, ActionLoggerMiddleware};
    pub use crate::error::{ApiError, ComposeError, ErrorDetail, NormalizeError};
    pub use crate::executor::{ApiEvent, ApiMiddleware, Transport, TransportResponse};
    pub use crate::history::{
        HistoryBackend, HistoryCache, HistoryEntry, HistoryMiddleware, HistorySync,
        MemoryHistory, Navigation, ViewStateCache,
    };
    pub use crate::http::{ApiHosts, HttpTransport};
    pub use crate::merge::{deep_merge, merge_all};
    pub use crate::realtime::{
        spawn_inbound, Broadcast, RealtimeMiddleware, SessionTagMiddleware,
    };
    pub use crate::request::{ApiRequest, Lifecycle, Meta, Method};
    pub use crate::runtime::Runtime;
    pub use crate::schema::{normalize, EntityDef, IdSource, NormalizedPayload, Schema};
    pub use crate::store::{
        DispatchContext, Envelope, Middleware, MiddlewareStack, Payload, Store,
        StoreWithMiddleware,
    };
}
