//! stargaze-client: the data-orchestration layer of the stargaze client
//!
//! Synchronizes one central state container with the content api and the
//! github api: guards turn load intents into deduplicated, cached, paginated
//! api requests; the execution middleware normalizes responses into entity
//! tables; realtime push and browser history feed the same dispatch path.
//!
//! The presentation layer renders from [`state::AppState`] and talks to this
//! crate exclusively through [`guards::Intent`] and
//! [`store::configure_store`].
//!
//! ```ignore
//! use stargaze_client::{guards, store};
//!
//! let mut composed = store::configure_store(store::StoreOptions::default())?;
//! let intent = guards::Intent::LoadRepo {
//!     full_name: "octocat/Hello-World".into(),
//!     required_fields: vec!["stars".into()],
//! };
//! if let Some(request) = guards::plan(&intent, composed.runtime.state()) {
//!     composed.runtime.dispatch_call(request);
//! }
//! ```

pub mod action;
pub mod config;
pub mod guards;
pub mod reducer;
pub mod schemas;
pub mod state;
pub mod store;

pub use action::Action;
pub use guards::{plan, Intent};
pub use reducer::ReducerMap;
pub use state::AppState;
pub use store::{configure_store, configure_store_with, ComposedStore, StoreOptions};
