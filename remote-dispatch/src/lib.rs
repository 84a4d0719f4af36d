//! remote-dispatch: Centralized state management with remote-data orchestration
//!
//! Like Redux, but for Rust clients talking to remote apis: guards decide
//! whether a fetch is needed, descriptors declare it, middleware execute and
//! normalize it, reducers fold the lifecycle actions into one state container.
//!
//! # Example
//! ```ignore
//! use remote_dispatch::prelude::*;
//!
//! let request = ApiRequest::new(
//!     "github",
//!     "repos/octocat/Hello-World",
//!     Schema::Entity(EntityDef::new("repos", "fullName")),
//!     Lifecycle::from_static("REPO_REQUEST", "REPO_SUCCESS", "REPO_FAILURE"),
//! );
//! runtime.dispatch_call(request);
//! ```

// Re-export everything from core
pub use remote_dispatch_core::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use remote_dispatch_core::prelude::*;
}
