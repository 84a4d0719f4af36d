//! Error types for the dispatch pipeline

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while executing an api request descriptor.
///
/// Variants hold owned strings rather than source errors so the type stays
/// `Clone` and can be replayed from stub transports in tests.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The descriptor named a logical target with no configured host.
    #[error("no host configured for api target {0:?}")]
    MissingHost(String),

    /// The request never produced a response (connection, DNS, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be decoded as JSON.
    #[error("undecodable response body: {0}")]
    Decode(String),

    /// The decoded response did not match the descriptor's schema.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

impl ApiError {
    /// Serializable error record carried on FAILURE lifecycle actions.
    pub fn detail(&self) -> ErrorDetail {
        let status = match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        };
        ErrorDetail {
            status,
            message: self.to_string(),
        }
    }
}

/// Error record carried on FAILURE lifecycle actions.
///
/// A plain data object (not a live error) so lifecycle actions stay
/// serializable and realtime frames can round-trip them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// HTTP status, when the failure came from a response.
    pub status: Option<u16>,
    /// Human-readable description.
    pub message: String,
}

/// Errors produced while flattening a response through an entity schema.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("expected a JSON object for entity table {table:?}")]
    NotAnObject { table: String },

    #[error("expected a JSON array for entity table {table:?}")]
    NotAnArray { table: String },

    #[error("record for entity table {table:?} has no usable {field:?} identifier")]
    MissingId { table: String, field: String },
}

/// Errors produced while composing the store's initial state.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// The merged initial state does not deserialize into the state type.
    #[error("merged initial state is malformed: {0}")]
    State(#[from] serde_json::Error),
}
