//! Async execution middleware
//!
//! Interprets dispatched [`ApiRequest`] descriptors: the REQUEST lifecycle
//! action is queued synchronously within the current dispatch call, the
//! network operation runs on a spawned task, and the SUCCESS or FAILURE
//! lifecycle action re-enters through the completion channel once the
//! response is normalized. Per descriptor, REQUEST always precedes its own
//! SUCCESS/FAILURE; completions of different in-flight descriptors may
//! interleave in any order.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::Action;
use crate::error::{ApiError, ErrorDetail};
use crate::request::ApiRequest;
use crate::schema::{normalize, NormalizedPayload};
use crate::store::{DispatchContext, Envelope, Middleware, Payload};

/// Lifecycle event of one api request descriptor.
///
/// The descriptor rides along on every phase, so correlation fields reach
/// reducers verbatim and a FAILURE can be traced back to what was asked for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ApiEvent {
    /// The request was accepted for execution.
    Requested { request: ApiRequest },
    /// The response arrived and normalized cleanly.
    Succeeded {
        request: ApiRequest,
        payload: NormalizedPayload,
    },
    /// The request failed in transport, decoding, or normalization.
    Failed {
        request: ApiRequest,
        error: ErrorDetail,
    },
}

impl ApiEvent {
    /// The lifecycle label for this phase.
    pub fn label(&self) -> &str {
        match self {
            ApiEvent::Requested { request } => request.lifecycle().request(),
            ApiEvent::Succeeded { request, .. } => request.lifecycle().success(),
            ApiEvent::Failed { request, .. } => request.lifecycle().failure(),
        }
    }

    /// The descriptor this event belongs to.
    pub fn request(&self) -> &ApiRequest {
        match self {
            ApiEvent::Requested { request }
            | ApiEvent::Succeeded { request, .. }
            | ApiEvent::Failed { request, .. } => request,
        }
    }
}

/// Raw result of executing a descriptor against the network.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportResponse {
    /// Decoded JSON body.
    pub json: Value,
    /// Pagination continuation extracted from the response, if any.
    pub next_page_url: Option<String>,
}

impl TransportResponse {
    /// Response with a body and no continuation.
    pub fn new(json: Value) -> Self {
        Self {
            json,
            next_page_url: None,
        }
    }

    /// Attach a pagination continuation url.
    pub fn with_next_page(mut self, url: impl Into<String>) -> Self {
        self.next_page_url = Some(url.into());
        self
    }
}

/// The network edge. Production uses [`HttpTransport`](crate::http::HttpTransport);
/// tests use [`StubTransport`](crate::testing::StubTransport).
pub trait Transport: Send + Sync + 'static {
    /// Execute the described operation and decode its response.
    fn execute(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<TransportResponse, ApiError>> + Send;
}

/// Middleware interpreting [`Payload::Call`] envelopes.
///
/// Matches the descriptor variant exhaustively; plain actions pass through
/// untouched. Never panics past the dispatch boundary: every outcome of the
/// spawned work, including normalization mismatch, becomes a lifecycle
/// action.
pub struct ApiMiddleware<T> {
    transport: Arc<T>,
}

impl<T: Transport> ApiMiddleware<T> {
    /// Wrap a transport. Spawning requires a running Tokio runtime.
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }
}

impl<S, A, T> Middleware<S, A> for ApiMiddleware<T>
where
    A: Action + From<ApiEvent>,
    T: Transport,
{
    fn handle(
        &mut self,
        env: Envelope<A>,
        ctx: &mut DispatchContext<'_, S, A>,
    ) -> Option<Envelope<A>> {
        let request = match env.payload {
            Payload::Call(request) => request,
            Payload::Action(_) => return Some(env),
        };

        tracing::debug!(
            label = %request.lifecycle().request(),
            endpoint = %request.endpoint(),
            "executing api request"
        );
        ctx.dispatch_action(A::from(ApiEvent::Requested {
            request: request.clone(),
        }));

        let transport = Arc::clone(&self.transport);
        let tx = ctx.action_tx();
        tokio::spawn(async move {
            let outcome = transport.execute(&request).await;
            let event = match outcome {
                Ok(response) => match normalize(&response.json, request.schema()) {
                    Ok(mut payload) => {
                        payload.next_page_url = response.next_page_url;
                        ApiEvent::Succeeded { request, payload }
                    }
                    Err(err) => {
                        let error = ApiError::from(err).detail();
                        tracing::warn!(message = %error.message, "response failed to normalize");
                        ApiEvent::Failed { request, error }
                    }
                },
                Err(err) => {
                    let error = err.detail();
                    tracing::warn!(message = %error.message, "api request failed");
                    ApiEvent::Failed { request, error }
                }
            };
            // Receiver dropped means the store is gone; nothing to report to.
            let _ = tx.send(A::from(event));
        });

        None
    }
}
