//! Test utilities for remote-dispatch applications
//!
//! - [`TestHarness`]: state plus an action channel with drain-and-assert
//!   helpers, for testing handlers that emit actions.
//! - [`StubTransport`]: canned-response transport for exercising the full
//!   dispatch pipeline without a network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;

use crate::action::Action;
use crate::error::ApiError;
use crate::executor::{Transport, TransportResponse};
use crate::request::ApiRequest;

/// Generic test harness: a state fixture and an action channel.
pub struct TestHarness<S, A: Action> {
    /// The state under test.
    pub state: S,
    tx: mpsc::UnboundedSender<A>,
    rx: mpsc::UnboundedReceiver<A>,
}

impl<S, A: Action> TestHarness<S, A> {
    /// Create a harness around the given state fixture.
    pub fn new(state: S) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { state, tx, rx }
    }

    /// Clone of the action sender, for handing to handlers under test.
    pub fn sender(&self) -> mpsc::UnboundedSender<A> {
        self.tx.clone()
    }

    /// Emit an action, as a handler would.
    pub fn emit(&self, action: A) {
        let _ = self.tx.send(action);
    }

    /// Drain all emitted actions, in emission order.
    pub fn drain_emitted(&mut self) -> Vec<A> {
        let mut drained = Vec::new();
        while let Ok(action) = self.rx.try_recv() {
            drained.push(action);
        }
        drained
    }
}

#[derive(Default)]
struct StubInner {
    routes: Mutex<HashMap<String, Result<TransportResponse, ApiError>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

/// Transport answering from a canned endpoint → response table.
///
/// Clones share routes and the request record, so a test can keep a handle
/// while the executor owns the other.
#[derive(Clone, Default)]
pub struct StubTransport {
    inner: Arc<StubInner>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `endpoint` with a successful JSON body.
    pub fn on(self, endpoint: impl Into<String>, json: Value) -> Self {
        self.route(endpoint, Ok(TransportResponse::new(json)))
    }

    /// Answer `endpoint` with a full response (pagination continuations).
    pub fn on_response(self, endpoint: impl Into<String>, response: TransportResponse) -> Self {
        self.route(endpoint, Ok(response))
    }

    /// Answer `endpoint` with a status failure.
    pub fn failing(
        self,
        endpoint: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        self.route(
            endpoint,
            Err(ApiError::Status {
                status,
                message: message.into(),
            }),
        )
    }

    fn route(self, endpoint: impl Into<String>, result: Result<TransportResponse, ApiError>) -> Self {
        self.inner
            .routes
            .lock()
            .expect("stub routes poisoned")
            .insert(endpoint.into(), result);
        self
    }

    /// Every request executed so far, in arrival order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.inner
            .requests
            .lock()
            .expect("stub requests poisoned")
            .clone()
    }
}

impl Transport for StubTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<TransportResponse, ApiError> {
        self.inner
            .requests
            .lock()
            .expect("stub requests poisoned")
            .push(request.clone());
        self.inner
            .routes
            .lock()
            .expect("stub routes poisoned")
            .get(request.endpoint())
            .cloned()
            .unwrap_or_else(|| {
                Err(ApiError::Status {
                    status: 404,
                    message: format!("no stub for {}", request.endpoint()),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Lifecycle;
    use crate::schema::{EntityDef, Schema};
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Ping,
        Pong,
    }

    impl Action for TestAction {
        fn name(&self) -> &str {
            match self {
                TestAction::Ping => "Ping",
                TestAction::Pong => "Pong",
            }
        }
    }

    #[test]
    fn test_harness_drains_in_order() {
        let mut harness = TestHarness::<(), TestAction>::new(());
        harness.emit(TestAction::Ping);
        harness.emit(TestAction::Pong);
        assert_eq!(
            harness.drain_emitted(),
            vec![TestAction::Ping, TestAction::Pong]
        );
        assert!(harness.drain_emitted().is_empty());
    }

    #[tokio::test]
    async fn test_stub_transport_routes_and_records() {
        let stub = StubTransport::new().on("user/me", json!({"login": "me"}));
        let request = ApiRequest::new(
            "api",
            "user/me",
            Schema::Entity(EntityDef::keyed("session", "current")),
            Lifecycle::from_static("SESS_REQUEST", "SESS_SUCCESS", "SESS_FAILURE"),
        );

        let response = stub.execute(&request).await.unwrap();
        assert_eq!(response.json, json!({"login": "me"}));
        assert_eq!(stub.requests().len(), 1);

        let miss = ApiRequest::new(
            "api",
            "user/you",
            Schema::Entity(EntityDef::keyed("session", "current")),
            Lifecycle::from_static("SESS_REQUEST", "SESS_SUCCESS", "SESS_FAILURE"),
        );
        let err = stub.execute(&miss).await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 404, .. }));
    }
}
