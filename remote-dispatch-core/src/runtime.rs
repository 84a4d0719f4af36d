//! Runtime loop for dispatch-driven apps
//!
//! Owns the store and the receiving half of the completion channel. UI code
//! and guards dispatch synchronously through the runtime; spawned network
//! work and realtime/history bridges enqueue actions that the loop feeds
//! back into the store strictly in arrival order.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::action::Action;
use crate::request::ApiRequest;
use crate::store::{Envelope, MiddlewareStack, StoreWithMiddleware};

/// The store plus its completion loop.
pub struct Runtime<S, A: Action> {
    store: StoreWithMiddleware<S, A>,
    action_rx: mpsc::UnboundedReceiver<A>,
    cancel: CancellationToken,
}

impl<S, A: Action> Runtime<S, A> {
    /// Create a runtime from state, reducer, and an ordered middleware chain.
    pub fn new<R>(state: S, reducer: R, middleware: MiddlewareStack<S, A>) -> Self
    where
        R: FnMut(&mut S, A) -> bool + Send + 'static,
    {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        Self {
            store: StoreWithMiddleware::new(state, reducer, middleware, action_tx),
            action_rx,
            cancel: CancellationToken::new(),
        }
    }

    /// Dispatch an envelope synchronously.
    pub fn dispatch(&mut self, env: Envelope<A>) -> bool {
        self.store.dispatch(env)
    }

    /// Dispatch a plain action synchronously.
    pub fn dispatch_action(&mut self, action: A) -> bool {
        self.store.dispatch_action(action)
    }

    /// Dispatch an api request descriptor synchronously.
    pub fn dispatch_call(&mut self, request: ApiRequest) -> bool {
        self.store.dispatch_call(request)
    }

    /// Current state.
    pub fn state(&self) -> &S {
        self.store.state()
    }

    /// Mutable state access, for initialization and tests.
    pub fn state_mut(&mut self) -> &mut S {
        self.store.state_mut()
    }

    /// Swap the reducer while keeping existing state (administrative path).
    pub fn replace_reducer<R>(&mut self, reducer: R)
    where
        R: FnMut(&mut S, A) -> bool + Send + 'static,
    {
        self.store.replace_reducer(reducer);
    }

    /// Clone the completion channel sender, for bridges and spawned work.
    pub fn action_tx(&self) -> mpsc::UnboundedSender<A> {
        self.store.action_tx()
    }

    /// Token that stops [`run`](Self::run) when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Dispatch completions that have already arrived, without waiting.
    /// Returns how many were processed.
    pub fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(action) = self.action_rx.try_recv() {
            self.store.dispatch(Envelope::action(action));
            processed += 1;
        }
        processed
    }

    /// Dispatch completions as they arrive until the channel stays idle for
    /// `grace`. Returns how many were processed. Intended for tests and
    /// batch-style hosts.
    pub async fn run_until_idle(&mut self, grace: Duration) -> usize {
        let mut processed = 0;
        loop {
            match tokio::time::timeout(grace, self.action_rx.recv()).await {
                Ok(Some(action)) => {
                    self.store.dispatch(Envelope::action(action));
                    processed += 1;
                }
                Ok(None) | Err(_) => break,
            }
        }
        processed
    }

    /// Run the completion loop until the cancel token fires or every sender
    /// is gone.
    pub async fn run(&mut self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                action = self.action_rx.recv() => {
                    match action {
                        Some(action) => {
                            self.store.dispatch(Envelope::action(action));
                        }
                        None => break,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    struct Bump;

    impl Action for Bump {
        fn name(&self) -> &str {
            "Bump"
        }
    }

    fn reducer(state: &mut u32, _action: Bump) -> bool {
        *state += 1;
        true
    }

    #[tokio::test]
    async fn test_process_pending_drains_in_order() {
        let mut runtime = Runtime::new(0u32, reducer, MiddlewareStack::new());
        let tx = runtime.action_tx();
        tx.send(Bump).unwrap();
        tx.send(Bump).unwrap();

        assert_eq!(runtime.process_pending(), 2);
        assert_eq!(*runtime.state(), 2);
        assert_eq!(runtime.process_pending(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let mut runtime = Runtime::new(0u32, reducer, MiddlewareStack::new());
        let cancel = runtime.cancel_token();
        cancel.cancel();
        runtime.run().await;
    }

    #[tokio::test]
    async fn test_run_until_idle() {
        let mut runtime = Runtime::new(0u32, reducer, MiddlewareStack::new());
        let tx = runtime.action_tx();
        tokio::spawn(async move {
            tx.send(Bump).unwrap();
        });

        runtime.run_until_idle(Duration::from_millis(50)).await;
        assert_eq!(*runtime.state(), 1);
    }
}
