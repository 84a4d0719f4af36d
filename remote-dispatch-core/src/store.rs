//! Centralized state store with an intercepting middleware chain
//!
//! One dispatch call runs the whole chain synchronously: every layer may
//! inspect, annotate, consume, or queue follow-up envelopes, and whatever
//! survives the chain reaches the reducer before `dispatch` returns.
//! Follow-ups queued by a layer (a REQUEST lifecycle action, for example)
//! re-enter the chain from the top within the same call, so reducers observe
//! them in dispatch order. Asynchronous completions re-enter later through
//! the action channel.

use std::collections::VecDeque;

use tokio::sync::mpsc;

use crate::action::Action;
use crate::request::{ApiRequest, Meta};

/// A reducer computes the next state from the current state and an action,
/// returning whether anything changed.
///
/// Boxed rather than a plain `fn` pointer so a reducer map can be compiled
/// into one closure and swapped at runtime via [`Store::replace_reducer`].
pub type BoxReducer<S, A> = Box<dyn FnMut(&mut S, A) -> bool + Send>;

/// What gets dispatched: either a plain action applied to state, or an api
/// request descriptor interpreted by the execution middleware.
///
/// The two cases are a discriminated union on purpose: execution middleware
/// matches `Call` exhaustively, and a descriptor can never masquerade as a
/// reducible action.
#[derive(Clone, Debug)]
pub enum Payload<A> {
    /// A synchronous action for the reducers.
    Action(A),
    /// An asynchronous api request descriptor.
    Call(ApiRequest),
}

/// Envelope carried through the middleware chain.
///
/// `meta` is transport-level annotation added by middleware (session/auth
/// tags for outbound frames); correlation fields of an api call live on the
/// descriptor itself and are echoed onto its lifecycle actions.
#[derive(Clone, Debug)]
pub struct Envelope<A> {
    pub payload: Payload<A>,
    pub meta: Meta,
}

impl<A> Envelope<A> {
    /// Wrap a plain action.
    pub fn action(action: A) -> Self {
        Self {
            payload: Payload::Action(action),
            meta: Meta::new(),
        }
    }

    /// Wrap an api request descriptor.
    pub fn call(request: ApiRequest) -> Self {
        Self {
            payload: Payload::Call(request),
            meta: Meta::new(),
        }
    }
}

/// Read-only state snapshot plus dispatch capabilities handed to middleware.
///
/// `dispatch` queues an envelope to be processed later in the same dispatch
/// call; `action_tx` is for asynchronous completions arriving after the call
/// returns.
pub struct DispatchContext<'a, S, A: Action> {
    state: &'a S,
    queue: &'a mut VecDeque<Envelope<A>>,
    action_tx: &'a mpsc::UnboundedSender<A>,
}

impl<'a, S, A: Action> DispatchContext<'a, S, A> {
    /// The state as of this dispatch call. Middleware never mutate state.
    pub fn state(&self) -> &S {
        self.state
    }

    /// Queue an envelope for synchronous processing after the current one.
    pub fn dispatch(&mut self, env: Envelope<A>) {
        self.queue.push_back(env);
    }

    /// Queue a plain action for synchronous processing.
    pub fn dispatch_action(&mut self, action: A) {
        self.dispatch(Envelope::action(action));
    }

    /// Clone the channel used for asynchronous completions.
    pub fn action_tx(&self) -> mpsc::UnboundedSender<A> {
        self.action_tx.clone()
    }
}

/// An interceptor between dispatch and the reducers.
///
/// Layers run in configuration order. Returning `None` from `handle`
/// consumes the envelope; later layers and the reducer never see it.
pub trait Middleware<S, A: Action>: Send {
    /// Inspect, annotate, transform, or consume an envelope.
    fn handle(
        &mut self,
        env: Envelope<A>,
        ctx: &mut DispatchContext<'_, S, A>,
    ) -> Option<Envelope<A>>;

    /// Called after the reducer ran for an action that survived the chain,
    /// in reverse layer order.
    fn after(&mut self, _action: &A, _state_changed: bool) {}
}

/// Ordered middleware chain.
pub struct MiddlewareStack<S, A: Action> {
    layers: Vec<Box<dyn Middleware<S, A>>>,
}

impl<S, A: Action> Default for MiddlewareStack<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A: Action> MiddlewareStack<S, A> {
    /// An empty chain.
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Append a layer. Order matters: earlier layers see envelopes first.
    pub fn push<M: Middleware<S, A> + 'static>(&mut self, layer: M) {
        self.layers.push(Box::new(layer));
    }

    /// Builder form of [`push`](Self::push).
    pub fn with<M: Middleware<S, A> + 'static>(mut self, layer: M) -> Self {
        self.push(layer);
        self
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Plain state store: state plus a replaceable reducer.
pub struct Store<S, A: Action> {
    state: S,
    reducer: BoxReducer<S, A>,
}

impl<S, A: Action> Store<S, A> {
    /// Create a store with initial state and reducer.
    pub fn new<R>(state: S, reducer: R) -> Self
    where
        R: FnMut(&mut S, A) -> bool + Send + 'static,
    {
        Self {
            state,
            reducer: Box::new(reducer),
        }
    }

    /// Apply an action through the reducer. Returns whether state changed.
    pub fn dispatch(&mut self, action: A) -> bool {
        (self.reducer)(&mut self.state, action)
    }

    /// Current state.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Mutable state access. Prefer dispatching actions; this exists for
    /// initialization and tests.
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Swap the reducer while keeping existing state.
    ///
    /// The administrative path for reloading a reducer map: the new reducer
    /// must be able to process the state the old one produced.
    pub fn replace_reducer<R>(&mut self, reducer: R)
    where
        R: FnMut(&mut S, A) -> bool + Send + 'static,
    {
        self.reducer = Box::new(reducer);
    }
}

/// Store wrapped in an ordered middleware chain.
///
/// Holds the sender half of the completion channel so middleware can hand it
/// to spawned work; the receiver half lives in the runtime loop.
pub struct StoreWithMiddleware<S, A: Action> {
    store: Store<S, A>,
    middleware: MiddlewareStack<S, A>,
    action_tx: mpsc::UnboundedSender<A>,
}

impl<S, A: Action> StoreWithMiddleware<S, A> {
    /// Create a store with middleware and a completion channel sender.
    pub fn new<R>(
        state: S,
        reducer: R,
        middleware: MiddlewareStack<S, A>,
        action_tx: mpsc::UnboundedSender<A>,
    ) -> Self
    where
        R: FnMut(&mut S, A) -> bool + Send + 'static,
    {
        Self {
            store: Store::new(state, reducer),
            middleware,
            action_tx,
        }
    }

    /// Dispatch an envelope through the chain, then the reducer.
    ///
    /// Processes synchronously queued follow-ups before returning. Returns
    /// whether any reduced action changed state.
    pub fn dispatch(&mut self, env: Envelope<A>) -> bool {
        let mut queue = VecDeque::new();
        queue.push_back(env);
        let mut changed_any = false;

        while let Some(env) = queue.pop_front() {
            let mut current = Some(env);
            for layer in self.middleware.layers.iter_mut() {
                let Some(env) = current.take() else { break };
                let mut ctx = DispatchContext {
                    state: &self.store.state,
                    queue: &mut queue,
                    action_tx: &self.action_tx,
                };
                current = layer.handle(env, &mut ctx);
            }

            match current {
                Some(Envelope {
                    payload: Payload::Action(action),
                    ..
                }) => {
                    let changed = self.store.dispatch(action.clone());
                    for layer in self.middleware.layers.iter_mut().rev() {
                        layer.after(&action, changed);
                    }
                    changed_any |= changed;
                }
                Some(Envelope {
                    payload: Payload::Call(request),
                    ..
                }) => {
                    // No execution middleware consumed the descriptor.
                    tracing::warn!(
                        endpoint = %request.endpoint(),
                        "api request reached the reducer boundary unhandled"
                    );
                }
                None => {}
            }
        }

        changed_any
    }

    /// Dispatch a plain action.
    pub fn dispatch_action(&mut self, action: A) -> bool {
        self.dispatch(Envelope::action(action))
    }

    /// Dispatch an api request descriptor.
    pub fn dispatch_call(&mut self, request: ApiRequest) -> bool {
        self.dispatch(Envelope::call(request))
    }

    /// Current state.
    pub fn state(&self) -> &S {
        self.store.state()
    }

    /// Mutable state access, for initialization and tests.
    pub fn state_mut(&mut self) -> &mut S {
        self.store.state_mut()
    }

    /// Swap the reducer while keeping existing state.
    pub fn replace_reducer<R>(&mut self, reducer: R)
    where
        R: FnMut(&mut S, A) -> bool + Send + 'static,
    {
        self.store.replace_reducer(reducer);
    }

    /// Clone the completion channel sender.
    pub fn action_tx(&self) -> mpsc::UnboundedSender<A> {
        self.action_tx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Lifecycle;
    use crate::schema::{EntityDef, Schema};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Increment,
        Decrement,
        NoOp,
    }

    impl Action for TestAction {
        fn name(&self) -> &str {
            match self {
                TestAction::Increment => "Increment",
                TestAction::Decrement => "Decrement",
                TestAction::NoOp => "NoOp",
            }
        }
    }

    #[derive(Default)]
    struct TestState {
        counter: i32,
    }

    fn test_reducer(state: &mut TestState, action: TestAction) -> bool {
        match action {
            TestAction::Increment => {
                state.counter += 1;
                true
            }
            TestAction::Decrement => {
                state.counter -= 1;
                true
            }
            TestAction::NoOp => false,
        }
    }

    fn call() -> ApiRequest {
        ApiRequest::new(
            "api",
            "things/1",
            Schema::Entity(EntityDef::new("things", "id")),
            Lifecycle::from_static("T_REQUEST", "T_SUCCESS", "T_FAILURE"),
        )
    }

    #[test]
    fn test_store_dispatch() {
        let mut store = Store::new(TestState::default(), test_reducer);
        assert!(store.dispatch(TestAction::Increment));
        assert!(store.dispatch(TestAction::Increment));
        assert_eq!(store.state().counter, 2);
        assert!(!store.dispatch(TestAction::NoOp));
    }

    #[test]
    fn test_replace_reducer_keeps_state() {
        let mut store = Store::new(TestState::default(), test_reducer);
        store.dispatch(TestAction::Increment);

        // New reducer map: increments now add ten.
        store.replace_reducer(|state: &mut TestState, action| match action {
            TestAction::Increment => {
                state.counter += 10;
                true
            }
            _ => false,
        });

        assert_eq!(store.state().counter, 1);
        store.dispatch(TestAction::Increment);
        assert_eq!(store.state().counter, 11);
    }

    /// Records the order in which layers see actions.
    struct Tracer {
        tag: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware<TestState, TestAction> for Tracer {
        fn handle(
            &mut self,
            env: Envelope<TestAction>,
            _ctx: &mut DispatchContext<'_, TestState, TestAction>,
        ) -> Option<Envelope<TestAction>> {
            if let Payload::Action(action) = &env.payload {
                self.seen
                    .lock()
                    .unwrap()
                    .push(format!("{}:{}", self.tag, action.name()));
            }
            Some(env)
        }

        fn after(&mut self, action: &TestAction, _state_changed: bool) {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:after:{}", self.tag, action.name()));
        }
    }

    /// Consumes everything.
    struct Sink;

    impl Middleware<TestState, TestAction> for Sink {
        fn handle(
            &mut self,
            _env: Envelope<TestAction>,
            _ctx: &mut DispatchContext<'_, TestState, TestAction>,
        ) -> Option<Envelope<TestAction>> {
            None
        }
    }

    /// Turns a Call into a follow-up Increment, consuming the descriptor.
    struct CallInterpreter;

    impl Middleware<TestState, TestAction> for CallInterpreter {
        fn handle(
            &mut self,
            env: Envelope<TestAction>,
            ctx: &mut DispatchContext<'_, TestState, TestAction>,
        ) -> Option<Envelope<TestAction>> {
            match env.payload {
                Payload::Call(_) => {
                    ctx.dispatch_action(TestAction::Increment);
                    None
                }
                _ => Some(env),
            }
        }
    }

    fn with_middleware(
        stack: MiddlewareStack<TestState, TestAction>,
    ) -> StoreWithMiddleware<TestState, TestAction> {
        let (tx, _rx) = mpsc::unbounded_channel();
        StoreWithMiddleware::new(TestState::default(), test_reducer, stack, tx)
    }

    #[test]
    fn test_layers_run_in_order_after_in_reverse() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let stack = MiddlewareStack::new()
            .with(Tracer {
                tag: "outer",
                seen: seen.clone(),
            })
            .with(Tracer {
                tag: "inner",
                seen: seen.clone(),
            });
        let mut store = with_middleware(stack);

        store.dispatch_action(TestAction::Increment);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "outer:Increment",
                "inner:Increment",
                "inner:after:Increment",
                "outer:after:Increment",
            ]
        );
    }

    #[test]
    fn test_consumed_envelope_never_reaches_reducer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let stack = MiddlewareStack::new().with(Sink).with(Tracer {
            tag: "inner",
            seen: seen.clone(),
        });
        let mut store = with_middleware(stack);

        assert!(!store.dispatch_action(TestAction::Increment));
        assert_eq!(store.state().counter, 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_follow_ups_processed_in_same_dispatch() {
        let stack = MiddlewareStack::new().with(CallInterpreter);
        let mut store = with_middleware(stack);

        // The Call is consumed; its follow-up Increment reaches the reducer
        // before dispatch returns.
        assert!(store.dispatch_call(call()));
        assert_eq!(store.state().counter, 1);
    }

    #[test]
    fn test_unhandled_call_is_dropped() {
        let mut store = with_middleware(MiddlewareStack::new());
        assert!(!store.dispatch_call(call()));
        assert_eq!(store.state().counter, 0);
    }
}
