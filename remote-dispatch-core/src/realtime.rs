//! Realtime bridge
//!
//! Inbound: a spawned task decodes push frames into the same typed actions
//! an HTTP lifecycle would produce and feeds them to the completion channel,
//! so reducers cannot tell push state from fetched state. Outbound: a
//! session-tagging layer annotates envelopes with auth metadata read from
//! state, and the bridge layer forwards broadcast-flagged actions as JSON
//! frames. The wire protocol behind the frame channel is not this module's
//! concern.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt};

use crate::action::Action;
use crate::store::{DispatchContext, Envelope, Middleware, Payload};

/// Envelope meta key carrying session/auth metadata.
pub const SESSION_META: &str = "session";

/// Actions that should be forwarded to the realtime transport.
pub trait Broadcast: Action {
    /// Whether this action leaves the client.
    fn broadcast(&self) -> bool {
        false
    }
}

/// Annotates every envelope with session metadata read from state.
///
/// Must sit before [`RealtimeMiddleware`] in the chain so frames leave the
/// client already tagged.
pub struct SessionTagMiddleware<S> {
    extract: fn(&S) -> Option<Value>,
}

impl<S> SessionTagMiddleware<S> {
    /// `extract` reads session/auth metadata from current state; `None`
    /// leaves the envelope untouched (anonymous client).
    pub fn new(extract: fn(&S) -> Option<Value>) -> Self {
        Self { extract }
    }
}

impl<S, A: Action> Middleware<S, A> for SessionTagMiddleware<S> {
    fn handle(
        &mut self,
        mut env: Envelope<A>,
        ctx: &mut DispatchContext<'_, S, A>,
    ) -> Option<Envelope<A>> {
        if let Some(meta) = (self.extract)(ctx.state()) {
            env.meta.insert(SESSION_META.into(), meta);
        }
        Some(env)
    }
}

/// Outbound half of the bridge: forwards broadcast actions as frames.
///
/// A frame is `{"action": <serialized action>, "meta": <envelope meta>}`.
/// The action passes through to the reducers unchanged either way.
pub struct RealtimeMiddleware {
    outbound: mpsc::UnboundedSender<Value>,
}

impl RealtimeMiddleware {
    pub fn new(outbound: mpsc::UnboundedSender<Value>) -> Self {
        Self { outbound }
    }
}

impl<S, A> Middleware<S, A> for RealtimeMiddleware
where
    A: Broadcast + Serialize,
{
    fn handle(
        &mut self,
        env: Envelope<A>,
        _ctx: &mut DispatchContext<'_, S, A>,
    ) -> Option<Envelope<A>> {
        if let Payload::Action(action) = &env.payload {
            if action.broadcast() {
                match serde_json::to_value(action) {
                    Ok(serialized) => {
                        let frame = json!({"action": serialized, "meta": env.meta});
                        if self.outbound.send(frame).is_err() {
                            tracing::warn!("realtime transport closed; dropping outbound frame");
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to serialize outbound action");
                    }
                }
            }
        }
        Some(env)
    }
}

/// Spawn the inbound half: decode frames from `stream` and enqueue them as
/// actions. Malformed frames are logged and skipped; the task ends when the
/// stream does.
pub fn spawn_inbound<A, St>(
    stream: St,
    action_tx: mpsc::UnboundedSender<A>,
) -> JoinHandle<()>
where
    A: Action + DeserializeOwned,
    St: Stream<Item = Value> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::pin!(stream);
        while let Some(frame) = stream.next().await {
            match serde_json::from_value::<A>(frame) {
                Ok(action) => {
                    if action_tx.send(action).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "dropping malformed realtime frame");
                }
            }
        }
    })
}
