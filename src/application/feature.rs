//! Unidirectional state-machine runtime
//!
//! A [`Feature`] owns one state value. [`Feature::send`] runs the pure
//! [`Reducer`] under a lock, publishes the new state, then hands every
//! returned effect to the [`EffectHandler`] on the Tokio runtime. Actions the
//! effect streams emit are sent back into the same feature.
//!
//! Reductions for one feature never overlap. Effects run concurrently and
//! may finish in any order. Dropping the feature cancels its in-flight
//! effects and discards whatever they would still emit.

use crate::error::{MemoTrackError, Result};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Pure state transition. Must not perform I/O.
pub trait Reducer: Send + Sync + 'static {
    type State: Clone + Send + Sync + 'static;
    type Action: std::fmt::Debug + Send + 'static;
    type Effect: std::fmt::Debug + Send + 'static;

    fn reduce(&self, state: &Self::State, action: Self::Action)
        -> (Self::State, Vec<Self::Effect>);
}

/// Resolves effects into follow-up actions
pub trait EffectHandler: Send + Sync + 'static {
    type Effect: Send + 'static;
    type Action: Send + 'static;

    fn handle(&self, effect: Self::Effect) -> BoxStream<'static, Self::Action>;
}

struct Core<R: Reducer, H> {
    reducer: R,
    handler: H,
    state: Mutex<R::State>,
    publisher: watch::Sender<R::State>,
    token: CancellationToken,
    runtime: Handle,
}

impl<R, H> Core<R, H>
where
    R: Reducer,
    H: EffectHandler<Effect = R::Effect, Action = R::Action>,
{
    fn send(core: &Arc<Self>, action: R::Action) {
        if core.token.is_cancelled() {
            trace!(?action, "feature closed, dropping action");
            return;
        }

        debug!(?action, "reducing");
        let effects = {
            let mut state = core.state.lock().unwrap_or_else(PoisonError::into_inner);
            let (next, effects) = core.reducer.reduce(&state, action);
            *state = next.clone();
            // Published under the lock so subscribers see states in order
            core.publisher.send_replace(next);
            effects
        };

        for effect in effects {
            Self::spawn_effect(core, effect);
        }
    }

    fn spawn_effect(core: &Arc<Self>, effect: R::Effect) {
        trace!(?effect, "dispatching effect");
        let mut actions = core.handler.handle(effect);
        let token = core.token.clone();
        let weak: Weak<Self> = Arc::downgrade(core);

        core.runtime.spawn(async move {
            loop {
                let next = tokio::select! {
                    _ = token.cancelled() => break,
                    next = actions.next() => next,
                };
                let Some(action) = next else { break };
                let Some(core) = weak.upgrade() else { break };
                Self::send(&core, action);
            }
        });
    }
}

/// A running state machine
pub struct Feature<R: Reducer, H> {
    core: Arc<Core<R, H>>,
}

impl<R, H> Feature<R, H>
where
    R: Reducer,
    H: EffectHandler<Effect = R::Effect, Action = R::Action>,
{
    /// Create a feature whose effects run on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn new(initial: R::State, reducer: R, handler: H) -> Self {
        Self::with_runtime(initial, reducer, handler, Handle::current())
    }

    pub fn with_runtime(initial: R::State, reducer: R, handler: H, runtime: Handle) -> Self {
        let (publisher, _) = watch::channel(initial.clone());
        Feature {
            core: Arc::new(Core {
                reducer,
                handler,
                state: Mutex::new(initial),
                publisher,
                token: CancellationToken::new(),
                runtime,
            }),
        }
    }

    pub fn send(&self, action: R::Action) {
        Core::send(&self.core, action);
    }

    /// Latest published state
    pub fn state(&self) -> R::State {
        self.core.publisher.borrow().clone()
    }

    /// Observe every state the feature publishes from now on
    pub fn subscribe(&self) -> watch::Receiver<R::State> {
        self.core.publisher.subscribe()
    }

    /// Wait until the state satisfies `condition`, checking the current state first
    pub async fn wait_for<F>(&self, condition: F) -> Result<R::State>
    where
        F: FnMut(&R::State) -> bool,
    {
        let mut rx = self.subscribe();
        let state = rx
            .wait_for(condition)
            .await
            .map_err(|e| MemoTrackError::Background(e.to_string()))?;
        Ok(state.clone())
    }

    /// Cancel in-flight effects and ignore further actions
    pub fn close(&self) {
        self.core.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.core.token.is_cancelled()
    }
}

impl<R: Reducer, H> Drop for Feature<R, H> {
    fn drop(&mut self) {
        self.core.token.cancel();
    }
}
