//! Listener subscriptions
//!
//! Three outbound channels: ticks, state changes, bar changes. Each
//! registration returns a [`Subscription`] handle that unregisters the
//! listener. Listeners are invoked from the engine's dispatcher thread,
//! never from the audio worker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tactus_core::TickEvent;

use crate::engine::EngineState;

type TickFn = Box<dyn Fn(&TickEvent) + Send + Sync>;
type StateFn = Box<dyn Fn(EngineState, Option<&str>) + Send + Sync>;
type BarFn = Box<dyn Fn(usize) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
enum Channel {
    Tick,
    State,
    Bar,
}

struct Registry {
    next_id: AtomicU64,
    tick: RwLock<Vec<(u64, TickFn)>>,
    state: RwLock<Vec<(u64, StateFn)>>,
    bar: RwLock<Vec<(u64, BarFn)>>,
}

/// Listener registry shared between the facade and its dispatcher
#[derive(Clone)]
pub struct Subscriptions {
    inner: Arc<Registry>,
}

impl Default for Subscriptions {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscriptions {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Registry {
                next_id: AtomicU64::new(1),
                tick: RwLock::new(Vec::new()),
                state: RwLock::new(Vec::new()),
                bar: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Register a tick listener
    pub fn on_tick(&self, listener: impl Fn(&TickEvent) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id();
        self.inner.tick.write().push((id, Box::new(listener)));
        self.handle(Channel::Tick, id)
    }

    /// Register a state listener
    pub fn on_state(
        &self,
        listener: impl Fn(EngineState, Option<&str>) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id();
        self.inner.state.write().push((id, Box::new(listener)));
        self.handle(Channel::State, id)
    }

    /// Register a bar-change listener
    pub fn on_bar_change(&self, listener: impl Fn(usize) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id();
        self.inner.bar.write().push((id, Box::new(listener)));
        self.handle(Channel::Bar, id)
    }

    pub(crate) fn emit_tick(&self, event: &TickEvent) {
        for (_, listener) in self.inner.tick.read().iter() {
            listener(event);
        }
    }

    pub(crate) fn emit_state(&self, state: EngineState, detail: Option<&str>) {
        for (_, listener) in self.inner.state.read().iter() {
            listener(state, detail);
        }
    }

    pub(crate) fn emit_bar(&self, bar: usize) {
        for (_, listener) in self.inner.bar.read().iter() {
            listener(bar);
        }
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn handle(&self, channel: Channel, id: u64) -> Subscription {
        Subscription {
            channel,
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }
}

/// Unregister handle returned by the `on_*` registrations
pub struct Subscription {
    channel: Channel,
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Remove the listener. A handle outliving its engine is a no-op.
    pub fn unsubscribe(self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        match self.channel {
            Channel::Tick => registry.tick.write().retain(|(id, _)| *id != self.id),
            Channel::State => registry.state.write().retain(|(id, _)| *id != self.id),
            Channel::Bar => registry.bar.write().retain(|(id, _)| *id != self.id),
        }
    }
}
