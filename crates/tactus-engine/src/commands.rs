//! Worker command and update queues
//!
//! Two lock-free SPSC rings connect the threads:
//! - caller → worker: [`EngineCommand`] (snapshot swaps, test ticks)
//! - worker → dispatcher: [`EngineUpdate`] (ticks, bar changes, state)
//!
//! The worker never blocks on either ring; a full update ring drops the
//! oldest-news events rather than stalling audio.

use std::sync::Arc;

use tactus_core::{ApplyAt, TickEvent};

use crate::engine::EngineState;
use crate::snapshot::EngineSnapshot;

/// Caller → worker commands
#[derive(Debug)]
pub enum EngineCommand {
    /// Swap in a new compiled snapshot at the given boundary
    Swap {
        snapshot: Arc<EngineSnapshot>,
        apply_at: ApplyAt,
    },
    /// Voice a single strong click immediately
    TestTick,
}

/// Worker → dispatcher updates
#[derive(Debug, Clone)]
pub enum EngineUpdate {
    /// One scheduled slot
    Tick(TickEvent),
    /// A bar was entered at the given audio-timeline time
    BarChange { bar: usize, at_ms: f64 },
    /// The worker changed state (errors carry a detail string)
    State {
        state: EngineState,
        detail: Option<String>,
    },
}

/// Capacity of the caller → worker command ring
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Capacity of the worker → dispatcher update ring
pub const UPDATE_QUEUE_CAPACITY: usize = 4096;
