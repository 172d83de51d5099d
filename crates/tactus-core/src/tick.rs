//! Tick events
//!
//! Every scheduled slot, audible or not, produces one tick event. The
//! presentation layer consumes these to animate a playhead; timestamps come
//! from the audio timeline, never from a wall clock.

use serde::{Deserialize, Serialize};

use crate::AccentLevel;

/// One scheduled slot on the audio timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickEvent {
    /// Absolute tick index, strictly monotonic from start
    pub index: u64,
    /// Bar index in the configured timeline
    pub bar: usize,
    /// Beat within the bar
    pub beat: u32,
    /// Subdivision slot within the beat
    pub slot: u32,
    /// Slot count of the current beat
    pub slot_count: u32,
    /// Whether this slot produces sound (mask- and beat-guide-derived)
    pub audible: bool,
    /// Accent level of this slot
    pub accent: AccentLevel,
    /// Effective linear gain of this slot's click
    pub gain: f32,
    /// Audio-timeline timestamp in milliseconds
    pub at_ms: f64,
}

impl TickEvent {
    /// Whether this tick opens a bar
    #[inline]
    pub fn is_downbeat(&self) -> bool {
        self.beat == 0 && self.slot == 0
    }
}
