//! Time signature handling
//!
//! A time signature is the pair `(beats, unit)`: `beats` per bar, with the
//! `unit` note value carrying one beat. The beat length at a given tempo is
//! `(60 / bpm) * (4 / unit)` seconds, so 4/4 at 120 BPM yields 0.5 s beats
//! and x/8 meters run twice as fast per beat.

use serde::{Deserialize, Serialize};

/// Minimum beats per bar
pub const MIN_BEATS: u8 = 1;

/// Maximum beats per bar
pub const MAX_BEATS: u8 = 64;

/// Time signature (e.g., 4/4, 11/8, 7/16)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Numerator (beats per bar)
    pub beats: u8,
    /// Denominator (note value that gets one beat, power of two in [1, 64])
    pub unit: u8,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self { beats: 4, unit: 4 }
    }
}

impl TimeSignature {
    /// Common time (4/4)
    pub const COMMON: Self = Self { beats: 4, unit: 4 };

    /// Waltz time (3/4)
    pub const WALTZ: Self = Self { beats: 3, unit: 4 };

    /// Create a signature, clamping into the legal range.
    ///
    /// `beats` is clamped to [1, 64]; `unit` is normalized to the nearest
    /// power of two in [1, 64] (ties round up).
    pub fn new(beats: u8, unit: u8) -> Self {
        Self {
            beats: beats.clamp(MIN_BEATS, MAX_BEATS),
            unit: nearest_unit(unit),
        }
    }

    /// Seconds per beat at the given tempo
    #[inline]
    pub fn seconds_per_beat(&self, bpm: f64) -> f64 {
        (60.0 / bpm) * (4.0 / self.unit as f64)
    }

    /// Is compound meter (6/8, 9/8, 12/8)
    pub fn is_compound(&self) -> bool {
        self.unit == 8 && matches!(self.beats, 6 | 9 | 12)
    }
}

impl std::fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.beats, self.unit)
    }
}

/// Round to the nearest power of two in [1, 64], ties rounding up
fn nearest_unit(unit: u8) -> u8 {
    let clamped = unit.clamp(1, 64) as u32;
    if clamped.is_power_of_two() {
        return clamped as u8;
    }
    let above = clamped.next_power_of_two().min(64);
    let below = above / 2;
    if clamped - below < above - clamped {
        below as u8
    } else {
        above as u8
    }
}
