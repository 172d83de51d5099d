//! Engine configuration and normalization
//!
//! Callers hand the engine partial updates; the normalizer turns them into a
//! complete canonical [`EngineConfig`] with every field clamped into range.
//! A content fingerprint over the materially-observable fields lets the
//! engine skip updates that are logically identical to the active snapshot.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::BarSpec;

/// Minimum tempo
pub const MIN_BPM: u32 = 30;

/// Maximum tempo
pub const MAX_BPM: u32 = 300;

/// When a published configuration takes effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyAt {
    /// At the next beat scheduling decision
    Now,
    /// At the next downbeat
    #[default]
    NextBar,
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tempo in BPM, [30, 300]
    pub bpm: u32,
    /// Ordered bar timeline, never empty after normalization
    pub bars: Vec<BarSpec>,
    /// Bar to start playback from
    pub start_bar: usize,
    /// Wrap to bar 0 after the last bar (hold the last bar otherwise)
    pub looped: bool,
    /// Force the first slot of every beat audible
    pub beat_guide: bool,
    /// Boundary at which published updates take effect
    pub apply_at: ApplyAt,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bpm: 120,
            bars: vec![BarSpec::default()],
            start_bar: 0,
            looped: true,
            beat_guide: false,
            apply_at: ApplyAt::default(),
        }
    }
}

impl EngineConfig {
    /// Produce the canonical form of this configuration.
    ///
    /// Idempotent: `c.normalized().normalized() == c.normalized()`.
    pub fn normalized(&self) -> Self {
        let bpm = self.bpm.clamp(MIN_BPM, MAX_BPM);

        let mut bars: Vec<BarSpec> = self.bars.iter().map(BarSpec::normalized).collect();
        if bars.is_empty() {
            bars.push(BarSpec::default());
        }

        Self {
            bpm,
            start_bar: self.start_bar.min(bars.len() - 1),
            bars,
            looped: self.looped,
            beat_guide: self.beat_guide,
            apply_at: self.apply_at,
        }
    }

    /// Merge a partial update onto this configuration and normalize
    pub fn with_update(&self, update: ConfigUpdate) -> Self {
        let mut merged = self.clone();
        if let Some(bpm) = update.bpm {
            merged.bpm = bpm;
        }
        if let Some(bars) = update.bars {
            merged.bars = bars;
        }
        if let Some(start_bar) = update.start_bar {
            merged.start_bar = start_bar;
        }
        if let Some(looped) = update.looped {
            merged.looped = looped;
        }
        if let Some(beat_guide) = update.beat_guide {
            merged.beat_guide = beat_guide;
        }
        if let Some(apply_at) = update.apply_at {
            merged.apply_at = apply_at;
        }
        merged.normalized()
    }

    /// Content fingerprint over the materially-observable fields: tempo,
    /// per-bar signature/groups/subdivisions/masks, beat guide, loop.
    ///
    /// The start bar and apply boundary are deliberately excluded; they
    /// change where playback begins or when a swap lands, not what the
    /// timeline sounds like.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.bpm.hash(&mut hasher);
        self.bars.hash(&mut hasher);
        self.beat_guide.hash(&mut hasher);
        self.looped.hash(&mut hasher);
        hasher.finish()
    }

    /// Fingerprint of everything except the tempo.
    ///
    /// Lets callers distinguish a tempo-only edit from a structural one, so
    /// an in-flight bar swap is not clobbered by an unrelated BPM change.
    pub fn structure_fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.bars.hash(&mut hasher);
        self.beat_guide.hash(&mut hasher);
        self.looped.hash(&mut hasher);
        hasher.finish()
    }
}

/// Partial configuration update; unset fields keep their current values
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub bpm: Option<u32>,
    pub bars: Option<Vec<BarSpec>>,
    pub start_bar: Option<usize>,
    pub looped: Option<bool>,
    pub beat_guide: Option<bool>,
    pub apply_at: Option<ApplyAt>,
}

impl ConfigUpdate {
    /// Update carrying only a tempo change
    pub fn bpm(bpm: u32) -> Self {
        Self {
            bpm: Some(bpm),
            ..Self::default()
        }
    }

    /// Update carrying only a new bar timeline
    pub fn bars(bars: Vec<BarSpec>) -> Self {
        Self {
            bars: Some(bars),
            ..Self::default()
        }
    }
}
