//! Rhythm adapter
//!
//! Reactive callers rebuild their bar arrays on every render, so array
//! identity churns even when content is stable. The adapter sits at that
//! boundary: it deep-clones the borrowed data, fingerprints the candidate
//! configuration, and republishes to the engine only when the content
//! actually changed. A tempo-only edit is detected separately so it can
//! land immediately without clobbering an in-flight bar swap.

use tactus_core::{ApplyAt, BarSpec, ConfigUpdate, EngineConfig};

use crate::engine::Engine;

/// Content-keyed republisher between reactive state and the engine
#[derive(Debug, Default)]
pub struct RhythmAdapter {
    fingerprint: Option<u64>,
    structure: Option<u64>,
}

impl RhythmAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stabilize one render's worth of caller state.
    ///
    /// Returns true when the engine was republished. Identity churn with
    /// unchanged content is a no-op; the engine owns the cloned data
    /// outright, so later caller mutation cannot race the audio thread.
    pub fn sync(
        &mut self,
        engine: &mut Engine,
        bpm: u32,
        bars: &[BarSpec],
        beat_guide: bool,
        looped: bool,
    ) -> bool {
        let candidate = EngineConfig {
            bpm,
            bars: bars.to_vec(),
            start_bar: engine.config().start_bar,
            looped,
            beat_guide,
            apply_at: ApplyAt::NextBar,
        }
        .normalized();

        let fingerprint = candidate.fingerprint();
        if self.fingerprint == Some(fingerprint) {
            return false;
        }

        let structure = candidate.structure_fingerprint();
        let apply_at = if self.structure == Some(structure) {
            // Nothing but the tempo moved: take effect at the next beat.
            ApplyAt::Now
        } else {
            ApplyAt::NextBar
        };

        self.fingerprint = Some(fingerprint);
        self.structure = Some(structure);

        engine.update(ConfigUpdate {
            bpm: Some(candidate.bpm),
            bars: Some(candidate.bars),
            start_bar: None,
            looped: Some(candidate.looped),
            beat_guide: Some(candidate.beat_guide),
            apply_at: Some(apply_at),
        });
        true
    }
}
