//! Compiled engine snapshots
//!
//! The workers never look at raw configuration. A snapshot compiles each
//! bar once per published update: beat length, the accent vector (beat- or
//! pool-indexed), and the effective masks with the beat guide applied. The
//! hot paths then only do table lookups.

use std::sync::Arc;

use tactus_core::{
    derive_accents, mask_with_beat_guide, AccentLevel, BarSpec, EngineConfig, GroupMode,
};

/// One bar, compiled for scheduling
#[derive(Debug, Clone)]
pub struct CompiledBar {
    /// Canonical source spec
    pub spec: BarSpec,
    /// Beat length in seconds at the snapshot's tempo
    pub seconds_per_beat: f64,
    /// Accent per beat (beat mode) or per flattened sub-tick (pool mode)
    accents: Vec<AccentLevel>,
    /// Whether `accents` is indexed by cumulative sub-tick
    pool_mode: bool,
    /// Cumulative slot offset of each beat, for pool indexing
    slot_offsets: Vec<u32>,
    /// Effective masks, beat guide applied
    masks: Vec<Vec<bool>>,
}

impl CompiledBar {
    fn compile(spec: &BarSpec, bpm: u32, beat_guide: bool) -> Self {
        let signature = spec.signature;
        let (accents, pool_mode) = match spec.group_mode() {
            Some(GroupMode::Pool) => (
                derive_accents(signature, spec.groups.as_deref(), Some(spec.tick_count())),
                true,
            ),
            Some(GroupMode::Beat) => (
                derive_accents(signature, spec.groups.as_deref(), None),
                false,
            ),
            None => (derive_accents(signature, None, None), false),
        };

        let masks = spec
            .masks
            .iter()
            .map(|mask| mask_with_beat_guide(mask, beat_guide))
            .collect();

        let mut slot_offsets = Vec::with_capacity(spec.subdivisions.len());
        let mut offset = 0u32;
        for &slots in &spec.subdivisions {
            slot_offsets.push(offset);
            offset += slots as u32;
        }

        Self {
            spec: spec.clone(),
            seconds_per_beat: signature.seconds_per_beat(bpm as f64),
            accents,
            pool_mode,
            slot_offsets,
            masks,
        }
    }

    /// Beats in this bar
    #[inline]
    pub fn beats(&self) -> u32 {
        self.spec.signature.beats as u32
    }

    /// Slot count of the given beat
    #[inline]
    pub fn slot_count(&self, beat: u32) -> u32 {
        self.spec.slot_count(beat as usize) as u32
    }

    /// Whether the slot sounds, beat guide already applied
    #[inline]
    pub fn slot_audible(&self, beat: u32, slot: u32) -> bool {
        self.masks
            .get(beat as usize)
            .and_then(|mask| mask.get(slot as usize))
            .copied()
            .unwrap_or(false)
    }

    /// Accent of a slot.
    ///
    /// Beat mode: slot 0 carries the beat's bar-position accent, later
    /// slots are weak. Pool mode: the accent vector is indexed by the
    /// cumulative sub-tick, so any slot may open a group.
    #[inline]
    pub fn accent(&self, beat: u32, slot: u32) -> AccentLevel {
        if self.pool_mode {
            let index = self
                .slot_offsets
                .get(beat as usize)
                .map(|&offset| (offset + slot) as usize)
                .unwrap_or(0);
            self.accents
                .get(index)
                .copied()
                .unwrap_or(AccentLevel::SubdivWeak)
        } else if slot == 0 {
            self.accents
                .get(beat as usize)
                .copied()
                .unwrap_or(AccentLevel::SubdivWeak)
        } else {
            AccentLevel::SubdivWeak
        }
    }
}

/// A full configuration compiled for the workers
#[derive(Debug)]
pub struct EngineSnapshot {
    /// Canonical configuration this snapshot was compiled from
    pub config: EngineConfig,
    /// Content fingerprint of `config`
    pub fingerprint: u64,
    bars: Vec<CompiledBar>,
}

impl EngineSnapshot {
    /// Compile a canonical configuration
    pub fn compile(config: EngineConfig) -> Arc<Self> {
        let config = config.normalized();
        let fingerprint = config.fingerprint();
        let bars = config
            .bars
            .iter()
            .map(|bar| CompiledBar::compile(bar, config.bpm, config.beat_guide))
            .collect();

        Arc::new(Self {
            config,
            fingerprint,
            bars,
        })
    }

    /// Number of bars in the timeline
    #[inline]
    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    /// Compiled bar at `index`, clamped into range
    #[inline]
    pub fn bar(&self, index: usize) -> &CompiledBar {
        &self.bars[index.min(self.bars.len() - 1)]
    }

    /// The bar following `index`: wrap to 0 when looping, hold the last
    /// bar otherwise
    #[inline]
    pub fn next_bar_index(&self, index: usize) -> usize {
        if index + 1 < self.bars.len() {
            index + 1
        } else if self.config.looped {
            0
        } else {
            self.bars.len() - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactus_core::{AccentLevel, TimeSignature};

    #[test]
    fn beat_mode_accents_route_by_beat() {
        let config = EngineConfig {
            bars: vec![BarSpec {
                signature: TimeSignature::new(11, 8),
                groups: Some(vec![3, 3, 3, 2]),
                subdivisions: vec![1; 11],
                masks: vec![vec![true]; 11],
            }],
            bpm: 180,
            ..EngineConfig::default()
        };
        let snapshot = EngineSnapshot::compile(config);
        let bar = snapshot.bar(0);

        assert_eq!(bar.accent(0, 0), AccentLevel::BarStrong);
        assert_eq!(bar.accent(3, 0), AccentLevel::GroupMedium);
        assert_eq!(bar.accent(4, 0), AccentLevel::SubdivWeak);
        // (60/180) * (4/8)
        assert!((bar.seconds_per_beat - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn pool_mode_accents_route_by_subtick() {
        // 4/4, S = [2, 2, 2, 2], pool of 8 grouped 3+3+2: group starts at
        // sub-ticks 0, 3, 6, landing on beat 1 slot 1 and beat 3 slot 0.
        let config = EngineConfig {
            bars: vec![BarSpec {
                signature: TimeSignature::COMMON,
                groups: Some(vec![3, 3, 2]),
                subdivisions: vec![2, 2, 2, 2],
                masks: vec![vec![true, true]; 4],
            }],
            ..EngineConfig::default()
        };
        let snapshot = EngineSnapshot::compile(config);
        let bar = snapshot.bar(0);

        assert_eq!(bar.accent(0, 0), AccentLevel::BarStrong);
        assert_eq!(bar.accent(1, 1), AccentLevel::GroupMedium);
        assert_eq!(bar.accent(3, 0), AccentLevel::GroupMedium);
        assert_eq!(bar.accent(0, 1), AccentLevel::SubdivWeak);
        assert_eq!(bar.accent(2, 0), AccentLevel::SubdivWeak);
    }

    #[test]
    fn beat_guide_applied_to_masks() {
        let config = EngineConfig {
            bars: vec![BarSpec {
                signature: TimeSignature::COMMON,
                groups: None,
                subdivisions: vec![3, 1, 1, 1],
                masks: vec![vec![false, false, false], vec![true], vec![true], vec![true]],
            }],
            beat_guide: true,
            ..EngineConfig::default()
        };
        let snapshot = EngineSnapshot::compile(config);
        let bar = snapshot.bar(0);

        assert!(bar.slot_audible(0, 0));
        assert!(!bar.slot_audible(0, 1));
        assert!(!bar.slot_audible(0, 2));
    }

    #[test]
    fn next_bar_wraps_only_when_looping() {
        let two_bars = |looped| {
            EngineSnapshot::compile(EngineConfig {
                bars: vec![
                    BarSpec::with_signature(TimeSignature::COMMON),
                    BarSpec::with_signature(TimeSignature::WALTZ),
                ],
                looped,
                ..EngineConfig::default()
            })
        };

        let looped = two_bars(true);
        assert_eq!(looped.next_bar_index(0), 1);
        assert_eq!(looped.next_bar_index(1), 0);

        let held = two_bars(false);
        assert_eq!(held.next_bar_index(1), 1);
    }

    #[test]
    fn identical_configs_compile_identical_fingerprints() {
        let config = EngineConfig::default();
        let a = EngineSnapshot::compile(config.clone());
        let b = EngineSnapshot::compile(config);
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(a.config, b.config);
    }
}
