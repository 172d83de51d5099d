//! Bar specification
//!
//! A bar carries a time signature, an optional accent grouping, a per-beat
//! subdivision vector, and a per-slot mute mask per beat. Bars are immutable
//! once handed to the engine; normalization always produces a fresh value.

use serde::{Deserialize, Serialize};

use crate::{groups_valid, pool_ticks, TimeSignature};

/// Engine cap on per-beat subdivisions
pub const MAX_SUBDIVISION: u8 = 16;

/// How an accent grouping partitions a bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMode {
    /// Group sizes sum to the beat count
    Beat,
    /// Group sizes sum to the flattened sub-tick pool (quarter meters only)
    Pool,
}

/// One bar of the timeline
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BarSpec {
    /// Time signature of this bar
    pub signature: TimeSignature,
    /// Optional accent grouping; discarded when invalid
    pub groups: Option<Vec<u8>>,
    /// Subdivision count per beat, length == signature.beats
    pub subdivisions: Vec<u8>,
    /// Per-slot audibility per beat, `masks[i].len() == subdivisions[i]`
    pub masks: Vec<Vec<bool>>,
}

impl Default for BarSpec {
    fn default() -> Self {
        Self::with_signature(TimeSignature::COMMON)
    }
}

impl BarSpec {
    /// A bar with single-slot, all-audible beats
    pub fn with_signature(signature: TimeSignature) -> Self {
        let signature = TimeSignature::new(signature.beats, signature.unit);
        let beats = signature.beats as usize;
        Self {
            signature,
            groups: None,
            subdivisions: vec![1; beats],
            masks: vec![vec![true]; beats],
        }
    }

    /// Produce the canonical form of this bar.
    ///
    /// - The signature is clamped into range.
    /// - Subdivision data is only meaningful for quarter-note meters; for any
    ///   other unit the beats collapse to single audible slots.
    /// - Subdivision counts are clamped to [1, 16]; the vectors are resized
    ///   to the beat count; missing mask slots default to audible.
    /// - A grouping that fits neither beat mode nor pool mode is dropped.
    pub fn normalized(&self) -> Self {
        let signature = TimeSignature::new(self.signature.beats, self.signature.unit);
        let beats = signature.beats as usize;

        let (subdivisions, masks) = if signature.unit == 4 {
            let mut subdivisions = self.subdivisions.clone();
            subdivisions.resize(beats, 1);
            for s in &mut subdivisions {
                *s = (*s).clamp(1, MAX_SUBDIVISION);
            }

            let mut masks: Vec<Vec<bool>> = self.masks.clone();
            masks.resize(beats, Vec::new());
            for (mask, &slots) in masks.iter_mut().zip(&subdivisions) {
                mask.resize(slots as usize, true);
            }
            (subdivisions, masks)
        } else {
            (vec![1; beats], vec![vec![true]; beats])
        };

        let mut bar = Self {
            signature,
            groups: self.groups.clone(),
            subdivisions,
            masks,
        };
        if bar.group_mode().is_none() {
            if let Some(groups) = bar.groups.take() {
                log::warn!("dropping accent grouping {:?} for bar {}", groups, signature);
            }
        }
        bar
    }

    /// Whether this bar is already in canonical form
    pub fn is_canonical(&self) -> bool {
        *self == self.normalized()
    }

    /// Classify the grouping of this bar, if present and valid
    pub fn group_mode(&self) -> Option<GroupMode> {
        let groups = self.groups.as_deref()?;
        if groups_valid(groups, self.signature.beats as usize) {
            return Some(GroupMode::Beat);
        }
        if self.signature.unit == 4 && groups_valid(groups, self.tick_count()) {
            return Some(GroupMode::Pool);
        }
        None
    }

    /// Number of accentable ticks: the sub-tick pool for quarter meters,
    /// the beat count otherwise
    pub fn tick_count(&self) -> usize {
        pool_ticks(self.signature, &self.subdivisions)
    }

    /// Slot count of the given beat (1 when out of range)
    #[inline]
    pub fn slot_count(&self, beat: usize) -> u8 {
        self.subdivisions.get(beat).copied().unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_defaults_missing_masks() {
        let bar = BarSpec {
            signature: TimeSignature::COMMON,
            groups: None,
            subdivisions: vec![1, 3, 1, 1],
            masks: vec![vec![true], vec![true, false]],
        };
        let canonical = bar.normalized();

        assert_eq!(canonical.masks.len(), 4);
        // Short mask extended with audible slots
        assert_eq!(canonical.masks[1], vec![true, false, true]);
        assert_eq!(canonical.masks[2], vec![true]);
        assert!(canonical.is_canonical());
    }

    #[test]
    fn non_quarter_units_collapse_subdivisions() {
        let bar = BarSpec {
            signature: TimeSignature::new(6, 8),
            groups: None,
            subdivisions: vec![4; 6],
            masks: vec![vec![false; 4]; 6],
        };
        let canonical = bar.normalized();

        assert_eq!(canonical.subdivisions, vec![1; 6]);
        assert_eq!(canonical.masks, vec![vec![true]; 6]);
    }

    #[test]
    fn subdivision_clamped_to_engine_cap() {
        let bar = BarSpec {
            signature: TimeSignature::COMMON,
            groups: None,
            subdivisions: vec![0, 99, 4, 4],
            masks: Vec::new(),
        };
        let canonical = bar.normalized();
        assert_eq!(canonical.subdivisions, vec![1, 16, 4, 4]);
    }

    #[test]
    fn pool_mode_groups_survive_only_for_quarter_meters() {
        // 4/4 with S = [2, 2, 2, 2]: pool of 8, groups 3+3+2 fail beat mode
        // (sum 8 != 4) but pass pool mode.
        let bar = BarSpec {
            signature: TimeSignature::COMMON,
            groups: Some(vec![3, 3, 2]),
            subdivisions: vec![2, 2, 2, 2],
            masks: vec![vec![true, true]; 4],
        };
        assert_eq!(bar.group_mode(), Some(GroupMode::Pool));
        assert!(bar.normalized().groups.is_some());

        // Same grouping on an eighth meter has no pool to match.
        let eighth = BarSpec {
            signature: TimeSignature::new(8, 8),
            groups: Some(vec![3, 3, 2]),
            subdivisions: vec![1; 8],
            masks: vec![vec![true]; 8],
        };
        assert_eq!(eighth.group_mode(), Some(GroupMode::Beat));
    }

    #[test]
    fn invalid_groups_dropped_in_normalization() {
        let bar = BarSpec {
            signature: TimeSignature::COMMON,
            groups: Some(vec![9, 9]),
            subdivisions: vec![1; 4],
            masks: vec![vec![true]; 4],
        };
        assert_eq!(bar.group_mode(), None);
        assert!(bar.normalized().groups.is_none());
    }
}
