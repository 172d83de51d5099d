//! Rhythm model
//!
//! Pure functions over meters, accent groups, and subdivision masks:
//! - Accent derivation (bar/group/weak levels per tick)
//! - Partition reachability (which group totals are expressible)
//! - Beat-guide mask handling
//! - Pool size for flattened sub-tick accenting
//!
//! Nothing here touches the audio path; all functions are side-effect-free
//! apart from a diagnostic when an invalid grouping is discarded.

use crate::{AccentLevel, TimeSignature};

/// Minimum size of a single accent group
pub const MIN_GROUP: u8 = 2;

/// Maximum size of a single accent group
pub const MAX_GROUP: u8 = 8;

/// Check a grouping against a tick count: every element in [2, 8] and the
/// sum equal to `ticks`.
pub fn groups_valid(groups: &[u8], ticks: usize) -> bool {
    !groups.is_empty()
        && groups.iter().all(|&g| (MIN_GROUP..=MAX_GROUP).contains(&g))
        && groups.iter().map(|&g| g as usize).sum::<usize>() == ticks
}

/// Derive the accent level of every tick in a bar.
///
/// Returns a vector of length `ticks_per_bar` (defaults to the signature's
/// beat count). Tick 0 is always [`AccentLevel::BarStrong`]. A valid
/// grouping marks the first tick of every subsequent group
/// [`AccentLevel::GroupMedium`]; all other ticks are
/// [`AccentLevel::SubdivWeak`].
///
/// Without groups, compound meters (6/8, 9/8, 12/8) accent every third tick.
/// An invalid grouping (bad sum or element out of range) is discarded with a
/// diagnostic and the no-groups path applies; this never panics.
pub fn derive_accents(
    signature: TimeSignature,
    groups: Option<&[u8]>,
    ticks_per_bar: Option<usize>,
) -> Vec<AccentLevel> {
    let ticks = ticks_per_bar.unwrap_or(signature.beats as usize);
    if ticks == 0 {
        return Vec::new();
    }

    let mut accents = vec![AccentLevel::SubdivWeak; ticks];
    accents[0] = AccentLevel::BarStrong;

    if let Some(groups) = groups {
        if groups_valid(groups, ticks) {
            let mut start = 0usize;
            for &g in &groups[..groups.len() - 1] {
                start += g as usize;
                accents[start % ticks] = AccentLevel::GroupMedium;
            }
            accents[0] = AccentLevel::BarStrong;
            return accents;
        }
        log::warn!(
            "discarding invalid accent grouping {:?} for {} ticks",
            groups,
            ticks
        );
    }

    // Default compound behavior: accent every third tick of 6/8, 9/8, 12/8.
    if signature.is_compound() && ticks == signature.beats as usize {
        for tick in (3..ticks).step_by(3) {
            accents[tick] = AccentLevel::GroupMedium;
        }
    }

    accents
}

/// Subset-sum reachability over group sizes.
///
/// `can_fill(total, sizes)[t]` is true when ticks `t` can be partitioned
/// into groups drawn (with repetition) from `sizes`. Index 0 is trivially
/// reachable. Runs in `O(total * sizes.len())`.
pub fn can_fill(total: usize, allowed_sizes: &[u8]) -> Vec<bool> {
    let mut reachable = vec![false; total + 1];
    reachable[0] = true;

    for t in 1..=total {
        reachable[t] = allowed_sizes
            .iter()
            .map(|&s| s as usize)
            .any(|s| s != 0 && s <= t && reachable[t - s]);
    }

    reachable
}

/// Apply the beat guide to a slot mask: when enabled, slot 0 is forced
/// audible regardless of user edits.
pub fn mask_with_beat_guide(mask: &[bool], enabled: bool) -> Vec<bool> {
    let mut mask = mask.to_vec();
    if enabled {
        if let Some(first) = mask.first_mut() {
            *first = true;
        }
    }
    mask
}

/// Number of accentable ticks in a bar: the flattened sub-tick pool for
/// quarter-note meters, the plain beat count otherwise.
pub fn pool_ticks(signature: TimeSignature, subdivisions: &[u8]) -> usize {
    if signature.unit == 4 {
        subdivisions.iter().map(|&s| s as usize).sum()
    } else {
        signature.beats as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AccentLevel::{BarStrong, GroupMedium, SubdivWeak};

    #[test]
    fn accents_length_matches_meter() {
        for beats in 1..=16u8 {
            let accents = derive_accents(TimeSignature::new(beats, 4), None, None);
            assert_eq!(accents.len(), beats as usize);
            assert_eq!(accents[0], BarStrong);
        }
    }

    #[test]
    fn accents_empty_for_zero_ticks() {
        assert!(derive_accents(TimeSignature::COMMON, None, Some(0)).is_empty());
    }

    #[test]
    fn grouped_eleven_eight() {
        // 11/8 grouped 3+3+3+2: F x x m x x m x x m x
        let accents = derive_accents(TimeSignature::new(11, 8), Some(&[3, 3, 3, 2]), None);
        let expected = [
            BarStrong, SubdivWeak, SubdivWeak, GroupMedium, SubdivWeak, SubdivWeak, GroupMedium,
            SubdivWeak, SubdivWeak, GroupMedium, SubdivWeak,
        ];
        assert_eq!(accents, expected);
    }

    #[test]
    fn group_starts_are_cumulative_sums() {
        let groups = [2u8, 3, 4];
        let ticks = 9usize;
        let accents = derive_accents(TimeSignature::new(9, 4), Some(&groups), None);

        let mut sum = 0usize;
        for &g in &groups[..groups.len() - 1] {
            sum += g as usize;
            assert_eq!(accents[sum % ticks], GroupMedium);
        }
        for (i, &a) in accents.iter().enumerate() {
            if i == 0 {
                assert_eq!(a, BarStrong);
            } else if a != GroupMedium {
                assert_eq!(a, SubdivWeak);
            }
        }
    }

    #[test]
    fn invalid_groups_fall_back() {
        // Sum mismatch
        let bad_sum = derive_accents(TimeSignature::new(7, 4), Some(&[3, 3]), None);
        assert_eq!(bad_sum, derive_accents(TimeSignature::new(7, 4), None, None));

        // Element out of range
        let bad_elem = derive_accents(TimeSignature::new(10, 4), Some(&[9, 1]), None);
        assert_eq!(bad_elem, derive_accents(TimeSignature::new(10, 4), None, None));
    }

    #[test]
    fn compound_default_accents() {
        let accents = derive_accents(TimeSignature::new(9, 8), None, None);
        assert_eq!(accents[0], BarStrong);
        assert_eq!(accents[3], GroupMedium);
        assert_eq!(accents[6], GroupMedium);
        assert_eq!(accents[1], SubdivWeak);

        // Simple meters get no default medium accents
        let plain = derive_accents(TimeSignature::new(6, 4), None, None);
        assert!(plain[1..].iter().all(|&a| a == SubdivWeak));
    }

    #[test]
    fn can_fill_reachability() {
        let table = can_fill(11, &[2, 3]);
        assert!(table[0]);
        assert!(!table[1]);
        assert!(table[2]);
        assert!(table[11]);

        let only_fours = can_fill(10, &[4]);
        assert!(only_fours[8]);
        assert!(!only_fours[10]);
    }

    #[test]
    fn beat_guide_forces_first_slot() {
        assert_eq!(
            mask_with_beat_guide(&[false, false, true], true),
            vec![true, false, true]
        );
        assert_eq!(
            mask_with_beat_guide(&[false, false], false),
            vec![false, false]
        );
        assert!(mask_with_beat_guide(&[], true).is_empty());
    }

    #[test]
    fn pool_size_depends_on_unit() {
        assert_eq!(pool_ticks(TimeSignature::new(4, 4), &[1, 3, 1, 1]), 6);
        assert_eq!(pool_ticks(TimeSignature::new(11, 8), &[1; 11]), 11);
    }
}
