//! Accent model
//!
//! Every scheduled click carries one of three accent levels. Each level has
//! a default gain and tone frequency; both are overridable at runtime
//! without touching the engine snapshot.

use serde::{Deserialize, Serialize};

/// Accent level of a single click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccentLevel {
    /// First tick of a bar
    BarStrong,
    /// First tick of an accent group
    GroupMedium,
    /// Everything else, including subdivision slots
    SubdivWeak,
}

impl AccentLevel {
    /// Default linear gain for this level
    #[inline]
    pub fn default_gain(self) -> f32 {
        match self {
            Self::BarStrong => 1.0,
            Self::GroupMedium => 0.7,
            Self::SubdivWeak => 0.4,
        }
    }

    /// Default tone frequency in Hz for this level
    #[inline]
    pub fn default_frequency(self) -> f32 {
        match self {
            Self::BarStrong => 1200.0,
            Self::GroupMedium => 900.0,
            Self::SubdivWeak => 700.0,
        }
    }
}

/// Tone frequency and gain of one click sound
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClickVoicing {
    /// Oscillator frequency (Hz)
    pub frequency: f32,
    /// Linear gain, clamped to [0, 1] on use
    pub gain: f32,
}

impl ClickVoicing {
    pub fn for_level(level: AccentLevel) -> Self {
        Self {
            frequency: level.default_frequency(),
            gain: level.default_gain(),
        }
    }
}

/// Voicing for all three accent levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccentVoicing {
    pub bar: ClickVoicing,
    pub group: ClickVoicing,
    pub subdiv: ClickVoicing,
}

impl Default for AccentVoicing {
    fn default() -> Self {
        Self {
            bar: ClickVoicing::for_level(AccentLevel::BarStrong),
            group: ClickVoicing::for_level(AccentLevel::GroupMedium),
            subdiv: ClickVoicing::for_level(AccentLevel::SubdivWeak),
        }
    }
}

impl AccentVoicing {
    /// Voicing for the given accent level
    #[inline]
    pub fn voicing(&self, level: AccentLevel) -> ClickVoicing {
        match level {
            AccentLevel::BarStrong => self.bar,
            AccentLevel::GroupMedium => self.group,
            AccentLevel::SubdivWeak => self.subdiv,
        }
    }
}
