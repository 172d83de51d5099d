//! Click synthesis
//!
//! Both scheduling paths voice the same short percussive click, just through
//! different machinery:
//! - The push path synthesizes a sine burst sample-by-sample with a squared
//!   linear-decay envelope.
//! - The pull path pre-schedules host voices shaped by a linear
//!   attack/decay gain envelope.
//!
//! Accent voicing overrides live here too: a small atomic record read by
//! the workers on every click, written by callers at any time.

use std::sync::atomic::{AtomicU32, Ordering};

use tactus_core::{AccentLevel, AccentVoicing, ClickVoicing, Sample};

/// Push-path burst length in seconds
pub const BURST_SECONDS: f32 = 0.010;

/// Pull-path envelope: linear attack in seconds
pub const VOICE_ATTACK: f64 = 0.002;

/// Pull-path envelope: linear decay in seconds
pub const VOICE_DECAY: f64 = 0.016;

/// Pull-path voice lifetime in seconds
pub const VOICE_LIFE: f64 = 0.030;

/// Peak amplitude of an unaccented full-gain click
pub const BASE_PEAK: f32 = 0.85;

/// Effective peak for an accent gain, clamped to [0, 1]
#[inline]
pub fn accent_peak(gain: f32) -> f32 {
    (BASE_PEAK * gain).clamp(0.0, 1.0)
}

/// One in-flight click burst (push path)
///
/// State is tiny and lives on the audio thread: remaining samples, phase,
/// and peak. Starting a new burst retriggers from sample zero.
#[derive(Debug, Clone, Copy)]
pub struct ClickBurst {
    remaining: u32,
    total: u32,
    phase: f32,
    phase_inc: f32,
    peak: f32,
}

impl ClickBurst {
    pub fn idle() -> Self {
        Self {
            remaining: 0,
            total: 0,
            phase: 0.0,
            phase_inc: 0.0,
            peak: 0.0,
        }
    }

    /// Begin a 10 ms burst (at least one sample) at the given frequency
    pub fn start(&mut self, frequency: f32, peak: f32, sample_rate: u32) {
        let total = ((BURST_SECONDS * sample_rate as f32) as u32).max(1);
        self.remaining = total;
        self.total = total;
        self.phase = 0.0;
        self.phase_inc = std::f32::consts::TAU * frequency / sample_rate as f32;
        self.peak = peak;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    /// Render one sample: `sin(phase) * peak * env²`, `env` the linear
    /// decay ratio remaining/total
    #[inline]
    pub fn next_sample(&mut self) -> Sample {
        if self.remaining == 0 {
            return 0.0;
        }

        let env = self.remaining as f32 / self.total as f32;
        let sample = self.phase.sin() * self.peak * env * env;

        self.phase += self.phase_inc;
        if self.phase >= std::f32::consts::TAU {
            self.phase -= std::f32::consts::TAU;
        }
        self.remaining -= 1;

        sample
    }
}

/// Lock-free accent voicing shared between callers and workers
///
/// Frequencies and gains are stored as f32 bits in atomics, so overrides
/// take effect immediately without touching the engine snapshot.
#[derive(Debug)]
pub struct SharedVoicing {
    bar_freq: AtomicU32,
    bar_gain: AtomicU32,
    group_freq: AtomicU32,
    group_gain: AtomicU32,
    subdiv_freq: AtomicU32,
    subdiv_gain: AtomicU32,
}

impl Default for SharedVoicing {
    fn default() -> Self {
        Self::new(AccentVoicing::default())
    }
}

impl SharedVoicing {
    pub fn new(voicing: AccentVoicing) -> Self {
        Self {
            bar_freq: AtomicU32::new(voicing.bar.frequency.to_bits()),
            bar_gain: AtomicU32::new(voicing.bar.gain.to_bits()),
            group_freq: AtomicU32::new(voicing.group.frequency.to_bits()),
            group_gain: AtomicU32::new(voicing.group.gain.to_bits()),
            subdiv_freq: AtomicU32::new(voicing.subdiv.frequency.to_bits()),
            subdiv_gain: AtomicU32::new(voicing.subdiv.gain.to_bits()),
        }
    }

    /// Replace all three voicings
    pub fn store(&self, voicing: AccentVoicing) {
        self.bar_freq
            .store(voicing.bar.frequency.to_bits(), Ordering::Relaxed);
        self.bar_gain
            .store(voicing.bar.gain.to_bits(), Ordering::Relaxed);
        self.group_freq
            .store(voicing.group.frequency.to_bits(), Ordering::Relaxed);
        self.group_gain
            .store(voicing.group.gain.to_bits(), Ordering::Relaxed);
        self.subdiv_freq
            .store(voicing.subdiv.frequency.to_bits(), Ordering::Relaxed);
        self.subdiv_gain
            .store(voicing.subdiv.gain.to_bits(), Ordering::Relaxed);
    }

    /// Override the gain of one accent level, keeping its tone frequency
    pub fn set_gain(&self, level: AccentLevel, gain: f32) {
        let slot = match level {
            AccentLevel::BarStrong => &self.bar_gain,
            AccentLevel::GroupMedium => &self.group_gain,
            AccentLevel::SubdivWeak => &self.subdiv_gain,
        };
        slot.store(gain.to_bits(), Ordering::Relaxed);
    }

    /// Current voicing for an accent level
    pub fn voicing(&self, level: AccentLevel) -> ClickVoicing {
        let (freq, gain) = match level {
            AccentLevel::BarStrong => (&self.bar_freq, &self.bar_gain),
            AccentLevel::GroupMedium => (&self.group_freq, &self.group_gain),
            AccentLevel::SubdivWeak => (&self.subdiv_freq, &self.subdiv_gain),
        };
        ClickVoicing {
            frequency: f32::from_bits(freq.load(Ordering::Relaxed)),
            gain: f32::from_bits(gain.load(Ordering::Relaxed)).clamp(0.0, 1.0),
        }
    }
}
