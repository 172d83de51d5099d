//! tactus-core: Shared types, rhythm model, and configuration for Tactus
//!
//! This crate provides the foundational types used across all Tactus crates:
//! time signatures and bar specifications, the pure rhythm model (accent
//! derivation, partition reachability, mask handling), the configuration
//! normalizer with content fingerprinting, and tick events.

mod accent;
mod bar;
mod config;
mod meter;
mod rhythm;
mod tick;
mod time;

pub use accent::*;
pub use bar::*;
pub use config::*;
pub use meter::*;
pub use rhythm::*;
pub use tick::*;
pub use time::*;

/// Type alias for audio samples
pub type Sample = f32;

/// Standard sample rate options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u32)]
pub enum SampleRate {
    Hz44100 = 44100,
    Hz48000 = 48000,
    Hz88200 = 88200,
    Hz96000 = 96000,
    Hz176400 = 176400,
    Hz192000 = 192000,
}

impl SampleRate {
    #[inline]
    pub fn as_f64(self) -> f64 {
        self as u32 as f64
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self::Hz48000
    }
}

/// Buffer size options
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u32)]
pub enum BufferSize {
    Samples64 = 64,
    Samples128 = 128,
    Samples256 = 256,
    Samples512 = 512,
    Samples1024 = 1024,
}

impl BufferSize {
    #[inline]
    pub fn as_usize(self) -> usize {
        self as u32 as usize
    }

    /// Calculate latency in milliseconds
    #[inline]
    pub fn latency_ms(self, sample_rate: SampleRate) -> f64 {
        (self.as_usize() as f64 / sample_rate.as_f64()) * 1000.0
    }
}

impl Default for BufferSize {
    fn default() -> Self {
        Self::Samples256
    }
}
