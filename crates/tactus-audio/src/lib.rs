//! tactus-audio: Host audio collaborators for Tactus
//!
//! The engine speaks to exactly two kinds of audio host:
//!
//! ```text
//! ┌──────────────┐   write(&[i16])   ┌─────────────┐     ┌─────────────┐
//! │ Push worker  │──────────────────▶│  PcmSink    │────▶│ cpal Device │
//! └──────────────┘                   └─────────────┘     └─────────────┘
//!
//! ┌──────────────┐  schedule voices  ┌──────────────┐
//! │ Pull         │──────────────────▶│ TimelineHost │  (callback-based
//! │ scheduler    │◀──current_time────│              │   audio timeline)
//! └──────────────┘                   └──────────────┘
//! ```
//!
//! This crate provides the trait seams for both, the cpal-backed PCM sink,
//! device selection, and real-time thread priority elevation.

mod device;
mod error;
mod sink;
pub mod thread_priority;
mod timeline;

pub use device::*;
pub use error::*;
pub use sink::*;
pub use thread_priority::{set_realtime_priority, PriorityResult};
pub use timeline::*;

use tactus_core::{BufferSize, SampleRate};

/// Output configuration for the PCM path
#[derive(Debug, Clone, Copy)]
pub struct AudioConfig {
    pub sample_rate: SampleRate,
    pub buffer_size: BufferSize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: SampleRate::Hz48000,
            buffer_size: BufferSize::Samples256,
        }
    }
}
