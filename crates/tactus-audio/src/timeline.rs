//! Callback-timeline host
//!
//! The pull scheduler targets hosts that expose a sample-accurate audio
//! timeline: individual click voices are enqueued ahead of time at absolute
//! timestamps, and the host renders them when their moment arrives. The
//! trait set mirrors the oscillator/gain node surface such hosts provide.

use crate::AudioResult;

/// A sample-accurate audio timeline accepting pre-scheduled voices
pub trait TimelineHost {
    type Osc: OscillatorNode;
    type Gain: GainNode;

    /// Current time of the audio timeline, in seconds
    fn current_time(&self) -> f64;

    /// Create an oscillator voice
    fn create_oscillator(&mut self) -> AudioResult<Self::Osc>;

    /// Create a gain node shaping one voice's envelope
    fn create_gain(&mut self) -> AudioResult<Self::Gain>;

    /// Wire `osc -> gain -> destination`
    fn connect(&mut self, osc: &Self::Osc, gain: &Self::Gain) -> AudioResult<()>;

    /// Drop every scheduled-but-unplayed voice promptly.
    ///
    /// Voices already sounding are left to end naturally.
    fn cancel_scheduled(&mut self);
}

/// One oscillator voice on the host timeline
pub trait OscillatorNode {
    /// Set the oscillator frequency effective at timeline time `at`
    fn set_frequency_at(&mut self, frequency: f64, at: f64);

    /// Begin sounding at timeline time `at`
    fn start(&mut self, at: f64);

    /// Stop and free the voice at timeline time `at`
    fn stop(&mut self, at: f64);
}

/// Gain automation for one voice
pub trait GainNode {
    /// Step the gain to `gain` at timeline time `at`
    fn set_gain_at(&mut self, gain: f64, at: f64);

    /// Ramp linearly to `gain`, arriving at timeline time `at`
    fn ramp_gain_to(&mut self, gain: f64, at: f64);
}
