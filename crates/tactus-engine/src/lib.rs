//! tactus-engine: Sample-accurate polymetric metronome engine
//!
//! Renders a continuous stream of short percussive clicks from a timeline
//! of bars (meter, accent grouping, per-beat subdivisions, per-slot mute
//! masks), scheduled on the audio sample grid rather than a wall-clock
//! timer. In parallel it emits tick events the presentation layer uses to
//! animate a playhead.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         ENGINE ARCHITECTURE                      │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  Caller thread                    Worker thread                  │
//! │  ┌────────────────┐              ┌─────────────────────────┐     │
//! │  │ Engine facade  │──commands───▶│ PushSynth (PCM frames)  │     │
//! │  │ RhythmAdapter  │   (rtrb)     │   or                    │     │
//! │  │ update()       │              │ PullScheduler (timeline │     │
//! │  └────────────────┘              │ host, lookahead loop)   │     │
//! │          ▲                       └───────────┬─────────────┘     │
//! │          │ callbacks                         │ updates (rtrb)    │
//! │  ┌───────┴────────┐              ┌───────────▼─────────────┐     │
//! │  │ Subscriptions  │◀─────────────│ Dispatcher thread       │     │
//! │  │ tick/state/bar │              │ drains ring, fans out   │     │
//! │  └────────────────┘              └─────────────────────────┘     │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both scheduling paths drive the same [`TimelineCursor`] and read the
//! same compiled [`EngineSnapshot`], so live parameter changes honor one
//! apply-boundary contract: `Now` means the next beat scheduling decision,
//! `NextBar` the next downbeat.

mod adapter;
mod click;
mod commands;
mod engine;
mod error;
mod events;
mod scheduler;
mod snapshot;
mod synth;
mod timeline;

pub use adapter::RhythmAdapter;
pub use click::{
    accent_peak, ClickBurst, SharedVoicing, BASE_PEAK, BURST_SECONDS, VOICE_ATTACK, VOICE_DECAY,
    VOICE_LIFE,
};
pub use commands::{EngineCommand, EngineUpdate, COMMAND_QUEUE_CAPACITY, UPDATE_QUEUE_CAPACITY};
pub use engine::{Engine, EngineState};
pub use error::{EngineError, EngineResult};
pub use events::{Subscription, Subscriptions};
pub use scheduler::{PullScheduler, SchedulerParams};
pub use snapshot::{CompiledBar, EngineSnapshot};
pub use synth::PushSynth;
pub use timeline::TimelineCursor;
