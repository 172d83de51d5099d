//! Engine error types

use tactus_audio::AudioError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Audio subsystem unavailable: {0}")]
    AudioUnavailable(#[from] AudioError),

    #[error("Audio worker failed to start: {0}")]
    WorkerStart(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
