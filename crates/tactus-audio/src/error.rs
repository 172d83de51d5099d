//! Audio error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio device found")]
    NoDevice,

    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    #[error("Failed to build stream: {0}")]
    StreamBuildError(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Buffer write failed: {0}")]
    WriteFailed(String),

    #[error("Timeline host error: {0}")]
    HostError(String),
}

pub type AudioResult<T> = Result<T, AudioError>;
