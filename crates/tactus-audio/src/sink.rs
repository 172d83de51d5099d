//! PCM-buffer host
//!
//! The push synthesizer demands a host that accepts mono 16-bit PCM through
//! a blocking `write` call with a play/pause/flush/stop/release lifecycle.
//! [`PcmSink`] is that seam; [`CpalPcmSink`] bridges it onto a cpal output
//! stream through a lock-free SPSC ring.
//!
//! CRITICAL: the cpal callback never blocks. The blocking side of `write`
//! lives on the engine's worker thread, which parks briefly while the ring
//! is full.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate as CpalSampleRate, StreamConfig};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::{get_default_output_device, AudioConfig, AudioError, AudioResult};

/// Ring headroom: how many host buffers the sink may run ahead of playback
const RING_BUFFERS: usize = 8;

/// Park interval while the ring is full
const WRITE_PARK: Duration = Duration::from_millis(1);

/// Blocking mono 16-bit PCM output
///
/// `write` accepts frames and blocks until the host has taken them all;
/// the lifecycle mirrors what platform PCM APIs expose.
pub trait PcmSink {
    /// Output sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Smallest buffer the host wants handed over per write
    fn min_buffer_frames(&self) -> usize;

    /// Write mono frames, blocking until all are accepted.
    /// Returns the number of frames taken.
    fn write(&mut self, frames: &[i16]) -> AudioResult<usize>;

    /// Begin (or resume) playback
    fn play(&mut self) -> AudioResult<()>;

    /// Pause playback, keeping queued frames
    fn pause(&mut self) -> AudioResult<()>;

    /// Discard queued frames without stopping the device
    fn flush(&mut self);

    /// Stop playback and discard queued frames
    fn stop(&mut self) -> AudioResult<()>;

    /// Tear down the host handle; the sink is unusable afterwards
    fn release(&mut self);
}

/// cpal-backed [`PcmSink`]
///
/// The output stream drains an SPSC ring filled by `write`; mono frames are
/// fanned out to every device channel. A stream error latches the sink into
/// a failed state, surfaced by the next `write`.
pub struct CpalPcmSink {
    stream: Option<cpal::Stream>,
    producer: Producer<i16>,
    failed: Arc<AtomicBool>,
    flush_requested: Arc<AtomicBool>,
    sample_rate: u32,
    min_frames: usize,
}

impl CpalPcmSink {
    /// Open the default output device with the requested configuration
    pub fn open_default(config: AudioConfig) -> AudioResult<Self> {
        let device = get_default_output_device()?;

        let requested_rate = CpalSampleRate(config.sample_rate.as_u32());
        let supported = device
            .supported_output_configs()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?
            .find(|range| {
                range.sample_format() == SampleFormat::F32
                    && range.min_sample_rate() <= requested_rate
                    && range.max_sample_rate() >= requested_rate
            })
            .ok_or_else(|| {
                AudioError::ConfigError(format!(
                    "no f32 output config @ {}Hz",
                    config.sample_rate.as_u32()
                ))
            })?
            .with_sample_rate(requested_rate);

        let channels = supported.channels() as usize;
        let min_frames = config.buffer_size.as_usize();

        let stream_config = StreamConfig {
            channels: supported.channels(),
            sample_rate: requested_rate,
            buffer_size: cpal::BufferSize::Fixed(min_frames as u32),
        };

        let (producer, mut consumer): (Producer<i16>, Consumer<i16>) =
            RingBuffer::new(min_frames * RING_BUFFERS);

        let failed = Arc::new(AtomicBool::new(false));
        let flush_requested = Arc::new(AtomicBool::new(false));

        let failed_cb = Arc::clone(&failed);
        let flush_cb = Arc::clone(&flush_requested);

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if flush_cb.swap(false, Ordering::AcqRel) {
                        while consumer.pop().is_ok() {}
                    }

                    for frame in data.chunks_mut(channels) {
                        // Underrun renders silence; the producer side paces itself.
                        let sample = consumer.pop().unwrap_or(0) as f32 / 32768.0;
                        frame.fill(sample);
                    }
                },
                move |err| {
                    log::error!("PCM output stream error: {}", err);
                    failed_cb.store(true, Ordering::Release);
                },
                None,
            )
            .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

        log::debug!(
            "PCM sink opened: {} Hz, {} frame buffer ({:.1} ms)",
            requested_rate.0,
            min_frames,
            config.buffer_size.latency_ms(config.sample_rate)
        );

        Ok(Self {
            stream: Some(stream),
            producer,
            failed,
            flush_requested,
            sample_rate: requested_rate.0,
            min_frames,
        })
    }

    fn stream(&self) -> AudioResult<&cpal::Stream> {
        self.stream
            .as_ref()
            .ok_or_else(|| AudioError::StreamError("sink released".into()))
    }
}

impl PcmSink for CpalPcmSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn min_buffer_frames(&self) -> usize {
        self.min_frames
    }

    fn write(&mut self, frames: &[i16]) -> AudioResult<usize> {
        if self.stream.is_none() {
            return Err(AudioError::WriteFailed("sink released".into()));
        }

        let mut written = 0;
        while written < frames.len() {
            if self.failed.load(Ordering::Acquire) {
                return Err(AudioError::WriteFailed("output stream failed".into()));
            }

            if self.producer.push(frames[written]).is_ok() {
                written += 1;
            } else {
                std::thread::sleep(WRITE_PARK);
            }
        }

        Ok(written)
    }

    fn play(&mut self) -> AudioResult<()> {
        self.stream()?
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))
    }

    fn pause(&mut self) -> AudioResult<()> {
        self.stream()?
            .pause()
            .map_err(|e| AudioError::StreamError(e.to_string()))
    }

    fn flush(&mut self) {
        self.flush_requested.store(true, Ordering::Release);
    }

    fn stop(&mut self) -> AudioResult<()> {
        self.flush();
        self.pause()
    }

    fn release(&mut self) {
        self.stream = None;
    }
}
