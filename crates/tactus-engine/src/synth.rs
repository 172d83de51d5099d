//! Push synthesizer
//!
//! Sample-accurate audio loop for hosts that demand raw PCM frames: mono
//! 16-bit output, one frame at a time, with fractional beat and slot
//! counters carrying phase across meter and tempo changes.
//!
//! CRITICAL: `fill_buffer` runs on the audio worker and must not block,
//! allocate, or log. Snapshot swaps arrive through the command ring and
//! are committed only at beat boundaries; full update rings drop events
//! instead of stalling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer};
use tactus_audio::{AudioResult, PcmSink};
use tactus_core::{AccentLevel, Sample, SamplePosition, TickEvent};

use crate::click::{accent_peak, ClickBurst, SharedVoicing};
use crate::commands::{EngineCommand, EngineUpdate};
use crate::engine::EngineState;
use crate::snapshot::EngineSnapshot;
use crate::timeline::TimelineCursor;

/// Beat whose slots are currently being played
struct ActiveBeat {
    snapshot: Arc<EngineSnapshot>,
    bar: usize,
    beat: u32,
    slots: u32,
}

/// PCM-frame synthesizer driving a [`PcmSink`]
pub struct PushSynth<S: PcmSink> {
    sink: S,
    cursor: TimelineCursor,
    voicing: Arc<SharedVoicing>,
    updates: Producer<EngineUpdate>,
    commands: Consumer<EngineCommand>,

    buffer: Vec<i16>,
    burst: ClickBurst,
    sample_rate: f64,

    samples_until_beat: f64,
    samples_until_sub: f64,
    samples_per_beat: f64,
    sub_gap: f64,
    slot_index: u32,
    active: ActiveBeat,

    position: SamplePosition,
    tick_index: u64,
    last_bar_entry: Option<(usize, SamplePosition)>,
}

impl<S: PcmSink> PushSynth<S> {
    pub fn new(
        sink: S,
        snapshot: Arc<EngineSnapshot>,
        voicing: Arc<SharedVoicing>,
        updates: Producer<EngineUpdate>,
        commands: Consumer<EngineCommand>,
    ) -> Self {
        let sample_rate = sink.sample_rate() as f64;
        let buffer = vec![0; sink.min_buffer_frames().max(1)];
        let cursor = TimelineCursor::new(Arc::clone(&snapshot));

        Self {
            sink,
            cursor,
            voicing,
            updates,
            commands,
            buffer,
            burst: ClickBurst::idle(),
            sample_rate,
            // Zero counters make the very first frame a beat boundary.
            samples_until_beat: 0.0,
            samples_until_sub: 0.0,
            samples_per_beat: 0.0,
            sub_gap: 0.0,
            slot_index: 0,
            active: ActiveBeat {
                snapshot,
                bar: 0,
                beat: 0,
                slots: 0,
            },
            position: SamplePosition::ZERO,
            tick_index: 0,
            last_bar_entry: None,
        }
    }

    /// Run until `stop` is raised or the sink fails.
    ///
    /// The sink is stopped and released on the way out either way; a sink
    /// failure is reported through the update ring before returning.
    pub fn run(&mut self, stop: &AtomicBool) -> AudioResult<()> {
        let result = self.run_loop(stop);
        if let Err(err) = &result {
            self.push_update(EngineUpdate::State {
                state: EngineState::Error,
                detail: Some(err.to_string()),
            });
        }
        let _ = self.sink.stop();
        self.sink.release();
        result
    }

    fn run_loop(&mut self, stop: &AtomicBool) -> AudioResult<()> {
        self.sink.play()?;

        while !stop.load(Ordering::Acquire) {
            self.drain_commands();
            self.fill_buffer();
            self.sink.write(&self.buffer)?;
        }

        Ok(())
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                EngineCommand::Swap { snapshot, apply_at } => {
                    self.cursor.publish(snapshot, apply_at);
                }
                EngineCommand::TestTick => {
                    let voicing = self.voicing.voicing(AccentLevel::BarStrong);
                    self.burst.start(
                        voicing.frequency,
                        accent_peak(voicing.gain),
                        self.sample_rate as u32,
                    );
                }
            }
        }
    }

    fn fill_buffer(&mut self) {
        for i in 0..self.buffer.len() {
            if self.samples_until_beat <= 0.0 {
                self.begin_beat();
            }
            if self.slot_index < self.active.slots && self.samples_until_sub <= 0.0 {
                self.begin_slot();
            }

            let sample: Sample = if self.burst.is_active() {
                self.burst.next_sample().clamp(-1.0, 1.0)
            } else {
                0.0
            };
            self.buffer[i] = (sample * i16::MAX as Sample) as i16;

            self.samples_until_beat -= 1.0;
            self.samples_until_sub -= 1.0;
            self.position.advance(1);
        }
    }

    /// Beat boundary: commit a due swap, recompute beat tables, announce
    /// bar entries, advance the cursor
    fn begin_beat(&mut self) {
        self.cursor.commit_pending();

        let snapshot = Arc::clone(self.cursor.snapshot());
        let bar_index = self.cursor.bar();
        let beat = self.cursor.beat();
        let (seconds_per_beat, slots) = {
            let bar = snapshot.bar(bar_index);
            (bar.seconds_per_beat, bar.slot_count(beat).max(1))
        };

        self.samples_per_beat = seconds_per_beat * self.sample_rate;
        self.sub_gap = self.samples_per_beat / slots as f64;
        self.slot_index = 0;
        self.samples_until_sub = 0.0;

        if beat == 0 && self.last_bar_entry != Some((bar_index, self.position)) {
            self.last_bar_entry = Some((bar_index, self.position));
            let at_ms = self.now_ms();
            self.push_update(EngineUpdate::BarChange { bar: bar_index, at_ms });
        }

        self.active = ActiveBeat {
            snapshot,
            bar: bar_index,
            beat,
            slots,
        };
        self.cursor.advance();
        self.samples_until_beat += self.samples_per_beat;
    }

    /// Slot boundary: maybe start a click burst, always emit a tick
    fn begin_slot(&mut self) {
        let slot = self.slot_index;
        let (accent, audible) = {
            let bar = self.active.snapshot.bar(self.active.bar);
            (
                bar.accent(self.active.beat, slot),
                bar.slot_audible(self.active.beat, slot),
            )
        };
        let voicing = self.voicing.voicing(accent);

        if audible {
            self.burst.start(
                voicing.frequency,
                accent_peak(voicing.gain),
                self.sample_rate as u32,
            );
        }

        let tick = TickEvent {
            index: self.tick_index,
            bar: self.active.bar,
            beat: self.active.beat,
            slot,
            slot_count: self.active.slots,
            audible,
            accent,
            gain: voicing.gain,
            at_ms: self.now_ms(),
        };
        self.tick_index += 1;
        self.push_update(EngineUpdate::Tick(tick));

        self.slot_index += 1;
        self.samples_until_sub += self.sub_gap;
    }

    #[inline]
    fn now_ms(&self) -> f64 {
        self.position.to_ms(self.sample_rate)
    }

    #[inline]
    fn push_update(&mut self, update: EngineUpdate) {
        // A full ring means the dispatcher is behind; dropping is the only
        // option that keeps the audio thread wait-free.
        let _ = self.updates.push(update);
    }
}
