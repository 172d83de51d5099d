//! Pull scheduler
//!
//! Targets hosts with a callback-based audio timeline: every wake it looks
//! a window ahead and enqueues one oscillator voice per audible slot at
//! absolute timestamps, so playback stays sample-accurate even though the
//! scheduler itself only wakes every few milliseconds.
//!
//! ```text
//! wake ──▶ drain commands ──▶ while next_beat < now + SCHEDULE_AHEAD:
//!              │                   commit pending swap (boundary-aware)
//!              │                   schedule slots of one beat
//!              │                   advance cursor, step next_beat
//!              └──▶ flush bar-change notifications that have come due
//! ```

use std::sync::Arc;
use std::time::Duration;

use rtrb::{Consumer, Producer};
use tactus_audio::{AudioResult, GainNode, OscillatorNode, TimelineHost};
use tactus_core::{AccentLevel, TickEvent};

use crate::click::{accent_peak, SharedVoicing, VOICE_ATTACK, VOICE_DECAY, VOICE_LIFE};
use crate::commands::{EngineCommand, EngineUpdate};
use crate::snapshot::EngineSnapshot;
use crate::timeline::TimelineCursor;

/// Scheduling parameters for the lookahead loop
#[derive(Debug, Clone, Copy)]
pub struct SchedulerParams {
    /// Wake interval of the scheduling thread
    pub lookahead: Duration,
    /// How far ahead of the timeline clock beats are enqueued, seconds
    pub schedule_ahead: f64,
    /// Offset of the first beat after start, seconds
    pub start_delay: f64,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            lookahead: Duration::from_millis(25),
            schedule_ahead: 0.180,
            start_delay: 0.060,
        }
    }
}

/// Lookahead scheduler for callback-timeline hosts
pub struct PullScheduler<H: TimelineHost> {
    host: H,
    cursor: TimelineCursor,
    params: SchedulerParams,
    voicing: Arc<SharedVoicing>,
    updates: Producer<EngineUpdate>,
    commands: Consumer<EngineCommand>,
    next_beat_time: Option<f64>,
    tick_index: u64,
    /// Bar entries scheduled but not yet announced, (bar, entry seconds)
    pending_bar_changes: Vec<(usize, f64)>,
    last_bar_entry: Option<(usize, f64)>,
    host_error_logged: bool,
}

impl<H: TimelineHost> PullScheduler<H> {
    pub fn new(
        host: H,
        snapshot: Arc<EngineSnapshot>,
        params: SchedulerParams,
        voicing: Arc<SharedVoicing>,
        updates: Producer<EngineUpdate>,
        commands: Consumer<EngineCommand>,
    ) -> Self {
        Self {
            host,
            cursor: TimelineCursor::new(snapshot),
            params,
            voicing,
            updates,
            commands,
            next_beat_time: None,
            tick_index: 0,
            pending_bar_changes: Vec::new(),
            last_bar_entry: None,
            host_error_logged: false,
        }
    }

    /// Wake interval the owning thread should sleep between calls
    pub fn lookahead(&self) -> Duration {
        self.params.lookahead
    }

    /// One scheduling pass. Called every `lookahead()` by the owning thread.
    pub fn process(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                EngineCommand::Swap { snapshot, apply_at } => {
                    self.cursor.publish(snapshot, apply_at);
                }
                EngineCommand::TestTick => self.schedule_test_tick(),
            }
        }

        let now = self.host.current_time();
        let mut next = self
            .next_beat_time
            .unwrap_or(now + self.params.start_delay);
        let horizon = now + self.params.schedule_ahead;

        while next < horizon {
            self.cursor.commit_pending();
            let seconds_per_beat = self.cursor.current_bar().seconds_per_beat;
            self.schedule_beat(next);
            self.cursor.advance();
            next += seconds_per_beat;
        }
        self.next_beat_time = Some(next);

        self.flush_due_bar_changes(now);
    }

    /// Drop everything enqueued on the host and forget scheduled state
    pub fn shutdown(&mut self) {
        self.host.cancel_scheduled();
        self.pending_bar_changes.clear();
    }

    /// Schedule every slot of the beat at timeline time `t`
    fn schedule_beat(&mut self, t: f64) {
        let snapshot = Arc::clone(self.cursor.snapshot());
        let bar_index = self.cursor.bar();
        let beat = self.cursor.beat();
        let bar = snapshot.bar(bar_index);

        let slots = bar.slot_count(beat).max(1);
        let sub_dt = bar.seconds_per_beat / slots as f64;

        for slot in 0..slots {
            let at = t + slot as f64 * sub_dt;
            let accent = bar.accent(beat, slot);
            let voicing = self.voicing.voicing(accent);
            let audible = bar.slot_audible(beat, slot);

            if audible {
                self.schedule_voice(at, voicing.frequency as f64, accent_peak(voicing.gain) as f64);
            }

            let tick = TickEvent {
                index: self.tick_index,
                bar: bar_index,
                beat,
                slot,
                slot_count: slots,
                audible,
                accent,
                gain: voicing.gain,
                at_ms: at * 1000.0,
            };
            self.tick_index += 1;
            self.push_update(EngineUpdate::Tick(tick));
        }

        if beat == 0 && self.last_bar_entry != Some((bar_index, t)) {
            self.last_bar_entry = Some((bar_index, t));
            self.pending_bar_changes.push((bar_index, t));
        }
    }

    /// Voice a single strong click a breath from now (UI audition)
    fn schedule_test_tick(&mut self) {
        let at = self.host.current_time() + 0.02;
        let voicing = self.voicing.voicing(AccentLevel::BarStrong);
        self.schedule_voice(at, voicing.frequency as f64, accent_peak(voicing.gain) as f64);
    }

    /// Enqueue one voice; host failures are swallowed per-event and
    /// reported once per run so the stream keeps going.
    fn schedule_voice(&mut self, at: f64, frequency: f64, peak: f64) {
        if let Err(err) = self.try_schedule_voice(at, frequency, peak) {
            if !self.host_error_logged {
                log::warn!("timeline host rejected a click voice: {}", err);
                self.host_error_logged = true;
            }
        }
    }

    fn try_schedule_voice(&mut self, at: f64, frequency: f64, peak: f64) -> AudioResult<()> {
        let mut osc = self.host.create_oscillator()?;
        let mut gain = self.host.create_gain()?;
        self.host.connect(&osc, &gain)?;

        osc.set_frequency_at(frequency, at);
        gain.set_gain_at(0.0, at);
        gain.ramp_gain_to(peak, at + VOICE_ATTACK);
        gain.ramp_gain_to(0.0, at + VOICE_ATTACK + VOICE_DECAY);
        osc.start(at);
        osc.stop(at + VOICE_LIFE);
        Ok(())
    }

    /// Announce bar entries whose timeline time has arrived
    fn flush_due_bar_changes(&mut self, now: f64) {
        let mut due = 0;
        while due < self.pending_bar_changes.len() && self.pending_bar_changes[due].1 <= now {
            due += 1;
        }
        for (bar, at) in self.pending_bar_changes.drain(..due) {
            let update = EngineUpdate::BarChange {
                bar,
                at_ms: at * 1000.0,
            };
            if self.updates.push(update).is_err() {
                log::trace!("update ring full, dropping bar change");
            }
        }
    }

    fn push_update(&mut self, update: EngineUpdate) {
        if self.updates.push(update).is_err() {
            log::trace!("update ring full, dropping event");
        }
    }
}
