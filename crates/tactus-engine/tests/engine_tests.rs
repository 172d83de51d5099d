//! Engine facade integration tests (push mode)
//!
//! Tests for:
//! - Lifecycle state sequence across start/stop and restarts
//! - Tick grids rendered by the PCM worker
//! - Start failure when no sink can be built
//! - Mid-stream write failure surfacing as the error state
//! - Live updates at the next-bar boundary
//! - Silent bars, test ticks, update deduplication
//!
//! The sink is an in-memory collector that paces itself a little, so the
//! worker runs well above real time without flooding the update ring.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tactus_audio::{AudioError, AudioResult, PcmSink};
use tactus_core::{
    AccentLevel, ApplyAt, BarSpec, ConfigUpdate, EngineConfig, TickEvent, TimeSignature,
};
use tactus_engine::{Engine, EngineState};

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

const TEST_SAMPLE_RATE: u32 = 48_000;

/// In-memory PCM sink. Accepts everything, keeps what it saw, and sleeps
/// briefly per write so the worker outruns real time by a bounded factor.
struct MemorySink {
    collected: Arc<Mutex<Vec<i16>>>,
    released: Arc<AtomicBool>,
    fail_after_writes: Option<usize>,
    writes: usize,
}

#[derive(Clone)]
struct SinkProbe {
    collected: Arc<Mutex<Vec<i16>>>,
    released: Arc<AtomicBool>,
}

impl MemorySink {
    fn new(fail_after_writes: Option<usize>) -> (Self, SinkProbe) {
        let collected = Arc::new(Mutex::new(Vec::new()));
        let released = Arc::new(AtomicBool::new(false));
        let probe = SinkProbe {
            collected: Arc::clone(&collected),
            released: Arc::clone(&released),
        };
        (
            Self {
                collected,
                released,
                fail_after_writes,
                writes: 0,
            },
            probe,
        )
    }
}

impl PcmSink for MemorySink {
    fn sample_rate(&self) -> u32 {
        TEST_SAMPLE_RATE
    }

    fn min_buffer_frames(&self) -> usize {
        256
    }

    fn write(&mut self, frames: &[i16]) -> AudioResult<usize> {
        self.writes += 1;
        if let Some(limit) = self.fail_after_writes {
            if self.writes > limit {
                return Err(AudioError::WriteFailed("simulated device loss".into()));
            }
        }
        self.collected.lock().unwrap().extend_from_slice(frames);
        std::thread::sleep(Duration::from_micros(200));
        Ok(frames.len())
    }

    fn play(&mut self) -> AudioResult<()> {
        Ok(())
    }

    fn pause(&mut self) -> AudioResult<()> {
        Ok(())
    }

    fn flush(&mut self) {}

    fn stop(&mut self) -> AudioResult<()> {
        Ok(())
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::Release);
    }
}

fn four_four_config(bpm: u32) -> EngineConfig {
    EngineConfig {
        bpm,
        bars: vec![BarSpec::with_signature(TimeSignature::COMMON)],
        start_bar: 0,
        looped: true,
        beat_guide: false,
        apply_at: ApplyAt::NextBar,
    }
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn collecting_engine() -> (Engine, Arc<Mutex<Vec<TickEvent>>>, Arc<Mutex<Vec<EngineState>>>) {
    let engine = Engine::new();

    let ticks = Arc::new(Mutex::new(Vec::new()));
    let tick_log = Arc::clone(&ticks);
    let _ = engine.on_tick(move |tick| tick_log.lock().unwrap().push(*tick));

    let states = Arc::new(Mutex::new(Vec::new()));
    let state_log = Arc::clone(&states);
    let _ = engine.on_state(move |state, _| state_log.lock().unwrap().push(state));

    (engine, ticks, states)
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIFECYCLE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn push_engine_renders_the_tick_grid() {
    let (mut engine, ticks, states) = collecting_engine();

    let bars_entered = Arc::new(AtomicUsize::new(0));
    let bars_seen = Arc::clone(&bars_entered);
    let _ = engine.on_bar_change(move |_| {
        bars_seen.fetch_add(1, Ordering::Relaxed);
    });

    let (sink, _probe) = MemorySink::new(None);
    engine
        .start_push(four_four_config(120), move || Ok(sink))
        .expect("start should succeed");
    assert_eq!(engine.status(), EngineState::Running);

    assert!(wait_until(Duration::from_secs(10), || ticks
        .lock()
        .unwrap()
        .len()
        >= 9));
    engine.stop();
    assert_eq!(engine.status(), EngineState::Idle);

    let ticks = ticks.lock().unwrap();
    for (i, tick) in ticks.iter().enumerate().take(9) {
        assert_eq!(tick.index, i as u64);
        assert!((tick.at_ms - i as f64 * 500.0).abs() < 1e-6, "tick {}", i);
        let expected = if i % 4 == 0 {
            AccentLevel::BarStrong
        } else {
            AccentLevel::SubdivWeak
        };
        assert_eq!(tick.accent, expected);
    }

    // Single-bar loop re-enters bar 0 over and over
    assert!(bars_entered.load(Ordering::Relaxed) >= 2);

    let states = states.lock().unwrap();
    let positions: Vec<_> = [
        EngineState::Starting,
        EngineState::Running,
        EngineState::Stopping,
        EngineState::Idle,
    ]
    .iter()
    .map(|wanted| states.iter().position(|s| s == wanted))
    .collect();
    for window in positions.windows(2) {
        let (a, b) = (window[0], window[1]);
        assert!(a.is_some() && b.is_some(), "missing state in {:?}", states);
        assert!(a < b, "states out of order: {:?}", states);
    }
}

#[test]
fn start_fails_cleanly_without_audio() {
    let mut engine = Engine::new();
    let result = engine.start_push::<MemorySink, _>(four_four_config(120), || {
        Err(AudioError::NoDevice)
    });

    assert!(result.is_err());
    assert_eq!(engine.status(), EngineState::Idle);

    // The engine is still usable afterwards
    let (sink, _probe) = MemorySink::new(None);
    engine
        .start_push(four_four_config(120), move || Ok(sink))
        .expect("second start should succeed");
    engine.stop();
}

#[test]
fn write_failure_surfaces_as_error_state() {
    let (mut engine, _ticks, _states) = collecting_engine();

    let (sink, probe) = MemorySink::new(Some(5));
    engine
        .start_push(four_four_config(120), move || Ok(sink))
        .expect("start should succeed");

    assert!(wait_until(Duration::from_secs(5), || engine.status()
        == EngineState::Error));
    // The worker released its sink on the way out
    assert!(wait_until(Duration::from_secs(5), || probe
        .released
        .load(Ordering::Acquire)));

    engine.stop();
    assert_eq!(engine.status(), EngineState::Idle);
}

#[test]
fn restart_after_stop_renders_again() {
    let (mut engine, ticks, _states) = collecting_engine();

    let (sink, _probe) = MemorySink::new(None);
    engine
        .start_push(four_four_config(120), move || Ok(sink))
        .unwrap();
    assert!(wait_until(Duration::from_secs(5), || !ticks
        .lock()
        .unwrap()
        .is_empty()));
    engine.stop();

    let after_first_run = ticks.lock().unwrap().len();
    let (sink, _probe) = MemorySink::new(None);
    engine
        .start_push(four_four_config(120), move || Ok(sink))
        .unwrap();
    assert!(wait_until(Duration::from_secs(5), || ticks
        .lock()
        .unwrap()
        .len()
        > after_first_run));
    engine.stop();
}

// ═══════════════════════════════════════════════════════════════════════════════
// UPDATES AND AUDITION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn live_update_takes_effect_at_next_downbeat() {
    let (mut engine, ticks, _states) = collecting_engine();

    let (sink, _probe) = MemorySink::new(None);
    engine
        .start_push(four_four_config(120), move || Ok(sink))
        .unwrap();
    assert!(wait_until(Duration::from_secs(5), || ticks
        .lock()
        .unwrap()
        .len()
        >= 2));

    let mut subdivided = BarSpec::with_signature(TimeSignature::COMMON);
    subdivided.subdivisions[0] = 4;
    subdivided.masks[0] = vec![true; 4];
    engine.update(ConfigUpdate {
        bars: Some(vec![subdivided]),
        apply_at: Some(ApplyAt::NextBar),
        ..ConfigUpdate::default()
    });

    assert!(wait_until(Duration::from_secs(10), || ticks
        .lock()
        .unwrap()
        .iter()
        .any(|t| t.slot_count == 4)));
    engine.stop();

    let ticks = ticks.lock().unwrap();
    let first_subdivided = ticks.iter().find(|t| t.slot_count == 4).unwrap();
    // The swap landed exactly on a downbeat
    assert!(first_subdivided.is_downbeat());

    // And the bar in flight at update time finished with single slots
    let before: Vec<_> = ticks
        .iter()
        .take_while(|t| t.index < first_subdivided.index)
        .collect();
    assert!(before.iter().all(|t| t.slot_count == 1));
}

#[test]
fn identical_update_is_deduplicated() {
    let mut engine = Engine::new();
    let before = engine.config().clone();

    engine.update(ConfigUpdate {
        bars: Some(before.bars.clone()),
        bpm: Some(before.bpm),
        ..ConfigUpdate::default()
    });

    assert_eq!(engine.config().fingerprint(), before.fingerprint());
    assert_eq!(engine.config(), &before);
}

#[test]
fn silent_bar_keeps_ticking_without_sound() {
    let (mut engine, ticks, _states) = collecting_engine();

    let config = EngineConfig {
        bars: vec![BarSpec {
            signature: TimeSignature::COMMON,
            groups: None,
            subdivisions: vec![1; 4],
            masks: vec![vec![false]; 4],
        }],
        ..four_four_config(120)
    };

    let (sink, probe) = MemorySink::new(None);
    engine.start_push(config, move || Ok(sink)).unwrap();
    assert!(wait_until(Duration::from_secs(10), || ticks
        .lock()
        .unwrap()
        .len()
        >= 4));
    engine.stop();

    let ticks = ticks.lock().unwrap();
    assert!(ticks.iter().all(|t| !t.audible));

    let samples = probe.collected.lock().unwrap();
    assert!(!samples.is_empty());
    assert!(samples.iter().all(|&s| s == 0));
}

#[test]
fn test_tick_needs_a_running_engine() {
    let (mut engine, _ticks, _states) = collecting_engine();
    assert!(!engine.play_test_tick());

    // A silent timeline, so the only sound can come from the audition click
    let config = EngineConfig {
        bars: vec![BarSpec {
            signature: TimeSignature::COMMON,
            groups: None,
            subdivisions: vec![1; 4],
            masks: vec![vec![false]; 4],
        }],
        ..four_four_config(120)
    };

    let (sink, probe) = MemorySink::new(None);
    engine.start_push(config, move || Ok(sink)).unwrap();
    assert!(engine.play_test_tick());

    // The audition click reaches the output
    assert!(wait_until(Duration::from_secs(5), || {
        probe.collected.lock().unwrap().iter().any(|&s| s != 0)
    }));

    engine.stop();
    assert!(!engine.play_test_tick());
}

#[test]
fn accent_gain_override_shows_up_in_ticks() {
    let (mut engine, ticks, _states) = collecting_engine();

    // Full voicing override first, then a gain-only tweak on top of it
    let mut voicing = tactus_core::AccentVoicing::default();
    voicing.subdiv.gain = 0.3;
    engine.set_accent_voicing(voicing);
    engine.set_accent_gains(&[(AccentLevel::BarStrong, 0.9)]);

    let (sink, _probe) = MemorySink::new(None);
    engine
        .start_push(four_four_config(120), move || Ok(sink))
        .unwrap();
    assert!(wait_until(Duration::from_secs(5), || ticks
        .lock()
        .unwrap()
        .len()
        >= 2));
    engine.stop();

    let ticks = ticks.lock().unwrap();
    let downbeat = ticks.iter().find(|t| t.is_downbeat()).unwrap();
    assert!((downbeat.gain - 0.9).abs() < 1e-6);
    let offbeat = ticks.iter().find(|t| !t.is_downbeat()).unwrap();
    assert!((offbeat.gain - 0.3).abs() < 1e-6);
}

#[test]
fn start_while_running_acts_as_update() {
    let (mut engine, ticks, _states) = collecting_engine();

    let (sink, _probe) = MemorySink::new(None);
    engine
        .start_push(four_four_config(120), move || Ok(sink))
        .unwrap();
    assert!(wait_until(Duration::from_secs(5), || !ticks
        .lock()
        .unwrap()
        .is_empty()));

    // No second worker is spawned; the config is adopted instead
    let (sink2, probe2) = MemorySink::new(None);
    engine
        .start_push(four_four_config(240), move || Ok(sink2))
        .expect("restart-as-update should succeed");
    assert_eq!(engine.status(), EngineState::Running);
    assert_eq!(engine.config().bpm, 240);
    assert!(!probe2.released.load(Ordering::Acquire));
    assert!(probe2.collected.lock().unwrap().is_empty());

    engine.stop();
}
