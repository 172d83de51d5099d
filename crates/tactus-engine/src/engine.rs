//! Engine facade
//!
//! Public entry point for callers. Owns the active scheduling worker (push
//! synthesizer or pull scheduler), the dispatcher thread that fans updates
//! out to listeners, and the caller-side view of the configuration.
//!
//! ## Thread layout
//!
//! ```text
//! Caller thread          Worker thread              Dispatcher thread
//! ┌──────────────┐  cmd  ┌───────────────────┐ upd  ┌────────────────┐
//! │ start/stop/  │──────▶│ PushSynth::run or │─────▶│ drain ring,    │
//! │ update       │ ring  │ PullScheduler     │ ring │ call listeners │
//! └──────────────┘       └───────────────────┘      └────────────────┘
//! ```
//!
//! The worker owns its host handle outright; callers never touch it. The
//! stop path requests cooperative exit and waits a bounded grace window, a
//! stuck worker is abandoned rather than deadlocking the caller.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rtrb::{Consumer, Producer, RingBuffer};
use tactus_audio::{
    set_realtime_priority, AudioConfig, AudioResult, CpalPcmSink, PcmSink, TimelineHost,
};
use tactus_core::{AccentLevel, AccentVoicing, ConfigUpdate, EngineConfig, TickEvent};

use crate::click::SharedVoicing;
use crate::commands::{
    EngineCommand, EngineUpdate, COMMAND_QUEUE_CAPACITY, UPDATE_QUEUE_CAPACITY,
};
use crate::error::{EngineError, EngineResult};
use crate::events::{Subscription, Subscriptions};
use crate::scheduler::{PullScheduler, SchedulerParams};
use crate::snapshot::EngineSnapshot;
use crate::synth::PushSynth;

/// Grace window for the worker to exit on `stop`
const STOP_TIMEOUT: Duration = Duration::from_millis(1200);

/// Dispatcher nap between ring drains
const DISPATCH_INTERVAL: Duration = Duration::from_millis(2);

/// Lifecycle state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    Idle = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
    Error = 4,
}

impl EngineState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::Stopping,
            4 => Self::Error,
            _ => Self::Idle,
        }
    }
}

/// Handles to a running worker + dispatcher pair
struct Worker {
    commands: Producer<EngineCommand>,
    stop: Arc<AtomicBool>,
    done_rx: crossbeam_channel::Receiver<()>,
    handle: Option<JoinHandle<()>>,
    dispatcher_stop: Arc<AtomicBool>,
    dispatcher: Option<JoinHandle<()>>,
}

/// The metronome engine facade
pub struct Engine {
    subscriptions: Subscriptions,
    voicing: Arc<SharedVoicing>,
    state: Arc<AtomicU8>,
    config: EngineConfig,
    fingerprint: u64,
    worker: Option<Worker>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        let config = EngineConfig::default().normalized();
        let fingerprint = config.fingerprint();
        Self {
            subscriptions: Subscriptions::new(),
            voicing: Arc::new(SharedVoicing::default()),
            state: Arc::new(AtomicU8::new(EngineState::Idle as u8)),
            config,
            fingerprint,
            worker: None,
        }
    }

    /// Current lifecycle state
    pub fn status(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Caller-observable canonical configuration (clamps and drops applied)
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a tick listener
    pub fn on_tick(&self, listener: impl Fn(&TickEvent) + Send + Sync + 'static) -> Subscription {
        self.subscriptions.on_tick(listener)
    }

    /// Register a state listener
    pub fn on_state(
        &self,
        listener: impl Fn(EngineState, Option<&str>) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscriptions.on_state(listener)
    }

    /// Register a bar-change listener
    pub fn on_bar_change(&self, listener: impl Fn(usize) + Send + Sync + 'static) -> Subscription {
        self.subscriptions.on_bar_change(listener)
    }

    /// Override the gain of any subset of accent levels. Takes effect
    /// immediately, outside the snapshot machinery; tone frequencies are
    /// left alone.
    pub fn set_accent_gains(&self, gains: &[(AccentLevel, f32)]) {
        for &(level, gain) in gains {
            self.voicing.set_gain(level, gain);
        }
    }

    /// Override accent voicing wholesale (gains and tone frequencies).
    /// Takes effect immediately, outside the snapshot machinery.
    pub fn set_accent_voicing(&self, voicing: AccentVoicing) {
        self.voicing.store(voicing);
    }

    /// Start on the default output device (push mode, mono 16-bit PCM)
    pub fn start(&mut self, config: EngineConfig) -> EngineResult<()> {
        self.start_push(config, || CpalPcmSink::open_default(AudioConfig::default()))
    }

    /// Start in push mode with a caller-provided PCM sink.
    ///
    /// The sink is constructed on the worker thread via `make_sink`, so
    /// host handles never cross threads. When the engine is already
    /// running this behaves as [`Engine::update`] at the configuration's
    /// apply boundary.
    pub fn start_push<S, F>(&mut self, config: EngineConfig, make_sink: F) -> EngineResult<()>
    where
        S: PcmSink + 'static,
        F: FnOnce() -> AudioResult<S> + Send + 'static,
    {
        if self.is_active() {
            self.restart_as_update(config);
            return Ok(());
        }
        self.spawn_worker(config, move |snapshot, voicing, updates, commands, stop, ready| {
            let sink = match make_sink() {
                Ok(sink) => sink,
                Err(err) => {
                    let _ = ready.send(Err(err));
                    return;
                }
            };
            set_realtime_priority();

            let mut synth = PushSynth::new(sink, snapshot, voicing, updates, commands);
            let _ = ready.send(Ok(()));

            if let Err(err) = synth.run(&stop) {
                log::error!("push worker stopped on error: {}", err);
            }
        })
    }

    /// Start in pull mode against a callback-timeline host.
    ///
    /// The host is constructed on the worker thread via `make_host`. When
    /// the engine is already running this behaves as [`Engine::update`].
    pub fn start_pull<H, F>(&mut self, config: EngineConfig, make_host: F) -> EngineResult<()>
    where
        H: TimelineHost + 'static,
        F: FnOnce() -> AudioResult<H> + Send + 'static,
    {
        if self.is_active() {
            self.restart_as_update(config);
            return Ok(());
        }
        self.spawn_worker(config, move |snapshot, voicing, updates, commands, stop, ready| {
            let host = match make_host() {
                Ok(host) => host,
                Err(err) => {
                    let _ = ready.send(Err(err));
                    return;
                }
            };

            let mut scheduler = PullScheduler::new(
                host,
                snapshot,
                SchedulerParams::default(),
                voicing,
                updates,
                commands,
            );
            let _ = ready.send(Ok(()));

            while !stop.load(Ordering::Acquire) {
                scheduler.process();
                thread::sleep(scheduler.lookahead());
            }
            scheduler.shutdown();
        })
    }

    /// Publish a partial configuration update.
    ///
    /// Never blocks. Updates whose content fingerprint matches the active
    /// configuration are dropped; everything else is normalized, compiled,
    /// and handed to the worker for the configured apply boundary.
    pub fn update(&mut self, update: ConfigUpdate) {
        let next = self.config.with_update(update);
        let fingerprint = next.fingerprint();
        let changed = fingerprint != self.fingerprint;

        self.config = next;
        self.fingerprint = fingerprint;

        if !changed {
            return;
        }

        if let Some(worker) = &mut self.worker {
            let snapshot = EngineSnapshot::compile(self.config.clone());
            let command = EngineCommand::Swap {
                snapshot,
                apply_at: self.config.apply_at,
            };
            if worker.commands.push(command).is_err() {
                log::warn!("command queue full, dropping configuration update");
            }
        }
    }

    /// Voice a single strong click right away (UI audition).
    /// Returns true when the running worker accepted the request.
    pub fn play_test_tick(&mut self) -> bool {
        if self.status() != EngineState::Running {
            return false;
        }
        match &mut self.worker {
            Some(worker) => worker.commands.push(EngineCommand::TestTick).is_ok(),
            None => false,
        }
    }

    /// Stop playback. Requests cooperative worker exit and waits up to the
    /// grace window; a stuck worker is abandoned with a diagnostic.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        self.set_state(EngineState::Stopping, None);
        Self::teardown(worker);
        self.set_state(EngineState::Idle, None);
    }

    fn teardown(mut worker: Worker) {
        worker.stop.store(true, Ordering::Release);

        match worker.done_rx.recv_timeout(STOP_TIMEOUT) {
            Ok(()) => {
                if let Some(handle) = worker.handle.take() {
                    let _ = handle.join();
                }
            }
            Err(_) => {
                log::warn!(
                    "audio worker did not exit within {:?}, abandoning it",
                    STOP_TIMEOUT
                );
                drop(worker.handle.take());
            }
        }

        worker.dispatcher_stop.store(true, Ordering::Release);
        if let Some(dispatcher) = worker.dispatcher.take() {
            let _ = dispatcher.join();
        }
    }

    /// Spawn the worker + dispatcher pair around a mode-specific body.
    ///
    /// The body receives its compiled snapshot, rings, stop flag, and the
    /// readiness channel; it must send on `ready` exactly once before
    /// entering its loop (or after failing to build its host).
    fn spawn_worker<B>(&mut self, config: EngineConfig, body: B) -> EngineResult<()>
    where
        B: FnOnce(
                Arc<EngineSnapshot>,
                Arc<SharedVoicing>,
                Producer<EngineUpdate>,
                Consumer<EngineCommand>,
                Arc<AtomicBool>,
                crossbeam_channel::Sender<AudioResult<()>>,
            ) + Send
            + 'static,
    {
        // A finished-but-uncollected worker (previous run ended in Error)
        // is cleaned up before starting fresh.
        if let Some(worker) = self.worker.take() {
            Self::teardown(worker);
        }

        self.config = config.normalized();
        self.fingerprint = self.config.fingerprint();
        self.set_state(EngineState::Starting, None);

        let snapshot = EngineSnapshot::compile(self.config.clone());
        let (command_tx, command_rx) = RingBuffer::new(COMMAND_QUEUE_CAPACITY);
        let (update_tx, update_rx) = RingBuffer::new(UPDATE_QUEUE_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let voicing = Arc::clone(&self.voicing);
        let stop_flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("tactus-worker".into())
            .spawn(move || {
                body(snapshot, voicing, update_tx, command_rx, stop_flag, ready_tx);
                let _ = done_tx.send(());
            })
            .map_err(|err| EngineError::WorkerStart(err.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = handle.join();
                self.set_state(EngineState::Idle, None);
                return Err(err.into());
            }
            Err(_) => {
                let _ = handle.join();
                self.set_state(EngineState::Idle, None);
                return Err(EngineError::WorkerStart(
                    "audio worker exited during startup".into(),
                ));
            }
        }

        let dispatcher_stop = Arc::new(AtomicBool::new(false));
        let dispatcher = {
            let subscriptions = self.subscriptions.clone();
            let state = Arc::clone(&self.state);
            let stop = Arc::clone(&dispatcher_stop);
            thread::Builder::new()
                .name("tactus-events".into())
                .spawn(move || dispatcher_loop(update_rx, subscriptions, state, stop))
                .map_err(|err| EngineError::WorkerStart(err.to_string()))?
        };

        self.worker = Some(Worker {
            commands: command_tx,
            stop,
            done_rx,
            handle: Some(handle),
            dispatcher_stop,
            dispatcher: Some(dispatcher),
        });
        self.set_state(EngineState::Running, None);
        Ok(())
    }

    /// `start` while running: last configuration wins at its boundary
    fn restart_as_update(&mut self, config: EngineConfig) {
        let config = config.normalized();
        self.update(ConfigUpdate {
            bpm: Some(config.bpm),
            bars: Some(config.bars),
            start_bar: Some(config.start_bar),
            looped: Some(config.looped),
            beat_guide: Some(config.beat_guide),
            apply_at: Some(config.apply_at),
        });
    }

    fn is_active(&self) -> bool {
        matches!(self.status(), EngineState::Starting | EngineState::Running)
    }

    fn set_state(&self, state: EngineState, detail: Option<&str>) {
        self.state.store(state as u8, Ordering::Release);
        self.subscriptions.emit_state(state, detail);
        log::debug!("engine state -> {:?}", state);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            Self::teardown(worker);
        }
    }
}

/// Drain worker updates and fan them out to listeners until told to stop
/// and the ring has been emptied.
fn dispatcher_loop(
    mut updates: Consumer<EngineUpdate>,
    subscriptions: Subscriptions,
    state: Arc<AtomicU8>,
    stop: Arc<AtomicBool>,
) {
    loop {
        while let Ok(update) = updates.pop() {
            match update {
                EngineUpdate::Tick(tick) => subscriptions.emit_tick(&tick),
                EngineUpdate::BarChange { bar, .. } => subscriptions.emit_bar(bar),
                EngineUpdate::State { state: next, detail } => {
                    state.store(next as u8, Ordering::Release);
                    subscriptions.emit_state(next, detail.as_deref());
                }
            }
        }

        if stop.load(Ordering::Acquire) && updates.is_empty() {
            return;
        }
        thread::sleep(DISPATCH_INTERVAL);
    }
}
