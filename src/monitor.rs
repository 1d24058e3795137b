//! Activity monitoring
//!
//! Turns raw terminal output into sound triggers. Each monitored stream owns
//! its own `ActivityMonitor`; the ingestion path calls `process_chunk`, a
//! `Ticker` thread calls `tick` to drive the silence timing. Decisions are
//! made under the state lock, the sink is invoked after it is released.

use crate::throttle::TokenBucket;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Receiver of sound triggers
pub trait SoundSink: Send + Sync {
    fn grain(&self, velocity: f32, octave_shift: i32);
    fn chime(&self);
    fn attention(&self);
}

/// A trigger decided by the monitor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    Grain { velocity: f32, octave_shift: i32 },
    Chime,
    Attention,
}

impl Trigger {
    fn dispatch<S: SoundSink + ?Sized>(&self, sink: &S) {
        match *self {
            Trigger::Grain {
                velocity,
                octave_shift,
            } => sink.grain(velocity, octave_shift),
            Trigger::Chime => sink.chime(),
            Trigger::Attention => sink.attention(),
        }
    }
}

/// Trigger polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Sound on output
    Normal,
    /// Sound during silence
    Reverse,
}

/// Coarse state of a monitored stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Nothing seen yet, or silent in reverse mode
    Idle,
    /// Output within the last `idle_after`
    Active,
    /// Silent, attention alert armed
    AttentionPending,
    /// Alert fired; latched until the next output
    AttentionFired,
}

/// Monitor tuning
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub mode: Mode,
    /// Silence before the attention alert
    pub silence_threshold: Duration,
    /// Upper bound on grain triggers
    pub max_grains_per_sec: f64,
    /// Consecutive newlines that mark a completion
    pub newline_threshold: usize,
    /// Silence after which a stream stops counting as active
    pub idle_after: Duration,
    /// Reverse mode: silence before ambient grains start
    pub reverse_idle_delay: Duration,
    /// Reverse mode: tick rate of ambient grains
    pub reverse_grains_per_sec: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Normal,
            silence_threshold: Duration::from_secs(30),
            max_grains_per_sec: 30.0,
            newline_threshold: 3,
            idle_after: Duration::from_secs(1),
            reverse_idle_delay: Duration::from_secs(3),
            reverse_grains_per_sec: 12.0,
        }
    }
}

impl MonitorConfig {
    /// Period of the silence ticker
    pub fn tick_interval(&self) -> Duration {
        match self.mode {
            Mode::Reverse if self.reverse_grains_per_sec > 0.0 => {
                Duration::from_secs_f64(1.0 / self.reverse_grains_per_sec)
            }
            _ => Duration::from_millis(250),
        }
    }
}

/// Summary of one chunk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkClass {
    /// Visible characters (escape sequences and whitespace excluded)
    pub visible: usize,
    /// Newline characters
    pub newlines: usize,
    /// A newline run reached the completion threshold
    pub chime: bool,
    /// Register derived from the last visible character
    pub octave_shift: i32,
}

impl ChunkClass {
    pub fn is_activity(&self) -> bool {
        self.visible > 0 || self.newlines > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    Ground,
    Esc,
    Csi,
    Osc,
    OscEsc,
}

/// Streaming classifier; escape and newline-run state carry across chunks
#[derive(Debug, Clone)]
pub struct Classifier {
    newline_threshold: usize,
    consecutive_newlines: usize,
    run_chimed: bool,
    escape: Escape,
}

impl Classifier {
    pub fn new(newline_threshold: usize) -> Self {
        Self {
            newline_threshold: newline_threshold.max(1),
            consecutive_newlines: 0,
            run_chimed: false,
            escape: Escape::Ground,
        }
    }

    pub fn classify(&mut self, text: &str) -> ChunkClass {
        let mut class = ChunkClass::default();
        for c in text.chars() {
            self.escape = match self.escape {
                Escape::Ground => {
                    self.ground(c, &mut class);
                    if c == '\x1b' {
                        Escape::Esc
                    } else {
                        Escape::Ground
                    }
                }
                Escape::Esc => match c {
                    '[' => Escape::Csi,
                    ']' => Escape::Osc,
                    _ => Escape::Ground,
                },
                Escape::Csi => {
                    if ('\x40'..='\x7e').contains(&c) {
                        Escape::Ground
                    } else {
                        Escape::Csi
                    }
                }
                Escape::Osc => match c {
                    '\x07' => Escape::Ground,
                    '\x1b' => Escape::OscEsc,
                    _ => Escape::Osc,
                },
                Escape::OscEsc => Escape::Ground,
            };
        }
        class
    }

    fn ground(&mut self, c: char, class: &mut ChunkClass) {
        match c {
            '\n' => {
                class.newlines += 1;
                self.consecutive_newlines += 1;
                if self.consecutive_newlines >= self.newline_threshold && !self.run_chimed {
                    self.run_chimed = true;
                    class.chime = true;
                }
            }
            // Transparent to newline runs
            '\r' | ' ' | '\t' => {}
            c if c.is_control() => {}
            c => {
                class.visible += 1;
                class.octave_shift = octave_shift_for(c);
                self.consecutive_newlines = 0;
                self.run_chimed = false;
            }
        }
    }
}

/// Register of a text grain: capitals low, digits and symbols high
pub fn octave_shift_for(c: char) -> i32 {
    if c.is_uppercase() {
        -1
    } else if c.is_ascii_digit() || c.is_ascii_punctuation() {
        1
    } else {
        0
    }
}

/// Loudness of a text grain from the size of its burst
pub fn velocity_for_burst(visible: usize) -> f32 {
    0.4 + 0.6 * (visible as f32 / 80.0).min(1.0).sqrt()
}

/// Per-stream activity state
#[derive(Debug, Clone)]
pub struct ActivityState {
    last_output: Instant,
    seen_output: bool,
    classifier: Classifier,
    bucket: TokenBucket,
    attention_fired: bool,
    reverse_sounding: bool,
}

impl ActivityState {
    pub fn new(config: &MonitorConfig, now: Instant) -> Self {
        Self {
            last_output: now,
            seen_output: false,
            classifier: Classifier::new(config.newline_threshold),
            bucket: TokenBucket::new(config.max_grains_per_sec, 1.0),
            attention_fired: false,
            reverse_sounding: false,
        }
    }

    pub fn last_output(&self) -> Instant {
        self.last_output
    }

    pub fn attention_fired(&self) -> bool {
        self.attention_fired
    }
}

/// Classifies output and silence for one stream and drives a sound sink
pub struct ActivityMonitor<S: SoundSink + ?Sized> {
    sink: Arc<S>,
    config: MonitorConfig,
    state: Mutex<ActivityState>,
}

impl<S: SoundSink + ?Sized> ActivityMonitor<S> {
    pub fn new(sink: Arc<S>, config: MonitorConfig, now: Instant) -> Self {
        let state = ActivityState::new(&config, now);
        Self {
            sink,
            config,
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, ActivityState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Feed one captured output fragment. Returns the triggers fired.
    pub fn process_chunk(&self, raw: &[u8], now: Instant) -> Vec<Trigger> {
        if raw.is_empty() {
            return Vec::new();
        }
        let text = String::from_utf8_lossy(raw);

        let mut triggers = Vec::new();
        {
            let mut state = self.lock();
            let class = state.classifier.classify(&text);
            if !class.is_activity() {
                return triggers;
            }

            state.last_output = state.last_output.max(now);
            state.seen_output = true;
            state.attention_fired = false;

            match self.config.mode {
                // Output is the quiet state in reverse mode
                Mode::Reverse => state.reverse_sounding = false,
                Mode::Normal => {
                    if class.visible > 0 {
                        if state.bucket.try_take(now) {
                            triggers.push(Trigger::Grain {
                                velocity: velocity_for_burst(class.visible),
                                octave_shift: class.octave_shift,
                            });
                        } else {
                            trace!("Grain throttled");
                        }
                    }
                    if class.chime {
                        debug!("Completion detected");
                        triggers.push(Trigger::Chime);
                    }
                }
            }
        }

        for trigger in &triggers {
            trigger.dispatch(&*self.sink);
        }
        triggers
    }

    /// Convenience for callers without their own clock
    pub fn on_chunk(&self, raw: &[u8]) -> Vec<Trigger> {
        self.process_chunk(raw, Instant::now())
    }

    /// Periodic silence check. Returns the triggers fired.
    pub fn tick(&self, now: Instant) -> Vec<Trigger> {
        let mut triggers = Vec::new();
        {
            let mut state = self.lock();
            let silent_for = now.saturating_duration_since(state.last_output);

            match self.config.mode {
                Mode::Normal => {
                    if silent_for >= self.config.silence_threshold && !state.attention_fired {
                        state.attention_fired = true;
                        debug!("Silent for {:?}, attention", silent_for);
                        triggers.push(Trigger::Attention);
                    }
                }
                Mode::Reverse => {
                    if silent_for >= self.config.reverse_idle_delay {
                        if !state.reverse_sounding {
                            state.reverse_sounding = true;
                            triggers.push(Trigger::Chime);
                        }
                        if state.bucket.try_take(now) {
                            triggers.push(Trigger::Grain {
                                velocity: 0.5,
                                octave_shift: 0,
                            });
                        }
                    } else {
                        state.reverse_sounding = false;
                    }
                }
            }
        }

        for trigger in &triggers {
            trigger.dispatch(&*self.sink);
        }
        triggers
    }

    pub fn state(&self, now: Instant) -> MonitorState {
        let state = self.lock();
        if state.attention_fired {
            return MonitorState::AttentionFired;
        }
        let silent_for = now.saturating_duration_since(state.last_output);
        if state.seen_output && silent_for < self.config.idle_after {
            MonitorState::Active
        } else if !state.seen_output || self.config.mode == Mode::Reverse {
            MonitorState::Idle
        } else {
            MonitorState::AttentionPending
        }
    }
}

impl<S: SoundSink + ?Sized + 'static> ActivityMonitor<S> {
    /// Start the periodic silence check on its own thread
    pub fn spawn_ticker(self: &Arc<Self>) -> std::io::Result<Ticker> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let monitor = Arc::clone(self);
        let interval = self.config.tick_interval();
        let handle = thread::Builder::new()
            .name("murmur-ticker".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        monitor.tick(Instant::now());
                    }
                    _ => break,
                }
            })?;
        debug!("Ticker started every {:?}", interval);
        Ok(Ticker {
            stop_tx,
            handle: Some(handle),
        })
    }
}

/// Handle to the silence-check thread; stops and joins on drop
pub struct Ticker {
    stop_tx: mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Ticker {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Ticker thread panicked");
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
