//! # Session State Machine
//!
//! A session is one continuous BAKE or REFLOW run. The controller never says
//! "session started" or "session ended"; both are inferred from the mode
//! field of consecutive samples:
//!
//! | previous mode | new mode       | effect                              |
//! |---------------|----------------|-------------------------------------|
//! | `STANDBY`     | `BAKE`/`REFLOW`| session start: series and log reset |
//! | `BAKE`/`REFLOW`| `STANDBY`     | session end: log handed out for persistence |
//!
//! A second, weaker completion signal is time based: once no BAKE/REFLOW
//! sample has been seen for the quiet threshold, [`SessionStateMachine::is_complete`]
//! reports the session as done. This is a heuristic: a single delayed report
//! from the device can trip it.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::debug;

use crate::protocol::{LineEvent, Mode, Sample};
use crate::series::SeriesStore;

/// Profile label used for bake sessions.
pub const BAKE_PROFILE: &str = "bake";

/// Default quiet threshold for [`SessionStateMachine::is_complete`].
pub const DEFAULT_QUIET_THRESHOLD: Duration = Duration::from_secs(5);

/// Source of wall-clock instants
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// The system monotonic clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock advanced by hand.
///
/// Clones share the same time, so a test can keep one handle while the
/// state machine owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    /// Clock starting at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }
}

/// Live state of the session tracker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Last observed mode, `None` until the first mode-bearing sample
    pub mode: Option<Mode>,
    /// Name of the current profile
    pub profile_name: String,
    /// Last time a BAKE/REFLOW sample was observed
    pub last_action: Option<Instant>,
}

/// A session that just ended, ready to persist
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedSession {
    /// Profile name at the time the session ended
    pub profile_name: String,
    /// Mode the session ran in
    pub mode: Mode,
    /// Accumulated samples in arrival order
    pub records: Vec<Sample>,
}

impl CompletedSession {
    /// Chart title for this session.
    pub fn title(&self) -> String {
        format!("Profile: {} Mode: {}", self.profile_name, self.mode)
    }
}

/// What observing one event did
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// No session boundary
    None,
    /// A session started; series and record log were cleared
    Started(Mode),
    /// A session ended
    Ended(CompletedSession),
}

/// Tracks mode and profile across samples and detects session boundaries
#[derive(Debug)]
pub struct SessionStateMachine<C: Clock = SystemClock> {
    state: SessionState,
    series: SeriesStore,
    records: Vec<Sample>,
    quiet_threshold: Duration,
    clock: C,
}

impl SessionStateMachine<SystemClock> {
    /// State machine on the system clock with the default quiet threshold.
    pub fn new(series: SeriesStore) -> Self {
        Self::with_clock(series, SystemClock, DEFAULT_QUIET_THRESHOLD)
    }
}

impl<C: Clock> SessionStateMachine<C> {
    /// State machine on an explicit clock.
    pub fn with_clock(series: SeriesStore, clock: C, quiet_threshold: Duration) -> Self {
        Self {
            state: SessionState::default(),
            series,
            records: Vec::new(),
            quiet_threshold,
            clock,
        }
    }

    /// Apply a parsed line.
    ///
    /// Comments and unparsable lines never change state.
    pub fn observe(&mut self, event: &LineEvent) -> Transition {
        match event {
            LineEvent::Sample(sample) => self.observe_sample(sample),
            LineEvent::ProfileAnnounced(name) => {
                self.announce_profile(name);
                Transition::None
            }
            LineEvent::Comment(_) | LineEvent::Unparsable { .. } => Transition::None,
        }
    }

    /// Record that the controller switched to profile `name`.
    pub fn announce_profile(&mut self, name: &str) {
        debug!("Profile announced: {}", name);
        self.state.profile_name = name.to_string();
    }

    /// Apply one sample.
    pub fn observe_sample(&mut self, sample: &Sample) -> Transition {
        let mut transition = Transition::None;

        if let Some(mode) = sample.mode {
            transition = self.apply_mode(mode);
        }

        if sample.has_timer() {
            self.series.add_sample(sample);
            self.records.push(sample.clone());
        }

        transition
    }

    fn apply_mode(&mut self, mode: Mode) -> Transition {
        let previous = self.state.mode;
        let mut transition = Transition::None;

        if previous == Some(Mode::Standby) && mode.is_active() {
            debug!("Session start: {} -> {}", Mode::Standby, mode);
            self.series.clear();
            self.records.clear();
            transition = Transition::Started(mode);
        }

        if let Some(ended) = previous.filter(|p| p.is_active()) {
            if mode == Mode::Standby {
                debug!("Session end: {} -> {}", ended, mode);
                transition = Transition::Ended(CompletedSession {
                    profile_name: self.state.profile_name.clone(),
                    mode: ended,
                    records: self.records.clone(),
                });
            }
        }

        self.state.mode = Some(mode);
        if mode == Mode::Bake {
            self.state.profile_name = BAKE_PROFILE.to_string();
        }
        if mode.is_active() {
            self.state.last_action = Some(self.clock.now());
        }

        let title = format!("Profile: {} Mode: {}", self.state.profile_name, mode);
        self.series.set_title(&title);

        transition
    }

    /// Whether the quiet threshold has passed since the last BAKE/REFLOW sample.
    pub fn is_complete(&self) -> bool {
        self.state
            .last_action
            .is_some_and(|at| self.clock.now().saturating_duration_since(at) > self.quiet_threshold)
    }

    /// Forget the last action time so the next session can re-arm completion.
    pub fn clear_last_action(&mut self) {
        self.state.last_action = None;
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Records accumulated since the last session start.
    pub fn records(&self) -> &[Sample] {
        &self.records
    }

    /// Live series.
    pub fn series(&self) -> &SeriesStore {
        &self.series
    }
}
