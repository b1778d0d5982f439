//! # Ingestion Pipeline
//!
//! Glue between the line parser, the session state machine and the persister:
//!
//! ```text
//! raw line -> parse_line -> Sample -----------> SessionStateMachine -> SeriesStore
//!                        -> ProfileAnnounced -/        |
//!                        -> Comment -> comment handler |  session end
//!                        -> Unparsable -> warn!        v
//!                                               SessionPersister::flush
//! ```
//!
//! Parse and persistence failures are recovered here (reported, then
//! ingestion continues); nothing in this module aborts the read loop.

use std::fmt;

use log::{error, info, warn};

use crate::persist::{SessionArtifacts, SessionPersister};
use crate::protocol::{parse_line, LineEvent};
use crate::session::{Clock, CompletedSession, SessionStateMachine, SystemClock, Transition};

/// Handler for device comment lines
pub type CommentHandler = Box<dyn FnMut(&str)>;

/// Counters over everything the pipeline has seen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Lines processed
    pub lines: usize,
    /// Lines parsed as samples
    pub samples: usize,
    /// Comment lines
    pub comments: usize,
    /// Rejected non-empty lines
    pub rejected: usize,
    /// Sessions started
    pub sessions_started: usize,
    /// Sessions persisted
    pub sessions_saved: usize,
    /// Sessions whose artifacts could not be written
    pub save_failures: usize,
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lines ({} samples, {} comments, {} rejected), {} sessions saved, {} failed",
            self.lines,
            self.samples,
            self.comments,
            self.rejected,
            self.sessions_saved,
            self.save_failures
        )
    }
}

/// What processing one line led to
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Nothing beyond state/series updates
    Processed,
    /// A session started
    SessionStarted,
    /// A session ended and was saved
    SessionSaved(SessionArtifacts),
    /// A session ended but saving failed; its artifacts are lost
    SaveFailed(String),
    /// The line was rejected
    Rejected,
}

/// Line-at-a-time ingestion of controller output
pub struct Pipeline<P, C: Clock = SystemClock> {
    machine: SessionStateMachine<C>,
    persister: P,
    on_comment: CommentHandler,
    stats: PipelineStats,
}

impl<P: SessionPersister, C: Clock> Pipeline<P, C> {
    /// Pipeline feeding `machine` and saving ended sessions with `persister`.
    ///
    /// Comments are logged at info level until a handler is installed.
    pub fn new(machine: SessionStateMachine<C>, persister: P) -> Self {
        Self {
            machine,
            persister,
            on_comment: Box::new(|text| info!("{}", text)),
            stats: PipelineStats::default(),
        }
    }

    /// Route device comments to `handler`.
    pub fn with_comment_handler<F: FnMut(&str) + 'static>(mut self, handler: F) -> Self {
        self.on_comment = Box::new(handler);
        self
    }

    /// Parse and apply one raw line.
    pub fn process_line(&mut self, raw: &str) -> LineOutcome {
        self.stats.lines += 1;
        let event = parse_line(raw);

        match &event {
            LineEvent::Comment(text) => {
                self.stats.comments += 1;
                (self.on_comment)(text);
                return LineOutcome::Processed;
            }
            LineEvent::Unparsable { text, reason } => {
                if !reason.is_silent() {
                    self.stats.rejected += 1;
                    warn!("!! {} ({})", text, reason);
                }
                return LineOutcome::Rejected;
            }
            LineEvent::Sample(_) => self.stats.samples += 1,
            LineEvent::ProfileAnnounced(_) => {}
        }

        match self.machine.observe(&event) {
            Transition::None => LineOutcome::Processed,
            Transition::Started(_) => {
                self.stats.sessions_started += 1;
                LineOutcome::SessionStarted
            }
            Transition::Ended(session) => self.save(&session),
        }
    }

    fn save(&mut self, session: &CompletedSession) -> LineOutcome {
        match self.persister.flush(session) {
            Ok(artifacts) => {
                self.stats.sessions_saved += 1;
                LineOutcome::SessionSaved(artifacts)
            }
            Err(e) => {
                self.stats.save_failures += 1;
                error!(
                    "Failed to save {} session '{}' ({} records): {}",
                    session.mode,
                    session.profile_name,
                    session.records.len(),
                    e
                );
                LineOutcome::SaveFailed(e.to_string())
            }
        }
    }

    /// Whether the running session has gone quiet.
    pub fn is_complete(&self) -> bool {
        self.machine.is_complete()
    }

    /// Re-arm the completion check after consuming it.
    pub fn clear_last_action(&mut self) {
        self.machine.clear_last_action();
    }

    /// The session state machine.
    pub fn machine(&self) -> &SessionStateMachine<C> {
        &self.machine
    }

    /// The persister.
    pub fn persister(&self) -> &P {
        &self.persister
    }

    /// Counters so far.
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartLayout;
    use crate::persist::PersistError;
    use crate::series::{LiveView, Series, SeriesStore};
    use crate::session::{ManualClock, DEFAULT_QUIET_THRESHOLD};
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Shares a log with the persister so clears and flushes are ordered.
    struct Recorder {
        log: Log,
    }

    impl LiveView for Recorder {
        fn redraw(&mut self, series: &[Series]) {
            // only a clear leaves the series empty
            if series[0].points.is_empty() {
                self.log.borrow_mut().push("clear".to_string());
            }
        }
    }

    struct RecordingPersister {
        log: Log,
        sessions: Vec<CompletedSession>,
        fail: bool,
    }

    impl SessionPersister for RecordingPersister {
        fn flush(&mut self, session: &CompletedSession) -> Result<SessionArtifacts, PersistError> {
            self.log.borrow_mut().push("flush".to_string());
            if self.fail {
                return Err(PersistError::Pdf("disk full".to_string()));
            }
            self.sessions.push(session.clone());
            Ok(SessionArtifacts {
                csv: PathBuf::from("session.csv"),
                png: None,
                pdf: None,
            })
        }
    }

    fn pipeline(fail: bool) -> (Pipeline<RecordingPersister, ManualClock>, Log, ManualClock) {
        let log = Log::default();
        let clock = ManualClock::new();
        let display = Recorder { log: log.clone() };
        let series = SeriesStore::new(&ChartLayout::default(), Box::new(display));
        let machine = SessionStateMachine::with_clock(series, clock.clone(), DEFAULT_QUIET_THRESHOLD);
        let persister = RecordingPersister { log: log.clone(), sessions: Vec::new(), fail };
        (Pipeline::new(machine, persister), log, clock)
    }

    const STANDBY: &str = "0.0,20,20,0,0,0,20,0,0,20,STANDBY";
    const REFLOW: &str = "1.0,24,24,0,0,50,25.0,120,0,20,REFLOW";

    #[test]
    fn test_one_clear_then_one_flush() {
        let (mut p, log, _) = pipeline(false);
        p.process_line(STANDBY);
        assert_eq!(p.process_line(REFLOW), LineOutcome::SessionStarted);
        assert!(matches!(p.process_line(STANDBY), LineOutcome::SessionSaved(_)));

        assert_eq!(log.borrow().as_slice(), ["clear", "flush"]);
        assert_eq!(p.stats().sessions_started, 1);
        assert_eq!(p.stats().sessions_saved, 1);
    }

    #[test]
    fn test_profile_announced_before_reflow() {
        let (mut p, _, _) = pipeline(false);
        for line in [
            STANDBY,
            "Starting reflow with profile: Lead-Free 1",
            REFLOW,
            STANDBY,
        ] {
            p.process_line(line);
        }

        let sessions = &p.persister().sessions;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].profile_name, "Lead-Free 1");
        assert_eq!(sessions[0].records.len(), 1);
        assert_eq!(sessions[0].records[0].actual, 25.0);
    }

    #[test]
    fn test_malformed_line_does_not_interrupt() {
        let (mut p, _, _) = pipeline(false);
        p.process_line(STANDBY);
        p.process_line(REFLOW);
        assert_eq!(p.process_line("1.0,2.0"), LineOutcome::Rejected);
        p.process_line("2.0,24,24,0,0,50,26.0,120,0,20,REFLOW");
        p.process_line(STANDBY);

        let records = &p.persister().sessions[0].records;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].actual, 26.0);
        assert_eq!(p.stats().rejected, 1);
    }

    #[test]
    fn test_unknown_mode_sample_is_logged() {
        let (mut p, _, _) = pipeline(false);
        p.process_line(STANDBY);
        p.process_line(REFLOW);
        assert_eq!(
            p.process_line("2.0,24,24,0,0,50,26.0,120,0,20,Reflow"),
            LineOutcome::Processed
        );
        p.process_line("3.0,24,24,0,0,50,27.0,120,0,20,REFLOW");
        p.process_line(STANDBY);

        let records = &p.persister().sessions[0].records;
        let actual: Vec<f64> = records.iter().map(|s| s.actual).collect();
        assert_eq!(actual, [25.0, 26.0, 27.0]);
        assert_eq!(records[1].mode, None);
        assert_eq!(p.stats().rejected, 0);
    }

    #[test]
    fn test_malformed_line_leaves_state_untouched() {
        let (mut p, _, _) = pipeline(false);
        p.process_line(REFLOW);
        let before = p.machine().state().clone();
        let records = p.machine().records().len();

        p.process_line("1,2,3,4,5,6,7,8,9,10,11,12");
        p.process_line("");
        assert_eq!(p.machine().state(), &before);
        assert_eq!(p.machine().records().len(), records);
        assert_eq!(p.stats().rejected, 1);
    }

    #[test]
    fn test_save_failure_is_recovered() {
        let (mut p, _, _) = pipeline(true);
        p.process_line(STANDBY);
        p.process_line(REFLOW);
        assert!(matches!(p.process_line(STANDBY), LineOutcome::SaveFailed(_)));

        assert_eq!(p.process_line(REFLOW), LineOutcome::SessionStarted);
        assert_eq!(p.stats().save_failures, 1);
    }

    #[test]
    fn test_comments_routed_to_handler() {
        let seen: Log = Log::default();
        let sink = seen.clone();
        let (p, _, _) = pipeline(false);
        let mut p = p.with_comment_handler(move |text| sink.borrow_mut().push(text.to_string()));

        p.process_line("# T-962 controller");
        assert_eq!(seen.borrow().as_slice(), ["# T-962 controller"]);
        assert_eq!(p.stats().comments, 1);
    }

    #[test]
    fn test_completion_follows_clock() {
        let (mut p, _, clock) = pipeline(false);
        p.process_line(REFLOW);
        assert!(!p.is_complete());
        clock.advance(std::time::Duration::from_secs(6));
        assert!(p.is_complete());
        p.clear_last_action();
        assert!(!p.is_complete());
    }
}
