//! # Read Loops
//!
//! Two drivers pull lines from a [`DeviceChannel`] into a [`Pipeline`], one
//! line at a time, on the calling thread:
//!
//! - [`run_logging`] ingests passively until the stream ends.
//! - [`ProfileRunner`] commands the oven through profiles `0..=last_profile`,
//!   advancing whenever the session state machine reports the current run as
//!   complete (quiet threshold elapsed).

use log::{debug, info};

use crate::device::{ChannelError, DeviceChannel};
use crate::persist::SessionPersister;
use crate::pipeline::{Pipeline, PipelineStats};
use crate::session::Clock;

/// Default index of the last profile swept by [`ProfileRunner`].
pub const DEFAULT_LAST_PROFILE: u32 = 6;

/// Ingest every line from `channel` until it closes.
///
/// A closed channel ends the loop normally and returns the counters; any
/// other channel error is propagated. Whether the end of the stream is fatal
/// is the caller's decision.
pub fn run_logging<D, P, C>(
    channel: &mut D,
    pipeline: &mut Pipeline<P, C>,
) -> Result<PipelineStats, ChannelError>
where
    D: DeviceChannel,
    P: SessionPersister,
    C: Clock,
{
    loop {
        match channel.read_line() {
            Ok(line) => {
                pipeline.process_line(&line);
            }
            Err(ChannelError::Closed) => {
                debug!("Channel closed after {}", pipeline.stats());
                return Ok(pipeline.stats());
            }
            Err(e) => return Err(e),
        }
    }
}

/// Summary of a completed profile sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of profiles run
    pub profiles_run: u32,
    /// Pipeline counters at the end of the sweep
    pub stats: PipelineStats,
}

/// Runs every profile of the controller in turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileRunner {
    last_profile: u32,
}

impl Default for ProfileRunner {
    fn default() -> Self {
        Self::new(DEFAULT_LAST_PROFILE)
    }
}

impl ProfileRunner {
    /// Runner over profiles `0..=last_profile`.
    pub fn new(last_profile: u32) -> Self {
        Self { last_profile }
    }

    /// Index of the last profile run.
    pub fn last_profile(&self) -> u32 {
        self.last_profile
    }

    /// Stop whatever runs, select `profile`, and start a reflow.
    pub fn start_profile<D: DeviceChannel>(channel: &mut D, profile: u32) -> Result<(), ChannelError> {
        info!("Running profile {}", profile);
        channel.write_line("stop")?;
        channel.write_line(&format!("select profile {}", profile))?;
        channel.write_line("reflow")?;
        Ok(())
    }

    /// Sweep all profiles.
    ///
    /// After each line is read the completion check runs first; the line is
    /// processed afterwards, even when it triggered the next profile. Returns
    /// once the last profile completes. A closed channel is an error here.
    pub fn run<D, P, C>(
        &self,
        channel: &mut D,
        pipeline: &mut Pipeline<P, C>,
    ) -> Result<RunSummary, ChannelError>
    where
        D: DeviceChannel,
        P: SessionPersister,
        C: Clock,
    {
        let mut profile = 0;
        Self::start_profile(channel, profile)?;

        loop {
            let line = channel.read_line()?;

            if pipeline.is_complete() {
                pipeline.clear_last_action();
                profile += 1;
                if profile > self.last_profile {
                    info!("Done.");
                    return Ok(RunSummary {
                        profiles_run: profile,
                        stats: pipeline.stats(),
                    });
                }
                Self::start_profile(channel, profile)?;
            }

            pipeline.process_line(&line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartLayout;
    use crate::device::LineChannel;
    use crate::persist::{PersistError, SessionArtifacts};
    use crate::series::{NullView, SeriesStore};
    use crate::session::{CompletedSession, ManualClock, SessionStateMachine, SystemClock};
    use std::io::Cursor;
    use std::time::Duration;

    #[derive(Default)]
    struct Discard(usize);

    impl SessionPersister for Discard {
        fn flush(&mut self, session: &CompletedSession) -> Result<SessionArtifacts, PersistError> {
            self.0 += 1;
            Ok(SessionArtifacts {
                csv: format!("{}.csv", session.profile_name).into(),
                png: None,
                pdf: None,
            })
        }
    }

    fn pipeline(threshold: Duration) -> Pipeline<Discard, SystemClock> {
        let series = SeriesStore::new(&ChartLayout::default(), Box::new(NullView));
        let machine = SessionStateMachine::with_clock(series, SystemClock, threshold);
        Pipeline::new(machine, Discard::default())
    }

    #[test]
    fn test_run_logging_until_closed() {
        let input = "\
0,20,20,0,0,0,20,0,0,20,STANDBY
Starting reflow with profile: Lead-Free 1
1,20,20,0,0,50,25,100,0,20,REFLOW
garbage
0,20,20,0,0,0,20,0,0,20,STANDBY
";
        let mut channel = LineChannel::new(Cursor::new(input), Vec::new());
        let mut p = pipeline(Duration::from_secs(5));

        let stats = run_logging(&mut channel, &mut p).unwrap();
        assert_eq!(stats.lines, 5);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.sessions_saved, 1);
        assert_eq!(p.persister().0, 1);
    }

    #[test]
    fn test_start_profile_commands() {
        let mut channel = LineChannel::new(Cursor::new(""), Vec::new());
        ProfileRunner::start_profile(&mut channel, 3).unwrap();
        assert_eq!(channel.into_writer(), b"stop\nselect profile 3\nreflow\n");
    }

    #[test]
    fn test_runner_propagates_closed_channel() {
        let mut channel = LineChannel::new(Cursor::new("# only line\n"), Vec::new());
        let mut p = pipeline(Duration::from_secs(5));
        let result = ProfileRunner::new(2).run(&mut channel, &mut p);
        assert!(matches!(result, Err(ChannelError::Closed)));
    }

    /// Advances a manual clock by one second per line read.
    struct Ticking<D> {
        inner: D,
        clock: ManualClock,
    }

    impl<D: DeviceChannel> DeviceChannel for Ticking<D> {
        fn read_line(&mut self) -> Result<String, ChannelError> {
            self.clock.advance(Duration::from_secs(1));
            self.inner.read_line()
        }

        fn write_line(&mut self, command: &str) -> Result<(), ChannelError> {
            self.inner.write_line(command)
        }
    }

    #[test]
    fn test_runner_sweeps_all_profiles() {
        // each block goes quiet 6 s after its REFLOW sample
        let block = "1,20,20,0,0,50,25,100,0,20,REFLOW\n".to_string() + &"# tick\n".repeat(6);
        let input = block.repeat(3);

        let clock = ManualClock::new();
        let series = SeriesStore::new(&ChartLayout::default(), Box::new(NullView));
        let machine = SessionStateMachine::with_clock(series, clock.clone(), Duration::from_secs(5));
        let mut p = Pipeline::new(machine, Discard::default());
        let mut channel = Ticking {
            inner: LineChannel::new(Cursor::new(input), Vec::new()),
            clock,
        };

        let summary = ProfileRunner::new(2).run(&mut channel, &mut p).unwrap();
        assert_eq!(summary.profiles_run, 3);
        assert_eq!(summary.stats.lines, 20);

        let commands = String::from_utf8(channel.inner.into_writer()).unwrap();
        let selects: Vec<&str> = commands.lines().filter(|l| l.starts_with("select")).collect();
        assert_eq!(selects, ["select profile 0", "select profile 1", "select profile 2"]);
    }

    #[test]
    fn test_default_sweeps_seven_profiles() {
        assert_eq!(ProfileRunner::default().last_profile(), 6);
    }
}
