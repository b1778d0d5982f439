//! # reflowlog - Session Logger for Reflow Oven Controllers
//!
//! `reflowlog` ingests the line-oriented telemetry a T-962 style reflow oven
//! controller prints on its serial port, reconstructs bake/reflow sessions from
//! the mode field, and writes one CSV log (plus PNG/PDF chart snapshots) per
//! completed session.
//!
//! ## Key Features
//!
//! - **Tolerant line parser**: every line is classified as a sample, a comment,
//!   a profile announcement, or rejected; a malformed line never stops ingestion.
//!
//! - **Inferred sessions**: a session starts on `STANDBY -> BAKE|REFLOW` and
//!   ends on `BAKE|REFLOW -> STANDBY`. The log is flushed exactly once per end.
//!
//! - **Atomic artifacts**: CSV, PNG and PDF share one timestamped base name and
//!   are staged in the log directory before being renamed into place.
//!
//! - **Profile sweeps**: [`runner::ProfileRunner`] drives the controller
//!   through each stored profile and advances once the oven goes quiet.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reflowlog::prelude::*;
//!
//! let series = SeriesStore::new(&ChartLayout::default(), Box::new(LogView::default()));
//! let machine = SessionStateMachine::new(series);
//! let mut pipeline = Pipeline::new(machine, LogDirPersister::new("logs"));
//!
//! let mut channel = open_first(&["/dev/ttyUSB0"], DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT)?;
//! let stats = run_logging(&mut channel, &mut pipeline)?;
//! println!("{}", stats);
//! # Ok::<(), reflowlog::device::ChannelError>(())
//! ```
//!
//! Each completed session produces:
//! ```text
//! logs/
//! ├── 2024-03-01-142530-Lead-Free_1.csv   # 11-column sample log
//! ├── 2024-03-01-142530-Lead-Free_1.png   # raster chart
//! └── 2024-03-01-142530-Lead-Free_1.pdf   # vector chart with legend
//! ```
//!
//! ## Wire Format
//!
//! Data lines carry exactly 11 comma-separated fields:
//!
//! | Field | Type | Description |
//! |-------|------|-------------|
//! | Time | f64 | Seconds since the session timer started (0 = idle) |
//! | Temp0..Temp3 | f64 | Thermocouple readings |
//! | Set | f64 | Setpoint |
//! | Actual | f64 | Controlled temperature |
//! | Heat | f64 | Heater PWM duty |
//! | Fan | f64 | Fan PWM duty |
//! | ColdJ | f64 | Cold junction temperature |
//! | Mode | token | `STANDBY`, `BAKE`, `REFLOW` or empty |
//!
//! ## Architecture
//!
//! - [`protocol`]: line classification and sample parsing
//! - [`series`]: per-line time series feeding the live view
//! - [`session`]: session boundary detection and the quiet-time heuristic
//! - [`persist`]: CSV logs and artifact commit
//! - [`chart`]: chart layout and PNG/PDF snapshots
//! - [`pipeline`]: per-line glue between parser, state machine and persister
//! - [`device`]: line-oriented duplex channel over a serial port
//! - [`runner`]: passive and profile-sweeping read loops

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod chart;
pub mod device;
pub mod persist;
pub mod pipeline;
pub mod protocol;
pub mod runner;
pub mod series;
pub mod session;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::chart::{ChartLayout, Panel, PlotLine};
    pub use crate::device::{
        list_candidate_ports, open_first, open_serial, ChannelError, DeviceChannel, LineChannel,
        SerialChannel, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT,
    };
    pub use crate::persist::{
        read_csv, write_csv, LogDirPersister, PersistError, SessionArtifacts, SessionPersister,
    };
    pub use crate::pipeline::{LineOutcome, Pipeline, PipelineStats};
    pub use crate::protocol::{parse_line, parse_sample, Channel, LineEvent, Mode, ParseError, Sample};
    pub use crate::runner::{run_logging, ProfileRunner, RunSummary};
    pub use crate::series::{LiveView, LogView, NullView, Series, SeriesStore};
    pub use crate::session::{
        Clock, CompletedSession, ManualClock, SessionState, SessionStateMachine, SystemClock,
        Transition,
    };
}
