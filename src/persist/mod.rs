//! # Session Persistence
//!
//! Every completed session is written as a group of artifacts sharing one
//! base name derived from the wall-clock time and the profile:
//!
//! ```text
//! logs/
//! ├── 2024-05-01-142310-Lead-Free_1.csv   # one row per sample
//! ├── 2024-05-01-142310-Lead-Free_1.png   # chart snapshot
//! └── 2024-05-01-142310-Lead-Free_1.pdf   # chart snapshot (vector)
//! ```
//!
//! Artifacts are staged as temporary files in the log directory and renamed
//! into place only after all of them were written. If a rename fails, the
//! artifacts already renamed are removed again.

mod csv_log;
mod error;
mod log_dir;

pub use csv_log::{read_csv, write_csv};
pub use error::PersistError;
pub use log_dir::LogDirPersister;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

use crate::session::CompletedSession;

/// Timestamp format of artifact base names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

/// Paths written for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionArtifacts {
    /// CSV log
    pub csv: PathBuf,
    /// Raster chart, when charts are enabled
    pub png: Option<PathBuf>,
    /// Vector chart, when charts are enabled
    pub pdf: Option<PathBuf>,
}

/// Writes completed sessions to durable storage
pub trait SessionPersister {
    /// Persist one session.
    ///
    /// Either every artifact is written or none is visible.
    fn flush(&mut self, session: &CompletedSession) -> Result<SessionArtifacts, PersistError>;
}

/// Replace characters that are unsafe in file names.
pub fn sanitize_profile(profile: &str) -> String {
    profile.replace([' ', '/'], "_")
}

/// Base path (without extension) of a session's artifacts.
pub fn base_name<Tz>(log_dir: &Path, at: &DateTime<Tz>, profile: &str) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    log_dir.join(format!(
        "{}-{}",
        at.format(TIMESTAMP_FORMAT),
        sanitize_profile(profile)
    ))
}

/// `base` with `.ext` appended; profile names may already contain dots.
pub fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
