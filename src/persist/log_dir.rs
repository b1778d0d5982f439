//! Persister writing artifact groups into a log directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{debug, info, warn};
use tempfile::NamedTempFile;

use super::{base_name, with_suffix, write_csv, PersistError, SessionArtifacts, SessionPersister};
use crate::chart::ChartLayout;
use crate::session::CompletedSession;

/// Writes CSV logs (and chart snapshots) into a directory
#[derive(Debug, Clone)]
pub struct LogDirPersister {
    log_dir: PathBuf,
    layout: ChartLayout,
    charts: bool,
}

impl LogDirPersister {
    /// Persister writing into `log_dir` with the default chart layout.
    pub fn new<P: AsRef<Path>>(log_dir: P) -> Self {
        Self {
            log_dir: log_dir.as_ref().to_path_buf(),
            layout: ChartLayout::default(),
            charts: cfg!(feature = "charts"),
        }
    }

    /// Use `layout` for chart snapshots.
    pub fn with_layout(mut self, layout: ChartLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Enable or disable chart snapshots.
    ///
    /// Has no effect without the `charts` feature.
    pub fn with_charts(mut self, charts: bool) -> Self {
        self.charts = charts && cfg!(feature = "charts");
        self
    }

    /// Directory artifacts are written to.
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    fn stage(&self) -> Result<NamedTempFile, PersistError> {
        Ok(NamedTempFile::new_in(&self.log_dir)?)
    }

    #[cfg(feature = "charts")]
    fn stage_charts(
        &self,
        session: &CompletedSession,
        staged: &mut Vec<(NamedTempFile, &'static str)>,
    ) -> Result<(), PersistError> {
        let title = session.title();

        let mut png = self.stage()?;
        crate::chart::render_png(png.as_file_mut(), &self.layout, &session.records, &title)?;
        staged.push((png, "png"));

        let mut pdf = self.stage()?;
        crate::chart::render_pdf(pdf.as_file_mut(), &self.layout, &session.records, &title)?;
        staged.push((pdf, "pdf"));
        Ok(())
    }

    #[cfg(not(feature = "charts"))]
    fn stage_charts(
        &self,
        _session: &CompletedSession,
        _staged: &mut Vec<(NamedTempFile, &'static str)>,
    ) -> Result<(), PersistError> {
        Ok(())
    }
}

impl SessionPersister for LogDirPersister {
    fn flush(&mut self, session: &CompletedSession) -> Result<SessionArtifacts, PersistError> {
        fs::create_dir_all(&self.log_dir)?;
        let base = base_name(&self.log_dir, &Local::now(), &session.profile_name);

        let mut staged = Vec::with_capacity(3);

        let mut csv = self.stage()?;
        write_csv(csv.as_file_mut(), &session.records)?;
        staged.push((csv, "csv"));

        if self.charts {
            self.stage_charts(session, &mut staged)?;
        }

        let mut artifacts = SessionArtifacts {
            csv: with_suffix(&base, "csv"),
            png: None,
            pdf: None,
        };

        for (path, ext) in commit(staged, &base)? {
            match ext {
                "png" => artifacts.png = Some(path),
                "pdf" => artifacts.pdf = Some(path),
                _ => {}
            }
        }

        info!("Saved log in {}", artifacts.csv.display());
        Ok(artifacts)
    }
}

/// Rename staged files next to `base`. On failure the ones already renamed are removed again.
fn commit(
    staged: Vec<(NamedTempFile, &'static str)>,
    base: &Path,
) -> Result<Vec<(PathBuf, &'static str)>, PersistError> {
    let mut committed: Vec<(PathBuf, &'static str)> = Vec::with_capacity(staged.len());

    for (file, ext) in staged {
        let path = with_suffix(base, ext);
        if let Err(e) = file.persist(&path) {
            for (done, _) in &committed {
                if let Err(remove) = fs::remove_file(done) {
                    warn!("Failed to remove {}: {}", done.display(), remove);
                }
            }
            return Err(PersistError::Commit {
                path,
                source: e.error,
            });
        }
        debug!("Wrote {}", path.display());
        committed.push((path, ext));
    }
    Ok(committed)
}
