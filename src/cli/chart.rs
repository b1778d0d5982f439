use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

use reflowlog::persist::read_csv;

use super::Settings;

/// Render PNG/PDF snapshots of an existing CSV log
pub fn run(settings: &Settings, csv: PathBuf) -> Result<()> {
    let handle =
        File::open(&csv).with_context(|| format!("Failed to open CSV log: {}", csv.display()))?;
    let records = read_csv(handle).with_context(|| format!("Not a session log: {}", csv.display()))?;

    let base = csv.with_extension("");
    let title = format!(
        "Profile: {}",
        base.file_name().unwrap_or_default().to_string_lossy()
    );

    for path in render(settings, &base, &records, &title)? {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

#[cfg(feature = "charts")]
fn render(
    settings: &Settings,
    base: &Path,
    records: &[reflowlog::protocol::Sample],
    title: &str,
) -> Result<Vec<PathBuf>> {
    use reflowlog::chart::{render_pdf, render_png};
    use reflowlog::persist::with_suffix;
    use tempfile::NamedTempFile;

    let dir = match base.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut png = NamedTempFile::new_in(dir)?;
    render_png(png.as_file_mut(), &settings.layout, records, title).context("Failed to render PNG")?;

    let mut pdf = NamedTempFile::new_in(dir)?;
    render_pdf(pdf.as_file_mut(), &settings.layout, records, title).context("Failed to render PDF")?;

    let mut written = Vec::with_capacity(2);
    for (file, ext) in [(png, "png"), (pdf, "pdf")] {
        let path = with_suffix(base, ext);
        file.persist(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(not(feature = "charts"))]
fn render(
    _settings: &Settings,
    _base: &Path,
    _records: &[reflowlog::protocol::Sample],
    _title: &str,
) -> Result<Vec<PathBuf>> {
    anyhow::bail!("reflowlog was built without the `charts` feature")
}
