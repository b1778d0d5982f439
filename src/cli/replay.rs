use anyhow::{Context, Result};
use log::info;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use reflowlog::device::LineChannel;
use reflowlog::runner::run_logging;

use super::Settings;

/// Feed a captured transcript through the logging pipeline
pub fn run(settings: &Settings, file: PathBuf) -> Result<()> {
    let handle = File::open(&file)
        .with_context(|| format!("Failed to open transcript: {}", file.display()))?;

    // commands have nowhere to go when replaying
    let mut channel = LineChannel::new(BufReader::new(handle), io::sink());
    let mut pipeline = settings.pipeline();

    info!("Replaying {}", file.display());
    let stats = run_logging(&mut channel, &mut pipeline)
        .with_context(|| format!("Failed to read transcript: {}", file.display()))?;

    println!("Replayed {}", file.display());
    println!("  {}", stats);
    Ok(())
}
