use anyhow::{Context, Result};
use log::info;

use reflowlog::runner::ProfileRunner;

use super::Settings;

/// Run profiles `0..=last_profile` back to back
pub fn run(settings: &Settings) -> Result<()> {
    let mut channel = settings.open_device()?;
    let mut pipeline = settings.pipeline();
    let runner = ProfileRunner::new(settings.last_profile);

    info!(
        "Sweeping profiles 0..={} (quiet threshold {:?})",
        runner.last_profile(),
        settings.quiet_threshold
    );
    let summary = runner
        .run(&mut channel, &mut pipeline)
        .context("Profile sweep aborted")?;

    println!("Done.");
    println!("  Profiles run: {}", summary.profiles_run);
    println!("  {}", summary.stats);
    Ok(())
}
