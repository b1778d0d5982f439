use anyhow::{bail, Context, Result};
use log::info;

use reflowlog::runner::run_logging;

use super::Settings;

/// Log sessions from the controller until the device goes away
pub fn run(settings: &Settings) -> Result<()> {
    let mut channel = settings.open_device()?;
    let mut pipeline = settings.pipeline();

    info!("Waiting for controller output...");
    let stats = run_logging(&mut channel, &mut pipeline).context("Lost the controller")?;

    bail!("Device channel closed after {}", stats)
}
