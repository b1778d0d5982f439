use anyhow::{Context, Result};
use log::warn;

use reflowlog::device::list_candidate_ports;

/// Print serial ports that can be opened, one per line
pub fn run() -> Result<()> {
    let ports = list_candidate_ports().context("Failed to look for serial ports")?;

    if ports.is_empty() {
        warn!("No usable serial ports found");
    }
    for port in ports {
        println!("{}", port);
    }
    Ok(())
}
