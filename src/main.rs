//! # reflowlog
//!
//! A command-line logger for T-962 style reflow oven controllers.
//!
//! ## Usage
//!
//! ```bash
//! # Log every session the controller runs into logs/
//! reflowlog --port /dev/ttyUSB0
//!
//! # Run profiles 0..=6 back to back
//! reflowlog test
//!
//! # Re-process a captured transcript
//! reflowlog replay capture.txt --log-dir replayed
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
