use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use std::path::PathBuf;
use std::time::Duration;

use reflowlog::chart::ChartLayout;
use reflowlog::device::{list_candidate_ports, open_first, SerialChannel};
use reflowlog::persist::LogDirPersister;
use reflowlog::pipeline::Pipeline;
use reflowlog::series::{LogView, SeriesStore};
use reflowlog::session::{SessionStateMachine, SystemClock};

mod chart;
mod config;
mod log_cmd;
mod ports;
mod replay;
mod sweep;

pub use config::Config;

/// reflowlog - Session logger for reflow oven controllers
#[derive(Parser)]
#[command(name = "reflowlog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Serial port to try; repeat to give several candidates
    #[arg(short, long = "port", value_name = "PORT", global = true)]
    ports: Vec<String>,

    /// Serial baud rate (default: 115200)
    #[arg(long, global = true)]
    baud_rate: Option<u32>,

    /// Directory session logs are written to (default: logs)
    #[arg(long, value_name = "DIR", global = true)]
    log_dir: Option<PathBuf>,

    /// Write CSV logs only, without PNG/PDF snapshots
    #[arg(long, global = true)]
    no_charts: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log every session the controller runs (default)
    Log,

    /// Run each stored profile in turn and log the sessions
    Test {
        /// Highest profile index to run (default: 6)
        #[arg(long, value_name = "N")]
        profiles: Option<u32>,
    },

    /// List serial ports that can be opened
    Ports,

    /// Ingest a captured transcript instead of a live device
    Replay {
        /// Transcript file, one controller line per line
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Re-render chart snapshots next to a CSV session log
    Chart {
        /// CSV session log
        #[arg(value_name = "CSV")]
        csv: PathBuf,
    },
}

/// Effective settings after merging the config file and flags.
pub struct Settings {
    ports: Vec<String>,
    baud_rate: u32,
    read_timeout: Duration,
    log_dir: PathBuf,
    charts: bool,
    quiet_threshold: Duration,
    last_profile: u32,
    layout: ChartLayout,
}

impl Settings {
    fn resolve(cli: &Cli, config: &Config) -> Result<Self> {
        let ports = if cli.ports.is_empty() {
            config.serial.ports.clone()
        } else {
            cli.ports.clone()
        };

        Ok(Self {
            ports,
            baud_rate: cli.baud_rate.unwrap_or_else(|| config.baud_rate()),
            read_timeout: config.read_timeout(),
            log_dir: cli.log_dir.clone().unwrap_or_else(|| config.log_dir()),
            charts: config.charts() && !cli.no_charts,
            quiet_threshold: config.quiet_threshold()?,
            last_profile: config.last_profile(),
            layout: config.chart_layout()?,
        })
    }

    /// Pipeline writing into the log directory; comments go to stdout.
    fn pipeline(&self) -> Pipeline<LogDirPersister> {
        let series = SeriesStore::new(&self.layout, Box::new(LogView::default()));
        let machine = SessionStateMachine::with_clock(series, SystemClock, self.quiet_threshold);
        let persister = LogDirPersister::new(&self.log_dir)
            .with_layout(self.layout.clone())
            .with_charts(self.charts);

        Pipeline::new(machine, persister).with_comment_handler(|text| println!("{}", text))
    }

    /// Open the configured port, or the first usable one on this system.
    fn open_device(&self) -> Result<SerialChannel> {
        let candidates = if self.ports.is_empty() {
            list_candidate_ports().context("Failed to look for serial ports")?
        } else {
            self.ports.clone()
        };

        if candidates.is_empty() {
            bail!("No serial ports found; pass one with --port");
        }
        debug!("Candidate ports: {:?}", candidates);

        open_first(&candidates, self.baud_rate, self.read_timeout)
            .with_context(|| format!("Could not open any of {}", candidates.join(", ")))
    }
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let mut settings = Settings::resolve(&cli, &config)?;
    info!("Logging to {}", settings.log_dir.display());

    match cli.command.unwrap_or(Commands::Log) {
        Commands::Log => log_cmd::run(&settings),
        Commands::Test { profiles } => {
            if let Some(last_profile) = profiles {
                settings.last_profile = last_profile;
            }
            sweep::run(&settings)
        }
        Commands::Ports => ports::run(),
        Commands::Replay { file } => replay::run(&settings, file),
        Commands::Chart { csv } => chart::run(&settings, csv),
    }
}
