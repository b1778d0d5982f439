//! TOML configuration file support.
//!
//! Every setting can also be given on the command line; flags win over the file:
//!
//! ```toml
//! # reflowlog.toml
//! [serial]
//! ports = ["/dev/ttyUSB0"]
//! baud_rate = 115200
//! read_timeout_ms = 1000
//!
//! [output]
//! log_dir = "logs"
//!
//! [session]
//! quiet_threshold_secs = 5
//!
//! [runner]
//! last_profile = 6
//!
//! [chart]
//! max_x = 470
//! max_y_temperature = 300
//! max_y_pwm = 260
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reflowlog::chart::ChartLayout;
use reflowlog::device::{DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT};
use reflowlog::runner::DEFAULT_LAST_PROFILE;
use reflowlog::session::DEFAULT_QUIET_THRESHOLD;

/// Default directory for session logs.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Root configuration structure for reflowlog.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Serial port settings.
    #[serde(default)]
    pub serial: SerialConfig,

    /// Where artifacts are written.
    #[serde(default)]
    pub output: OutputConfig,

    /// Session detection settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Profile sweep settings.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Chart axis limits.
    #[serde(default)]
    pub chart: ChartConfig,
}

/// Serial port settings.
#[derive(Debug, Default, Deserialize)]
pub struct SerialConfig {
    /// Explicit candidate ports, tried in order. Empty means enumerate.
    #[serde(default)]
    pub ports: Vec<String>,

    /// Baud rate.
    pub baud_rate: Option<u32>,

    /// Read timeout in milliseconds.
    pub read_timeout_ms: Option<u64>,
}

/// Output settings.
#[derive(Debug, Default, Deserialize)]
pub struct OutputConfig {
    /// Log directory, created on first save.
    pub log_dir: Option<PathBuf>,

    /// Write PNG/PDF snapshots next to each CSV.
    pub charts: Option<bool>,
}

/// Session detection settings.
#[derive(Debug, Default, Deserialize)]
pub struct SessionConfig {
    /// Seconds without BAKE/REFLOW samples before a run counts as complete.
    pub quiet_threshold_secs: Option<f64>,
}

/// Profile sweep settings.
#[derive(Debug, Default, Deserialize)]
pub struct RunnerConfig {
    /// Highest profile index run by `test`.
    pub last_profile: Option<u32>,
}

/// Chart axis limits.
#[derive(Debug, Default, Deserialize)]
pub struct ChartConfig {
    /// x-axis limit in seconds.
    pub max_x: Option<f64>,

    /// y-axis limit of the temperature panel.
    pub max_y_temperature: Option<f64>,

    /// y-axis limit of the PWM panel.
    pub max_y_pwm: Option<f64>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Load `path` if given, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Baud rate, falling back to the controller default.
    pub fn baud_rate(&self) -> u32 {
        self.serial.baud_rate.unwrap_or(DEFAULT_BAUD_RATE)
    }

    /// Serial read timeout.
    pub fn read_timeout(&self) -> Duration {
        self.serial
            .read_timeout_ms
            .map_or(DEFAULT_READ_TIMEOUT, Duration::from_millis)
    }

    /// Log directory.
    pub fn log_dir(&self) -> PathBuf {
        self.output
            .log_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
    }

    /// Whether chart snapshots are written.
    pub fn charts(&self) -> bool {
        self.output.charts.unwrap_or(true)
    }

    /// Quiet threshold of the completion check.
    pub fn quiet_threshold(&self) -> Result<Duration> {
        match self.session.quiet_threshold_secs {
            None => Ok(DEFAULT_QUIET_THRESHOLD),
            Some(secs) => Duration::try_from_secs_f64(secs)
                .with_context(|| format!("Invalid session.quiet_threshold_secs: {}", secs)),
        }
    }

    /// Highest profile index of a sweep.
    pub fn last_profile(&self) -> u32 {
        self.runner.last_profile.unwrap_or(DEFAULT_LAST_PROFILE)
    }

    /// Chart layout with the configured axis limits.
    pub fn chart_layout(&self) -> Result<ChartLayout> {
        let mut layout = ChartLayout::default();
        let limits = [
            ("chart.max_x", self.chart.max_x, &mut layout.max_x),
            (
                "chart.max_y_temperature",
                self.chart.max_y_temperature,
                &mut layout.max_y_temperature,
            ),
            ("chart.max_y_pwm", self.chart.max_y_pwm, &mut layout.max_y_pwm),
        ];

        for (name, value, target) in limits {
            if let Some(value) = value {
                if !(value.is_finite() && value > 0.0) {
                    bail!("{} must be a positive number, got {}", name, value);
                }
                *target = value;
            }
        }
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [serial]
            ports = ["/dev/ttyUSB1", "/dev/ttyACM0"]
            baud_rate = 57600
            read_timeout_ms = 250

            [output]
            log_dir = "/var/log/oven"
            charts = false

            [session]
            quiet_threshold_secs = 2.5

            [runner]
            last_profile = 3

            [chart]
            max_x = 600
            max_y_temperature = 280.0
            max_y_pwm = 255
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.serial.ports, ["/dev/ttyUSB1", "/dev/ttyACM0"]);
        assert_eq!(config.baud_rate(), 57_600);
        assert_eq!(config.read_timeout(), Duration::from_millis(250));
        assert_eq!(config.log_dir(), PathBuf::from("/var/log/oven"));
        assert!(!config.charts());
        assert_eq!(config.quiet_threshold().unwrap(), Duration::from_millis(2500));
        assert_eq!(config.last_profile(), 3);

        let layout = config.chart_layout().unwrap();
        assert_eq!(layout.max_x, 600.0);
        assert_eq!(layout.max_y_temperature, 280.0);
        assert_eq!(layout.max_y_pwm, 255.0);
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [serial]
            baud_rate = 9600
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.baud_rate(), 9600);
        assert!(config.serial.ports.is_empty());
        assert_eq!(config.read_timeout(), DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.baud_rate(), 115_200);
        assert_eq!(config.log_dir(), PathBuf::from("logs"));
        assert_eq!(config.quiet_threshold().unwrap(), Duration::from_secs(5));
        assert_eq!(config.last_profile(), 6);
        assert_eq!(config.chart_layout().unwrap(), ChartLayout::default());
        assert!(config.charts());
    }

    #[test]
    fn test_invalid_axis_limit() {
        let config = Config::from_str("[chart]\nmax_y_pwm = 0").unwrap();
        assert!(config.chart_layout().is_err());
    }

    #[test]
    fn test_negative_quiet_threshold() {
        let config = Config::from_str("[session]\nquiet_threshold_secs = -1").unwrap();
        assert!(config.quiet_threshold().is_err());
    }

    #[test]
    fn test_unreadable_file() {
        let err = Config::from_file(Path::new("/nonexistent/reflowlog.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
