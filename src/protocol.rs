//! # Line Protocol
//!
//! The oven controller reports its state as human-readable text, one message
//! per line. Three kinds of lines are meaningful to the host:
//!
//! - **Comments** start with `#` and are echoed to the user.
//! - **Profile announcements** name the profile the next reflow run will use.
//! - **Data lines** carry eleven comma-separated fields:
//!
//! ```text
//! Time,Temp0,Temp1,Temp2,Temp3,Set,Actual,Heat,Fan,ColdJ,Mode
//! 12.0,25.5,25.0,0.0,0.0,50.0,25.2,120.0,0.0,24.0,REFLOW
//! ```
//!
//! Anything else is rejected as a whole; a line is never partially accepted.

use log::warn;
use std::fmt;
use std::str::FromStr;

/// Field names of a data line, in wire order.
pub const FIELD_NAMES: [&str; 11] = [
    "Time", "Temp0", "Temp1", "Temp2", "Temp3", "Set", "Actual", "Heat", "Fan", "ColdJ", "Mode",
];

/// Field delimiter of a data line.
pub const DELIMITER: char = ',';

/// Comment marker.
pub const COMMENT_PREFIX: &str = "#";

/// Announcement printed when a reflow run starts.
pub const REFLOW_START_PREFIX: &str = "Starting reflow with profile: ";

/// Announcement printed after `select profile <id>`.
pub const PROFILE_SELECTED_PREFIX: &str = "Selected profile";

// The profile name follows at a fixed offset; for `Selected profile` the
// firmware prints `Selected profile NN: ` before the name.
const REFLOW_START_NAME_OFFSET: usize = 30;
const PROFILE_SELECTED_NAME_OFFSET: usize = 20;

/// Errors that reject a line as unparsable
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// The line was empty after trimming
    #[error("empty line")]
    Empty,

    /// The line did not split into the expected number of fields
    #[error("Expected {expected} fields, found {found}")]
    FieldCount {
        /// Number of fields in the schema
        expected: usize,
        /// Number of fields on the line
        found: usize,
    },

    /// A numeric field could not be parsed as a float
    #[error("Field {field} is not a number: {value:?}")]
    InvalidNumber {
        /// Field name from [`FIELD_NAMES`]
        field: &'static str,
        /// Offending text
        value: String,
    },

    /// A mode token other than `STANDBY`, `BAKE` or `REFLOW`
    #[error("Unknown mode: {0:?}")]
    InvalidMode(String),
}

impl ParseError {
    /// Whether the rejection should go unreported.
    ///
    /// Blank lines are common on the wire (e.g. after a command echo) and are
    /// dropped without a diagnostic.
    pub fn is_silent(&self) -> bool {
        matches!(self, ParseError::Empty)
    }
}

/// Operating mode reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Idle, heater and fan under manual/standby control
    Standby,
    /// Constant-temperature bake
    Bake,
    /// Profile-driven reflow run
    Reflow,
}

impl Mode {
    /// Wire token for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Standby => "STANDBY",
            Mode::Bake => "BAKE",
            Mode::Reflow => "REFLOW",
        }
    }

    /// Whether this mode is a running session (bake or reflow).
    pub fn is_active(&self) -> bool {
        matches!(self, Mode::Bake | Mode::Reflow)
    }
}

impl FromStr for Mode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STANDBY" => Ok(Mode::Standby),
            "BAKE" => Ok(Mode::Bake),
            "REFLOW" => Ok(Mode::Reflow),
            other => Err(ParseError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A telemetry channel carried by every data line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Thermocouple input 0
    Temp0,
    /// Thermocouple input 1
    Temp1,
    /// Thermocouple input 2
    Temp2,
    /// Thermocouple input 3
    Temp3,
    /// Temperature setpoint
    Set,
    /// Control temperature used by the regulator
    Actual,
    /// Heater PWM duty
    Heat,
    /// Fan PWM duty
    Fan,
    /// Cold-junction reference temperature
    ColdJ,
}

impl Channel {
    /// All channels in wire order.
    pub const ALL: [Channel; 9] = [
        Channel::Temp0,
        Channel::Temp1,
        Channel::Temp2,
        Channel::Temp3,
        Channel::Set,
        Channel::Actual,
        Channel::Heat,
        Channel::Fan,
        Channel::ColdJ,
    ];

    /// Field name of this channel on the wire and in CSV headers.
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Temp0 => "Temp0",
            Channel::Temp1 => "Temp1",
            Channel::Temp2 => "Temp2",
            Channel::Temp3 => "Temp3",
            Channel::Set => "Set",
            Channel::Actual => "Actual",
            Channel::Heat => "Heat",
            Channel::Fan => "Fan",
            Channel::ColdJ => "ColdJ",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One parsed data line
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Seconds since the session timer started; 0 means no timer is running
    pub time: f64,
    /// Thermocouple 0 temperature
    pub temp0: f64,
    /// Thermocouple 1 temperature
    pub temp1: f64,
    /// Thermocouple 2 temperature
    pub temp2: f64,
    /// Thermocouple 3 temperature
    pub temp3: f64,
    /// Setpoint
    pub set: f64,
    /// Control temperature
    pub actual: f64,
    /// Heater duty
    pub heat: f64,
    /// Fan duty
    pub fan: f64,
    /// Cold-junction temperature
    pub cold_j: f64,
    /// Operating mode, absent when the mode field is blank
    pub mode: Option<Mode>,
}

impl Sample {
    /// Value of a single channel.
    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Temp0 => self.temp0,
            Channel::Temp1 => self.temp1,
            Channel::Temp2 => self.temp2,
            Channel::Temp3 => self.temp3,
            Channel::Set => self.set,
            Channel::Actual => self.actual,
            Channel::Heat => self.heat,
            Channel::Fan => self.fan,
            Channel::ColdJ => self.cold_j,
        }
    }

    /// Whether the session timer was running when this sample was taken.
    pub fn has_timer(&self) -> bool {
        self.time != 0.0
    }

    /// Field values as text, in [`FIELD_NAMES`] order.
    ///
    /// Numbers use the shortest representation that parses back to the same
    /// `f64`, always with a fractional part (`25.0`, not `25`).
    pub fn to_fields(&self) -> [String; 11] {
        let mut fields: [String; 11] = Default::default();
        fields[0] = format_number(self.time);
        for (slot, channel) in fields[1..10].iter_mut().zip(Channel::ALL) {
            *slot = format_number(self.value(channel));
        }
        fields[10] = self.mode.map(|m| m.as_str().to_string()).unwrap_or_default();
        fields
    }

    /// Serialize back into a wire-format data line.
    pub fn to_line(&self) -> String {
        self.to_fields().join(",")
    }
}

fn format_number(value: f64) -> String {
    format!("{:?}", value)
}

/// Result of classifying one raw line
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    /// A telemetry sample
    Sample(Sample),
    /// A `#` comment, including the marker
    Comment(String),
    /// The active profile is now the given name
    ProfileAnnounced(String),
    /// A line that is neither of the above
    Unparsable {
        /// The line as received
        text: String,
        /// Why it was rejected
        reason: ParseError,
    },
}

/// Classify and parse one line received from the controller.
///
/// Surrounding whitespace (including a trailing `\r`) is ignored.
pub fn parse_line(raw: &str) -> LineEvent {
    let line = raw.trim();

    if line.starts_with(COMMENT_PREFIX) {
        return LineEvent::Comment(line.to_string());
    }

    if line.starts_with(REFLOW_START_PREFIX) {
        return LineEvent::ProfileAnnounced(profile_name(line, REFLOW_START_NAME_OFFSET));
    }

    if line.starts_with(PROFILE_SELECTED_PREFIX) {
        return LineEvent::ProfileAnnounced(profile_name(line, PROFILE_SELECTED_NAME_OFFSET));
    }

    match parse_sample(line) {
        Ok(sample) => LineEvent::Sample(sample),
        Err(reason) => LineEvent::Unparsable {
            text: line.to_string(),
            reason,
        },
    }
}

/// Name after the first `offset` characters of an announcement.
fn profile_name(line: &str, offset: usize) -> String {
    let name: String = line.chars().skip(offset).collect();
    name.trim().to_string()
}

/// Parse a data line into a [`Sample`].
pub fn parse_sample(line: &str) -> Result<Sample, ParseError> {
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let fields: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();
    if fields.len() != FIELD_NAMES.len() {
        return Err(ParseError::FieldCount {
            expected: FIELD_NAMES.len(),
            found: fields.len(),
        });
    }

    let mut numbers = [0.0f64; 10];
    for (i, (slot, text)) in numbers.iter_mut().zip(&fields).enumerate() {
        *slot = text.parse().map_err(|_| ParseError::InvalidNumber {
            field: FIELD_NAMES[i],
            value: text.to_string(),
        })?;
    }

    let mode = match fields[10] {
        "" => None,
        token => match token.parse::<Mode>() {
            Ok(mode) => Some(mode),
            Err(_) => {
                warn!("Unknown mode {:?}, sample kept without mode", token);
                None
            }
        },
    };

    let [time, temp0, temp1, temp2, temp3, set, actual, heat, fan, cold_j] = numbers;
    Ok(Sample {
        time,
        temp0,
        temp1,
        temp2,
        temp3,
        set,
        actual,
        heat,
        fan,
        cold_j,
        mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFLOW_LINE: &str = "1.0,24.5,24.75,0.0,0.0,50.0,25.0,120.0,0.0,23.5,REFLOW";

    #[test]
    fn test_parse_data_line() {
        let event = parse_line(REFLOW_LINE);
        let LineEvent::Sample(sample) = event else {
            panic!("expected sample, got {event:?}");
        };

        assert_eq!(sample.time, 1.0);
        assert_eq!(sample.temp1, 24.75);
        assert_eq!(sample.value(Channel::Actual), 25.0);
        assert_eq!(sample.value(Channel::Heat), 120.0);
        assert_eq!(sample.value(Channel::ColdJ), 23.5);
        assert_eq!(sample.mode, Some(Mode::Reflow));
    }

    #[test]
    fn test_fields_are_trimmed() {
        let event = parse_line("  2.0, 1.0 ,1,1,1,1,1,1,1,1, BAKE \r\n");
        assert!(matches!(
            event,
            LineEvent::Sample(Sample { time, mode: Some(Mode::Bake), .. }) if time == 2.0
        ));
    }

    #[test]
    fn test_comment() {
        assert_eq!(
            parse_line("# Reflow profile loaded"),
            LineEvent::Comment("# Reflow profile loaded".to_string())
        );
    }

    #[test]
    fn test_profile_announcements() {
        assert_eq!(
            parse_line("Starting reflow with profile: Lead-Free 1  "),
            LineEvent::ProfileAnnounced("Lead-Free 1".to_string())
        );
        assert_eq!(
            parse_line("Selected profile 2: AMTECH 4300 63SN/37PB"),
            LineEvent::ProfileAnnounced("AMTECH 4300 63SN/37PB".to_string())
        );
    }

    #[test]
    fn test_short_announcement_yields_empty_name() {
        assert_eq!(
            parse_line("Selected profile"),
            LineEvent::ProfileAnnounced(String::new())
        );
    }

    #[test]
    fn test_wrong_field_count() {
        let event = parse_line("1.0,2.0");
        assert_eq!(
            event,
            LineEvent::Unparsable {
                text: "1.0,2.0".to_string(),
                reason: ParseError::FieldCount { expected: 11, found: 2 },
            }
        );
    }

    #[test]
    fn test_non_numeric_field() {
        let event = parse_line("1.0,x,0,0,0,0,0,0,0,0,STANDBY");
        match event {
            LineEvent::Unparsable { reason, .. } => assert_eq!(
                reason,
                ParseError::InvalidNumber { field: "Temp0", value: "x".to_string() }
            ),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_mode_keeps_sample() {
        let event = parse_line("2.0,0,0,0,0,0,26.0,0,0,0,Reflow");
        assert!(matches!(
            event,
            LineEvent::Sample(Sample { time, actual, mode: None, .. }) if time == 2.0 && actual == 26.0
        ));
        assert!(matches!("standby".parse::<Mode>(), Err(ParseError::InvalidMode(_))));
    }

    #[test]
    fn test_profile_name_uses_character_offset() {
        assert_eq!(
            parse_line("Selected profile \u{2116}: Sn42Bi58"),
            LineEvent::ProfileAnnounced("Sn42Bi58".to_string())
        );
        assert_eq!(
            parse_line("Starting reflow with profile: Bleifrei \u{fc}"),
            LineEvent::ProfileAnnounced("Bleifrei \u{fc}".to_string())
        );
    }

    #[test]
    fn test_negative_nan_time_is_kept() {
        let LineEvent::Sample(sample) = parse_line("-nan,0,0,0,0,0,0,0,0,0,") else {
            panic!("expected sample");
        };
        assert!(sample.time.is_nan());

        let LineEvent::Sample(again) = parse_line(&sample.to_line()) else {
            panic!("expected sample");
        };
        assert!(again.time.is_nan());
    }

    #[test]
    fn test_blank_mode_is_absent() {
        let event = parse_line("0,0,0,0,0,0,0,0,0,0,");
        assert!(matches!(event, LineEvent::Sample(Sample { mode: None, .. })));
    }

    #[test]
    fn test_empty_line_is_silent() {
        match parse_line("   ") {
            LineEvent::Unparsable { reason, .. } => assert!(reason.is_silent()),
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(!ParseError::FieldCount { expected: 11, found: 1 }.is_silent());
    }

    #[test]
    fn test_to_line_keeps_decimal_point() {
        let LineEvent::Sample(sample) = parse_line(REFLOW_LINE) else {
            panic!("expected sample");
        };
        assert_eq!(sample.to_line(), REFLOW_LINE);
    }
}
