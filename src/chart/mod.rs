//! # Chart Layout and Snapshots
//!
//! The session chart has two stacked panels sharing the time axis:
//!
//! ```text
//! +--------------------------------------+
//! | temperatures (°C)                    |  4
//! |   Actual, Temp0, Temp1, Set, ColdJ   |
//! +--------------------------------------+
//! | PWM duty: Fan, Heat                  |  1
//! +--------------------------------------+
//!   0 s                              max_x
//! ```
//!
//! [`ChartLayout`] describes which channels are plotted where. It drives both
//! the live [`SeriesStore`](crate::series::SeriesStore) and the PNG/PDF
//! snapshots written next to each CSV log.

#[cfg(feature = "charts")]
mod pdf;
#[cfg(feature = "charts")]
mod png;

#[cfg(feature = "charts")]
pub use pdf::render_pdf;
#[cfg(feature = "charts")]
pub use png::render_png;

use crate::protocol::{Channel, Sample};

/// Default x-axis limit in seconds.
pub const DEFAULT_MAX_X: f64 = 470.0;

/// Default y-axis limit of the temperature panel.
pub const DEFAULT_MAX_Y_TEMPERATURE: f64 = 300.0;

/// Default y-axis limit of the PWM panel.
pub const DEFAULT_MAX_Y_PWM: f64 = 260.0;

/// Panel a line is drawn on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    /// Upper panel, temperatures
    Temperature,
    /// Lower panel, PWM duty
    Pwm,
}

/// One plotted line
#[derive(Debug, Clone, PartialEq)]
pub struct PlotLine {
    /// Channel providing the y values
    pub channel: Channel,
    /// Legend label
    pub label: String,
    /// Panel the line belongs to
    pub panel: Panel,
}

impl PlotLine {
    /// Line labelled with the channel name.
    pub fn new(channel: Channel, panel: Panel) -> Self {
        Self {
            channel,
            label: channel.name().to_string(),
            panel,
        }
    }

    /// Override the legend label.
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }
}

/// Full chart configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    /// Lines in draw order
    pub lines: Vec<PlotLine>,
    /// x-axis limit in seconds
    pub max_x: f64,
    /// y-axis limit of the temperature panel
    pub max_y_temperature: f64,
    /// y-axis limit of the PWM panel
    pub max_y_pwm: f64,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self {
            lines: vec![
                PlotLine::new(Channel::Actual, Panel::Temperature),
                PlotLine::new(Channel::Temp0, Panel::Temperature),
                PlotLine::new(Channel::Temp1, Panel::Temperature),
                PlotLine::new(Channel::Set, Panel::Temperature).with_label("Setpoint"),
                PlotLine::new(Channel::ColdJ, Panel::Temperature).with_label("Coldjunction"),
                PlotLine::new(Channel::Fan, Panel::Pwm),
                PlotLine::new(Channel::Heat, Panel::Pwm).with_label("Heater"),
            ],
            max_x: DEFAULT_MAX_X,
            max_y_temperature: DEFAULT_MAX_Y_TEMPERATURE,
            max_y_pwm: DEFAULT_MAX_Y_PWM,
        }
    }
}

impl ChartLayout {
    /// y-axis limit of a panel.
    pub fn max_y(&self, panel: Panel) -> f64 {
        match panel {
            Panel::Temperature => self.max_y_temperature,
            Panel::Pwm => self.max_y_pwm,
        }
    }

    /// Lines on one panel with their index within that panel.
    pub fn lines_on(&self, panel: Panel) -> impl Iterator<Item = (usize, &PlotLine)> {
        self.lines
            .iter()
            .filter(move |line| line.panel == panel)
            .enumerate()
    }
}

/// Points of one plotted line extracted from a session's records.
pub fn line_points(records: &[Sample], channel: Channel) -> Vec<(f64, f64)> {
    records
        .iter()
        .map(|sample| (sample.time, sample.value(channel)))
        .collect()
}

/// Per-panel line colours (matplotlib's default cycle).
#[cfg(feature = "charts")]
pub(crate) const PALETTE: [[u8; 3]; 5] = [
    [0x1f, 0x77, 0xb4],
    [0xff, 0x7f, 0x0e],
    [0x2c, 0xa0, 0x2c],
    [0xd6, 0x27, 0x28],
    [0x94, 0x67, 0xbd],
];

#[cfg(feature = "charts")]
pub(crate) fn colour(index_in_panel: usize) -> [u8; 3] {
    PALETTE[index_in_panel % PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{parse_sample, Mode};

    #[test]
    fn test_default_layout() {
        let layout = ChartLayout::default();
        assert_eq!(layout.lines.len(), 7);
        assert_eq!(layout.lines_on(Panel::Temperature).count(), 5);

        let pwm: Vec<_> = layout.lines_on(Panel::Pwm).map(|(i, l)| (i, l.label.as_str())).collect();
        assert_eq!(pwm, vec![(0, "Fan"), (1, "Heater")]);
        assert_eq!(layout.max_y(Panel::Pwm), 260.0);
    }

    #[test]
    fn test_line_points() {
        let a = parse_sample("1.0,0,0,0,0,0,25.0,10,0,0,REFLOW").unwrap();
        let b = parse_sample("2.0,0,0,0,0,0,26.5,12,0,0,REFLOW").unwrap();
        assert_eq!(a.mode, Some(Mode::Reflow));

        let points = line_points(&[a, b], Channel::Actual);
        assert_eq!(points, vec![(1.0, 25.0), (2.0, 26.5)]);
    }
}
