//! # Session Series
//!
//! Per-line time series for the live view. One [`Series`] exists for every
//! [`PlotLine`] of the chart layout; all of them receive their point from the
//! same [`Sample`], so they share x values.
//!
//! Rendering is a collaborator behind the [`LiveView`] trait. Every mutation
//! signals a redraw; implementations must return quickly since they run on the
//! ingestion thread.

use log::{debug, info};

use crate::chart::{ChartLayout, PlotLine};
use crate::protocol::Sample;

/// Ordered `(elapsed seconds, value)` points of one plotted line
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// What is plotted
    pub line: PlotLine,
    /// Points in arrival order
    pub points: Vec<(f64, f64)>,
}

impl Series {
    fn new(line: PlotLine) -> Self {
        Self {
            line,
            points: Vec::new(),
        }
    }
}

/// Live view of the accumulated series
pub trait LiveView {
    /// The series changed.
    fn redraw(&mut self, series: &[Series]);

    /// The profile or mode changed.
    fn set_title(&mut self, _title: &str) {}
}

/// View that draws nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullView;

impl LiveView for NullView {
    fn redraw(&mut self, _series: &[Series]) {}
}

/// View reporting title changes through the log
#[derive(Debug, Default, Clone)]
pub struct LogView {
    title: String,
}

impl LiveView for LogView {
    fn redraw(&mut self, series: &[Series]) {
        let points = series.first().map_or(0, |s| s.points.len());
        debug!("{} | {} points", self.title, points);
    }

    fn set_title(&mut self, title: &str) {
        if self.title != title {
            info!("{}", title);
            self.title = title.to_string();
        }
    }
}

/// Accumulates one series per configured plot line
pub struct SeriesStore {
    series: Vec<Series>,
    view: Box<dyn LiveView>,
}

impl SeriesStore {
    /// Create empty series for every line of `layout`.
    pub fn new(layout: &ChartLayout, view: Box<dyn LiveView>) -> Self {
        Self {
            series: layout.lines.iter().cloned().map(Series::new).collect(),
            view,
        }
    }

    /// Append one point to the series at `index` and redraw.
    ///
    /// Out-of-range indices are ignored.
    pub fn add(&mut self, index: usize, x: f64, y: f64) {
        if let Some(series) = self.series.get_mut(index) {
            series.points.push((x, y));
            self.view.redraw(&self.series);
        }
    }

    /// Append `sample` to every series.
    pub fn add_sample(&mut self, sample: &Sample) {
        for series in &mut self.series {
            series.points.push((sample.time, sample.value(series.line.channel)));
        }
        self.view.redraw(&self.series);
    }

    /// Empty every series and redraw.
    pub fn clear(&mut self) {
        for series in &mut self.series {
            series.points.clear();
        }
        self.view.redraw(&self.series);
    }

    /// Forward a title change to the view.
    pub fn set_title(&mut self, title: &str) {
        self.view.set_title(title);
    }

    /// Current series.
    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Number of points per series.
    pub fn len(&self) -> usize {
        self.series.first().map_or(0, |s| s.points.len())
    }

    /// Whether no points have been accumulated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SeriesStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesStore")
            .field("series", &self.series)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{parse_sample, Channel};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct CountingView {
        redraws: Rc<RefCell<usize>>,
        titles: Rc<RefCell<Vec<String>>>,
    }

    impl LiveView for CountingView {
        fn redraw(&mut self, _series: &[Series]) {
            *self.redraws.borrow_mut() += 1;
        }

        fn set_title(&mut self, title: &str) {
            self.titles.borrow_mut().push(title.to_string());
        }
    }

    #[test]
    fn test_add_sample_shares_x() {
        let mut store = SeriesStore::new(&ChartLayout::default(), Box::new(NullView));
        let sample = parse_sample("3.0,21,22,0,0,50,25,100,30,20,REFLOW").unwrap();
        store.add_sample(&sample);

        assert_eq!(store.len(), 1);
        for series in store.series() {
            assert_eq!(series.points[0].0, 3.0);
        }
        let actual = store
            .series()
            .iter()
            .find(|s| s.line.channel == Channel::Actual)
            .unwrap();
        assert_eq!(actual.points, vec![(3.0, 25.0)]);
    }

    #[test]
    fn test_add_and_clear_signal_redraw() {
        let view = CountingView::default();
        let redraws = view.redraws.clone();
        let mut store = SeriesStore::new(&ChartLayout::default(), Box::new(view));

        store.add(0, 1.0, 2.0);
        store.add(99, 1.0, 2.0);
        assert_eq!(*redraws.borrow(), 1);
        assert_eq!(store.series()[0].points, vec![(1.0, 2.0)]);

        store.clear();
        assert_eq!(*redraws.borrow(), 2);
        assert!(store.is_empty());
        assert_eq!(store.series().len(), 7);
    }

    #[test]
    fn test_title_forwarded() {
        let view = CountingView::default();
        let titles = view.titles.clone();
        let mut store = SeriesStore::new(&ChartLayout::default(), Box::new(view));

        store.set_title("Profile: bake Mode: BAKE");
        assert_eq!(titles.borrow().as_slice(), ["Profile: bake Mode: BAKE"]);
    }
}
