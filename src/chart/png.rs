//! Raster snapshot of a session chart.

use std::convert::Infallible;
use std::io::{Seek, Write};

use embedded_graphics::mono_font::iso_8859_1::{FONT_10X20, FONT_7X13};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, Polyline, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use image::{ImageFormat, Rgba, RgbaImage};

use super::{colour, line_points, ChartLayout, Panel};
use crate::protocol::Sample;

const WIDTH: u32 = 1400;
const HEIGHT: u32 = 1000;

const BACKGROUND: Rgb888 = Rgb888::WHITE;
const FRAME: Rgb888 = Rgb888::BLACK;
const GRID: Rgb888 = Rgb888::new(0xe0, 0xe0, 0xe0);

const TICK_STEP: f64 = 50.0;

/// `RgbaImage` as an embedded-graphics draw target.
struct Canvas(RgbaImage);

impl Canvas {
    fn new() -> Self {
        let [r, g, b] = [BACKGROUND.r(), BACKGROUND.g(), BACKGROUND.b()];
        Self(RgbaImage::from_pixel(WIDTH, HEIGHT, Rgba([r, g, b, 0xff])))
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.0.width(), self.0.height())
    }
}

impl DrawTarget for Canvas {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            if x < self.0.width() && y < self.0.height() {
                self.0.put_pixel(x, y, Rgba([color.r(), color.g(), color.b(), 0xff]));
            }
        }
        Ok(())
    }
}

/// Pixel rectangle of one panel.
#[derive(Debug, Clone, Copy)]
struct Area {
    left: i32,
    top: i32,
    width: i32,
    height: i32,
}

impl Area {
    fn right(&self) -> i32 {
        self.left + self.width
    }

    fn bottom(&self) -> i32 {
        self.top + self.height
    }

    fn rectangle(&self) -> Rectangle {
        Rectangle::new(
            Point::new(self.left, self.top),
            Size::new(self.width as u32 + 1, self.height as u32 + 1),
        )
    }

    fn project(&self, x: f64, y: f64, max_x: f64, max_y: f64) -> Point {
        let px = f64::from(self.left) + x / max_x * f64::from(self.width);
        let py = f64::from(self.bottom()) - y / max_y * f64::from(self.height);
        // keep off-chart values close enough that clipping stays cheap
        let limit = 2 * WIDTH.max(HEIGHT) as i32;
        Point::new(
            (px.round() as i32).clamp(-limit, limit),
            (py.round() as i32).clamp(-limit, limit),
        )
    }
}

/// Panel rectangles: room for title and tick labels, 2% gap, heights split 4:1.
fn panel_areas() -> (Area, Area) {
    let (left, right, top, bottom) = (80, 30, 50, 70);
    let gap = (HEIGHT as f64 * 0.02) as i32;
    let width = WIDTH as i32 - left - right;
    let plot_height = HEIGHT as i32 - top - bottom - gap;
    let upper_height = plot_height * 4 / 5;

    let upper = Area { left, top, width, height: upper_height };
    let lower = Area {
        left,
        top: top + upper_height + gap,
        width,
        height: plot_height - upper_height,
    };
    (upper, lower)
}

fn rgb([r, g, b]: [u8; 3]) -> Rgb888 {
    Rgb888::new(r, g, b)
}

/// Render the chart of `records` as a PNG image with title, legends and axis labels.
pub fn render_png<W: Write + Seek>(
    writer: &mut W,
    layout: &ChartLayout,
    records: &[Sample],
    title: &str,
) -> Result<(), image::ImageError> {
    chart_image(layout, records, title).write_to(writer, ImageFormat::Png)
}

fn chart_image(layout: &ChartLayout, records: &[Sample], title: &str) -> RgbaImage {
    let mut canvas = Canvas::new();
    draw_chart(&mut canvas, layout, records, title).unwrap_or_else(|never| match never {});
    canvas.0
}

fn draw_chart(
    canvas: &mut Canvas,
    layout: &ChartLayout,
    records: &[Sample],
    title: &str,
) -> Result<(), Infallible> {
    let large = MonoTextStyle::new(&FONT_10X20, Rgb888::BLACK);
    let small = MonoTextStyle::new(&FONT_7X13, Rgb888::BLACK);
    let centered = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Top)
        .build();

    Text::with_text_style(title, Point::new(WIDTH as i32 / 2, 15), large, centered).draw(canvas)?;

    let (upper, lower) = panel_areas();
    let panels = [
        (upper, Panel::Temperature, "Temperature [°C]"),
        (lower, Panel::Pwm, "PWM value"),
    ];

    for (area, panel, axis_label) in panels {
        let max_y = layout.max_y(panel);
        draw_grid(canvas, area, layout.max_x, max_y, panel == Panel::Pwm, small)?;

        let mut clipped = canvas.clipped(&area.rectangle());
        for (index, line) in layout.lines_on(panel) {
            let points: Vec<Point> = line_points(records, line.channel)
                .into_iter()
                .map(|(x, y)| area.project(x, y, layout.max_x, max_y))
                .collect();
            if points.len() > 1 {
                Polyline::new(&points)
                    .into_styled(PrimitiveStyle::with_stroke(rgb(colour(index)), 2))
                    .draw(&mut clipped)?;
            }
        }

        Text::with_baseline(
            axis_label,
            Point::new(area.left + 8, area.top + 6),
            small,
            Baseline::Top,
        )
        .draw(canvas)?;
        draw_legend(canvas, area, layout, panel, small)?;

        area.rectangle()
            .into_styled(PrimitiveStyle::with_stroke(FRAME, 1))
            .draw(canvas)?;
    }

    let centered_below = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Bottom)
        .build();
    Text::with_text_style(
        "Time [s]",
        Point::new(lower.left + lower.width / 2, HEIGHT as i32 - 10),
        large,
        centered_below,
    )
    .draw(canvas)?;

    Ok(())
}

fn draw_grid(
    canvas: &mut Canvas,
    area: Area,
    max_x: f64,
    max_y: f64,
    with_x_labels: bool,
    font: MonoTextStyle<'_, Rgb888>,
) -> Result<(), Infallible> {
    let grid = PrimitiveStyle::with_stroke(GRID, 1);
    let right_middle = TextStyleBuilder::new()
        .alignment(Alignment::Right)
        .baseline(Baseline::Middle)
        .build();

    let mut tick = 0.0;
    while tick <= max_y {
        let y = area.project(0.0, tick, max_x, max_y).y;
        if tick > 0.0 {
            Line::new(Point::new(area.left, y), Point::new(area.right(), y))
                .into_styled(grid)
                .draw(canvas)?;
        }
        Text::with_text_style(&format!("{tick:.0}"), Point::new(area.left - 6, y), font, right_middle)
            .draw(canvas)?;
        tick += TICK_STEP;
    }

    if with_x_labels {
        let centered = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Top)
            .build();
        let mut tick = 0.0;
        while tick <= max_x {
            let x = area.project(tick, 0.0, max_x, max_y).x;
            Text::with_text_style(&format!("{tick:.0}"), Point::new(x, area.bottom() + 6), font, centered)
                .draw(canvas)?;
            tick += TICK_STEP;
        }
    }
    Ok(())
}

/// Legend in the top-right corner of a panel.
fn draw_legend(
    canvas: &mut Canvas,
    area: Area,
    layout: &ChartLayout,
    panel: Panel,
    font: MonoTextStyle<'_, Rgb888>,
) -> Result<(), Infallible> {
    let x = area.right() - 150;
    for (index, line) in layout.lines_on(panel) {
        let y = area.top + 14 + index as i32 * 16;
        Line::new(Point::new(x, y), Point::new(x + 24, y))
            .into_styled(PrimitiveStyle::with_stroke(rgb(colour(index)), 3))
            .draw(canvas)?;
        Text::with_baseline(&line.label, Point::new(x + 32, y), font, Baseline::Middle).draw(canvas)?;
    }
    Ok(())
}
