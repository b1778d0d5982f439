//! Vector snapshot of a session chart.

use std::io::{BufWriter, Write};

use printpdf::{BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rgb};

use super::{colour, line_points, ChartLayout, Panel};
use crate::persist::PersistError;
use crate::protocol::Sample;

// 14 x 10 inch page
const PAGE_WIDTH: f32 = 355.6;
const PAGE_HEIGHT: f32 = 254.0;

const TICK_STEP: f64 = 50.0;

/// Panel rectangle in millimetres, origin bottom-left.
#[derive(Debug, Clone, Copy)]
struct Area {
    left: f32,
    bottom: f32,
    width: f32,
    height: f32,
}

impl Area {
    fn x_mm(&self, x: f64, max_x: f64) -> Mm {
        Mm(self.left + (x / max_x).clamp(0.0, 1.0) as f32 * self.width)
    }

    fn y_mm(&self, y: f64, max_y: f64) -> Mm {
        Mm(self.bottom + (y / max_y).clamp(0.0, 1.0) as f32 * self.height)
    }

    fn point(&self, x: f64, y: f64, max_x: f64, max_y: f64) -> Point {
        Point::new(self.x_mm(x, max_x), self.y_mm(y, max_y))
    }
}

fn panel_areas() -> (Area, Area) {
    let left = PAGE_WIDTH * 0.07;
    let width = PAGE_WIDTH * 0.88;
    let bottom = PAGE_HEIGHT * 0.07;
    let gap = PAGE_HEIGHT * 0.02;
    let plot_height = PAGE_HEIGHT * 0.86 - gap;
    let lower_height = plot_height / 5.0;

    let lower = Area { left, bottom, width, height: lower_height };
    let upper = Area {
        left,
        bottom: bottom + lower_height + gap,
        width,
        height: plot_height - lower_height,
    };
    (upper, lower)
}

fn rgb([r, g, b]: [u8; 3]) -> Color {
    Color::Rgb(Rgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}

fn polyline(points: Vec<Point>, is_closed: bool) -> Line {
    Line {
        points: points.into_iter().map(|p| (p, false)).collect(),
        is_closed,
    }
}

/// Render the chart of `records` as a single-page PDF with title and legend.
pub fn render_pdf<W: Write>(
    writer: W,
    layout: &ChartLayout,
    records: &[Sample],
    title: &str,
) -> Result<(), PersistError> {
    let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "chart");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| PersistError::Pdf(e.to_string()))?;
    let canvas = doc.get_page(page).get_layer(layer);
    let (upper, lower) = panel_areas();

    canvas.use_text(
        title,
        14.0,
        Mm(upper.left),
        Mm(upper.bottom + upper.height + 4.0),
        &font,
    );

    for (area, panel) in [(upper, Panel::Temperature), (lower, Panel::Pwm)] {
        let max_y = layout.max_y(panel);
        draw_axes(&canvas, &font, area, layout.max_x, max_y, panel == Panel::Pwm);

        canvas.set_outline_thickness(1.0);
        for (index, line) in layout.lines_on(panel) {
            let points: Vec<Point> = line_points(records, line.channel)
                .into_iter()
                .map(|(x, y)| area.point(x, y, layout.max_x, max_y))
                .collect();
            canvas.set_outline_color(rgb(colour(index)));
            if points.len() > 1 {
                canvas.add_line(polyline(points, false));
            }

            // legend entry, top-right corner
            let y = area.bottom + area.height - 6.0 - index as f32 * 5.0;
            let x = area.left + area.width - 40.0;
            canvas.add_line(polyline(
                vec![Point::new(Mm(x), Mm(y + 1.0)), Point::new(Mm(x + 8.0), Mm(y + 1.0))],
                false,
            ));
            canvas.use_text(line.label.as_str(), 9.0, Mm(x + 10.0), Mm(y), &font);
        }
    }

    canvas.use_text("Temperature", 10.0, Mm(4.0), Mm(upper.bottom + upper.height / 2.0), &font);
    canvas.use_text("PWM value", 10.0, Mm(4.0), Mm(lower.bottom + lower.height / 2.0), &font);
    canvas.use_text("Time [s]", 10.0, Mm(lower.left + lower.width / 2.0), Mm(3.0), &font);

    let mut out = BufWriter::new(writer);
    doc.save(&mut out)
        .map_err(|e| PersistError::Pdf(e.to_string()))?;
    out.flush()?;
    Ok(())
}

fn draw_axes(
    canvas: &PdfLayerReference,
    font: &IndirectFontRef,
    area: Area,
    max_x: f64,
    max_y: f64,
    with_x_labels: bool,
) {
    canvas.set_outline_color(rgb([0, 0, 0]));
    canvas.set_outline_thickness(0.5);
    canvas.add_line(polyline(
        vec![
            area.point(0.0, 0.0, max_x, max_y),
            area.point(max_x, 0.0, max_x, max_y),
            area.point(max_x, max_y, max_x, max_y),
            area.point(0.0, max_y, max_x, max_y),
        ],
        true,
    ));

    let mut tick = 0.0;
    while tick <= max_y {
        canvas.use_text(format!("{tick:.0}"), 7.0, Mm(area.left - 9.0), area.y_mm(tick, max_y), font);
        tick += TICK_STEP;
    }

    if with_x_labels {
        let mut tick = 0.0;
        while tick <= max_x {
            canvas.use_text(format!("{tick:.0}"), 7.0, area.x_mm(tick, max_x), Mm(area.bottom - 5.0), font);
            tick += TICK_STEP;
        }
    }
}
