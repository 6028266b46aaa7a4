//! Plotters-powered consumption chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// One polyline in chart coordinates (days since the window start, MW).
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLine {
    pub original: bool,
    pub points: Vec<(f64, f64)>,
}

/// A render-only chart description; all series and bounds are computed by the caller.
pub struct SeriesChart<'a> {
    pub lines: &'a [ChartLine],
    /// X bounds (days since the window start).
    pub x_bounds: [f64; 2],
    /// Y bounds (MW).
    pub y_bounds: [f64; 2],
}

impl<'a> Widget for SeriesChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to build a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            // Terminal cells are low-res: no mesh, ticks are drawn by the caller.
            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .axis_style(&WHITE)
                .draw()?;

            let original_color = RGBColor(0, 200, 0);
            let reconstructed_color = RGBColor(255, 0, 0);

            // Reconstructed pieces on top so short fills stay visible.
            for original in [true, false] {
                let color = if original { original_color } else { reconstructed_color };
                for line in self.lines.iter().filter(|l| l.original == original) {
                    chart.draw_series(LineSeries::new(line.points.iter().copied(), &color))?;
                }
            }
            Ok(())
        });

        widget.render(area, buf);
    }
}
