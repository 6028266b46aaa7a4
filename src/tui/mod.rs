//! Ratatui-based series browser.
//!
//! Shows a window of the reconstructed series with provenance colors (green
//! original, red reconstructed), window statistics and navigation to the
//! unreconstructable gaps.

use std::io;
use std::ops::Range;
use std::time::Duration;

use chrono::NaiveDateTime;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
};
use tracing::info;

use crate::app::pipeline::RunOutput;
use crate::domain::{FillSource, Sample};
use crate::error::{AppError, EXIT_RUNTIME};
use crate::plot::layout::{day_offset, non_degenerate, provenance_segments, value_bounds};
use crate::stats::{DescriptiveStats, describe};

mod plotters_chart;

use plotters_chart::{ChartLine, SeriesChart};

/// Narrowest window reachable by zooming in, in samples.
const MIN_WINDOW: usize = 8;

/// Start the browser on the last `window_days` of the series.
pub fn run(out: RunOutput, window_days: u32) -> Result<(), AppError> {
    if out.series.is_empty() {
        return Err(AppError::new(EXIT_RUNTIME, "Nothing to browse: the series is empty."));
    }
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(out, window_days);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(
                EXIT_RUNTIME,
                format!("Failed to enter alternate screen: {e}"),
            ));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Visible slice of the series, in sample indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ViewWindow {
    start: usize,
    len: usize,
    total: usize,
}

impl ViewWindow {
    /// The last `len` samples.
    fn new(total: usize, len: usize) -> Self {
        let len = len.clamp(MIN_WINDOW.min(total), total);
        Self {
            start: total - len,
            len,
            total,
        }
    }

    fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }

    fn max_start(&self) -> usize {
        self.total - self.len
    }

    fn pan(&mut self, delta: isize) {
        let target = self.start.saturating_add_signed(delta);
        self.start = target.min(self.max_start());
    }

    /// Resize around the current center.
    fn resize(&mut self, len: usize) {
        let center = self.start + self.len / 2;
        self.len = len.clamp(MIN_WINDOW.min(self.total), self.total);
        self.start = center.saturating_sub(self.len / 2).min(self.max_start());
    }

    fn zoom_in(&mut self) {
        self.resize(self.len / 2);
    }

    fn zoom_out(&mut self) {
        self.resize(self.len.saturating_mul(2));
    }

    /// Center the window on sample `idx`.
    fn center_on(&mut self, idx: usize) {
        self.start = idx.saturating_sub(self.len / 2).min(self.max_start());
    }
}

/// Counts and descriptive statistics of the visible window.
#[derive(Debug, Clone, Copy, PartialEq)]
struct WindowSummary {
    original: usize,
    reconstructed: usize,
    absent: usize,
    /// `None` below two present values.
    stats: Option<DescriptiveStats>,
}

fn summarize_window(samples: &[Sample]) -> WindowSummary {
    let mut original = 0;
    let mut reconstructed = 0;
    let mut absent = 0;
    for s in samples {
        match s.fill_source() {
            FillSource::Original => original += 1,
            FillSource::Interpolated | FillSource::WeeklyLag => reconstructed += 1,
            FillSource::Unreconstructed => absent += 1,
        }
    }

    let values: Vec<f64> = samples.iter().filter_map(Sample::final_value).collect();
    WindowSummary {
        original,
        reconstructed,
        absent,
        stats: describe(&values).ok(),
    }
}

/// Provenance polylines of the window plus chart bounds.
fn chart_lines(samples: &[Sample]) -> (Vec<ChartLine>, [f64; 2], [f64; 2]) {
    let Some(origin) = samples.first().map(|s| s.instant) else {
        return (Vec::new(), [0.0, 1.0], [0.0, 1.0]);
    };
    let lines = provenance_segments(samples)
        .into_iter()
        .map(|seg| ChartLine {
            original: seg.original,
            points: seg.points.iter().map(|&(t, v)| (day_offset(origin, t), v)).collect(),
        })
        .collect();

    let last = samples.last().map_or(origin, |s| s.instant);
    let (x0, x1) = non_degenerate(0.0, day_offset(origin, last));
    let (lo, hi) = value_bounds(samples).unwrap_or((0.0, 1.0));
    let (lo, hi) = non_degenerate(lo, hi);
    let pad = (hi - lo) * 0.05;
    (lines, [x0, x1], [lo - pad, hi + pad])
}

struct App {
    out: RunOutput,
    view: ViewWindow,
    /// Start index of each unreconstructable gap.
    gaps: Vec<usize>,
    status: String,
}

impl App {
    fn new(out: RunOutput, window_days: u32) -> Self {
        let per_day = out.series.sampling().samples_per_day();
        let view = ViewWindow::new(out.series.len(), per_day * window_days.max(1) as usize);
        let gaps = out
            .summary
            .unreconstructable
            .iter()
            .filter_map(|g| out.series.index_of(g.start))
            .collect();
        let status = format!("Loaded {}", out.source);
        Self {
            out,
            view,
            gaps,
            status,
        }
    }

    fn window(&self) -> &[Sample] {
        &self.out.series.samples()[self.view.range()]
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(EXIT_RUNTIME, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => needs_redraw = true,
                _ => {}
            }
        }
        info!("browser closed");
        Ok(())
    }

    /// Returns `true` when the browser should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        let step = (self.view.len / 4).max(1) as isize;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Left => self.view.pan(-step),
            KeyCode::Right => self.view.pan(step),
            KeyCode::PageUp => self.view.pan(-(self.view.len as isize)),
            KeyCode::PageDown => self.view.pan(self.view.len as isize),
            KeyCode::Home => self.view.start = 0,
            KeyCode::End => self.view.start = self.view.max_start(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.view.zoom_in(),
            KeyCode::Char('-') => self.view.zoom_out(),
            KeyCode::Char('n') => self.jump_gap(true),
            KeyCode::Char('p') => self.jump_gap(false),
            _ => return false,
        }
        self.status = self.window_label();
        false
    }

    /// Center on the next (or previous) gap after the window center.
    fn jump_gap(&mut self, forward: bool) {
        let center = self.view.start + self.view.len / 2;
        let target = if forward {
            self.gaps.iter().copied().find(|&g| g > center)
        } else {
            self.gaps.iter().rev().copied().find(|&g| g < center)
        };
        match target {
            Some(idx) => self.view.center_on(idx),
            None => self.status = "No further unreconstructable gap.".to_string(),
        }
    }

    fn window_label(&self) -> String {
        let w = self.window();
        match (w.first(), w.last()) {
            (Some(a), Some(b)) => format!("{} .. {}", fmt_instant(a.instant), fmt_instant(b.instant)),
            _ => "-".to_string(),
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        self.draw_header(frame, chunks[0]);
        self.draw_chart(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let series = &self.out.series;
        let summary = summarize_window(self.window());
        let stats = summary.stats.map_or_else(
            || "too few values for statistics".to_string(),
            |d| {
                format!(
                    "mean={:.0} median={:.0} sd={:.0} min={:.0} max={:.0} MW",
                    d.mean, d.median, d.std_dev, d.min, d.max
                )
            },
        );

        let lines = vec![
            Line::from(vec![
                Span::styled("conso", Style::default().fg(Color::Cyan)),
                Span::raw(format!(" - {} ({})", series.area().name, series.area().code)),
            ]),
            Line::from(Span::styled(
                format!(
                    "window: {} | {} of {} samples",
                    self.window_label(),
                    self.view.len,
                    series.len()
                ),
                Style::default().fg(Color::Gray),
            )),
            Line::from(Span::styled(
                format!(
                    "original={} reconstructed={} absent={} | {stats}",
                    summary.original, summary.reconstructed, summary.absent
                ),
                Style::default().fg(Color::Gray),
            )),
        ];

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default()
            .title(Line::from(vec![
                Span::raw("Consumption (MW) "),
                Span::styled("original", Style::default().fg(Color::Green)),
                Span::raw(" / "),
                Span::styled("reconstructed", Style::default().fg(Color::Red)),
            ]))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let window = self.window();
        let (lines, x_bounds, y_bounds) = chart_lines(window);
        let (chart_rect, insets) = chart_layout(inner);
        frame.render_widget(
            SeriesChart {
                lines: &lines,
                x_bounds,
                y_bounds,
            },
            chart_rect,
        );
        if let (Some(insets), Some(origin)) = (insets, window.first().map(|s| s.instant)) {
            draw_axis_ticks(frame, inner, chart_rect, insets, origin, x_bounds, y_bounds);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "←/→ pan  PgUp/PgDn page  +/- zoom  n/p gap  Home/End  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn fmt_instant(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M").to_string()
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 6,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };
    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    origin: NaiveDateTime,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let days = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let t = origin + chrono::Duration::seconds((days * 86_400.0).round() as i64);
        let label = t.format("%d %b %H:%M").to_string();
        let label_len = label.chars().count() as u16;
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let start = x.saturating_sub(label_len / 2).max(inner.x);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height || start + label_len > inner.x + inner.width {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = format!("{y_val:.0}");
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label_len);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let y_label = Paragraph::new("MW").style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    frame.render_widget(
        y_label,
        Rect {
            x: inner.x,
            y: inner.y,
            width: insets.left.saturating_sub(1),
            height: 1,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    /// `pattern` per sample: 'o' original, 'r' reconstructed, '.' absent.
    fn samples(pattern: &str) -> Vec<Sample> {
        pattern.chars()
            .enumerate()
            .map(|(i, c)| {
                let v = 100.0 + 10.0 * i as f64;
                let (raw, fin) = match c {
                    'o' => (Some(v), Some(v)),
                    'r' => (None, Some(v)),
                    _ => (None, None),
                };
                Sample {
                    instant: t0() + chrono::Duration::minutes(15 * i as i64),
                    raw_value: raw,
                    interpolated_value: fin,
                    final_value: fin,
                }
            })
            .collect()
    }

    #[test]
    fn window_opens_on_the_latest_samples() {
        let w = ViewWindow::new(100, 30);
        assert_eq!(w.range(), 70..100);
        assert_eq!(ViewWindow::new(10, 96).range(), 0..10);
    }

    #[test]
    fn pan_is_clamped_to_the_series() {
        let mut w = ViewWindow::new(100, 30);
        w.pan(10);
        assert_eq!(w.start, 70);
        w.pan(-50);
        assert_eq!(w.start, 20);
        w.pan(-50);
        assert_eq!(w.start, 0);
    }

    #[test]
    fn zoom_keeps_the_center_and_limits() {
        let mut w = ViewWindow::new(200, 64);
        w.center_on(100);
        assert_eq!(w.range(), 68..132);
        w.zoom_in();
        assert_eq!(w.range(), 84..116);
        for _ in 0..10 {
            w.zoom_in();
        }
        assert_eq!(w.len, MIN_WINDOW);
        for _ in 0..10 {
            w.zoom_out();
        }
        assert_eq!(w.range(), 0..200);
    }

    #[test]
    fn window_summary_counts_provenance() {
        let s = summarize_window(&samples("oor.o"));
        assert_eq!((s.original, s.reconstructed, s.absent), (3, 1, 1));
        let stats = s.stats.unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 140.0);
        assert!((stats.mean - 117.5).abs() < 1e-12);

        assert_eq!(summarize_window(&samples("o..")).stats, None);
    }

    #[test]
    fn chart_lines_use_day_offsets() {
        let (lines, x, y) = chart_lines(&samples("oorr"));
        assert_eq!(lines.len(), 2);
        assert!(lines[0].original);
        assert_eq!(lines[0].points[0], (0.0, 100.0));
        assert!((x[1] - 45.0 / 1440.0).abs() < 1e-12);
        assert!(y[0] < 100.0 && y[1] > 130.0);
    }

    #[test]
    fn empty_window_has_default_bounds() {
        let (lines, x, y) = chart_lines(&[]);
        assert!(lines.is_empty());
        assert_eq!((x, y), ([0.0, 1.0], [0.0, 1.0]));
    }
}
