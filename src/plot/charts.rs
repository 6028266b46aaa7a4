//! Static SVG charts.
//!
//! One file per chart kind, named after `ChartKind::file_stem`. All charts
//! draw the samples they are given; date-range filtering happens upstream.

use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::info;

use super::layout::{date_ticks, day_offset, non_degenerate, present_runs, provenance_segments, value_bounds};
use crate::domain::{ChartKind, Sample, TimedSeries};
use crate::error::{AppError, EXIT_RUNTIME};
use crate::profile::{
    AggregateBar, DailyProfile, Heatmap, annual_aggregate, hour_weekday_heatmap, monthly_aggregate,
    season_profiles, weekday_name, weekday_weekend_profiles,
};

type DrawResult<DB> = Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;
type TimeChart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

const ORIGINAL_COLOR: RGBColor = RGBColor(0, 150, 60);
const RECONSTRUCTED_COLOR: RGBColor = RGBColor(210, 40, 40);
const MISSING_CELL: RGBColor = RGBColor(220, 220, 220);

/// Pixel size of the SVG canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartSize {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Render `kind` (every kind for `ChartKind::All`) into `out_dir`.
///
/// Returns the written paths in rendering order.
pub fn render_charts(
    kind: ChartKind,
    series: &TimedSeries,
    window: &[Sample],
    out_dir: &Path,
    size: ChartSize,
) -> Result<Vec<PathBuf>, AppError> {
    std::fs::create_dir_all(out_dir).map_err(|e| {
        AppError::new(
            EXIT_RUNTIME,
            format!("Failed to create chart directory '{}': {e}", out_dir.display()),
        )
    })?;

    let mut written = Vec::new();
    for kind in kind.expand() {
        let path = out_dir.join(format!("{}.svg", kind.file_stem()));
        render_one(kind, series, window, &path, size)?;
        info!(chart = kind.file_stem(), path = %path.display(), "chart written");
        written.push(path);
    }
    Ok(written)
}

fn render_one(
    kind: ChartKind,
    series: &TimedSeries,
    window: &[Sample],
    path: &Path,
    size: ChartSize,
) -> Result<(), AppError> {
    let root = SVGBackend::new(path, (size.width, size.height)).into_drawing_area();
    let area = &series.area().name;
    let sampling = series.sampling();

    let drawn = match kind {
        ChartKind::Range => draw_range(&root, &format!("{area}: consumption"), window),
        ChartKind::Provenance => draw_provenance(&root, &format!("{area}: original vs reconstructed"), window),
        ChartKind::Annual => draw_bars(
            &root,
            &format!("{area}: mean consumption per year"),
            &annual_aggregate(window, sampling),
        ),
        ChartKind::Monthly => draw_bars(
            &root,
            &format!("{area}: mean consumption per month"),
            &monthly_aggregate(window, sampling),
        ),
        ChartKind::Heatmap => draw_heatmap(
            &root,
            &format!("{area}: mean MW by hour and weekday"),
            &hour_weekday_heatmap(window),
        ),
        ChartKind::Weekday => draw_profiles(
            &root,
            &format!("{area}: weekday vs weekend daily profile"),
            &weekday_weekend_profiles(window, sampling),
            sampling.interval_hours(),
        ),
        ChartKind::Season => draw_profiles(
            &root,
            &format!("{area}: seasonal daily profile"),
            &season_profiles(window, sampling),
            sampling.interval_hours(),
        ),
        ChartKind::All => Ok(()),
    };

    drawn.and_then(|()| root.present()).map_err(|e| {
        AppError::new(
            EXIT_RUNTIME,
            format!("Failed to render chart '{}': {e}", path.display()),
        )
    })
}

fn no_data<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, caption: &str) -> DrawResult<DB> {
    root.draw(&Text::new(caption.to_string(), (20, 20), ("sans-serif", 22)))?;
    root.draw(&Text::new("no data in selected range", (20, 56), ("sans-serif", 16)))?;
    Ok(())
}

/// Axes for a time chart over `samples`, with date ticks drawn under the plot.
///
/// Returns `None` (after drawing a placeholder) when nothing is present.
fn time_chart<'a, DB: DrawingBackend>(
    root: &'a DrawingArea<DB, Shift>,
    caption: &str,
    samples: &[Sample],
) -> Result<Option<TimeChart<'a, DB>>, DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;
    let (Some(first), Some(last), Some((lo, hi))) = (samples.first(), samples.last(), value_bounds(samples)) else {
        no_data(root, caption)?;
        return Ok(None);
    };
    let (lo, hi) = non_degenerate(lo, hi);
    let origin = first.instant;
    let x_max = day_offset(origin, last.instant).max(1.0 / 24.0);

    let mut chart = ChartBuilder::on(root)
        .caption(caption, ("sans-serif", 22))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(72)
        .build_cartesian_2d(0.0..x_max, lo..hi)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        // Date ticks are placed by hand below.
        .x_label_formatter(&|_| String::new())
        .y_desc("MW")
        .y_label_formatter(&|v| format!("{v:.0}"))
        .draw()?;

    let label_style = TextStyle::from(("sans-serif", 13).into_font()).pos(Pos::new(HPos::Center, VPos::Top));
    for (at, label) in date_ticks(origin, last.instant) {
        let (px, py) = chart.backend_coord(&(day_offset(origin, at), lo));
        root.draw(&PathElement::new(vec![(px, py), (px, py + 5)], &BLACK))?;
        root.draw(&Text::new(label, (px, py + 8), label_style.clone()))?;
    }

    Ok(Some(chart))
}

fn draw_range<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, caption: &str, samples: &[Sample]) -> DrawResult<DB> {
    let Some(mut chart) = time_chart(root, caption, samples)? else {
        return Ok(());
    };
    let origin = samples[0].instant;
    for run in present_runs(samples) {
        chart.draw_series(LineSeries::new(
            run.into_iter().map(|(t, v)| (day_offset(origin, t), v)),
            BLUE.stroke_width(1),
        ))?;
    }
    Ok(())
}

fn draw_provenance<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    caption: &str,
    samples: &[Sample],
) -> DrawResult<DB> {
    let Some(mut chart) = time_chart(root, caption, samples)? else {
        return Ok(());
    };
    let origin = samples[0].instant;

    let mut labelled = [false; 2];
    for segment in provenance_segments(samples) {
        let (color, label) = if segment.original {
            (ORIGINAL_COLOR, "original")
        } else {
            (RECONSTRUCTED_COLOR, "reconstructed")
        };
        let anno = chart.draw_series(LineSeries::new(
            segment.points.into_iter().map(|(t, v)| (day_offset(origin, t), v)),
            color.stroke_width(1),
        ))?;
        let seen = &mut labelled[usize::from(segment.original)];
        if !*seen {
            *seen = true;
            anno.label(label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.85))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}

fn draw_bars<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, caption: &str, bars: &[AggregateBar]) -> DrawResult<DB> {
    root.fill(&WHITE)?;
    if bars.is_empty() {
        return no_data(root, caption);
    }
    let top = bars.iter().map(|b| b.mean_mw).fold(0.0, f64::max);
    let top = if top > 0.0 { top * 1.1 } else { 1.0 };

    let mut chart = ChartBuilder::on(root)
        .caption(caption, ("sans-serif", 22))
        .margin(16)
        .x_label_area_size(48)
        .y_label_area_size(72)
        .build_cartesian_2d((0..bars.len()).into_segmented(), 0.0..top)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => bars.get(*i).map(|b| b.label.clone()).unwrap_or_default(),
            _ => String::new(),
        })
        .y_desc("mean MW")
        .y_label_formatter(&|v| format!("{v:.0}"))
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, b)| {
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), b.mean_mw)],
            BLUE.mix(0.7).filled(),
        );
        bar.set_margin(0, 0, 3, 3);
        bar
    }))?;
    Ok(())
}

fn draw_heatmap<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, caption: &str, heatmap: &Heatmap) -> DrawResult<DB> {
    root.fill(&WHITE)?;
    let Some((lo, hi)) = heatmap.bounds() else {
        return no_data(root, caption);
    };
    let caption = format!("{caption} ({lo:.0} to {hi:.0})");

    let mut chart = ChartBuilder::on(root)
        .caption(&caption, ("sans-serif", 22))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(56)
        .build_cartesian_2d((0..7usize).into_segmented(), (0..24usize).into_segmented())?;

    let days = [
        chrono::Weekday::Mon,
        chrono::Weekday::Tue,
        chrono::Weekday::Wed,
        chrono::Weekday::Thu,
        chrono::Weekday::Fri,
        chrono::Weekday::Sat,
        chrono::Weekday::Sun,
    ];

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(7)
        .y_labels(24)
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => days.get(*i).map(|d| weekday_name(*d).to_string()).unwrap_or_default(),
            _ => String::new(),
        })
        .y_label_formatter(&|v| match v {
            SegmentValue::CenterOf(h) => format!("{h:02}h"),
            _ => String::new(),
        })
        .draw()?;

    let span = hi - lo;
    let cells = (0..24usize).flat_map(|h| days.iter().enumerate().map(move |(d, day)| (h, d, *day)));
    chart.draw_series(cells.map(|(h, d, day)| {
        let color = match heatmap.cell(h as u32, day) {
            Some(v) => {
                let t = if span > 0.0 { (v - lo) / span } else { 0.5 };
                let c = colorous::VIRIDIS.eval_continuous(t.clamp(0.0, 1.0));
                RGBColor(c.r, c.g, c.b)
            }
            None => MISSING_CELL,
        };
        Rectangle::new(
            [
                (SegmentValue::Exact(d), SegmentValue::Exact(h)),
                (SegmentValue::Exact(d + 1), SegmentValue::Exact(h + 1)),
            ],
            color.filled(),
        )
    }))?;
    Ok(())
}

fn draw_profiles<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    caption: &str,
    profiles: &[DailyProfile],
    slot_hours: f64,
) -> DrawResult<DB> {
    root.fill(&WHITE)?;
    let bounds = profiles
        .iter()
        .flat_map(|p| p.points().map(|(_, v)| v))
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        });
    let Some((lo, hi)) = bounds else {
        return no_data(root, caption);
    };
    let (lo, hi) = non_degenerate(lo, hi);

    let mut chart = ChartBuilder::on(root)
        .caption(caption, ("sans-serif", 22))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(72)
        .build_cartesian_2d(0.0..24.0, lo..hi)?;

    chart
        .configure_mesh()
        .x_labels(13)
        .x_desc("hour of day")
        .x_label_formatter(&|h| format!("{:02}:00", *h as u32))
        .y_desc("mean MW")
        .y_label_formatter(&|v| format!("{v:.0}"))
        .draw()?;

    for (i, profile) in profiles.iter().enumerate() {
        if profile.points().next().is_none() {
            continue;
        }
        let color = Palette99::pick(i);
        chart
            .draw_series(LineSeries::new(
                profile.points().map(|(slot, v)| (slot as f64 * slot_hours, v)),
                color.stroke_width(2),
            ))?
            .label(profile.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], Palette99::pick(i).stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.85))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}
