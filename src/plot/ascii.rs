//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - original samples: `o`
//! - reconstructed samples: `*`
//! - neighbors joined by a `-` line; absent values leave the grid blank

use crate::domain::Sample;

/// Render the final values of `samples` on a `width × height` grid.
pub fn render_ascii_chart(samples: &[Sample], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return "Chart: no data in selected range\n".to_string();
    };
    let Some((y_min, y_max)) = y_range(samples) else {
        return "Chart: no data in selected range\n".to_string();
    };
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let t_min = 0.0;
    let t_max = ((last.instant - first.instant).num_seconds() as f64).max(1.0);
    let cell = |s: &Sample, v: f64| {
        let t = (s.instant - first.instant).num_seconds() as f64;
        (map_x(t, t_min, t_max, width), map_y(v, y_min, y_max, height))
    };

    let mut grid = vec![vec![' '; width]; height];

    // Lines first so points overlay them.
    for pair in samples.windows(2) {
        if let (Some(a), Some(b)) = (pair[0].final_value(), pair[1].final_value()) {
            let (x0, y0) = cell(&pair[0], a);
            let (x1, y1) = cell(&pair[1], b);
            draw_line(&mut grid, x0, y0, x1, y1, '-');
        }
    }

    for s in samples {
        let Some(v) = s.final_value() else { continue };
        let (x, y) = cell(s, v);
        // A reconstructed sample stays visible when it shares a cell.
        if grid[y][x] != '*' {
            grid[y][x] = if s.is_original() { 'o' } else { '*' };
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Chart: {} to {} | y=[{y_min:.2}, {y_max:.2}] MW\n",
        first.instant.format("%Y-%m-%d %H:%M"),
        last.instant.format("%Y-%m-%d %H:%M"),
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out.push_str("o original  * reconstructed\n");

    out
}

fn y_range(samples: &[Sample]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for v in samples.iter().filter_map(Sample::final_value) {
        min_y = min_y.min(v);
        max_y = max_y.max(v);
    }
    if min_y.is_finite() && max_y.is_finite() {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn sample(i: i64, raw: Option<f64>, fin: Option<f64>) -> Sample {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        Sample {
            instant: start + Duration::minutes(15 * i),
            raw_value: raw,
            interpolated_value: fin,
            final_value: fin,
        }
    }

    #[test]
    fn chart_golden_snapshot_small() {
        let samples = vec![
            sample(0, Some(100.0), Some(100.0)),
            sample(1, None, Some(110.0)),
            sample(2, None, None),
            sample(3, Some(130.0), Some(130.0)),
            sample(4, Some(140.0), Some(140.0)),
        ];

        let txt = render_ascii_chart(&samples, 10, 5);
        let expected = concat!(
            "Chart: 2024-01-01 00:00 to 2024-01-01 01:00 | y=[98.00, 142.00] MW\n",
            "        -o\n",
            "       o  \n",
            "          \n",
            " -*       \n",
            "o         \n",
            "o original  * reconstructed\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn all_absent_renders_placeholder() {
        let samples = vec![sample(0, None, None), sample(1, None, None)];
        assert_eq!(render_ascii_chart(&samples, 20, 5), "Chart: no data in selected range\n");
        assert_eq!(render_ascii_chart(&[], 20, 5), "Chart: no data in selected range\n");
    }
}
