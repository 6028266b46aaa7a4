//! Chart rendering: SVG files, a fixed-grid terminal chart and shared layout.

pub mod ascii;
pub mod charts;
pub mod layout;

pub use ascii::render_ascii_chart;
pub use charts::{ChartSize, render_charts};
