//! Command-line parsing for the consumption cleaning pipeline.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the cleaning/statistics code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::ChartKind;

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "conso",
    version,
    about = "Metropolitan electricity consumption: gap reconstruction and profiling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Normalize and reconstruct an extract, then print the cleaning summary.
    Clean(CleanArgs),
    /// Print descriptive statistics and the stationarity diagnostic.
    Stats(StatsArgs),
    /// Render SVG charts of the reconstructed series.
    Chart(ChartArgs),
    /// Draw the reconstructed series as a terminal chart.
    Ascii(AsciiArgs),
    /// Browse the reconstructed series in an interactive terminal UI.
    Tui(TuiArgs),
    /// Write a synthetic extract in the input format.
    Synth(SynthArgs),
}

/// Where the extract comes from and how it is sampled.
///
/// Flags override the TOML configuration file, which overrides the built-in
/// defaults.
#[derive(Debug, Args, Clone, Default)]
pub struct SourceArgs {
    /// Extract to read (semicolon-delimited CSV).
    #[arg(short = 'f', long, value_name = "CSV", conflicts_with_all = ["url", "metropole"])]
    pub file: Option<PathBuf>,

    /// Download the extract from this URL.
    #[arg(long, conflicts_with = "metropole")]
    pub url: Option<String>,

    /// Download the ODRE extract of this metropole (display name).
    #[arg(long)]
    pub metropole: Option<String>,

    /// Keep only rows of this area code.
    #[arg(long)]
    pub area: Option<String>,

    /// Processing date: rows dated on it are excluded (defaults to the local date).
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub today: Option<NaiveDate>,

    /// TOML configuration file (defaults to $CONSO_CONFIG).
    #[arg(long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Minutes between samples.
    #[arg(long)]
    pub interval_minutes: Option<u32>,

    /// Longest absent run (samples) filled by interpolation.
    #[arg(long)]
    pub interp_limit: Option<usize>,

    /// Distance of the fallback sample, in days.
    #[arg(long)]
    pub lag_days: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct CleanArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Write a Markdown audit bundle of the cleaning run.
    #[arg(long, value_name = "MD")]
    pub audit: Option<PathBuf>,

    /// Unreconstructable gaps listed in the summary.
    #[arg(long, default_value_t = 20)]
    pub max_gaps: usize,
}

#[derive(Debug, Args, Clone)]
pub struct StatsArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Largest ADF lag order considered (defaults to Schwert's rule).
    #[arg(long)]
    pub adf_max_lag: Option<usize>,

    /// Export the full report to JSON.
    #[arg(long, value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Export the descriptive statistics row to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_csv: Option<PathBuf>,
}

/// Optional inclusive date window.
#[derive(Debug, Args, Clone, Default)]
pub struct RangeArgs {
    /// First day shown (inclusive).
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub start: Option<NaiveDate>,

    /// Last day shown (inclusive).
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Args, Clone)]
pub struct ChartArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub range: RangeArgs,

    /// Which chart to render.
    #[arg(long, value_enum, default_value_t = ChartKind::All)]
    pub kind: ChartKind,

    /// Directory receiving the SVG files.
    #[arg(long, default_value = "charts")]
    pub out_dir: PathBuf,

    /// Image width (pixels).
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Image height (pixels).
    #[arg(long, default_value_t = 720)]
    pub height: u32,
}

#[derive(Debug, Args, Clone)]
pub struct AsciiArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub range: RangeArgs,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Days visible when the browser opens.
    #[arg(long, default_value_t = 14)]
    pub window_days: u32,
}

#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Output CSV path.
    #[arg(short = 'o', long, default_value = "synthetic.csv")]
    pub out: PathBuf,

    /// Number of days generated.
    #[arg(long, default_value_t = 28)]
    pub days: u32,

    /// First generated day (defaults to `days` before today).
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub start: Option<NaiveDate>,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Mean load (MW).
    #[arg(long, default_value_t = 1500.0)]
    pub base_mw: f64,

    /// Probability of an isolated zero reading.
    #[arg(long, default_value_t = 0.002)]
    pub zero_rate: f64,

    /// Probability of a missing row.
    #[arg(long, default_value_t = 0.002)]
    pub drop_rate: f64,

    /// Number of multi-sample outages.
    #[arg(long, default_value_t = 3)]
    pub outages: usize,

    /// Minutes between samples.
    #[arg(long, default_value_t = 15)]
    pub interval_minutes: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn source_flags_parse_with_overrides() {
        let cli = Cli::try_parse_from([
            "conso",
            "stats",
            "-f",
            "lyon.csv",
            "--today",
            "2024-05-01",
            "--interp-limit",
            "2",
            "--adf-max-lag",
            "10",
        ])
        .unwrap();
        let Command::Stats(args) = cli.command else {
            panic!("expected stats");
        };
        assert_eq!(args.source.file, Some(PathBuf::from("lyon.csv")));
        assert_eq!(args.source.today, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(args.source.interp_limit, Some(2));
        assert_eq!(args.adf_max_lag, Some(10));
    }

    #[test]
    fn file_and_url_conflict() {
        let res = Cli::try_parse_from(["conso", "clean", "-f", "a.csv", "--url", "http://x"]);
        assert!(res.is_err());
    }

    #[test]
    fn chart_kind_parses() {
        let cli = Cli::try_parse_from(["conso", "chart", "--kind", "heatmap"]).unwrap();
        let Command::Chart(args) = cli.command else {
            panic!("expected chart");
        };
        assert_eq!(args.kind, ChartKind::Heatmap);
        assert_eq!(args.out_dir, PathBuf::from("charts"));
    }
}
