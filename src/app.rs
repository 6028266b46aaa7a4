//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs logging
//! - parses CLI arguments and resolves the run configuration
//! - runs the cleaning pipeline
//! - prints summaries/tables/plots
//! - writes optional exports

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::{debug, info};

use crate::cli::{AsciiArgs, ChartArgs, CleanArgs, Command, SourceArgs, StatsArgs, SynthArgs, TuiArgs};
use crate::config::{CSV_ENV, FileConfig, RunConfig};
use crate::data::synth::{SynthConfig, generate_extract, start_for};
use crate::domain::SamplingConfig;
use crate::error::AppError;
use crate::observability::{DEFAULT_DIRECTIVE, init_tracing};
use crate::plot::ChartSize;

pub mod pipeline;

/// Entry point for the `conso` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is normal.
    let _ = dotenvy::dotenv();
    init_tracing(DEFAULT_DIRECTIVE);

    // `conso` and `conso -f x.csv` behave like `conso clean ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Clean(args) => handle_clean(args),
        Command::Stats(args) => handle_stats(args),
        Command::Chart(args) => handle_chart(args),
        Command::Ascii(args) => handle_ascii(args),
        Command::Tui(args) => handle_tui(args),
        Command::Synth(args) => handle_synth(args),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Merge flags, the TOML file and the environment into one run configuration.
pub fn resolve_run(source: &SourceArgs) -> Result<RunConfig, AppError> {
    let file = FileConfig::load(source.config.as_deref())?;
    let env_csv = std::env::var_os(CSV_ENV).map(PathBuf::from);
    let run = RunConfig::resolve(source, file, today(), env_csv)?;
    debug!(?run, "run configuration resolved");
    Ok(run)
}

fn handle_clean(args: CleanArgs) -> Result<(), AppError> {
    let run = resolve_run(&args.source)?;
    let out = pipeline::run_clean(&run)?;

    println!(
        "{}",
        crate::report::format_clean_summary(&out.series, &out.normalization, &out.summary, args.max_gaps)
    );

    if let Some(path) = &args.audit {
        crate::audit::write_audit_bundle(path, &run, &out)?;
        println!("Audit written to {}", path.display());
    }
    Ok(())
}

fn handle_stats(args: StatsArgs) -> Result<(), AppError> {
    let run = resolve_run(&args.source)?;
    let out = pipeline::run_clean(&run)?;
    let report = pipeline::analyze(&out, args.adf_max_lag.or(run.adf_max_lag))?;

    println!("{}", crate::report::format_descriptive(&report.descriptive));
    println!("{}", crate::report::format_stationarity(&report.stationarity));

    if let Some(path) = &args.export_json {
        crate::io::export::write_report_json(path, &report)?;
        info!(path = %path.display(), "report exported");
    }
    if let Some(path) = &args.export_csv {
        crate::io::export::write_stats_csv(path, &report.descriptive)?;
        info!(path = %path.display(), "statistics exported");
    }
    Ok(())
}

fn handle_chart(args: ChartArgs) -> Result<(), AppError> {
    let run = resolve_run(&args.source)?;
    let out = pipeline::run_clean(&run)?;
    let window = pipeline::window(&out.series, args.range.start, args.range.end)?;

    let size = ChartSize {
        width: args.width,
        height: args.height,
    };
    let written = crate::plot::render_charts(args.kind, &out.series, window, &args.out_dir, size)?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

fn handle_ascii(args: AsciiArgs) -> Result<(), AppError> {
    let run = resolve_run(&args.source)?;
    let out = pipeline::run_clean(&run)?;
    let window = pipeline::window(&out.series, args.range.start, args.range.end)?;
    println!("{}", crate::plot::render_ascii_chart(window, args.width, args.height));
    Ok(())
}

fn handle_tui(args: TuiArgs) -> Result<(), AppError> {
    let run = resolve_run(&args.source)?;
    let out = pipeline::run_clean(&run)?;
    crate::tui::run(out, args.window_days)
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let sampling = SamplingConfig {
        interval_minutes: args.interval_minutes,
        ..SamplingConfig::default()
    };
    let config = synth_config_from_args(&args, today());
    let readings = generate_extract(&config, &sampling)?;
    crate::io::export::write_extract_path(&args.out, &readings)?;
    println!("Wrote {} rows to {}", readings.len(), args.out.display());
    Ok(())
}

pub fn synth_config_from_args(args: &SynthArgs, today: NaiveDate) -> SynthConfig {
    SynthConfig {
        start: args.start.unwrap_or_else(|| start_for(today, args.days)),
        days: args.days,
        base_mw: args.base_mw,
        zero_rate: args.zero_rate,
        drop_rate: args.drop_rate,
        outages: args.outages,
        seed: args.seed,
        ..SynthConfig::default()
    }
}

/// Rewrite argv so `conso` defaults to `conso clean`.
///
/// Rules:
/// - `conso`                      -> `conso clean`
/// - `conso -f lyon.csv ...`      -> `conso clean -f lyon.csv ...`
/// - `conso --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("clean".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(
        arg1.as_str(),
        "clean" | "stats" | "chart" | "ascii" | "tui" | "synth"
    );
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "clean".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_clean() {
        assert_eq!(rewrite_args(argv(&["conso"])), argv(&["conso", "clean"]));
    }

    #[test]
    fn leading_flag_is_routed_to_clean() {
        assert_eq!(
            rewrite_args(argv(&["conso", "-f", "lyon.csv"])),
            argv(&["conso", "clean", "-f", "lyon.csv"])
        );
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        for args in [
            &["conso", "stats", "-f", "x.csv"][..],
            &["conso", "--help"][..],
            &["conso", "-V"][..],
            &["conso", "synth"][..],
        ] {
            assert_eq!(rewrite_args(argv(args)), argv(args));
        }
    }

    #[test]
    fn rewritten_argv_parses() {
        let cli = crate::cli::Cli::try_parse_from(rewrite_args(argv(&["conso", "--max-gaps", "3"]))).unwrap();
        let Command::Clean(args) = cli.command else {
            panic!("expected clean");
        };
        assert_eq!(args.max_gaps, 3);
    }

    #[test]
    fn synth_start_defaults_to_days_before_today() {
        let cli = crate::cli::Cli::try_parse_from(["conso", "synth", "--days", "10"]).unwrap();
        let Command::Synth(args) = cli.command else {
            panic!("expected synth");
        };
        let today = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        let config = synth_config_from_args(&args, today);
        assert_eq!(config.start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(config.days, 10);
        assert_eq!(config.seed, 42);
    }
}
