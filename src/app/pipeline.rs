//! Shared cleaning pipeline used by every front-end.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load -> normalize -> reconstruct -> (statistics | charts | browser)
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use chrono::NaiveDate;
use tracing::info;

use crate::clean::{NormalizeOptions, NormalizeReport, ReconstructionSummary, normalize, reconstruct};
use crate::config::{InputSource, RunConfig};
use crate::data::odre::OdreClient;
use crate::domain::{Sample, TimedSeries};
use crate::error::{AppError, EXIT_INPUT};
use crate::io::ingest::{RawExtract, load_extract_path};
use crate::report::AnalysisReport;
use crate::stats::{describe, stationarity_report};

/// All computed outputs of one cleaning run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Human-readable description of where the extract came from.
    pub source: String,
    pub ignored_columns: Vec<String>,
    pub normalization: NormalizeReport,
    pub series: TimedSeries,
    pub summary: ReconstructionSummary,
}

/// Load the raw extract named by `run.input`.
pub fn load_raw(run: &RunConfig) -> Result<(String, RawExtract), AppError> {
    match &run.input {
        InputSource::File(path) => Ok((path.display().to_string(), load_extract_path(path)?)),
        InputSource::Url(url) => Ok((url.clone(), OdreClient::new().fetch_url(url)?)),
        InputSource::Metropole(name) => Ok((format!("ODRE: {name}"), OdreClient::new().fetch_metropole(name)?)),
        InputSource::Prompt => {
            let path = crate::cli::picker::prompt_for_csv_path()?;
            Ok((path.display().to_string(), load_extract_path(&path)?))
        }
    }
}

/// Load, normalize and reconstruct.
pub fn run_clean(run: &RunConfig) -> Result<RunOutput, AppError> {
    let (source, extract) = load_raw(run)?;
    clean_extract(source, extract, run)
}

/// Normalize and reconstruct an already loaded extract.
pub fn clean_extract(source: String, extract: RawExtract, run: &RunConfig) -> Result<RunOutput, AppError> {
    let options = NormalizeOptions {
        today: run.today,
        area: run.area.clone(),
        sampling: run.sampling,
    };
    let normalized = normalize(&extract.readings, &options)?;
    let mut series = normalized.series;
    let summary = reconstruct(&mut series);

    info!(source = %source, samples = series.len(), "cleaning complete");
    Ok(RunOutput {
        source,
        ignored_columns: extract.ignored_columns,
        normalization: normalized.report,
        series,
        summary,
    })
}

/// Descriptive statistics and ADF verdicts over the final series.
pub fn analyze(output: &RunOutput, adf_max_lag: Option<usize>) -> Result<AnalysisReport, AppError> {
    let values = output.series.final_values();
    let descriptive = describe(&values)?;
    let stationarity = stationarity_report(&values, adf_max_lag)?;
    info!(values = values.len(), "statistics computed");
    Ok(AnalysisReport::new(
        &output.series,
        &output.normalization,
        &output.summary,
        descriptive,
        stationarity,
    ))
}

/// Samples within the optional inclusive date window.
pub fn window(series: &TimedSeries, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<&[Sample], AppError> {
    let (Some(first), Some(last)) = (series.first_instant(), series.last_instant()) else {
        return Ok(&[]);
    };
    let start = start.unwrap_or(first.date());
    let end = end.unwrap_or(last.date());
    if start > end {
        return Err(AppError::new(
            EXIT_INPUT,
            format!("Empty date window: start {start} is after end {end}."),
        ));
    }
    Ok(series.date_range(start, end))
}
