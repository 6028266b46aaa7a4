//! Reporting: the serializable analysis report and terminal tables.

pub mod format;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::clean::{NormalizeReport, ReconstructionSummary};
use crate::domain::{Area, SamplingConfig, TimedSeries};
use crate::stats::{AdfResult, DescriptiveStats};

pub use format::{format_clean_summary, format_descriptive, format_stationarity};

/// Everything `conso stats` reports, in one serializable value.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub area: Area,
    pub first_instant: Option<NaiveDateTime>,
    pub last_instant: Option<NaiveDateTime>,
    pub sampling: SamplingConfig,
    pub normalization: NormalizeReport,
    pub reconstruction: ReconstructionSummary,
    pub descriptive: DescriptiveStats,
    pub stationarity: Vec<AdfResult>,
}

impl AnalysisReport {
    pub fn new(
        series: &TimedSeries,
        normalization: &NormalizeReport,
        reconstruction: &ReconstructionSummary,
        descriptive: DescriptiveStats,
        stationarity: Vec<AdfResult>,
    ) -> Self {
        Self {
            area: series.area().clone(),
            first_instant: series.first_instant(),
            last_instant: series.last_instant(),
            sampling: *series.sampling(),
            normalization: normalization.clone(),
            reconstruction: reconstruction.clone(),
            descriptive,
            stationarity,
        }
    }
}
