//! Descriptive statistics and the stationarity diagnostic.

pub mod descriptive;
pub mod stationarity;

pub use descriptive::{DescriptiveStats, describe};
pub use stationarity::{AdfResult, TrendSpec, adf_test, default_max_lag, stationarity_report};
