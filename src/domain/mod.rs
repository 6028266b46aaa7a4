//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw extract rows (`RawReading`)
//! - the canonical series (`TimedSeries`, `Sample`, `FillSource`)
//! - feed cadence (`SamplingConfig`) and chart selection (`ChartKind`)

pub mod types;

pub use types::*;
