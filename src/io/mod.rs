//! Input/output helpers.
//!
//! - extract loading (`ingest`)
//! - result exports (CSV/JSON) and extract writing (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
