//! Cleaning pipeline: normalization onto the time grid, then gap reconstruction.

pub mod normalize;
pub mod reconstruct;

pub use normalize::{NormalizeOptions, NormalizeReport, Normalized, normalize};
pub use reconstruct::{AbsentRun, Gap, ReconstructionSummary, RunClass, reconstruct};
