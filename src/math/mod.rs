//! Mathematical utilities: least squares via normal equations or SVD.

pub mod ols;

pub use ols::*;
