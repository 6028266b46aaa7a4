//! `conso-metropoles` library crate.
//!
//! The binary (`conso`) is a thin wrapper around this library so that:
//!
//! - the cleaning pipeline is testable without spawning processes
//! - the cleaned series can feed several front-ends (tables, SVG, terminal, TUI)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod audit;
pub mod clean;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod observability;
pub mod plot;
pub mod profile;
pub mod report;
pub mod stats;
pub mod tui;
