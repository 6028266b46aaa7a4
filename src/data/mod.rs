//! Extract sources beyond local files: the ODRE open-data export and a
//! seeded synthetic generator.

pub mod odre;
pub mod synth;
