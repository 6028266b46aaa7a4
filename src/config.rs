//! Run configuration.
//!
//! Precedence: built-in defaults < TOML file < command-line flags. The TOML
//! file comes from `--config` or `CONSO_CONFIG`; a missing variable means no
//! file, a missing file named explicitly is an error.
//!
//! ```toml
//! [sampling]
//! interval_minutes = 15
//! interpolation_limit = 4
//! lag_days = 7
//!
//! [source]
//! metropole = "Métropole de Lyon"
//! area = "200046977"
//!
//! [stats]
//! adf_max_lag = 24
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::cli::SourceArgs;
use crate::domain::SamplingConfig;
use crate::error::{AppError, EXIT_INPUT};

pub const CONFIG_ENV: &str = "CONSO_CONFIG";
pub const CSV_ENV: &str = "CONSO_CSV";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub file: Option<PathBuf>,
    pub url: Option<String>,
    pub metropole: Option<String>,
    pub area: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatsConfig {
    pub adf_max_lag: Option<usize>,
}

/// Contents of the TOML configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub sampling: SamplingConfig,
    pub source: SourceConfig,
    pub stats: StatsConfig,
}

impl FileConfig {
    /// Load from `explicit`, else from `$CONSO_CONFIG`, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, AppError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(p) => PathBuf::from(p),
                None => return Ok(Self::default()),
            },
        };
        let contents = fs::read_to_string(&path).map_err(|e| {
            AppError::new(
                EXIT_INPUT,
                format!("Failed to read config '{}': {e}", path.display()),
            )
        })?;
        Self::from_toml_str(&contents)
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Invalid config '{}': {e}", path.display())))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

/// Where the raw extract is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(PathBuf),
    Url(String),
    Metropole(String),
    /// Nothing configured: ask on the terminal.
    Prompt,
}

/// Fully resolved settings of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub input: InputSource,
    pub area: Option<String>,
    pub today: NaiveDate,
    pub sampling: SamplingConfig,
    pub adf_max_lag: Option<usize>,
}

impl RunConfig {
    /// Merge flags over the file configuration.
    ///
    /// `default_today` and `env_csv` are the ambient defaults (local date and
    /// `$CONSO_CSV`), passed in so resolution stays deterministic.
    pub fn resolve(
        args: &SourceArgs,
        file: FileConfig,
        default_today: NaiveDate,
        env_csv: Option<PathBuf>,
    ) -> Result<Self, AppError> {
        let input = if let Some(path) = &args.file {
            InputSource::File(path.clone())
        } else if let Some(url) = &args.url {
            InputSource::Url(url.clone())
        } else if let Some(name) = &args.metropole {
            InputSource::Metropole(name.clone())
        } else if let Some(path) = file.source.file {
            InputSource::File(path)
        } else if let Some(url) = file.source.url {
            InputSource::Url(url)
        } else if let Some(name) = file.source.metropole {
            InputSource::Metropole(name)
        } else if let Some(path) = env_csv {
            InputSource::File(path)
        } else {
            InputSource::Prompt
        };

        let mut sampling = file.sampling;
        if let Some(v) = args.interval_minutes {
            sampling.interval_minutes = v;
        }
        if let Some(v) = args.interp_limit {
            sampling.interpolation_limit = v;
        }
        if let Some(v) = args.lag_days {
            sampling.lag_days = v;
        }
        sampling.validate()?;

        Ok(Self {
            input,
            area: args.area.clone().or(file.source.area),
            today: args.today.unwrap_or(default_today),
            sampling,
            adf_max_lag: file.stats.adf_max_lag,
        })
    }
}
