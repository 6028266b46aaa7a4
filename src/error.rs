use chrono::NaiveDateTime;
use thiserror::Error;

/// Exit code for usage errors and unreadable inputs.
pub const EXIT_INPUT: u8 = 2;
/// Exit code for extracts that fail structural validation.
pub const EXIT_DATA: u8 = 3;
/// Exit code for runtime failures (network, terminal, rendering).
pub const EXIT_RUNTIME: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<CleanError> for AppError {
    fn from(err: CleanError) -> Self {
        AppError::new(EXIT_DATA, err.to_string())
    }
}

impl From<StatsError> for AppError {
    fn from(err: StatsError) -> Self {
        AppError::new(EXIT_DATA, err.to_string())
    }
}

/// Structural problems found while loading or normalizing an extract.
///
/// Every variant aborts the run. None of them is recoverable row by row: they
/// point at a feed-format change or an upstream data error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CleanError {
    #[error("missing required column `{0}`")]
    MissingColumn(String),

    #[error("line {line}: CSV parse error: {message}")]
    Csv { line: usize, message: String },

    #[error("line {line}: malformed timestamp '{date} {time}': {reason}")]
    MalformedTimestamp {
        line: usize,
        date: String,
        time: String,
        reason: String,
    },

    #[error("line {line}: malformed consumption value '{value}'")]
    MalformedConsumption { line: usize, value: String },

    #[error("duplicate instant {instant} (lines {first_line} and {second_line})")]
    DuplicateInstant {
        instant: NaiveDateTime,
        first_line: usize,
        second_line: usize,
    },

    #[error("line {line}: instant {instant} is not on the {interval_minutes}-minute sampling grid")]
    OffGridInstant {
        line: usize,
        instant: NaiveDateTime,
        interval_minutes: u32,
    },

    #[error("extract mixes several areas ({}); select one with --area", .codes.join(", "))]
    MixedAreas { codes: Vec<String> },

    #[error("no rows left to normalize after same-day exclusion and area filtering")]
    EmptyExtract,

    #[error("invalid sampling configuration: {0}")]
    InvalidSampling(String),
}

/// Failures of the descriptive and stationarity computations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("not enough values: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("regression is singular: {0}")]
    Singular(String),
}
