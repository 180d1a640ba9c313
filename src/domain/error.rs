//! Domain error types.

use chrono::NaiveDate;

use super::series::BalanceTrajectory;
use super::universe::UniverseError;

/// A frequency alias that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frequency '{input}': {reason}")]
pub struct FrequencyError {
    pub input: String,
    pub reason: String,
}

impl FrequencyError {
    pub fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Top-level error type for rebalsim.
#[derive(Debug, thiserror::Error)]
pub enum RebalsimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    InvalidFrequency(#[from] FrequencyError),

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("data alignment error: {reason}")]
    DataAlignment { reason: String },

    #[error("return of {value} for {asset} on {date} leaves no positive value to compound")]
    NumericDomain {
        asset: String,
        date: NaiveDate,
        value: f64,
    },

    #[error("portfolio balance reached zero on {date}")]
    ZeroBalance {
        date: NaiveDate,
        path: BalanceTrajectory,
    },

    #[error("run aborted in period {period} starting {date}: {source}")]
    PeriodAborted {
        period: usize,
        date: NaiveDate,
        trajectory: BalanceTrajectory,
        #[source]
        source: Box<RebalsimError>,
    },

    #[error(transparent)]
    Universe(#[from] UniverseError),

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RebalsimError {
    pub fn alignment(reason: impl Into<String>) -> Self {
        Self::DataAlignment {
            reason: reason.into(),
        }
    }

    pub fn data(reason: impl Into<String>) -> Self {
        Self::Data {
            reason: reason.into(),
        }
    }
}

impl From<&RebalsimError> for std::process::ExitCode {
    fn from(err: &RebalsimError) -> Self {
        let code: u8 = match err {
            RebalsimError::Io(_) | RebalsimError::Report { .. } => 1,
            RebalsimError::ConfigParse { .. }
            | RebalsimError::ConfigMissing { .. }
            | RebalsimError::ConfigInvalid { .. }
            | RebalsimError::InvalidFrequency(_) => 2,
            RebalsimError::Data { .. } | RebalsimError::Universe(_) => 3,
            RebalsimError::DataAlignment { .. } => 4,
            RebalsimError::NumericDomain { .. } | RebalsimError::ZeroBalance { .. } => 5,
            RebalsimError::PeriodAborted { source, .. } => return Self::from(source.as_ref()),
        };
        std::process::ExitCode::from(code)
    }
}
