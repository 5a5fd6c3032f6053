//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for voltrader.
#[derive(Debug, thiserror::Error)]
pub enum VoltraderError {
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

    #[error("unknown market '{market}' (expected HK, CN or US)")]
    UnknownMarket { market: String },

    #[error("data integrity error for {instrument}{}: {reason}", at_date(.date))]
    DataIntegrity {
        instrument: String,
        date: Option<NaiveDate>,
        reason: String,
    },

    #[error("no data for {instrument}")]
    NoData { instrument: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn at_date(date: &Option<NaiveDate>) -> String {
    match date {
        Some(d) => format!(" at {d}"),
        None => String::new(),
    }
}

impl VoltraderError {
    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        VoltraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn integrity(
        instrument: &str,
        date: Option<NaiveDate>,
        reason: impl Into<String>,
    ) -> Self {
        VoltraderError::DataIntegrity {
            instrument: instrument.to_string(),
            date,
            reason: reason.into(),
        }
    }

    /// Configuration errors abort before any run starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            VoltraderError::ConfigParse { .. }
                | VoltraderError::ConfigMissing { .. }
                | VoltraderError::ConfigInvalid { .. }
                | VoltraderError::UnknownMarket { .. }
        )
    }
}

impl From<&VoltraderError> for std::process::ExitCode {
    fn from(err: &VoltraderError) -> Self {
        let code: u8 = match err {
            VoltraderError::Io(_) | VoltraderError::Csv(_) => 1,
            VoltraderError::ConfigParse { .. }
            | VoltraderError::ConfigMissing { .. }
            | VoltraderError::ConfigInvalid { .. }
            | VoltraderError::UnknownMarket { .. } => 2,
            VoltraderError::DataIntegrity { .. } | VoltraderError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
