//! Domain error types.
//!
//! The computational core never fails: short histories produce empty
//! results and undefined ratios fall back to fixed values. These errors
//! belong to configuration loading and the data adapters around it.

/// Top-level error type for crosstrader.
#[derive(Debug, thiserror::Error)]
pub enum CrosstraderError {
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

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("insufficient data for {code}: have {periods} periods, need {minimum}")]
    InsufficientData {
        code: String,
        periods: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CrosstraderError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        CrosstraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        CrosstraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&CrosstraderError> for std::process::ExitCode {
    fn from(err: &CrosstraderError) -> Self {
        let code: u8 = match err {
            CrosstraderError::Io(_) | CrosstraderError::Csv(_) => 1,
            CrosstraderError::ConfigParse { .. }
            | CrosstraderError::ConfigMissing { .. }
            | CrosstraderError::ConfigInvalid { .. } => 2,
            CrosstraderError::DataSource { .. } => 3,
            CrosstraderError::NoData { .. } | CrosstraderError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
