//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for vwaptrader.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
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

    #[error("no {interval} data for {symbol} between {start} and {end}")]
    DataUnavailable {
        symbol: String,
        interval: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("insufficient data for {symbol}: have {bars} 15-minute bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("no option instrument for {underlying} near {spot} expiring {expiry}")]
    NoMatchingInstrument {
        underlying: String,
        spot: f64,
        expiry: NaiveDate,
    },

    #[error("order for {instrument} rejected: {reason}")]
    OrderRejected { instrument: String, reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error("logging setup failed: {reason}")]
    Telemetry { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TraderError {
    /// Process exit status for this error kind.
    pub fn exit_status(&self) -> u8 {
        match self {
            TraderError::Io(_) | TraderError::Report { .. } | TraderError::Telemetry { .. } => 1,
            TraderError::ConfigParse { .. }
            | TraderError::ConfigMissing { .. }
            | TraderError::ConfigInvalid { .. } => 2,
            TraderError::DataSource { .. } => 3,
            TraderError::NoMatchingInstrument { .. } | TraderError::OrderRejected { .. } => 4,
            TraderError::DataUnavailable { .. } | TraderError::InsufficientData { .. } => 5,
        }
    }
}

impl From<&TraderError> for std::process::ExitCode {
    fn from(err: &TraderError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
