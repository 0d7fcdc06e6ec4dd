//! Domain error types and the wire-level error taxonomy.

use serde::Serialize;
use std::fmt;

/// Stable error codes reported to callers. Every [`TradeError`] maps onto one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InsufficientData,
    InvalidRiskParameters,
    ClassifierUnavailable,
    BrokerRejected,
    BrokerUnreachable,
    InternalFault,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InsufficientData => "insufficient_data",
            ErrorCode::InvalidRiskParameters => "invalid_risk_parameters",
            ErrorCode::ClassifierUnavailable => "classifier_unavailable",
            ErrorCode::BrokerRejected => "broker_rejected",
            ErrorCode::BrokerUnreachable => "broker_unreachable",
            ErrorCode::InternalFault => "internal_fault",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for smctrader.
#[derive(Debug, thiserror::Error)]
pub enum TradeError {
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

    #[error("market data error: {reason}")]
    MarketData { reason: String },

    #[error("no data for {symbol} on {timeframe}")]
    NoData { symbol: String, timeframe: String },

    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("invalid risk parameters: {reason}")]
    InvalidRiskParameters { reason: String },

    #[error("classifier unavailable: {reason}")]
    ClassifierUnavailable { reason: String },

    #[error("broker rejected order: {reason}")]
    BrokerRejected {
        reason: String,
        response: Option<serde_json::Value>,
    },

    #[error("broker unreachable: {reason}")]
    BrokerUnreachable { reason: String },

    #[error("internal fault: {reason}")]
    InternalFault { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradeError {
    pub fn invalid_risk(reason: impl Into<String>) -> Self {
        TradeError::InvalidRiskParameters {
            reason: reason.into(),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        TradeError::InternalFault {
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            TradeError::NoData { .. } | TradeError::InsufficientData { .. } => {
                ErrorCode::InsufficientData
            }
            TradeError::InvalidRiskParameters { .. } => ErrorCode::InvalidRiskParameters,
            TradeError::ClassifierUnavailable { .. } => ErrorCode::ClassifierUnavailable,
            TradeError::BrokerRejected { .. } => ErrorCode::BrokerRejected,
            TradeError::BrokerUnreachable { .. } => ErrorCode::BrokerUnreachable,
            TradeError::ConfigParse { .. }
            | TradeError::ConfigMissing { .. }
            | TradeError::ConfigInvalid { .. }
            | TradeError::MarketData { .. }
            | TradeError::InternalFault { .. }
            | TradeError::Io(_) => ErrorCode::InternalFault,
        }
    }

    /// Only transport-level broker failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TradeError::BrokerUnreachable { .. })
    }

    /// Message safe to hand to an external caller.
    pub fn public_message(&self) -> String {
        match self.code() {
            ErrorCode::InternalFault => "internal fault".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<&TradeError> for std::process::ExitCode {
    fn from(err: &TradeError) -> Self {
        let code: u8 = match err {
            TradeError::Io(_) | TradeError::InternalFault { .. } => 1,
            TradeError::ConfigParse { .. }
            | TradeError::ConfigMissing { .. }
            | TradeError::ConfigInvalid { .. } => 2,
            TradeError::MarketData { .. }
            | TradeError::NoData { .. }
            | TradeError::InsufficientData { .. } => 3,
            TradeError::InvalidRiskParameters { .. } => 4,
            TradeError::ClassifierUnavailable { .. } => 5,
            TradeError::BrokerRejected { .. } | TradeError::BrokerUnreachable { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
