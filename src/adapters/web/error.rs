//! JSON error responses for the web adapter.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::domain::error::{ErrorCode, TradeError};

/// Rendered as `{"error": {"code": ..., "message": ...}}`, plus a top-level
/// `details` object when one is attached.
#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl WebError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Internal detail never leaves the process.
    pub fn internal() -> Self {
        Self::from_code(ErrorCode::InternalFault, "internal fault")
    }

    pub fn from_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(status_for(code), code.as_str(), message)
    }
}

pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRiskParameters => StatusCode::BAD_REQUEST,
        ErrorCode::InsufficientData | ErrorCode::BrokerRejected => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorCode::ClassifierUnavailable | ErrorCode::BrokerUnreachable => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ErrorCode::InternalFault => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<TradeError> for WebError {
    fn from(err: TradeError) -> Self {
        Self::from_code(err.code(), err.public_message())
    }
}

impl From<JsonRejection> for WebError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), "invalid_request", rejection.body_text())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_statuses() {
        let cases = [
            (ErrorCode::InvalidRiskParameters, 400),
            (ErrorCode::InsufficientData, 422),
            (ErrorCode::BrokerRejected, 422),
            (ErrorCode::ClassifierUnavailable, 503),
            (ErrorCode::BrokerUnreachable, 503),
            (ErrorCode::InternalFault, 500),
        ];
        for (code, status) in cases {
            assert_eq!(status_for(code).as_u16(), status, "{code}");
        }
    }

    #[test]
    fn internal_fault_message_is_redacted() {
        let err = WebError::from(TradeError::internal("db password is hunter2"));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, "internal_fault");
        assert!(!err.message.contains("hunter2"));
    }

    #[test]
    fn details_are_attached() {
        let err = WebError::from_code(ErrorCode::BrokerRejected, "rejected")
            .with_details(json!({"attempts": 1}));
        assert_eq!(err.details, Some(json!({"attempts": 1})));
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn domain_message_is_kept() {
        let err = WebError::from(TradeError::invalid_risk("risk_pct must be positive"));
        assert_eq!(err.code, "invalid_risk_parameters");
        assert!(err.message.contains("risk_pct must be positive"));
    }
}
