//! HTTP order-entry adapter.
//!
//! One `POST` per attempt; the submitter owns the retry loop. The
//! idempotency key travels both as the `Idempotency-Key` header and as
//! `client_order_id` in the body.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};

use crate::domain::error::TradeError;
use crate::ports::broker_port::{BrokerOrderRequest, BrokerPort, BrokerReceipt};

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

pub struct HttpBroker {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpBroker {
    /// Must be called outside an async context; the blocking client owns
    /// its own runtime.
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self, TradeError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| TradeError::ConfigInvalid {
                section: "broker".into(),
                key: "api_key".into(),
                reason: "api_key contains characters not allowed in a header".into(),
            })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| TradeError::internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Maps a broker reply onto a receipt or a classified failure.
///
/// 2xx with a reference → receipt; 2xx without one, 408, 429 and 5xx →
/// `BrokerUnreachable` (retryable); any other status → `BrokerRejected`.
pub fn classify_response(status: StatusCode, body: &str) -> Result<BrokerReceipt, TradeError> {
    let response: serde_json::Value = serde_json::from_str(body)
        .unwrap_or_else(|_| serde_json::Value::String(body.to_string()));

    if status.is_success() {
        let reference = ["order_id", "id", "reference"]
            .iter()
            .find_map(|field| match response.get(*field) {
                Some(serde_json::Value::String(s)) => Some(s.clone()),
                Some(serde_json::Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| body.trim().to_string());
        if reference.trim().is_empty() {
            // Unconfirmed; a retry reuses the idempotency key.
            return Err(TradeError::BrokerUnreachable {
                reason: format!(
                    "broker returned HTTP {} without an order reference",
                    status
                ),
            });
        }
        return Ok(BrokerReceipt {
            reference,
            response,
        });
    }

    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        return Err(TradeError::BrokerUnreachable {
            reason: format!("broker returned HTTP {}", status),
        });
    }

    Err(TradeError::BrokerRejected {
        reason: format!("HTTP {}", status),
        response: Some(response),
    })
}

impl BrokerPort for HttpBroker {
    fn place_order(&self, request: &BrokerOrderRequest) -> Result<BrokerReceipt, TradeError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header(IDEMPOTENCY_HEADER, request.client_order_id.as_str())
            .json(request)
            .send()
            .map_err(|e| TradeError::BrokerUnreachable {
                reason: if e.is_timeout() {
                    "broker request timed out".to_string()
                } else {
                    format!("broker request failed: {}", e)
                },
            })?;

        let status = resp.status();
        let body = resp.text().map_err(|e| TradeError::BrokerUnreachable {
            reason: format!("failed to read broker response: {}", e),
        })?;
        tracing::debug!(%status, endpoint = %self.endpoint, "broker replied");
        classify_response(status, &body)
    }
}
