//! HTTP request handlers for the web adapter.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::domain::error::ErrorCode;
use crate::domain::execution::ExecutionResult;
use crate::domain::pipeline::{Decision, TradeRequest, log_failure};

use super::{AppState, WebError};

#[derive(Debug, Serialize)]
pub struct TradeResponse {
    pub status: &'static str,
    pub details: ExecutionResult,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "Bot is running" }))
}

/// Runs one decision.
///
/// The side-effect free stage runs first on the blocking pool. If the caller
/// goes away while it runs this future is dropped and nothing is submitted.
/// Once the submit task is spawned it finishes and logs its outcome whether
/// or not anyone is still waiting for the reply.
pub async fn trade(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TradeRequest>, JsonRejection>,
) -> Result<Json<TradeResponse>, WebError> {
    let Json(request) = payload?;

    let pipeline = Arc::clone(&state.pipeline);
    let prepared = request.clone();
    let decision = tokio::task::spawn_blocking(move || pipeline.prepare(&prepared))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "prepare task panicked");
            WebError::internal()
        })?;

    let order = match decision {
        Ok(Decision::Submit(order)) => order,
        Ok(Decision::NoTrade(reason)) => {
            return Ok(Json(TradeResponse {
                status: "no_trade",
                details: ExecutionResult::no_trade(reason),
            }));
        }
        Err(err) => {
            log_failure(&err, &request);
            return Err(err.into());
        }
    };

    let pipeline = Arc::clone(&state.pipeline);
    let result = tokio::task::spawn_blocking(move || pipeline.execute(order))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "submit task panicked");
            WebError::internal()
        })?;

    if result.is_executed() {
        return Ok(Json(TradeResponse {
            status: "executed",
            details: result,
        }));
    }

    let code = result.error.unwrap_or(ErrorCode::InternalFault);
    if code == ErrorCode::InternalFault {
        return Err(WebError::internal());
    }
    let message = result.message.clone().unwrap_or_else(|| code.to_string());
    let details = serde_json::to_value(&result).map_err(|e| {
        tracing::error!(error = %e, "failed to render execution result");
        WebError::internal()
    })?;
    Err(WebError::from_code(code, message).with_details(details))
}

pub async fn not_found() -> WebError {
    WebError::new(StatusCode::NOT_FOUND, "not_found", "no such route")
}
