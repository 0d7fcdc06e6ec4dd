//! Order submission and execution outcomes.
//!
//! The submitter drives each order through
//!
//! ```text
//! Pending -> Submitted -> Confirmed
//! Pending -> Submitted -> RejectedByBroker
//! Pending -> FailedToSubmit
//! ```
//!
//! retrying transient broker faults with capped exponential backoff while
//! reusing the order's idempotency key.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::error::{ErrorCode, TradeError};
use crate::domain::order::SizedOrder;
use crate::ports::broker_port::{BrokerOrderRequest, BrokerPort, BrokerReceipt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Executed,
    NoTrade,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoTradeReason {
    /// No structural confluence.
    NoSignal,
    /// Classifier rejected the proposal.
    Vetoed,
    /// Risk budget rounds to a zero lot.
    ZeroSize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<NoTradeReason>,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SizedOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_response: Option<serde_json::Value>,
}

impl ExecutionResult {
    pub fn executed(order: SizedOrder, receipt: BrokerReceipt, attempts: u32) -> Self {
        ExecutionResult {
            status: ExecutionStatus::Executed,
            broker_reference: Some(receipt.reference),
            error: None,
            message: None,
            reason: None,
            attempts,
            order: Some(order),
            broker_response: Some(receipt.response),
        }
    }

    pub fn no_trade(reason: NoTradeReason) -> Self {
        ExecutionResult {
            status: ExecutionStatus::NoTrade,
            broker_reference: None,
            error: None,
            message: None,
            reason: Some(reason),
            attempts: 0,
            order: None,
            broker_response: None,
        }
    }

    /// Failure carrying the error's taxonomy code and caller-safe message.
    pub fn failed(err: &TradeError) -> Self {
        let broker_response = match err {
            TradeError::BrokerRejected { response, .. } => response.clone(),
            _ => None,
        };
        ExecutionResult {
            status: ExecutionStatus::Failed,
            broker_reference: None,
            error: Some(err.code()),
            message: Some(err.public_message()),
            reason: None,
            attempts: 0,
            order: None,
            broker_response,
        }
    }

    fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    fn with_order(mut self, order: SizedOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn is_executed(&self) -> bool {
        self.status == ExecutionStatus::Executed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Pending,
    Submitted,
    Confirmed,
    RejectedByBroker,
    FailedToSubmit,
}

impl SubmissionState {
    pub fn can_transition_to(self, next: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, next),
            (Pending, Submitted)
                | (Pending, FailedToSubmit)
                | (Submitted, Confirmed)
                | (Submitted, RejectedByBroker)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SubmissionState::Confirmed
                | SubmissionState::RejectedByBroker
                | SubmissionState::FailedToSubmit
        )
    }
}

/// Tracks one order through the submission state machine.
#[derive(Debug)]
struct Submission<'a> {
    key: &'a str,
    state: SubmissionState,
}

impl<'a> Submission<'a> {
    fn new(key: &'a str) -> Self {
        Submission {
            key,
            state: SubmissionState::Pending,
        }
    }

    fn advance(&mut self, next: SubmissionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal submission transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(
            idempotency_key = self.key,
            from = ?self.state,
            to = ?next,
            terminal = next.is_terminal(),
            "submission state change"
        );
        self.state = next;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// No sleeping between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`,
    /// capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

pub struct OrderSubmitter {
    broker: Arc<dyn BrokerPort + Send + Sync>,
    retry: RetryPolicy,
}

impl OrderSubmitter {
    pub fn new(broker: Arc<dyn BrokerPort + Send + Sync>, retry: RetryPolicy) -> Self {
        Self { broker, retry }
    }

    pub fn submit(&self, order: SizedOrder) -> ExecutionResult {
        if !order.is_submittable() {
            let err = TradeError::invalid_risk(format!(
                "refusing to submit lot size {}",
                order.lot_size
            ));
            return ExecutionResult::failed(&err).with_order(order);
        }

        let request = BrokerOrderRequest::from(&order);
        let mut submission = Submission::new(order.idempotency_key.as_str());
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempts = 0u32;

        let span = tracing::info_span!(
            "submit_order",
            symbol = %order.symbol,
            side = %order.side,
            volume = order.lot_size,
            idempotency_key = %order.idempotency_key,
        );
        let _enter = span.enter();

        loop {
            attempts += 1;
            match self.broker.place_order(&request) {
                Ok(receipt) => {
                    submission.advance(SubmissionState::Submitted);
                    submission.advance(SubmissionState::Confirmed);
                    tracing::info!(
                        attempts,
                        broker_reference = %receipt.reference,
                        "order confirmed"
                    );
                    return ExecutionResult::executed(order, receipt, attempts);
                }
                Err(err) if err.is_retryable() && attempts < max_attempts => {
                    let delay = self.retry.delay_after(attempts);
                    tracing::warn!(
                        attempt = attempts,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient broker failure, retrying"
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
                Err(err) => {
                    match err {
                        TradeError::BrokerRejected { .. } => {
                            submission.advance(SubmissionState::Submitted);
                            submission.advance(SubmissionState::RejectedByBroker);
                        }
                        _ => submission.advance(SubmissionState::FailedToSubmit),
                    }
                    tracing::warn!(attempts, error = %err, "order not executed");
                    return ExecutionResult::failed(&err)
                        .with_attempts(attempts)
                        .with_order(order);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::IdempotencyKey;
    use crate::domain::signal::Side;
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<Vec<Result<BrokerReceipt, TradeError>>>,
        seen: Mutex<Vec<BrokerOrderRequest>>,
    }

    impl Scripted {
        fn new(mut replies: Vec<Result<BrokerReceipt, TradeError>>) -> Arc<Self> {
            replies.reverse();
            Arc::new(Scripted {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    impl BrokerPort for Scripted {
        fn place_order(&self, request: &BrokerOrderRequest) -> Result<BrokerReceipt, TradeError> {
            self.seen.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(TradeError::internal("script exhausted")))
        }
    }

    fn receipt(reference: &str) -> Result<BrokerReceipt, TradeError> {
        Ok(BrokerReceipt {
            reference: reference.into(),
            response: serde_json::json!({ "order_id": reference }),
        })
    }

    fn unreachable() -> Result<BrokerReceipt, TradeError> {
        Err(TradeError::BrokerUnreachable {
            reason: "timeout".into(),
        })
    }

    fn order(lots: f64) -> SizedOrder {
        SizedOrder {
            symbol: "XAUUSD".into(),
            side: Side::Sell,
            lot_size: lots,
            stop_loss: 50.0,
            take_profit: 100.0,
            idempotency_key: IdempotencyKey::from("key-1"),
        }
    }

    #[test]
    fn first_attempt_success() {
        let broker = Scripted::new(vec![receipt("A1")]);
        let result = OrderSubmitter::new(broker.clone(), RetryPolicy::immediate(3)).submit(order(1.5));
        assert_eq!(result.status, ExecutionStatus::Executed);
        assert_eq!(result.broker_reference.as_deref(), Some("A1"));
        assert_eq!(result.attempts, 1);
        assert_eq!(broker.calls(), 1);
    }

    #[test]
    fn retries_transient_failures_with_same_key() {
        let broker = Scripted::new(vec![unreachable(), unreachable(), receipt("A2")]);
        let result = OrderSubmitter::new(broker.clone(), RetryPolicy::immediate(3)).submit(order(1.5));
        assert!(result.is_executed());
        assert_eq!(result.attempts, 3);
        let seen = broker.seen.lock().unwrap();
        assert!(seen.iter().all(|r| r.client_order_id == "key-1"));
        assert_eq!(seen[0].order_type, "sell");
    }

    #[test]
    fn exhausted_retries_fail_as_unreachable() {
        let broker = Scripted::new(vec![unreachable(), unreachable(), unreachable(), receipt("late")]);
        let result = OrderSubmitter::new(broker.clone(), RetryPolicy::immediate(3)).submit(order(1.5));
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(result.error, Some(ErrorCode::BrokerUnreachable));
        assert_eq!(result.attempts, 3);
        assert_eq!(broker.calls(), 3);
    }

    #[test]
    fn rejection_is_terminal() {
        let rejection = Err(TradeError::BrokerRejected {
            reason: "insufficient margin".into(),
            response: Some(serde_json::json!({ "error": "insufficient margin" })),
        });
        let broker = Scripted::new(vec![rejection, receipt("never")]);
        let result = OrderSubmitter::new(broker.clone(), RetryPolicy::immediate(3)).submit(order(1.5));
        assert_eq!(result.error, Some(ErrorCode::BrokerRejected));
        assert_eq!(result.attempts, 1);
        assert_eq!(broker.calls(), 1);
        assert_eq!(
            result.broker_response,
            Some(serde_json::json!({ "error": "insufficient margin" }))
        );
    }

    #[test]
    fn zero_lot_never_reaches_broker() {
        let broker = Scripted::new(vec![receipt("never")]);
        let result = OrderSubmitter::new(broker.clone(), RetryPolicy::immediate(3)).submit(order(0.0));
        assert_eq!(result.error, Some(ErrorCode::InvalidRiskParameters));
        assert_eq!(broker.calls(), 0);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(350));
        assert_eq!(policy.delay_after(40), Duration::from_millis(350));
    }

    #[test]
    fn state_machine_transitions() {
        use SubmissionState::*;
        assert!(Pending.can_transition_to(Submitted));
        assert!(Pending.can_transition_to(FailedToSubmit));
        assert!(Submitted.can_transition_to(Confirmed));
        assert!(Submitted.can_transition_to(RejectedByBroker));
        assert!(!Pending.can_transition_to(Confirmed));
        assert!(!Confirmed.can_transition_to(Submitted));
        assert!(Confirmed.is_terminal());
        assert!(!Submitted.is_terminal());
    }

    #[test]
    fn no_trade_serializes_reason() {
        let json = serde_json::to_value(ExecutionResult::no_trade(NoTradeReason::Vetoed)).unwrap();
        assert_eq!(json["status"], "no_trade");
        assert_eq!(json["reason"], "vetoed");
        assert!(json.get("broker_reference").is_none());
    }
}
