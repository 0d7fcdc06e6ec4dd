//! Per-request trade decision pipeline.
//!
//! load bars → detect → synthesize → filter → size → submit
//!
//! Every stage up to sizing is side-effect free and grouped in
//! [`DecisionPipeline::prepare`]; only [`DecisionPipeline::execute`] talks to
//! the broker. WAIT, veto and zero-size outcomes stop before submission.

use serde::Deserialize;
use std::sync::Arc;

use crate::domain::detector::PatternEngine;
use crate::domain::error::{ErrorCode, TradeError};
use crate::domain::execution::{ExecutionResult, NoTradeReason, OrderSubmitter};
use crate::domain::filter::{SignalFilter, Verdict};
use crate::domain::order::{IdempotencyKey, SizedOrder};
use crate::domain::signal::SignalSynthesizer;
use crate::domain::sizing::PositionSizer;
use crate::ports::market_data_port::MarketDataPort;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TradeRequest {
    pub symbol: String,
    pub timeframe: String,
    pub account_balance: f64,
    #[serde(default)]
    pub risk_pct: Option<f64>,
}

/// Symbols and timeframes name market data series, so they are limited to
/// `[A-Za-z0-9._-]` and may not contain `..`.
fn check_series_name(field: &str, value: &str) -> Result<(), TradeError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TradeError::invalid_risk(format!("{field} must not be empty")));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-');
    if !value.chars().all(allowed) || value.contains("..") {
        return Err(TradeError::invalid_risk(format!(
            "{field} may only contain letters, digits, '.', '_' and '-'"
        )));
    }
    Ok(())
}

impl TradeRequest {
    pub fn validate(&self) -> Result<(), TradeError> {
        check_series_name("symbol", &self.symbol)?;
        check_series_name("timeframe", &self.timeframe)?;
        if !self.account_balance.is_finite() || self.account_balance <= 0.0 {
            return Err(TradeError::invalid_risk(format!(
                "account_balance must be positive, got {}",
                self.account_balance
            )));
        }
        Ok(())
    }
}

/// Result of the side-effect free stages.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    NoTrade(NoTradeReason),
    Submit(SizedOrder),
}

pub struct DecisionPipeline {
    market_data: Arc<dyn MarketDataPort + Send + Sync>,
    engine: PatternEngine,
    synthesizer: SignalSynthesizer,
    filter: SignalFilter,
    sizer: PositionSizer,
    submitter: OrderSubmitter,
}

impl DecisionPipeline {
    pub fn new(
        market_data: Arc<dyn MarketDataPort + Send + Sync>,
        engine: PatternEngine,
        synthesizer: SignalSynthesizer,
        filter: SignalFilter,
        sizer: PositionSizer,
        submitter: OrderSubmitter,
    ) -> Self {
        Self {
            market_data,
            engine,
            synthesizer,
            filter,
            sizer,
            submitter,
        }
    }

    pub fn prepare(&self, request: &TradeRequest) -> Result<Decision, TradeError> {
        request.validate()?;
        let symbol = request.symbol.trim();
        let timeframe = request.timeframe.trim();

        let span = tracing::info_span!("prepare_trade", symbol, timeframe);
        let _enter = span.enter();

        let bars = self.market_data.load_ohlcv(symbol, timeframe)?;
        let detection = self.engine.detect(&bars)?;
        let proposal = self.synthesizer.synthesize(&detection, symbol, timeframe)?;
        let decision = self.filter.filter(proposal, symbol, &bars)?;

        let trade = match (decision.verdict(), decision.accepted_trade()) {
            (Verdict::Accepted, Some(trade)) => *trade,
            (Verdict::Vetoed, _) => {
                tracing::info!("proposal vetoed by classifier");
                return Ok(Decision::NoTrade(NoTradeReason::Vetoed));
            }
            _ => {
                tracing::info!(bars = bars.len(), "no structural confluence");
                return Ok(Decision::NoTrade(NoTradeReason::NoSignal));
            }
        };

        let lot_size = self
            .sizer
            .size(request.account_balance, request.risk_pct, &trade)?;
        if lot_size <= 0.0 {
            tracing::info!(side = %trade.side(), "lot size rounds to zero");
            return Ok(Decision::NoTrade(NoTradeReason::ZeroSize));
        }

        let order = SizedOrder {
            symbol: symbol.to_string(),
            side: trade.side(),
            lot_size,
            stop_loss: trade.stop_loss_pips(),
            take_profit: trade.take_profit_pips(),
            idempotency_key: IdempotencyKey::generate(),
        };
        tracing::info!(
            side = %order.side,
            lot_size,
            idempotency_key = %order.idempotency_key,
            "order prepared"
        );
        Ok(Decision::Submit(order))
    }

    /// Submits a prepared order. Always returns a result; broker faults are
    /// reported as FAILED.
    pub fn execute(&self, order: SizedOrder) -> ExecutionResult {
        self.submitter.submit(order)
    }

    /// Runs the whole pipeline, mapping every fault to a FAILED result.
    pub fn run(&self, request: &TradeRequest) -> ExecutionResult {
        match self.prepare(request) {
            Ok(Decision::NoTrade(reason)) => ExecutionResult::no_trade(reason),
            Ok(Decision::Submit(order)) => self.execute(order),
            Err(err) => {
                log_failure(&err, request);
                ExecutionResult::failed(&err)
            }
        }
    }
}

/// Internal faults keep their full context in the log only.
pub fn log_failure(err: &TradeError, request: &TradeRequest) {
    match err.code() {
        ErrorCode::InternalFault => tracing::error!(
            symbol = %request.symbol,
            timeframe = %request.timeframe,
            error = %err,
            "trade decision failed"
        ),
        code => tracing::warn!(
            symbol = %request.symbol,
            timeframe = %request.timeframe,
            code = %code,
            error = %err,
            "trade decision rejected"
        ),
    }
}
