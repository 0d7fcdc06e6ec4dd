//! Risk-based position sizing.
//!
//! `lot = round(balance * risk_pct / 100 / (stop_loss_pips * pip_value), 2)`

use crate::domain::error::TradeError;
use crate::domain::signal::TradeProposal;

/// Decimal places kept on lot sizes.
pub const LOT_PRECISION: i32 = 2;

/// Round half away from zero to [`LOT_PRECISION`] places.
pub fn round_lots(lots: f64) -> f64 {
    let scale = 10f64.powi(LOT_PRECISION);
    (lots * scale).round() / scale
}

/// Lot size risking `risk_pct` percent of `balance` over a stop of
/// `stop_loss_pips` worth `pip_value` each.
pub fn size_position(
    balance: f64,
    risk_pct: f64,
    stop_loss_pips: f64,
    pip_value: f64,
) -> Result<f64, TradeError> {
    if !balance.is_finite() || balance <= 0.0 {
        return Err(TradeError::invalid_risk(format!(
            "balance must be positive, got {balance}"
        )));
    }
    if !risk_pct.is_finite() || risk_pct <= 0.0 || risk_pct > 100.0 {
        return Err(TradeError::invalid_risk(format!(
            "risk_pct must be in (0, 100], got {risk_pct}"
        )));
    }
    if !stop_loss_pips.is_finite() || stop_loss_pips <= 0.0 {
        return Err(TradeError::invalid_risk(format!(
            "stop_loss_pips must be positive, got {stop_loss_pips}"
        )));
    }
    if !pip_value.is_finite() || pip_value <= 0.0 {
        return Err(TradeError::invalid_risk(format!(
            "pip_value must be positive, got {pip_value}"
        )));
    }

    let risk_amount = balance * risk_pct / 100.0;
    let lots = round_lots(risk_amount / (stop_loss_pips * pip_value));
    if !lots.is_finite() {
        return Err(TradeError::invalid_risk("lot size overflowed"));
    }
    Ok(lots.max(0.0))
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskSettings {
    pub risk_pct: f64,
    pub max_lot_size: Option<f64>,
}

impl Default for RiskSettings {
    fn default() -> Self {
        RiskSettings {
            risk_pct: 1.5,
            max_lot_size: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PositionSizer {
    settings: RiskSettings,
}

impl PositionSizer {
    pub fn new(settings: RiskSettings) -> Self {
        Self { settings }
    }

    /// Sizes an accepted proposal, using `risk_override` in place of the
    /// configured risk percentage when given.
    pub fn size(
        &self,
        balance: f64,
        risk_override: Option<f64>,
        trade: &TradeProposal,
    ) -> Result<f64, TradeError> {
        let risk_pct = risk_override.unwrap_or(self.settings.risk_pct);
        let lots = size_position(balance, risk_pct, trade.stop_loss_pips(), trade.pip_value())?;
        Ok(match self.settings.max_lot_size {
            Some(cap) => round_lots(lots.min(cap)),
            None => lots,
        })
    }
}
