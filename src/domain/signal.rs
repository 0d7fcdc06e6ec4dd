//! Signal synthesis: detection results to directional trade proposals.
//!
//! A trade is proposed only on full confluence: order block, break of
//! structure and fair-value gap all present and pointing the same way.
//! Anything less is [`SignalProposal::Wait`].

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::domain::detector::{Bias, DetectionResult};
use crate::domain::error::TradeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Order type string used on the broker wire.
    pub fn broker_type(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl From<Bias> for Side {
    fn from(bias: Bias) -> Self {
        match bias {
            Bias::Bullish => Side::Buy,
            Bias::Bearish => Side::Sell,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// A directional proposal. Stop, target and pip value are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeProposal {
    side: Side,
    stop_loss_pips: f64,
    take_profit_pips: f64,
    pip_value: f64,
}

impl TradeProposal {
    pub fn new(
        side: Side,
        stop_loss_pips: f64,
        take_profit_pips: f64,
        pip_value: f64,
    ) -> Result<Self, TradeError> {
        for (name, value) in [
            ("stop_loss_pips", stop_loss_pips),
            ("take_profit_pips", take_profit_pips),
            ("pip_value", pip_value),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(TradeError::invalid_risk(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        Ok(TradeProposal {
            side,
            stop_loss_pips,
            take_profit_pips,
            pip_value,
        })
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn stop_loss_pips(&self) -> f64 {
        self.stop_loss_pips
    }

    pub fn take_profit_pips(&self) -> f64 {
        self.take_profit_pips
    }

    pub fn pip_value(&self) -> f64 {
        self.pip_value
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalProposal {
    Wait,
    Trade(TradeProposal),
}

impl SignalProposal {
    pub fn is_wait(&self) -> bool {
        matches!(self, SignalProposal::Wait)
    }

    /// BUY, SELL or WAIT.
    pub fn action(&self) -> &'static str {
        match self {
            SignalProposal::Wait => "WAIT",
            SignalProposal::Trade(t) => match t.side {
                Side::Buy => "BUY",
                Side::Sell => "SELL",
            },
        }
    }

    pub fn trade(&self) -> Option<&TradeProposal> {
        match self {
            SignalProposal::Trade(t) => Some(t),
            SignalProposal::Wait => None,
        }
    }
}

/// Stop-loss / take-profit distances in pips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalLevels {
    pub stop_loss_pips: f64,
    pub take_profit_pips: f64,
}

impl Default for SignalLevels {
    fn default() -> Self {
        SignalLevels {
            stop_loss_pips: 50.0,
            take_profit_pips: 100.0,
        }
    }
}

/// Per-instrument tuning for the synthesizer.
///
/// Override keys are lowercase `symbol` or `symbol.timeframe`; the more
/// specific key wins.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSettings {
    pub default_levels: SignalLevels,
    pub level_overrides: HashMap<String, SignalLevels>,
    pub default_pip_value: f64,
    pub pip_values: HashMap<String, f64>,
}

impl Default for SignalSettings {
    fn default() -> Self {
        SignalSettings {
            default_levels: SignalLevels::default(),
            level_overrides: HashMap::new(),
            default_pip_value: 1.0,
            pip_values: HashMap::new(),
        }
    }
}

impl SignalSettings {
    pub fn levels_for(&self, symbol: &str, timeframe: &str) -> SignalLevels {
        let symbol = symbol.to_lowercase();
        let specific = format!("{}.{}", symbol, timeframe.to_lowercase());
        self.level_overrides
            .get(&specific)
            .or_else(|| self.level_overrides.get(&symbol))
            .copied()
            .unwrap_or(self.default_levels)
    }

    pub fn pip_value_for(&self, symbol: &str) -> f64 {
        self.pip_values
            .get(&symbol.to_lowercase())
            .copied()
            .unwrap_or(self.default_pip_value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignalSynthesizer {
    settings: SignalSettings,
}

impl SignalSynthesizer {
    pub fn new(settings: SignalSettings) -> Self {
        Self { settings }
    }

    pub fn synthesize(
        &self,
        detection: &DetectionResult,
        symbol: &str,
        timeframe: &str,
    ) -> Result<SignalProposal, TradeError> {
        let Some(bias) = detection.confluence() else {
            return Ok(SignalProposal::Wait);
        };

        let levels = self.settings.levels_for(symbol, timeframe);
        let proposal = TradeProposal::new(
            Side::from(bias),
            levels.stop_loss_pips,
            levels.take_profit_pips,
            self.settings.pip_value_for(symbol),
        )?;
        Ok(SignalProposal::Trade(proposal))
    }
}
