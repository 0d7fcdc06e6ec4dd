//! OHLCV bar representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// |close - open|
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// high - low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// True when every timestamp is strictly later than the one before it.
pub fn is_strictly_increasing(bars: &[Bar]) -> bool {
    bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp)
}
