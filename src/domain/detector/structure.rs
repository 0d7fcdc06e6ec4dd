//! Break of structure.
//!
//! The latest close beyond the most recent confirmed swing high is a bullish
//! break; below the most recent swing low, a bearish one. A close beyond both
//! at once is contradictory and reports no break.

use super::swing::{last_swing_high, last_swing_low};
use super::{Bias, Detector};
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone)]
pub struct BreakOfStructureDetector {
    swing_length: usize,
}

impl BreakOfStructureDetector {
    pub fn new(swing_length: usize) -> Self {
        Self { swing_length }
    }
}

impl Detector for BreakOfStructureDetector {
    type Output = Option<Bias>;

    fn name(&self) -> &'static str {
        "break_of_structure"
    }

    fn evaluate(&self, bars: &[Bar]) -> Option<Bias> {
        let last = bars.last()?;

        let bullish = last_swing_high(bars, self.swing_length)
            .is_some_and(|swing| last.close > swing.price);
        let bearish = last_swing_low(bars, self.swing_length)
            .is_some_and(|swing| last.close < swing.price);

        match (bullish, bearish) {
            (true, false) => Some(Bias::Bullish),
            (false, true) => Some(Bias::Bearish),
            _ => None,
        }
    }
}
