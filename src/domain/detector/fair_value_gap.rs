//! Fair-value gaps (three-bar imbalances).
//!
//! Bullish: `low[i] > high[i-2]`, zone `high[i-2]..low[i]`.
//! Bearish: `high[i] < low[i-2]`, zone `high[i]..low[i-2]`.
//!
//! A bullish gap is filled once a later low trades down to the zone low; a
//! bearish gap once a later high trades up to the zone high. The most recent
//! unfilled gap inside the lookback window wins.

use super::{Bias, Detector, PriceZone};
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone)]
pub struct FairValueGapDetector {
    lookback: usize,
    min_gap_pct: f64,
}

impl FairValueGapDetector {
    pub fn new(lookback: usize, min_gap_pct: f64) -> Self {
        Self {
            lookback,
            min_gap_pct,
        }
    }

    fn gap_at(&self, bars: &[Bar], i: usize) -> Option<PriceZone> {
        let first = &bars[i - 2];
        let third = &bars[i];
        let threshold = third.close.abs() * self.min_gap_pct / 100.0;

        if third.low > first.high && third.low - first.high > threshold {
            return Some(PriceZone::new(first.high, third.low, Bias::Bullish));
        }
        if third.high < first.low && first.low - third.high > threshold {
            return Some(PriceZone::new(third.high, first.low, Bias::Bearish));
        }
        None
    }
}

fn is_filled(zone: &PriceZone, later: &[Bar]) -> bool {
    match zone.bias {
        Bias::Bullish => later.iter().any(|b| b.low <= zone.low),
        Bias::Bearish => later.iter().any(|b| b.high >= zone.high),
    }
}

impl Detector for FairValueGapDetector {
    type Output = Option<PriceZone>;

    fn name(&self) -> &'static str {
        "fair_value_gap"
    }

    fn evaluate(&self, bars: &[Bar]) -> Option<PriceZone> {
        let n = bars.len();
        if n < 3 {
            return None;
        }
        let earliest = n.saturating_sub(self.lookback).max(2);

        (earliest..n).rev().find_map(|i| {
            self.gap_at(bars, i)
                .filter(|zone| !is_filled(zone, &bars[i + 1..]))
        })
    }
}
