//! Order blocks: the last opposite candle before a displacement move.
//!
//! Bullish block: a bearish candle `k` whose next bar closes above `high[k]`.
//! It stays valid until a later close falls below `low[k]`. Bearish blocks
//! mirror this. The most recent valid block inside the lookback wins.

use super::{Bias, Detector, PriceZone};
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone)]
pub struct OrderBlockDetector {
    lookback: usize,
}

impl OrderBlockDetector {
    pub fn new(lookback: usize) -> Self {
        Self { lookback }
    }
}

fn block_at(bars: &[Bar], k: usize) -> Option<PriceZone> {
    let candle = &bars[k];
    let next = &bars[k + 1];
    let later = &bars[k + 1..];

    if candle.is_bearish() && next.close > candle.high {
        let invalidated = later.iter().any(|b| b.close < candle.low);
        return (!invalidated).then(|| PriceZone::new(candle.low, candle.high, Bias::Bullish));
    }
    if candle.is_bullish() && next.close < candle.low {
        let invalidated = later.iter().any(|b| b.close > candle.high);
        return (!invalidated).then(|| PriceZone::new(candle.low, candle.high, Bias::Bearish));
    }
    None
}

impl Detector for OrderBlockDetector {
    type Output = Option<PriceZone>;

    fn name(&self) -> &'static str {
        "order_block"
    }

    fn evaluate(&self, bars: &[Bar]) -> Option<PriceZone> {
        let n = bars.len();
        if n < 2 {
            return None;
        }
        let earliest = n.saturating_sub(self.lookback);

        (earliest..n - 1).rev().find_map(|k| block_at(bars, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::detector::test_bars::{bars, mirror};

    fn displacement_up() -> Vec<Bar> {
        bars(&[
            (10.0, 10.2, 9.9, 10.1),
            (10.1, 10.15, 9.6, 9.7),
            (9.7, 10.8, 9.7, 10.7),
            (10.7, 11.0, 10.5, 10.9),
        ])
    }

    #[test]
    fn detects_bullish_block() {
        let detector = OrderBlockDetector::new(50);
        assert_eq!(
            detector.evaluate(&displacement_up()),
            Some(PriceZone::new(9.6, 10.15, Bias::Bullish))
        );
    }

    #[test]
    fn mirror_gives_bearish_block() {
        let detector = OrderBlockDetector::new(50);
        let zone = detector.evaluate(&mirror(&displacement_up())).unwrap();
        assert_eq!(zone.bias, Bias::Bearish);
        assert!((zone.low - 189.85).abs() < 1e-9);
        assert!((zone.high - 190.4).abs() < 1e-9);
    }

    #[test]
    fn invalidated_block_gives_way_to_newer_one() {
        let mut data = displacement_up();
        data.extend(bars(&[(10.9, 10.9, 9.4, 9.5)]));
        let zone = OrderBlockDetector::new(50).evaluate(&data).unwrap();
        // bullish block at 9.6..10.15 is broken by the 9.5 close; the last
        // up candle before the drop becomes a bearish block
        assert_eq!(zone, PriceZone::new(10.5, 11.0, Bias::Bearish));
    }

    #[test]
    fn lookback_excludes_old_blocks() {
        assert_eq!(OrderBlockDetector::new(2).evaluate(&displacement_up()), None);
        assert!(OrderBlockDetector::new(3).evaluate(&displacement_up()).is_some());
    }

    #[test]
    fn needs_two_bars() {
        let detector = OrderBlockDetector::new(50);
        assert_eq!(detector.evaluate(&displacement_up()[..1]), None);
    }
}
