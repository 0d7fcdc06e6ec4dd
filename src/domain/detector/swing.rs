//! Fractal swing points.
//!
//! Bar `i` is a swing high when its high is strictly greater than the highs of
//! the `length` bars on either side (swing low mirrors this on lows). The last
//! `length` bars can never be confirmed swings.

use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingPoint {
    pub index: usize,
    pub price: f64,
}

pub fn swing_highs(bars: &[Bar], length: usize) -> Vec<SwingPoint> {
    swings(bars, length, |b| b.high, |candidate, other| candidate > other)
}

pub fn swing_lows(bars: &[Bar], length: usize) -> Vec<SwingPoint> {
    swings(bars, length, |b| b.low, |candidate, other| candidate < other)
}

pub fn last_swing_high(bars: &[Bar], length: usize) -> Option<SwingPoint> {
    swing_highs(bars, length).pop()
}

pub fn last_swing_low(bars: &[Bar], length: usize) -> Option<SwingPoint> {
    swing_lows(bars, length).pop()
}

fn swings(
    bars: &[Bar],
    length: usize,
    price: impl Fn(&Bar) -> f64,
    dominates: impl Fn(f64, f64) -> bool,
) -> Vec<SwingPoint> {
    let length = length.max(1);
    if bars.len() < 2 * length + 1 {
        return Vec::new();
    }

    (length..bars.len() - length)
        .filter(|&i| {
            let candidate = price(&bars[i]);
            (i - length..=i + length)
                .filter(|&j| j != i)
                .all(|j| dominates(candidate, price(&bars[j])))
        })
        .map(|i| SwingPoint {
            index: i,
            price: price(&bars[i]),
        })
        .collect()
}
