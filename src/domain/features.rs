//! Feature extraction for the signal filter.

use crate::domain::error::TradeError;
use crate::domain::ohlcv::Bar;

/// Number of features every extractor must produce.
pub const FEATURE_DIM: usize = 5;

/// Fixed-length, finite feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Result<Self, TradeError> {
        if values.len() != FEATURE_DIM {
            return Err(TradeError::internal(format!(
                "feature vector has {} values, expected {FEATURE_DIM}",
                values.len()
            )));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(TradeError::internal(format!(
                "feature {pos} is not finite"
            )));
        }
        Ok(FeatureVector(values))
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }
}

pub trait FeatureExtractor {
    fn extract(&self, symbol: &str, bars: &[Bar]) -> Result<FeatureVector, TradeError>;
}

/// Price-action features over the trailing `window` bars:
///
/// 0. close location within the last bar's range (0 = low, 1 = high)
/// 1. mean true range as a fraction of the last close
/// 2. last bar body / range
/// 3. last volume relative to the window mean
/// 4. bars in the window
#[derive(Debug, Clone)]
pub struct BarFeatureExtractor {
    window: usize,
}

impl BarFeatureExtractor {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }
}

impl Default for BarFeatureExtractor {
    fn default() -> Self {
        Self::new(60)
    }
}

impl FeatureExtractor for BarFeatureExtractor {
    fn extract(&self, _symbol: &str, bars: &[Bar]) -> Result<FeatureVector, TradeError> {
        let window = &bars[bars.len().saturating_sub(self.window)..];
        let Some(last) = window.last() else {
            return Err(TradeError::InsufficientData {
                bars: 0,
                minimum: 1,
            });
        };

        let range = last.range();
        let close_location = if range > 0.0 {
            (last.close - last.low) / range
        } else {
            0.5
        };
        let body_ratio = if range > 0.0 { last.body() / range } else { 0.0 };

        let true_ranges: Vec<f64> = window
            .iter()
            .enumerate()
            .map(|(i, b)| match i {
                0 => b.range(),
                _ => b.true_range(window[i - 1].close),
            })
            .collect();
        let mean_tr = true_ranges.iter().sum::<f64>() / true_ranges.len() as f64;
        let volatility = if last.close != 0.0 {
            mean_tr / last.close.abs()
        } else {
            0.0
        };

        let mean_volume = window.iter().map(|b| b.volume).sum::<f64>() / window.len() as f64;
        let relative_volume = if mean_volume > 0.0 {
            last.volume / mean_volume
        } else {
            1.0
        };

        FeatureVector::new(vec![
            close_location,
            volatility,
            body_ratio,
            relative_volume,
            window.len() as f64,
        ])
    }
}
