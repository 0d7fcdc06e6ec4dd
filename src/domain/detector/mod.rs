//! Price-action structure detection.
//!
//! Three independent detectors feed a [`DetectionResult`]:
//! - [`OrderBlockDetector`]: last opposite candle before a displacement move
//! - [`BreakOfStructureDetector`]: close beyond the latest confirmed swing
//! - [`FairValueGapDetector`]: unfilled three-bar imbalance
//!
//! Each one implements [`Detector`] and is held behind a trait object by
//! [`PatternEngine`], so any of them can be swapped out without touching the
//! rest of the pipeline.

pub mod fair_value_gap;
pub mod order_block;
pub mod structure;
pub mod swing;

pub use fair_value_gap::FairValueGapDetector;
pub use order_block::OrderBlockDetector;
pub use structure::BreakOfStructureDetector;

use serde::Serialize;

use crate::domain::error::TradeError;
use crate::domain::ohlcv::Bar;

/// Directional bias of a detected structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    Bullish,
    Bearish,
}

/// A price range with the direction it supports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceZone {
    pub low: f64,
    pub high: f64,
    pub bias: Bias,
}

impl PriceZone {
    /// Builds a zone, ordering the bounds so that `low <= high`.
    pub fn new(a: f64, b: f64, bias: Bias) -> Self {
        PriceZone {
            low: a.min(b),
            high: a.max(b),
            bias,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub order_block: Option<PriceZone>,
    pub break_of_structure: Option<Bias>,
    pub fair_value_gap: Option<PriceZone>,
}

impl DetectionResult {
    pub fn has_order_block(&self) -> bool {
        self.order_block.is_some()
    }

    pub fn has_break_of_structure(&self) -> bool {
        self.break_of_structure.is_some()
    }

    pub fn has_fair_value_gap(&self) -> bool {
        self.fair_value_gap.is_some()
    }

    /// The shared bias when all three structures are present and agree.
    pub fn confluence(&self) -> Option<Bias> {
        let ob = self.order_block?.bias;
        let bos = self.break_of_structure?;
        let fvg = self.fair_value_gap?.bias;
        (ob == bos && bos == fvg).then_some(bos)
    }
}

/// A single structural test over a bar sequence.
///
/// Implementations must be pure: the same bars always give the same output.
pub trait Detector {
    type Output;

    fn name(&self) -> &'static str;

    fn evaluate(&self, bars: &[Bar]) -> Self::Output;
}

pub type ZoneDetector = Box<dyn Detector<Output = Option<PriceZone>> + Send + Sync>;
pub type BiasDetector = Box<dyn Detector<Output = Option<Bias>> + Send + Sync>;

/// Tuning for the built-in detectors.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    pub swing_length: usize,
    pub order_block_lookback: usize,
    pub fvg_lookback: usize,
    pub min_gap_pct: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            swing_length: 2,
            order_block_lookback: 50,
            fvg_lookback: 20,
            min_gap_pct: 0.0,
        }
    }
}

pub struct PatternEngine {
    order_block: ZoneDetector,
    break_of_structure: BiasDetector,
    fair_value_gap: ZoneDetector,
}

impl PatternEngine {
    pub fn new(
        order_block: ZoneDetector,
        break_of_structure: BiasDetector,
        fair_value_gap: ZoneDetector,
    ) -> Self {
        Self {
            order_block,
            break_of_structure,
            fair_value_gap,
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(
            Box::new(OrderBlockDetector::new(config.order_block_lookback)),
            Box::new(BreakOfStructureDetector::new(config.swing_length)),
            Box::new(FairValueGapDetector::new(
                config.fvg_lookback,
                config.min_gap_pct,
            )),
        )
    }

    pub fn detect(&self, bars: &[Bar]) -> Result<DetectionResult, TradeError> {
        if bars.is_empty() {
            return Err(TradeError::InsufficientData {
                bars: 0,
                minimum: 1,
            });
        }

        let result = DetectionResult {
            order_block: self.order_block.evaluate(bars),
            break_of_structure: self.break_of_structure.evaluate(bars),
            fair_value_gap: self.fair_value_gap.evaluate(bars),
        };

        tracing::debug!(
            bars = bars.len(),
            detectors = ?[
                self.order_block.name(),
                self.break_of_structure.name(),
                self.fair_value_gap.name(),
            ],
            order_block = ?result.order_block,
            break_of_structure = ?result.break_of_structure,
            fair_value_gap = ?result.fair_value_gap,
            "structure detection complete"
        );

        Ok(result)
    }
}

impl Default for PatternEngine {
    fn default() -> Self {
        Self::from_config(&DetectorConfig::default())
    }
}
