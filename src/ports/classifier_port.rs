//! Binary classifier port used by the signal filter.

use crate::domain::error::TradeError;
use crate::domain::features::FeatureVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prediction {
    Accept,
    Reject,
}

impl Prediction {
    pub fn label(&self) -> u8 {
        match self {
            Prediction::Accept => 1,
            Prediction::Reject => 0,
        }
    }
}

/// Opaque predictive model. Implementations load once at startup and are
/// shared read-only across requests.
pub trait Classifier {
    /// Fails with `ClassifierUnavailable` when the model cannot answer.
    fn predict(&self, features: &FeatureVector) -> Result<Prediction, TradeError>;
}
