//! Logistic-regression signal filter loaded from a JSON artifact.
//!
//! ```json
//! {"weights": [0.8, -2.0, 1.1, 0.3, 0.0], "bias": -0.4, "threshold": 0.5}
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::domain::error::TradeError;
use crate::domain::features::{FeatureVector, FEATURE_DIM};
use crate::ports::classifier_port::{Classifier, Prediction};

#[derive(Debug, Deserialize)]
struct ModelArtifact {
    weights: Vec<f64>,
    bias: f64,
    #[serde(default = "default_threshold")]
    threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

fn unavailable(reason: impl Into<String>) -> TradeError {
    TradeError::ClassifierUnavailable {
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearClassifier {
    weights: [f64; FEATURE_DIM],
    bias: f64,
    threshold: f64,
}

impl LinearClassifier {
    pub fn new(weights: [f64; FEATURE_DIM], bias: f64, threshold: f64) -> Result<Self, TradeError> {
        if weights.iter().any(|w| !w.is_finite()) || !bias.is_finite() {
            return Err(unavailable("model parameters must be finite"));
        }
        if !(0.0..=1.0).contains(&threshold) {
            return Err(unavailable(format!(
                "threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        Ok(Self {
            weights,
            bias,
            threshold,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TradeError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| unavailable(format!("failed to read {}: {}", path.display(), e)))?;
        let model = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), threshold = model.threshold, "classifier loaded");
        Ok(model)
    }

    pub fn from_json(content: &str) -> Result<Self, TradeError> {
        let artifact: ModelArtifact = serde_json::from_str(content)
            .map_err(|e| unavailable(format!("malformed model artifact: {}", e)))?;
        let weights: [f64; FEATURE_DIM] = artifact.weights.as_slice().try_into().map_err(|_| {
            unavailable(format!(
                "model has {} weights, expected {}",
                artifact.weights.len(),
                FEATURE_DIM
            ))
        })?;
        Self::new(weights, artifact.bias, artifact.threshold)
    }

    /// Probability that the proposal is worth taking.
    pub fn score(&self, features: &FeatureVector) -> f64 {
        let z: f64 = self
            .weights
            .iter()
            .zip(features.values())
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias;
        1.0 / (1.0 + (-z).exp())
    }
}

impl Classifier for LinearClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction, TradeError> {
        let p = self.score(features);
        if !p.is_finite() {
            return Err(unavailable("model produced a non-finite score"));
        }
        tracing::debug!(score = p, threshold = self.threshold, "classifier score");
        Ok(if p >= self.threshold {
            Prediction::Accept
        } else {
            Prediction::Reject
        })
    }
}
