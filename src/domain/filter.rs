//! Classifier-backed veto stage.

use std::sync::Arc;

use crate::domain::error::TradeError;
use crate::domain::features::FeatureExtractor;
use crate::domain::ohlcv::Bar;
use crate::domain::signal::{SignalProposal, TradeProposal};
use crate::ports::classifier_port::{Classifier, Prediction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Trade proposal passed the classifier unchanged.
    Accepted,
    /// Trade proposal forced to WAIT.
    Vetoed,
    /// Input was already WAIT; classifier not consulted.
    Skipped,
}

/// Outcome of filtering. Can only keep a trade or downgrade it to WAIT.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDecision {
    proposal: SignalProposal,
    verdict: Verdict,
}

impl FilterDecision {
    fn accepted(trade: TradeProposal) -> Self {
        FilterDecision {
            proposal: SignalProposal::Trade(trade),
            verdict: Verdict::Accepted,
        }
    }

    fn vetoed() -> Self {
        FilterDecision {
            proposal: SignalProposal::Wait,
            verdict: Verdict::Vetoed,
        }
    }

    fn skipped() -> Self {
        FilterDecision {
            proposal: SignalProposal::Wait,
            verdict: Verdict::Skipped,
        }
    }

    pub fn proposal(&self) -> &SignalProposal {
        &self.proposal
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn accepted_trade(&self) -> Option<&TradeProposal> {
        match self.verdict {
            Verdict::Accepted => self.proposal.trade(),
            Verdict::Vetoed | Verdict::Skipped => None,
        }
    }
}

pub struct SignalFilter {
    features: Arc<dyn FeatureExtractor + Send + Sync>,
    classifier: Arc<dyn Classifier + Send + Sync>,
}

impl SignalFilter {
    pub fn new(
        features: Arc<dyn FeatureExtractor + Send + Sync>,
        classifier: Arc<dyn Classifier + Send + Sync>,
    ) -> Self {
        Self {
            features,
            classifier,
        }
    }

    pub fn filter(
        &self,
        proposal: SignalProposal,
        symbol: &str,
        bars: &[Bar],
    ) -> Result<FilterDecision, TradeError> {
        let SignalProposal::Trade(trade) = proposal else {
            return Ok(FilterDecision::skipped());
        };

        let features = self.features.extract(symbol, bars)?;
        let prediction = self.classifier.predict(&features)?;
        tracing::debug!(
            symbol,
            features = ?features.values(),
            prediction = prediction.label(),
            "classifier consulted"
        );

        Ok(match prediction {
            Prediction::Accept => FilterDecision::accepted(trade),
            Prediction::Reject => FilterDecision::vetoed(),
        })
    }
}
