#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use smctrader::domain::detector::{
    Bias, BiasDetector, Detector, PatternEngine, PriceZone, ZoneDetector,
};
use smctrader::domain::error::TradeError;
use smctrader::domain::execution::{OrderSubmitter, RetryPolicy};
use smctrader::domain::features::{BarFeatureExtractor, FeatureVector};
pub use smctrader::domain::ohlcv::Bar;
use smctrader::domain::pipeline::{DecisionPipeline, TradeRequest};
use smctrader::domain::signal::{SignalSettings, SignalSynthesizer};
use smctrader::domain::filter::SignalFilter;
use smctrader::domain::sizing::{PositionSizer, RiskSettings};
use smctrader::ports::broker_port::{BrokerOrderRequest, BrokerPort, BrokerReceipt};
use smctrader::ports::classifier_port::{Classifier, Prediction};
use smctrader::ports::market_data_port::MarketDataPort;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Bars from (open, high, low, close) tuples, 15 minutes apart.
pub fn bars(ohlc: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    ohlc.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            timestamp: start + chrono::Duration::minutes(15 * i as i64),
            open,
            high,
            low,
            close,
            volume: 100.0,
        })
        .collect()
}

/// Bearish order block, swing-high breakout and an unfilled gap up.
/// Detected as bullish confluence with `swing_length = 1`.
pub fn bullish_setup() -> Vec<Bar> {
    bars(&[
        (10.0, 10.5, 9.5, 10.0),
        (10.0, 12.0, 9.8, 11.5),
        (11.5, 11.6, 10.5, 11.0),
        (11.0, 11.4, 10.8, 10.9),
        (10.9, 12.6, 10.9, 12.5),
        (12.5, 13.2, 12.0, 13.0),
    ])
}

/// Reflects prices around 100 so bullish structure becomes bearish.
pub fn mirror(bars: &[Bar]) -> Vec<Bar> {
    bars.iter()
        .map(|b| Bar {
            timestamp: b.timestamp,
            open: 200.0 - b.open,
            high: 200.0 - b.low,
            low: 200.0 - b.high,
            close: 200.0 - b.close,
            volume: b.volume,
        })
        .collect()
}

pub fn request(symbol: &str, balance: f64) -> TradeRequest {
    TradeRequest {
        symbol: symbol.to_string(),
        timeframe: "15m".to_string(),
        account_balance: balance,
        risk_pct: None,
    }
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

pub struct MockMarketData {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
    pub calls: AtomicUsize,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockMarketData {
    fn load_ohlcv(&self, symbol: &str, timeframe: &str) -> Result<Vec<Bar>, TradeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TradeError::MarketData {
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => Ok(bars.clone()),
            _ => Err(TradeError::NoData {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Detectors with fixed outputs
// ---------------------------------------------------------------------------

pub struct FixedZone(pub Option<PriceZone>);

impl Detector for FixedZone {
    type Output = Option<PriceZone>;

    fn name(&self) -> &'static str {
        "fixed_zone"
    }

    fn evaluate(&self, _bars: &[Bar]) -> Self::Output {
        self.0
    }
}

pub struct FixedBias(pub Option<Bias>);

impl Detector for FixedBias {
    type Output = Option<Bias>;

    fn name(&self) -> &'static str {
        "fixed_bias"
    }

    fn evaluate(&self, _bars: &[Bar]) -> Self::Output {
        self.0
    }
}

/// Engine reporting the given flags with a shared bias.
pub fn fixed_engine(order_block: bool, break_of_structure: bool, fair_value_gap: bool, bias: Bias) -> PatternEngine {
    let zone = |present: bool| present.then(|| PriceZone::new(10.0, 11.0, bias));
    let ob: ZoneDetector = Box::new(FixedZone(zone(order_block)));
    let bos: BiasDetector = Box::new(FixedBias(break_of_structure.then_some(bias)));
    let fvg: ZoneDetector = Box::new(FixedZone(zone(fair_value_gap)));
    PatternEngine::new(ob, bos, fvg)
}

// ---------------------------------------------------------------------------
// Classifiers
// ---------------------------------------------------------------------------

pub struct CountingClassifier {
    pub prediction: Prediction,
    pub calls: AtomicUsize,
}

impl CountingClassifier {
    pub fn accepting() -> Self {
        Self {
            prediction: Prediction::Accept,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            prediction: Prediction::Reject,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for CountingClassifier {
    fn predict(&self, _features: &FeatureVector) -> Result<Prediction, TradeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.prediction)
    }
}

pub struct BrokenClassifier;

impl Classifier for BrokenClassifier {
    fn predict(&self, _features: &FeatureVector) -> Result<Prediction, TradeError> {
        Err(TradeError::ClassifierUnavailable {
            reason: "model not loaded".into(),
        })
    }
}

// ---------------------------------------------------------------------------
// Brokers
// ---------------------------------------------------------------------------

/// Echoes orders back, confirming each client_order_id at most once.
#[derive(Default)]
pub struct EchoBroker {
    pub requests: Mutex<Vec<BrokerOrderRequest>>,
    pub positions: Mutex<HashSet<String>>,
}

impl EchoBroker {
    pub fn attempts(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn open_positions(&self) -> usize {
        self.positions.lock().unwrap().len()
    }
}

impl BrokerPort for EchoBroker {
    fn place_order(&self, request: &BrokerOrderRequest) -> Result<BrokerReceipt, TradeError> {
        self.requests.lock().unwrap().push(request.clone());
        let first_time = self
            .positions
            .lock()
            .unwrap()
            .insert(request.client_order_id.clone());
        Ok(BrokerReceipt {
            reference: format!("echo-{}", request.client_order_id),
            response: serde_json::json!({
                "symbol": request.symbol,
                "type": request.order_type,
                "volume": request.volume,
                "duplicate": !first_time,
            }),
        })
    }
}

/// Fails with a transport fault `failures` times, then echoes.
pub struct FlakyBroker {
    pub failures: usize,
    pub inner: EchoBroker,
}

impl FlakyBroker {
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            inner: EchoBroker::default(),
        }
    }
}

impl BrokerPort for FlakyBroker {
    fn place_order(&self, request: &BrokerOrderRequest) -> Result<BrokerReceipt, TradeError> {
        let seen = self.inner.attempts();
        if seen < self.failures {
            self.inner.requests.lock().unwrap().push(request.clone());
            return Err(TradeError::BrokerUnreachable {
                reason: "connection reset".into(),
            });
        }
        self.inner.place_order(request)
    }
}

pub struct RejectingBroker {
    pub calls: AtomicUsize,
}

impl RejectingBroker {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl BrokerPort for RejectingBroker {
    fn place_order(&self, _request: &BrokerOrderRequest) -> Result<BrokerReceipt, TradeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TradeError::BrokerRejected {
            reason: "HTTP 422 Unprocessable Entity".into(),
            response: Some(serde_json::json!({"error": "market closed"})),
        })
    }
}

// ---------------------------------------------------------------------------
// Pipeline assembly
// ---------------------------------------------------------------------------

pub fn pipeline_with(
    market_data: Arc<dyn MarketDataPort + Send + Sync>,
    engine: PatternEngine,
    classifier: Arc<dyn Classifier + Send + Sync>,
    broker: Arc<dyn BrokerPort + Send + Sync>,
) -> DecisionPipeline {
    DecisionPipeline::new(
        market_data,
        engine,
        SignalSynthesizer::new(SignalSettings::default()),
        SignalFilter::new(Arc::new(BarFeatureExtractor::default()), classifier),
        PositionSizer::new(RiskSettings::default()),
        OrderSubmitter::new(broker, RetryPolicy::immediate(3)),
    )
}

pub fn xauusd_data() -> Arc<MockMarketData> {
    Arc::new(MockMarketData::new().with_bars("XAUUSD", bullish_setup()))
}
