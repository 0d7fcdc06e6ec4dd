//! Sized orders and their idempotency keys.

use rand::RngCore;
use serde::Serialize;
use std::fmt;

use crate::domain::signal::Side;

/// Token that lets the broker recognise a retried submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// 16 random bytes, hex encoded.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        IdempotencyKey(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for IdempotencyKey {
    fn from(value: &str) -> Self {
        IdempotencyKey(value.to_string())
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An accepted, sized order ready for the broker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizedOrder {
    pub symbol: String,
    pub side: Side,
    pub lot_size: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub idempotency_key: IdempotencyKey,
}

impl SizedOrder {
    /// Zero-volume orders never go to the broker.
    pub fn is_submittable(&self) -> bool {
        self.lot_size.is_finite() && self.lot_size > 0.0
    }
}
