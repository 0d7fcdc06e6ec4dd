//! Broker order-entry port.

use serde::Serialize;

use crate::domain::error::TradeError;
use crate::domain::order::SizedOrder;

/// JSON body sent to the broker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerOrderRequest {
    pub symbol: String,
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub volume: f64,
    pub sl: f64,
    pub tp: f64,
    pub client_order_id: String,
}

impl From<&SizedOrder> for BrokerOrderRequest {
    fn from(order: &SizedOrder) -> Self {
        BrokerOrderRequest {
            symbol: order.symbol.clone(),
            order_type: order.side.broker_type(),
            volume: order.lot_size,
            sl: order.stop_loss,
            tp: order.take_profit,
            client_order_id: order.idempotency_key.as_str().to_string(),
        }
    }
}

/// Broker acknowledgement of a placed order.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerReceipt {
    pub reference: String,
    pub response: serde_json::Value,
}

pub trait BrokerPort {
    /// Places one order. Transport failures and timeouts are
    /// `BrokerUnreachable`; refusals by the broker are `BrokerRejected`.
    /// Repeating a request with the same `client_order_id` must not open a
    /// second position.
    fn place_order(&self, request: &BrokerOrderRequest) -> Result<BrokerReceipt, TradeError>;
}
