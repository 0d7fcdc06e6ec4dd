//! Port traits implemented by adapters.

pub mod broker_port;
pub mod classifier_port;
pub mod config_port;
pub mod market_data_port;
