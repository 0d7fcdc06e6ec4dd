//! Core domain types and decision logic.

pub mod config;
pub mod detector;
pub mod error;
pub mod execution;
pub mod features;
pub mod filter;
pub mod ohlcv;
pub mod order;
pub mod pipeline;
pub mod signal;
pub mod sizing;
