//! smctrader: structure-based trade decision service.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], process bootstrap in [`cli`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
