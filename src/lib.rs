//! tradeagent: indicator-driven trading decision agent with a simulated
//! portfolio.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
pub mod logging;
