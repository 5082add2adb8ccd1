//! Core domain types and logic: indicators, regime, signals, risk, decisions,
//! allocation and the portfolio simulator.

pub mod ohlcv;
pub mod indicator;
pub mod indicator_set;
pub mod regime;
pub mod signal;
pub mod risk;
pub mod decision;
pub mod allocation;
pub mod position;
pub mod portfolio;
pub mod simulator;
pub mod agent;
pub mod config_validation;
pub mod error;
