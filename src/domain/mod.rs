//! Core domain types and logic.

pub mod ohlcv;
pub mod market;
pub mod signal;
pub mod trade;
pub mod commission;
pub mod sizing;
pub mod position;
pub mod account;
pub mod indicator;
pub mod strategy;
pub mod backtest;
pub mod metrics;
pub mod records;
pub mod config_validation;
pub mod batch;
pub mod error;
