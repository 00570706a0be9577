//! Core domain types and logic.

pub mod candle;
pub mod indicator;
pub mod signal;
pub mod risk;
pub mod position;
pub mod trade_machine;
pub mod strategy;
pub mod backtest;
pub mod live;
pub mod metrics;
pub mod instrument;
pub mod order;
pub mod config_validation;
pub mod error;
