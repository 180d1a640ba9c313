//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod cost;
pub mod error;
pub mod frequency;
pub mod metrics;
pub mod period;
pub mod price_grid;
pub mod schedule;
pub mod series;
pub mod universe;
pub mod weights;
