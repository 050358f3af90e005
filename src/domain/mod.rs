//! Core domain types and logic.

pub mod price;
pub mod indicator;
pub mod signal;
pub mod returns;
pub mod position;
pub mod backtest;
pub mod portfolio;
pub mod metrics;
pub mod scan;
pub mod universe;
pub mod config_validation;
pub mod error;
