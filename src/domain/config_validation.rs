//! Configuration validation and typed config builders.
//!
//! Validates all config fields before any backtest runs.

use crate::domain::error::CrosstraderError;
use crate::domain::portfolio::{PortfolioConfig, EQUAL_WEIGHT_SLOTS};
use crate::domain::signal::{WindowConfig, DEFAULT_LONG_WINDOW, DEFAULT_SHORT_WINDOW};
use crate::domain::universe::{default_codes, parse_codes};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::Duration;

/// First month of the default history window.
pub const DEFAULT_START_DATE: (i32, u32, u32) = (2001, 1, 1);

/// Price data is refetched after two hours.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 7200;

/// Run-level settings shared by every CLI command.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub codes: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub data_path: PathBuf,
    pub benchmark: Option<String>,
    pub cache_ttl: Duration,
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), CrosstraderError> {
    build_window_config(config)?;
    build_portfolio_config(config)?;
    validate_dates(config)?;
    validate_codes(config)?;
    validate_data(config)?;
    Ok(())
}

fn positive(config: &dyn ConfigPort, section: &str, key: &str, default: i64) -> Result<usize, CrosstraderError> {
    let value = config.get_int(section, key, default);
    if value <= 0 {
        return Err(CrosstraderError::invalid(
            section,
            key,
            format!("{} must be positive", key),
        ));
    }
    Ok(value as usize)
}

pub fn build_window_config(config: &dyn ConfigPort) -> Result<WindowConfig, CrosstraderError> {
    let short = positive(config, "signal", "short_window", DEFAULT_SHORT_WINDOW as i64)?;
    let long = positive(config, "signal", "long_window", DEFAULT_LONG_WINDOW as i64)?;
    WindowConfig::new(short, long)
}

pub fn build_portfolio_config(config: &dyn ConfigPort) -> Result<PortfolioConfig, CrosstraderError> {
    let slots = positive(config, "portfolio", "slots", EQUAL_WEIGHT_SLOTS as i64)?;
    PortfolioConfig::new(slots)
}

fn parse_date(
    config: &dyn ConfigPort,
    key: &str,
    default: NaiveDate,
) -> Result<NaiveDate, CrosstraderError> {
    match config.get_string("backtest", key) {
        None => Ok(default),
        Some(_) => config.get_date("backtest", key).ok_or_else(|| {
            CrosstraderError::invalid(
                "backtest",
                key,
                format!("invalid {} format, expected YYYY-MM-DD", key),
            )
        }),
    }
}

fn dates(config: &dyn ConfigPort) -> Result<(NaiveDate, NaiveDate), CrosstraderError> {
    let (y, m, d) = DEFAULT_START_DATE;
    let default_start = NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN);
    let start = parse_date(config, "start_date", default_start)?;
    let end = parse_date(config, "end_date", NaiveDate::MAX)?;
    Ok((start, end))
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), CrosstraderError> {
    let (start, end) = dates(config)?;
    if start >= end {
        return Err(CrosstraderError::invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

fn codes(config: &dyn ConfigPort) -> Result<Vec<String>, CrosstraderError> {
    match config.get_string("backtest", "codes") {
        None => Ok(default_codes()),
        Some(s) => parse_codes(&s).map_err(|e| CrosstraderError::invalid("backtest", "codes", e.to_string())),
    }
}

fn validate_codes(config: &dyn ConfigPort) -> Result<(), CrosstraderError> {
    codes(config).map(|_| ())
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), CrosstraderError> {
    if config.get_string("data", "path").is_none() {
        return Err(CrosstraderError::missing("data", "path"));
    }
    let ttl = config.get_int("data", "cache_ttl_secs", DEFAULT_CACHE_TTL_SECS as i64);
    if ttl < 0 {
        return Err(CrosstraderError::invalid(
            "data",
            "cache_ttl_secs",
            "cache_ttl_secs must be non-negative",
        ));
    }
    Ok(())
}

pub fn build_run_config(config: &dyn ConfigPort) -> Result<RunConfig, CrosstraderError> {
    validate_data(config)?;
    validate_dates(config)?;
    let (start_date, end_date) = dates(config)?;

    let data_path = config
        .get_string("data", "path")
        .map(PathBuf::from)
        .ok_or_else(|| CrosstraderError::missing("data", "path"))?;
    let ttl = config.get_int("data", "cache_ttl_secs", DEFAULT_CACHE_TTL_SECS as i64);

    Ok(RunConfig {
        codes: codes(config)?,
        start_date,
        end_date,
        data_path,
        benchmark: config.get_string("data", "benchmark"),
        cache_ttl: Duration::from_secs(ttl.max(0) as u64),
    })
}
