//! Equal-weight portfolio aggregation.
//!
//! Every instrument owns a fixed `1/slots` share of capital. A slot whose
//! instrument is inactive (or absent) sits in cash and earns nothing, so
//! the aggregate return is always divided by `slots` and never by the
//! number of active instruments.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::domain::error::CrosstraderError;
use crate::domain::price::{period_returns, PricePoint};
use crate::domain::returns::{compound, EquityPoint, ReturnPoint};
use crate::domain::signal::{calculate_signals, WindowConfig};

pub const EQUAL_WEIGHT_SLOTS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortfolioConfig {
    pub slots: usize,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        PortfolioConfig {
            slots: EQUAL_WEIGHT_SLOTS,
        }
    }
}

impl PortfolioConfig {
    pub fn new(slots: usize) -> Result<Self, CrosstraderError> {
        if slots == 0 {
            return Err(CrosstraderError::invalid(
                "portfolio",
                "slots",
                "slots must be positive",
            ));
        }
        Ok(PortfolioConfig { slots })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioResult {
    pub returns: Vec<ReturnPoint>,
    pub cumulative: Vec<EquityPoint>,
    pub active_counts: Vec<ActiveCount>,
    /// Instruments that met the minimum history and took part.
    pub instruments: Vec<String>,
}

impl PortfolioResult {
    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    pub fn max_active(&self) -> usize {
        self.active_counts.iter().map(|a| a.count).max().unwrap_or(0)
    }
}

/// One instrument's position and raw-return columns, keyed by date.
struct InstrumentColumns {
    positions: HashMap<NaiveDate, Option<bool>>,
    returns: HashMap<NaiveDate, Option<f64>>,
}

fn instrument_columns(points: &[PricePoint], config: &WindowConfig) -> InstrumentColumns {
    let signals = calculate_signals(points, config);
    let raw = period_returns(points);

    InstrumentColumns {
        positions: signals.iter().map(|s| (s.date, s.position)).collect(),
        returns: points.iter().map(|p| p.date).zip(raw).collect(),
    }
}

pub fn backtest_portfolio(
    universe: &BTreeMap<String, Vec<PricePoint>>,
    windows: &WindowConfig,
    config: &PortfolioConfig,
) -> PortfolioResult {
    let columns: Vec<(String, InstrumentColumns)> = universe
        .par_iter()
        .filter(|(_, points)| points.len() >= windows.min_periods())
        .map(|(code, points)| (code.clone(), instrument_columns(points, windows)))
        .collect();

    for (code, points) in universe {
        if points.len() < windows.min_periods() {
            warn!(
                code = %code,
                periods = points.len(),
                minimum = windows.min_periods(),
                "excluding instrument from portfolio"
            );
        }
    }

    if columns.is_empty() {
        return PortfolioResult::default();
    }

    let position_dates: BTreeSet<NaiveDate> = columns
        .iter()
        .flat_map(|(_, c)| c.positions.keys().copied())
        .collect();
    let return_dates: BTreeSet<NaiveDate> = columns
        .iter()
        .flat_map(|(_, c)| c.returns.keys().copied())
        .collect();

    let slots = config.slots as f64;
    let mut returns = Vec::new();
    let mut active_counts = Vec::new();

    for &date in position_dates.intersection(&return_dates) {
        let mut weighted = 0.0_f64;
        let mut active = 0usize;

        for (_, col) in &columns {
            let position = col.positions.get(&date).copied().flatten();
            if position == Some(true) {
                active += 1;
            }
            let ret = col.returns.get(&date).copied().flatten();
            if let (Some(p), Some(r)) = (position, ret) {
                weighted += if p { r } else { 0.0 };
            }
        }

        returns.push(ReturnPoint {
            date,
            value: Some(weighted / slots),
        });
        active_counts.push(ActiveCount {
            date,
            count: active,
        });
    }

    let cumulative = compound(&returns);
    let instruments: Vec<String> = columns.into_iter().map(|(code, _)| code).collect();

    debug!(
        instruments = instruments.len(),
        periods = returns.len(),
        slots = config.slots,
        "portfolio backtest complete"
    );

    PortfolioResult {
        returns,
        cumulative,
        active_counts,
        instruments,
    }
}
