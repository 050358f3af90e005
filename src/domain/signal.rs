//! Moving-average crossover signal.
//!
//! The market state is long while the short-window SMA is strictly above
//! the long-window SMA. Periods before the long window fills carry no
//! state at all, and no transition is ever reported against them.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::domain::error::CrosstraderError;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::price::PricePoint;

pub const DEFAULT_SHORT_WINDOW: usize = 2;
pub const DEFAULT_LONG_WINDOW: usize = 10;

/// Short/long SMA window lengths, in periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    pub short_window: usize,
    pub long_window: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            short_window: DEFAULT_SHORT_WINDOW,
            long_window: DEFAULT_LONG_WINDOW,
        }
    }
}

impl WindowConfig {
    pub fn new(short_window: usize, long_window: usize) -> Result<Self, CrosstraderError> {
        if short_window == 0 {
            return Err(CrosstraderError::invalid(
                "signal",
                "short_window",
                "short_window must be positive",
            ));
        }
        if long_window <= short_window {
            return Err(CrosstraderError::invalid(
                "signal",
                "long_window",
                "long_window must be greater than short_window",
            ));
        }
        Ok(WindowConfig {
            short_window,
            long_window,
        })
    }

    /// Observations a backtest needs: a full long window plus one period
    /// to realise a return against it.
    pub fn min_periods(&self) -> usize {
        self.long_window + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRecord {
    pub date: NaiveDate,
    pub close: f64,
    pub short_ma: Option<f64>,
    pub long_ma: Option<f64>,
    /// `Some(true)` while short > long; `None` during warmup.
    pub signal: Option<bool>,
    /// Previous period's `signal`, used to gate this period's return.
    pub position: Option<bool>,
    pub buy: bool,
    pub sell: bool,
}

impl SignalRecord {
    /// Position as an exposure multiplier; undefined counts as flat.
    pub fn exposure(&self) -> f64 {
        if self.position == Some(true) { 1.0 } else { 0.0 }
    }
}

pub fn calculate_signals(points: &[PricePoint], config: &WindowConfig) -> Vec<SignalRecord> {
    let short = calculate_sma(points, config.short_window);
    let long = calculate_sma(points, config.long_window);
    debug!(
        short = %short.indicator_type,
        long = %long.indicator_type,
        periods = points.len(),
        defined = long.valid_count(),
        "moving averages computed"
    );

    let mut records: Vec<SignalRecord> = Vec::with_capacity(points.len());
    let mut prev_signal: Option<bool> = None;

    for (i, point) in points.iter().enumerate() {
        let short_ma = short.values.get(i).and_then(|p| p.get());
        let long_ma = long.values.get(i).and_then(|p| p.get());

        let signal = match (short_ma, long_ma) {
            (Some(s), Some(l)) => Some(s > l),
            _ => None,
        };

        let buy = signal == Some(true) && prev_signal == Some(false);
        let sell = signal == Some(false) && prev_signal == Some(true);

        records.push(SignalRecord {
            date: point.date,
            close: point.close,
            short_ma,
            long_ma,
            signal,
            position: prev_signal,
            buy,
            sell,
        });

        prev_signal = signal;
    }

    records
}

/// State of the most recent period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurrentSignal {
    pub position: bool,
    pub new_buy: bool,
    pub new_sell: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SignalState {
    NewBuy,
    NewSell,
    Hold,
    Flat,
}

impl CurrentSignal {
    pub fn state(&self) -> SignalState {
        if self.new_buy {
            SignalState::NewBuy
        } else if self.new_sell {
            SignalState::NewSell
        } else if self.position {
            SignalState::Hold
        } else {
            SignalState::Flat
        }
    }
}

/// Signal state at the last period, or `None` for short histories.
pub fn current_signal(points: &[PricePoint], config: &WindowConfig) -> Option<CurrentSignal> {
    if points.len() < config.min_periods() {
        return None;
    }
    let records = calculate_signals(points, config);
    let last = records.last()?;
    Some(CurrentSignal {
        position: last.signal == Some(true),
        new_buy: last.buy,
        new_sell: last.sell,
    })
}
