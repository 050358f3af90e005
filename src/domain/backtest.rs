//! Single-instrument backtest.
//!
//! Returns are earned only in periods entered with an active position
//! (the previous period's signal), so a crossover is never traded on the
//! close that revealed it.

use tracing::debug;

use crate::domain::position::{ClosedTrade, Position};
use crate::domain::price::{period_returns, PricePoint};
use crate::domain::returns::{compound, EquityPoint, ReturnPoint};
use crate::domain::signal::{calculate_signals, SignalRecord, WindowConfig};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstrumentBacktest {
    pub signals: Vec<SignalRecord>,
    /// Gated strategy return per period.
    pub returns: Vec<ReturnPoint>,
    pub cumulative: Vec<EquityPoint>,
    pub trades: Vec<ClosedTrade>,
}

impl InstrumentBacktest {
    /// The "no result" value for histories too short to backtest.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn final_growth(&self) -> Option<f64> {
        self.cumulative.last().map(|p| p.equity)
    }
}

pub fn backtest_instrument(points: &[PricePoint], config: &WindowConfig) -> InstrumentBacktest {
    if points.len() < config.min_periods() {
        debug!(
            periods = points.len(),
            minimum = config.min_periods(),
            "series too short to backtest"
        );
        return InstrumentBacktest::empty();
    }

    let signals = calculate_signals(points, config);
    let raw = period_returns(points);

    let returns: Vec<ReturnPoint> = signals
        .iter()
        .zip(raw)
        .map(|(rec, r)| ReturnPoint {
            date: rec.date,
            value: r.map(|v| v * rec.exposure()),
        })
        .collect();

    let cumulative = compound(&returns);
    let trades = reconstruct_trades(&signals);

    debug!(
        periods = signals.len(),
        trades = trades.len(),
        "instrument backtest complete"
    );

    InstrumentBacktest {
        signals,
        returns,
        cumulative,
        trades,
    }
}

/// Pair each buy with the next sell. Only one position is held at a time;
/// a position still open at the end is not reported.
pub fn reconstruct_trades(signals: &[SignalRecord]) -> Vec<ClosedTrade> {
    let mut trades = Vec::new();
    let mut open: Option<Position> = None;

    for rec in signals {
        match open {
            None if rec.buy => open = Some(Position::open(rec.date, rec.close)),
            Some(pos) if rec.sell => {
                trades.push(pos.close(rec.date, rec.close));
                open = None;
            }
            _ => {}
        }
    }

    trades
}
