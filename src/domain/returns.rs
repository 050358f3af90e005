//! Dated return and growth series shared by the backtesters and metrics.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::price::{period_returns, PricePoint};

/// A period return; `None` where no return is defined (the first period).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Running product of `1 + r`, with undefined returns compounding as zero.
pub fn compound(returns: &[ReturnPoint]) -> Vec<EquityPoint> {
    let mut growth = 1.0_f64;
    returns
        .iter()
        .map(|r| {
            growth *= 1.0 + r.value.unwrap_or(0.0);
            EquityPoint {
                date: r.date,
                equity: growth,
            }
        })
        .collect()
}

/// Buy-and-hold returns of a price series, e.g. a benchmark index.
pub fn from_prices(points: &[PricePoint]) -> Vec<ReturnPoint> {
    points
        .iter()
        .zip(period_returns(points))
        .map(|(p, value)| ReturnPoint {
            date: p.date,
            value,
        })
        .collect()
}

/// Defined returns only, in order.
pub fn defined(returns: &[ReturnPoint]) -> Vec<(NaiveDate, f64)> {
    returns
        .iter()
        .filter_map(|r| r.value.map(|v| (r.date, v)))
        .collect()
}
