//! Monthly closing-price series.
//!
//! A price series is a slice of [`PricePoint`] sorted ascending by date with
//! one observation per month-end. Callers guarantee the ordering; nothing
//! in the core re-sorts its input.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Last calendar day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

/// Collapse a sorted daily series into month-end closes.
///
/// Each calendar month keeps its last observed close and is stamped with
/// the month's final calendar day, whether or not that day traded.
/// Already-monthly input passes through with dates normalised.
pub fn resample_to_monthly(points: &[PricePoint]) -> Vec<PricePoint> {
    let mut monthly: Vec<PricePoint> = Vec::new();

    for point in points {
        let end = month_end(point.date);
        match monthly.last_mut() {
            Some(last) if last.date == end => last.close = point.close,
            _ => monthly.push(PricePoint::new(end, point.close)),
        }
    }

    monthly
}

/// Period-over-period simple returns: `close[t] / close[t-1] - 1`.
///
/// The first period has no predecessor and is `None`.
pub fn period_returns(points: &[PricePoint]) -> Vec<Option<f64>> {
    let mut returns = Vec::with_capacity(points.len());
    for (i, point) in points.iter().enumerate() {
        if i == 0 {
            returns.push(None);
        } else {
            returns.push(Some(point.close / points[i - 1].close - 1.0));
        }
    }
    returns
}
