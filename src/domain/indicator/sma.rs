//! Simple Moving Average indicator.
//!
//! SMA(n) = (P[i-n+1] + ... + P[i]) / n
//! Warmup: first (n-1) points are invalid.
//!
//! A window holding n equal closes yields that close exactly. Any other
//! window is summed from its own slice with Neumaier compensation, so no
//! rounding error carries over from earlier windows.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::price::PricePoint;

pub fn calculate_sma(points: &[PricePoint], period: usize) -> IndicatorSeries {
    if period == 0 || points.is_empty() {
        return IndicatorSeries {
            indicator_type: IndicatorType::Sma(period),
            values: Vec::new(),
        };
    }

    let mut values = Vec::with_capacity(points.len());
    // Consecutive closes equal to the current one, current included.
    let mut equal_run = 0usize;

    for (i, point) in points.iter().enumerate() {
        equal_run = if i > 0 && points[i - 1].close == point.close {
            equal_run + 1
        } else {
            1
        };

        let valid = i + 1 >= period;
        let sma = if !valid {
            0.0
        } else if equal_run >= period {
            point.close
        } else {
            compensated_sum(&points[i + 1 - period..=i]) / period as f64
        };

        values.push(IndicatorPoint {
            date: point.date,
            valid,
            value: sma,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}

fn compensated_sum(window: &[PricePoint]) -> f64 {
    let mut sum = 0.0_f64;
    let mut compensation = 0.0_f64;
    for point in window {
        let x = point.close;
        let t = sum + x;
        if sum.abs() >= x.abs() {
            compensation += (sum - t) + x;
        } else {
            compensation += (x - t) + sum;
        }
        sum = t;
    }
    sum + compensation
}
