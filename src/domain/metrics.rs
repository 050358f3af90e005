//! Performance metrics over a monthly return series.
//!
//! All statistics are computed at full precision; rounding happens only
//! in [`Metrics::to_named`].

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::returns::{defined, EquityPoint, ReturnPoint};

pub const PERIODS_PER_YEAR: f64 = 12.0;

pub const BENCHMARK_PREFIX: &str = "Benchmark ";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    /// Final growth minus one, as a fraction.
    pub cumulative_return: f64,
    pub cagr: f64,
    /// Deepest peak-to-trough decline, as a non-positive fraction.
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    /// Percentage of nonzero-return periods that were positive.
    pub win_rate: f64,
    pub profit_loss_ratio: f64,
    pub periods: usize,
    pub benchmark: Option<BenchmarkMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkMetrics {
    pub cumulative_return: f64,
    pub cagr: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub periods: usize,
}

impl Metrics {
    /// Metrics for `returns`, dropping undefined periods first.
    ///
    /// Returns `None` when no defined period remains. Benchmark figures are
    /// computed over the benchmark's own defined values at dates shared
    /// with the strategy and are omitted when nothing overlaps.
    pub fn compute(returns: &[ReturnPoint], benchmark: Option<&[ReturnPoint]>) -> Option<Self> {
        let series = defined(returns);
        if series.is_empty() {
            return None;
        }
        let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();

        let curve = growth_curve(&values);
        let final_growth = curve.last().copied().unwrap_or(1.0);

        let benchmark = benchmark.and_then(|bm| compute_benchmark(&series, bm));

        Some(Metrics {
            cumulative_return: final_growth - 1.0,
            cagr: compute_cagr(final_growth, values.len()),
            max_drawdown: compute_max_drawdown(&curve),
            sharpe_ratio: compute_sharpe(&values),
            win_rate: compute_win_rate(&values),
            profit_loss_ratio: compute_profit_loss_ratio(&values),
            periods: values.len(),
            benchmark,
        })
    }

    /// Presentation view: ordered `(name, value)` pairs, percentages
    /// scaled by 100 and rounded to 2 dp (win rate to 1 dp).
    pub fn to_named(&self) -> Vec<(String, f64)> {
        let mut named = vec![
            ("Cumulative Return (%)".to_string(), round_to(self.cumulative_return * 100.0, 2)),
            ("CAGR (%)".to_string(), round_to(self.cagr * 100.0, 2)),
            ("MDD (%)".to_string(), round_to(self.max_drawdown * 100.0, 2)),
            ("Sharpe Ratio".to_string(), round_to(self.sharpe_ratio, 2)),
            ("Win Rate (%)".to_string(), round_to(self.win_rate, 1)),
            ("Profit/Loss Ratio".to_string(), round_to(self.profit_loss_ratio, 2)),
        ];

        if let Some(bm) = &self.benchmark {
            named.push((
                format!("{BENCHMARK_PREFIX}Cumulative Return (%)"),
                round_to(bm.cumulative_return * 100.0, 2),
            ));
            named.push((format!("{BENCHMARK_PREFIX}CAGR (%)"), round_to(bm.cagr * 100.0, 2)));
            named.push((
                format!("{BENCHMARK_PREFIX}MDD (%)"),
                round_to(bm.max_drawdown * 100.0, 2),
            ));
            named.push((
                format!("{BENCHMARK_PREFIX}Sharpe Ratio"),
                round_to(bm.sharpe_ratio, 2),
            ));
        }

        named
    }
}

fn compute_benchmark(
    strategy: &[(NaiveDate, f64)],
    benchmark: &[ReturnPoint],
) -> Option<BenchmarkMetrics> {
    let bm: HashMap<NaiveDate, f64> = defined(benchmark).into_iter().collect();
    let common: Vec<f64> = strategy
        .iter()
        .filter_map(|(date, _)| bm.get(date).copied())
        .collect();

    if common.is_empty() {
        return None;
    }

    let curve = growth_curve(&common);
    let final_growth = curve.last().copied().unwrap_or(1.0);

    Some(BenchmarkMetrics {
        cumulative_return: final_growth - 1.0,
        cagr: compute_cagr(final_growth, common.len()),
        max_drawdown: compute_max_drawdown(&curve),
        sharpe_ratio: compute_sharpe(&common),
        periods: common.len(),
    })
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn growth_curve(values: &[f64]) -> Vec<f64> {
    let mut growth = 1.0_f64;
    values
        .iter()
        .map(|r| {
            growth *= 1.0 + r;
            growth
        })
        .collect()
}

pub fn compute_cagr(final_growth: f64, periods: usize) -> f64 {
    let years = periods as f64 / PERIODS_PER_YEAR;
    if years <= 0.0 || final_growth <= 0.0 {
        return 0.0;
    }
    final_growth.powf(1.0 / years) - 1.0
}

/// Minimum of `(growth - peak) / peak`; zero for a curve that never falls.
pub fn compute_max_drawdown(curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for &growth in curve {
        if growth > peak {
            peak = growth;
        }
        if peak > 0.0 {
            let dd = (growth - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

/// Annualized mean over sample standard deviation; zero without variance.
pub fn compute_sharpe(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let first = values[0];
    if values.iter().all(|&v| v == first) {
        return 0.0;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        mean / stddev * PERIODS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}

/// Share of nonzero periods that were positive, in percent.
pub fn compute_win_rate(values: &[f64]) -> f64 {
    let wins = values.iter().filter(|&&r| r > 0.0).count();
    let nonzero = values.iter().filter(|&&r| r != 0.0).count();
    if nonzero > 0 {
        wins as f64 / nonzero as f64 * 100.0
    } else {
        0.0
    }
}

/// Mean winning return over absolute mean losing return.
///
/// With no winners the numerator is 0; with no losers the denominator is 1.
pub fn compute_profit_loss_ratio(values: &[f64]) -> f64 {
    let wins: Vec<f64> = values.iter().copied().filter(|&r| r > 0.0).collect();
    let losses: Vec<f64> = values.iter().copied().filter(|&r| r < 0.0).collect();

    let avg_win = if wins.is_empty() {
        0.0
    } else {
        wins.iter().sum::<f64>() / wins.len() as f64
    };
    let avg_loss = if losses.is_empty() {
        1.0
    } else {
        (losses.iter().sum::<f64>() / losses.len() as f64).abs()
    };

    if avg_loss > 0.0 { avg_win / avg_loss } else { 0.0 }
}

/// Year-by-month grid of summed returns in percent; months without data
/// are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyReturnTable {
    pub rows: BTreeMap<i32, [Option<f64>; 12]>,
}

impl MonthlyReturnTable {
    pub fn from_returns(returns: &[ReturnPoint]) -> Self {
        let mut rows: BTreeMap<i32, [Option<f64>; 12]> = BTreeMap::new();
        for (date, value) in defined(returns) {
            let row = rows.entry(date.year()).or_insert([None; 12]);
            let cell = &mut row[date.month0() as usize];
            *cell = Some(cell.unwrap_or(0.0) + value * 100.0);
        }
        MonthlyReturnTable { rows }
    }

    pub fn get(&self, year: i32, month: u32) -> Option<f64> {
        if !(1..=12).contains(&month) {
            return None;
        }
        self.rows.get(&year).and_then(|row| row[month as usize - 1])
    }
}

/// Benchmark growth over the strategy's dates, for side-by-side display.
/// Undefined benchmark returns compound as zero.
pub fn aligned_benchmark_growth(
    strategy: &[EquityPoint],
    benchmark: &[ReturnPoint],
) -> Vec<EquityPoint> {
    let bm: HashMap<NaiveDate, Option<f64>> =
        benchmark.iter().map(|r| (r.date, r.value)).collect();

    let mut growth = 1.0_f64;
    strategy
        .iter()
        .filter_map(|p| bm.get(&p.date).map(|v| (p.date, *v)))
        .map(|(date, value)| {
            growth *= 1.0 + value.unwrap_or(0.0);
            EquityPoint {
                date,
                equity: growth,
            }
        })
        .collect()
}
