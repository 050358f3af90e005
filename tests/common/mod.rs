#![allow(dead_code)]

use chrono::{Months, NaiveDate};
use crosstrader::domain::error::CrosstraderError;
pub use crosstrader::domain::price::PricePoint;
use crosstrader::ports::data_port::DataPort;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, code: &str, points: Vec<PricePoint>) -> Self {
        self.data.insert(code.to_string(), points);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_monthly_closes(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, CrosstraderError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(CrosstraderError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(code)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.date >= start_date && p.date <= end_date)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, CrosstraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Month-end closes starting at `start`, one per month.
pub fn monthly_series(start: NaiveDate, prices: &[f64]) -> Vec<PricePoint> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint::new(start + Months::new(i as u32), close))
        .collect()
}

pub fn jan_2020() -> NaiveDate {
    date(2020, 1, 31)
}

/// Ten flat months, a dip, then a rally: SMA(2) crosses above SMA(10) at
/// index 12 and the position is held from index 13.
pub const RALLY: [f64; 14] = [
    100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 90.0, 80.0, 120.0,
    150.0,
];

pub fn rally_then_crash() -> Vec<f64> {
    let mut prices = RALLY.to_vec();
    prices.extend([40.0, 30.0]);
    prices
}

pub fn universe(entries: &[(&str, Vec<PricePoint>)]) -> BTreeMap<String, Vec<PricePoint>> {
    entries
        .iter()
        .map(|(code, points)| (code.to_string(), points.clone()))
        .collect()
}

/// Write `<code>.csv` with `date,close` rows for the CSV adapter.
pub fn write_price_csv(dir: &Path, code: &str, points: &[PricePoint]) {
    let mut content = String::from("date,close\n");
    for p in points {
        content.push_str(&format!("{},{}\n", p.date.format("%Y-%m-%d"), p.close));
    }
    fs::write(dir.join(format!("{code}.csv")), content).unwrap();
}
