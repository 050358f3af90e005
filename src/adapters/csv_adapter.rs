//! CSV file data adapter.
//!
//! Each instrument lives in `<base>/<code>.csv` with a header row holding
//! at least `date` and `close` columns. Rows may be daily or monthly; they
//! are sorted and resampled to month-end closes on read.

use crate::domain::error::CrosstraderError;
use crate::domain::price::{resample_to_monthly, PricePoint};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }

    fn parse(content: &str) -> Result<Vec<PricePoint>, CrosstraderError> {
        let mut rdr = csv::Reader::from_reader(content.as_bytes());

        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| CrosstraderError::DataSource {
                    reason: format!("missing {} column", name),
                })
        };
        let date_col = column("date")?;
        let close_col = column("close")?;

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result?;

            let date_str = record.get(date_col).unwrap_or_default().trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                CrosstraderError::DataSource {
                    reason: format!("invalid date {:?}: {}", date_str, e),
                }
            })?;

            let close_str = record.get(close_col).unwrap_or_default().trim();
            if close_str.is_empty() {
                continue;
            }
            let close: f64 = close_str.parse().map_err(|e| CrosstraderError::DataSource {
                reason: format!("invalid close value {:?}: {}", close_str, e),
            })?;

            points.push(PricePoint { date, close });
        }

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_monthly_closes(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, CrosstraderError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path).map_err(|e| CrosstraderError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let daily: Vec<PricePoint> = Self::parse(&content)?
            .into_iter()
            .filter(|p| p.date >= start_date && p.date <= end_date)
            .collect();
        let monthly = resample_to_monthly(&daily);

        debug!(
            code,
            rows = daily.len(),
            months = monthly.len(),
            "read price file"
        );
        Ok(monthly)
    }

    fn list_symbols(&self) -> Result<Vec<String>, CrosstraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| CrosstraderError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(code) = name_str.strip_suffix(".csv") {
                symbols.push(code.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
