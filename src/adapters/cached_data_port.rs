//! Time-bounded cache in front of another data port.
//!
//! Entries are keyed by `(code, start_date, end_date)` and expire after a
//! fixed time-to-live. Failed fetches are never cached.

use crate::domain::error::CrosstraderError;
use crate::domain::price::PricePoint;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use moka::sync::Cache;
use std::time::Duration;
use tracing::trace;

const MAX_ENTRIES: u64 = 1024;

type CacheKey = (String, NaiveDate, NaiveDate);

pub struct CachedDataPort<P> {
    inner: P,
    cache: Cache<CacheKey, Vec<PricePoint>>,
}

impl<P: DataPort> CachedDataPort<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .time_to_live(ttl)
            .build();
        Self { inner, cache }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

impl<P: DataPort> DataPort for CachedDataPort<P> {
    fn fetch_monthly_closes(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, CrosstraderError> {
        let key = (code.to_string(), start_date, end_date);
        if let Some(hit) = self.cache.get(&key) {
            trace!(code, "price cache hit");
            return Ok(hit);
        }

        let points = self.inner.fetch_monthly_closes(code, start_date, end_date)?;
        self.cache.insert(key, points.clone());
        Ok(points)
    }

    fn list_symbols(&self) -> Result<Vec<String>, CrosstraderError> {
        self.inner.list_symbols()
    }
}
