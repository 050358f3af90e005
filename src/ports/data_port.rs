//! Market data port trait.
//!
//! Implementations resolve an instrument code to a month-end closing
//! series. Where the data comes from, and any caching or provider
//! fallback, stays behind this trait.

use crate::domain::error::CrosstraderError;
use crate::domain::price::PricePoint;
use chrono::NaiveDate;

pub trait DataPort {
    /// Month-end closes for `code` within `[start_date, end_date]`,
    /// ascending by date.
    fn fetch_monthly_closes(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, CrosstraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, CrosstraderError>;
}
