//! Configuration access port trait.

use chrono::NaiveDate;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;

    /// `YYYY-MM-DD` value; `None` when absent or malformed.
    fn get_date(&self, section: &str, key: &str) -> Option<NaiveDate> {
        self.get_string(section, key)
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
    }
}
