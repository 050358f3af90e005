//! Open positions and realized round-trip trades.

use chrono::NaiveDate;
use serde::Serialize;

/// A long position opened on a buy signal and not yet closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
}

impl Position {
    pub fn open(entry_date: NaiveDate, entry_price: f64) -> Self {
        Position {
            entry_date,
            entry_price,
        }
    }

    pub fn unrealized_return_pct(&self, price: f64) -> f64 {
        (price - self.entry_price) / self.entry_price * 100.0
    }

    /// Realize the position at `exit_price`.
    pub fn close(self, exit_date: NaiveDate, exit_price: f64) -> ClosedTrade {
        ClosedTrade {
            entry_date: self.entry_date,
            exit_date,
            entry_price: self.entry_price,
            exit_price,
            return_pct: self.unrealized_return_pct(exit_price),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosedTrade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    /// `(exit - entry) / entry * 100`, full precision.
    pub return_pct: f64,
}

impl ClosedTrade {
    pub fn is_win(&self) -> bool {
        self.return_pct > 0.0
    }

    /// Months between entry and exit.
    pub fn holding_months(&self) -> i32 {
        use chrono::Datelike;
        (self.exit_date.year() - self.entry_date.year()) * 12 + self.exit_date.month() as i32
            - self.entry_date.month() as i32
    }
}
