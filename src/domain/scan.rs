//! Latest-period signal scan across a universe.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::price::PricePoint;
use crate::domain::signal::{current_signal, SignalState, WindowConfig};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanEntry {
    pub code: String,
    pub as_of: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalScan {
    pub new_buys: Vec<ScanEntry>,
    pub new_sells: Vec<ScanEntry>,
    pub holds: Vec<ScanEntry>,
    /// Instruments with too little history to carry a signal.
    pub skipped: Vec<String>,
}

pub fn scan_universe(
    universe: &BTreeMap<String, Vec<PricePoint>>,
    config: &WindowConfig,
) -> SignalScan {
    let mut scan = SignalScan::default();

    for (code, points) in universe {
        let (Some(sig), Some(last)) = (current_signal(points, config), points.last()) else {
            scan.skipped.push(code.clone());
            continue;
        };

        let entry = ScanEntry {
            code: code.clone(),
            as_of: last.date,
            close: last.close,
        };

        match sig.state() {
            SignalState::NewBuy => scan.new_buys.push(entry),
            SignalState::NewSell => scan.new_sells.push(entry),
            SignalState::Hold => scan.holds.push(entry),
            SignalState::Flat => {}
        }
    }

    scan
}
