//! Instrument universe: code lists, the default listing, and loading with
//! minimum-history validation.

use crate::domain::error::CrosstraderError;
use crate::domain::price::PricePoint;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

/// KOSPI top-30 by market capitalisation (January 2025), used when no
/// listing is configured.
pub const DEFAULT_UNIVERSE: [(&str, &str); 30] = [
    ("005930", "Samsung Electronics"),
    ("000660", "SK hynix"),
    ("005380", "Hyundai Motor"),
    ("373220", "LG Energy Solution"),
    ("005935", "Samsung Electronics Pref"),
    ("000270", "Kia"),
    ("068270", "Celltrion"),
    ("105560", "KB Financial"),
    ("055550", "Shinhan Financial"),
    ("035420", "NAVER"),
    ("028260", "Samsung C&T"),
    ("003670", "POSCO Holdings"),
    ("012330", "Hyundai Mobis"),
    ("035720", "Kakao"),
    ("066570", "LG Electronics"),
    ("086790", "Hana Financial"),
    ("051910", "LG Chem"),
    ("006400", "Samsung SDI"),
    ("032830", "Samsung Life"),
    ("003550", "LG Corp"),
    ("096770", "SK Innovation"),
    ("017670", "SK Telecom"),
    ("030200", "KT"),
    ("034730", "SK Inc"),
    ("009150", "Samsung Electro-Mechanics"),
    ("018260", "Samsung SDS"),
    ("010130", "Korea Zinc"),
    ("033780", "KT&G"),
    ("011200", "HMM"),
    ("316140", "Woori Financial"),
];

pub fn default_codes() -> Vec<String> {
    DEFAULT_UNIVERSE
        .iter()
        .map(|(code, _)| code.to_string())
        .collect()
}

pub fn display_name(code: &str) -> Option<&'static str> {
    DEFAULT_UNIVERSE
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[derive(Debug, Clone)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoData,
    InsufficientPeriods { periods: usize },
}

#[derive(Debug, Clone, Default)]
pub struct LoadedUniverse {
    pub series: BTreeMap<String, Vec<PricePoint>>,
    pub skipped: Vec<SkippedCode>,
}

impl LoadedUniverse {
    pub fn count(&self) -> usize {
        self.series.len()
    }
}

/// Fetch every code and keep those with at least `minimum` monthly closes.
///
/// Failed or short codes are skipped with a warning; it is an error only
/// when nothing survives.
pub fn load_universe(
    data_port: &dyn DataPort,
    codes: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
    minimum: usize,
) -> Result<LoadedUniverse, CrosstraderError> {
    let mut loaded = LoadedUniverse::default();

    for code in codes {
        let points = match data_port.fetch_monthly_closes(code, start_date, end_date) {
            Ok(points) => points,
            Err(e) => {
                warn!(code = %code, error = %e, "skipping instrument");
                loaded.skipped.push(SkippedCode {
                    code: code.clone(),
                    reason: SkipReason::NoData,
                });
                continue;
            }
        };

        if points.is_empty() {
            warn!(code = %code, "skipping instrument: no data found");
            loaded.skipped.push(SkippedCode {
                code: code.clone(),
                reason: SkipReason::NoData,
            });
            continue;
        }

        if points.len() < minimum {
            warn!(
                code = %code,
                periods = points.len(),
                minimum,
                "skipping instrument: insufficient history"
            );
            loaded.skipped.push(SkippedCode {
                code: code.clone(),
                reason: SkipReason::InsufficientPeriods {
                    periods: points.len(),
                },
            });
            continue;
        }

        info!(code = %code, periods = points.len(), "loaded");
        loaded.series.insert(code.clone(), points);
    }

    if loaded.series.is_empty() {
        return Err(CrosstraderError::InsufficientData {
            code: "all".to_string(),
            periods: 0,
            minimum,
        });
    }

    if !loaded.skipped.is_empty() {
        info!(
            loaded = loaded.count(),
            requested = codes.len(),
            "universe partially loaded"
        );
    }

    Ok(loaded)
}
