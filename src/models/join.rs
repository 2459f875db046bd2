use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::time::date_to_ms;

/// Where a detected join signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    /// Earliest matching mail found by the tiered mailbox scan.
    Mailbox,
    /// Account creation time reported by the platform's public profile API.
    Profile,
}

/// One successful detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    /// Server-assigned timestamp, never a client-editable header.
    pub timestamp_ms: i64,
    /// Index of the query tier that produced the hit.
    pub tier_index: usize,
    pub source: DetectionSource,
}

impl Hit {
    pub fn mailbox(timestamp_ms: i64, tier_index: usize) -> Self {
        Self {
            timestamp_ms,
            tier_index,
            source: DetectionSource::Mailbox,
        }
    }

    pub fn profile(timestamp_ms: i64) -> Self {
        Self {
            timestamp_ms,
            tier_index: 0,
            source: DetectionSource::Profile,
        }
    }

    /// The earlier of two optional hits.
    pub fn earliest(a: Option<Hit>, b: Option<Hit>) -> Option<Hit> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if b.timestamp_ms < a.timestamp_ms { b } else { a }),
            (a, b) => a.or(b),
        }
    }
}

/// User-declared approximate join month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualEntry {
    pub target_key: String,
    /// Always the 1st of a month at UTC midnight.
    pub timestamp_ms: i64,
}

impl ManualEntry {
    pub fn from_month(target_key: &str, year: i32, month: u32) -> Result<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            AppError::Validation(format!("invalid month {}-{:02} for {}", year, month, target_key))
        })?;
        Ok(Self {
            target_key: target_key.to_string(),
            timestamp_ms: date_to_ms(date),
        })
    }

    /// Parses `YYYY-MM`.
    pub fn parse(target_key: &str, value: &str) -> Result<Self> {
        let invalid = || {
            AppError::Validation(format!(
                "manual date for {} must be YYYY-MM, got {:?}",
                target_key, value
            ))
        };
        let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::from_month(target_key, year, month)
    }

    pub fn month(&self) -> NaiveDate {
        let date = crate::models::time::ms_to_date(self.timestamp_ms);
        date.with_day(1).unwrap_or(date)
    }
}

/// Final, confidence-tagged join date for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedJoin {
    pub target_key: String,
    pub timestamp_ms: i64,
    /// True when backed by a detected signal.
    pub verified: bool,
    /// Detected timestamp that was overruled by the manual date.
    pub conflicting_hint_ms: Option<i64>,
}
