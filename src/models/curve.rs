//! Adoption curves
//!
//! A curve is a launch date plus strictly ascending `(date, users)` control
//! points. The dataset maps target keys to curves and is loaded once at
//! startup. Loading never fails the process: a missing or malformed file
//! falls back to the bundled dataset, and a target without a curve gets a
//! minimal default one.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::models::time::date_to_ms;

const BUNDLED_DATASET: &str = include_str!("../../data/adoption_curves.json");

/// One observed user count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub users: u64,
}

impl TimelinePoint {
    pub fn new(date: NaiveDate, users: u64) -> Self {
        Self { date, users }
    }

    pub fn timestamp_ms(&self) -> i64 {
        date_to_ms(self.date)
    }
}

/// Piecewise-linear user-count history of a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdoptionCurve {
    launch_date: NaiveDate,
    timeline: Vec<TimelinePoint>,
}

impl AdoptionCurve {
    /// Rejects an empty timeline and dates that are not strictly ascending.
    pub fn new(launch_date: NaiveDate, timeline: Vec<TimelinePoint>) -> Result<Self> {
        if timeline.is_empty() {
            return Err(AppError::Validation("curve timeline is empty".into()));
        }
        if let Some(pair) = timeline.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(AppError::Validation(format!(
                "curve timeline not strictly ascending at {}",
                pair[1].date
            )));
        }
        Ok(Self {
            launch_date,
            timeline,
        })
    }

    /// Fallback used when the dataset has nothing for a target.
    pub fn minimal(launch_date: NaiveDate) -> Self {
        let matured = launch_date
            .checked_add_months(Months::new(120))
            .unwrap_or(NaiveDate::MAX);
        Self {
            launch_date,
            timeline: vec![
                TimelinePoint::new(launch_date, 0),
                TimelinePoint::new(matured, 100_000_000),
            ],
        }
    }

    pub fn launch_date(&self) -> NaiveDate {
        self.launch_date
    }

    pub fn launch_ms(&self) -> i64 {
        date_to_ms(self.launch_date)
    }

    pub fn points(&self) -> &[TimelinePoint] {
        &self.timeline
    }

    pub fn first(&self) -> &TimelinePoint {
        &self.timeline[0]
    }

    pub fn last(&self) -> &TimelinePoint {
        &self.timeline[self.timeline.len() - 1]
    }
}

/// On-disk shape: `{"launch_date": "...", "timeline": [["YYYY-MM-DD", users], ...]}`.
#[derive(Debug, Deserialize)]
struct RawCurve {
    launch_date: NaiveDate,
    timeline: Vec<(NaiveDate, u64)>,
}

/// All curves, keyed by target key.
#[derive(Debug, Clone, Default)]
pub struct CurveDataset {
    curves: HashMap<String, Arc<AdoptionCurve>>,
}

impl CurveDataset {
    /// Parses a dataset document. Entries that violate the curve invariants
    /// are skipped with a warning; a document that is not a JSON object of
    /// curves is an error.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut curves = HashMap::with_capacity(raw.len());

        for (key, value) in raw {
            let parsed = serde_json::from_value::<RawCurve>(value)
                .map_err(AppError::from)
                .and_then(|raw| {
                    let points = raw
                        .timeline
                        .into_iter()
                        .map(|(date, users)| TimelinePoint::new(date, users))
                        .collect();
                    AdoptionCurve::new(raw.launch_date, points)
                });
            match parsed {
                Ok(curve) => {
                    curves.insert(key, Arc::new(curve));
                }
                Err(e) => warn!(target_key = %key, error = %e, "Skipping malformed adoption curve"),
            }
        }

        Ok(Self { curves })
    }

    /// Dataset compiled into the binary.
    pub fn bundled() -> Self {
        Self::from_json(BUNDLED_DATASET).unwrap_or_else(|e| {
            warn!(error = %e, "Bundled adoption curves unreadable");
            Self::default()
        })
    }

    /// Loads `path` when given, falling back to the bundled dataset on any
    /// failure.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::bundled();
        };

        match std::fs::read_to_string(path)
            .map_err(AppError::from)
            .and_then(|json| Self::from_json(&json))
        {
            Ok(dataset) if !dataset.is_empty() => {
                info!(path = %path.display(), curves = dataset.len(), "Adoption curves loaded");
                dataset
            }
            Ok(_) => {
                warn!(path = %path.display(), "Adoption curve dataset is empty, using bundled curves");
                Self::bundled()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Adoption curve dataset unavailable, using bundled curves");
                Self::bundled()
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<AdoptionCurve>> {
        self.curves.get(key).cloned()
    }

    /// Curve for `key`, or a minimal default launched at `fallback_launch`.
    pub fn curve_or_default(&self, key: &str, fallback_launch: NaiveDate) -> Arc<AdoptionCurve> {
        self.get(key)
            .unwrap_or_else(|| Arc::new(AdoptionCurve::minimal(fallback_launch)))
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}
