use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::join::ResolvedJoin;

/// Rank of one join date against a platform's curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileResult {
    pub target_key: String,
    /// Users the platform had when the person joined.
    pub joined_users: u64,
    /// Users the platform has today.
    pub today_users: u64,
    /// `100 * joined / today`; smaller means earlier.
    pub early_percentile: f64,
    /// Share of today's users who joined later.
    pub narrative_percent: f64,
}

/// Mean early percentile across targets, on a 0–100 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub overall: Option<f64>,
    pub verified_only: Option<f64>,
}

/// Timeline control point in display units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformReport {
    pub target_key: String,
    pub display_name: String,
    pub metric_label: String,
    pub joined: ResolvedJoin,
    pub joined_date: String,
    pub percentile: Option<PercentileResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analysis_id: Uuid,
    pub platforms: Vec<PlatformReport>,
    pub composite: CompositeScore,
    pub elapsed_ms: u64,
}

impl AnalysisReport {
    pub fn platform(&self, target_key: &str) -> Option<&PlatformReport> {
        self.platforms.iter().find(|p| p.target_key == target_key)
    }
}
