//! Percentile engine
//!
//! Turns a resolved join time into an early-adopter percentile and averages
//! percentiles into composite scores.

use crate::models::curve::AdoptionCurve;
use crate::models::join::ResolvedJoin;
use crate::models::report::{CompositeScore, PercentileResult};
use crate::services::adoption::{users_at, users_today};

/// `100 * joined / today`. Smaller is earlier.
pub fn early_percentile(joined_users: Option<u64>, today_users: Option<u64>) -> Option<f64> {
    match (joined_users, today_users) {
        (Some(joined), Some(today)) if today > 0 => Some(100.0 * joined as f64 / today as f64),
        _ => None,
    }
}

/// Share of today's users who joined after the person.
pub fn narrative_percent(joined_users: Option<u64>, today_users: Option<u64>) -> Option<f64> {
    match (joined_users, today_users) {
        (Some(joined), Some(today)) if today > 0 => {
            Some(100.0 * (1.0 - joined as f64 / today as f64))
        }
        _ => None,
    }
}

pub fn percentile_result(
    target_key: &str,
    curve: &AdoptionCurve,
    timestamp_ms: i64,
) -> Option<PercentileResult> {
    let joined = users_at(curve, timestamp_ms);
    let today = users_today(curve);

    Some(PercentileResult {
        target_key: target_key.to_string(),
        joined_users: joined,
        today_users: today,
        early_percentile: early_percentile(Some(joined), Some(today))?,
        narrative_percent: narrative_percent(Some(joined), Some(today))?,
    })
}

/// Mean of 0–100 percentiles, rounded to one decimal. `None` when empty.
pub fn composite_score(percentiles: &[f64]) -> Option<f64> {
    if percentiles.is_empty() {
        return None;
    }
    let mean_fraction =
        percentiles.iter().map(|p| p / 100.0).sum::<f64>() / percentiles.len() as f64;
    Some((mean_fraction * 100.0 * 10.0).round() / 10.0)
}

/// Composite over every ranked join and over the verified ones only.
pub fn composite_for<'a, I>(ranked: I) -> CompositeScore
where
    I: IntoIterator<Item = (&'a ResolvedJoin, &'a PercentileResult)>,
{
    let mut all = Vec::new();
    let mut verified = Vec::new();
    for (join, result) in ranked {
        all.push(result.early_percentile);
        if join.verified {
            verified.push(result.early_percentile);
        }
    }

    CompositeScore {
        overall: composite_score(&all),
        verified_only: composite_score(&verified),
    }
}
