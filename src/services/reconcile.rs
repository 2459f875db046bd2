//! Reconciliation of detected and manually declared join dates.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::config::ReconciliationConfig;
use crate::models::join::{Hit, ManualEntry, ResolvedJoin};
use crate::models::time::months_between;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationPolicy {
    /// A detected date this many months or more away from the manual date is
    /// treated as a false positive.
    pub threshold_months: u32,
}

impl Default for ReconciliationPolicy {
    fn default() -> Self {
        Self {
            threshold_months: 12,
        }
    }
}

impl From<&ReconciliationConfig> for ReconciliationPolicy {
    fn from(config: &ReconciliationConfig) -> Self {
        Self {
            threshold_months: config.threshold_months,
        }
    }
}

impl ReconciliationPolicy {
    /// Merges the two signals into one join date, or `None` when there is
    /// neither. The result never predates `launch_ms`.
    pub fn resolve(
        &self,
        target_key: &str,
        manual: Option<&ManualEntry>,
        detected: Option<&Hit>,
        launch_ms: i64,
    ) -> Option<ResolvedJoin> {
        let (timestamp_ms, verified, conflicting_hint_ms) = match (manual, detected) {
            (Some(manual), Some(detected)) => {
                let distance = months_between(manual.timestamp_ms, detected.timestamp_ms);
                if distance < self.threshold_months {
                    (detected.timestamp_ms, true, None)
                } else {
                    debug!(
                        target_key,
                        distance_months = distance,
                        "Detected date disagrees with manual date, keeping manual"
                    );
                    (manual.timestamp_ms, false, Some(detected.timestamp_ms))
                }
            }
            (None, Some(detected)) => (detected.timestamp_ms, true, None),
            (Some(manual), None) => (manual.timestamp_ms, false, None),
            (None, None) => return None,
        };

        Some(ResolvedJoin {
            target_key: target_key.to_string(),
            timestamp_ms: timestamp_ms.max(launch_ms),
            verified,
            conflicting_hint_ms,
        })
    }
}
