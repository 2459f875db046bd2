//! Multi-tier scanner
//!
//! Runs a target's query tiers in order against the locator and keeps the
//! earliest hit across tiers. Each tier gets whatever budget the previous
//! tiers left; a tier cut short never discards an earlier tier's hit.

use chrono::{Days, NaiveDate, Utc};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::join::Hit;
use crate::models::target::Target;
use crate::models::time::ms_to_date;
use crate::models::window::SearchWindow;
use crate::services::locator::{BisectionLocator, QueryProbe};
use crate::storage::MessageStore;

#[derive(Debug, Clone, Default)]
pub struct TierScanner {
    locator: BisectionLocator,
}

impl TierScanner {
    pub fn new(locator: BisectionLocator) -> Self {
        Self { locator }
    }

    /// Scans `target` from its window floor through today.
    pub async fn scan(
        &self,
        store: &dyn MessageStore,
        target: &Target,
        budget: Duration,
    ) -> Result<Option<Hit>> {
        let window = target.search_window(Utc::now().date_naive())?;
        self.scan_window(store, target, window, budget).await
    }

    pub async fn scan_window(
        &self,
        store: &dyn MessageStore,
        target: &Target,
        window: SearchWindow,
        budget: Duration,
    ) -> Result<Option<Hit>> {
        let started = Instant::now();
        let mut best: Option<Hit> = None;

        for (tier_index, query) in target.query_tiers.iter().enumerate() {
            let remaining = budget.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                info!(target_key = %target.key, tier_index, "Time budget exhausted before tier");
                break;
            }

            // Only a hit earlier than the current best can change the answer.
            let tier_window = match best {
                Some(hit) => match window.truncated(day_after(ms_to_date(hit.timestamp_ms))) {
                    Some(narrowed) => narrowed,
                    None => {
                        debug!(target_key = %target.key, tier_index, "Nothing left to search before best hit");
                        continue;
                    }
                },
                None => window,
            };

            let probe = QueryProbe::new(store, query);
            let found = self
                .locator
                .locate_earliest(&probe, tier_window, remaining)
                .await?;

            if let Some(ts) = found {
                if best.is_none_or(|b| ts < b.timestamp_ms) {
                    best = Some(Hit::mailbox(ts, tier_index));
                }
            }

            if started.elapsed() >= budget {
                info!(target_key = %target.key, tier_index, ?best, "Time budget exhausted, keeping best hit");
                break;
            }
        }

        debug!(
            target_key = %target.key,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ?best,
            "Tier scan finished"
        );
        Ok(best)
    }
}

fn day_after(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}
