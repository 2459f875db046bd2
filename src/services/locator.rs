//! Bounded bisection locator
//!
//! Finds the earliest timestamp in a day window for which a remote existence
//! predicate holds, within an iteration cap and a wall-clock budget.
//!
//! The probe must be monotonic over the run: once a match exists before day
//! `d` it exists before every later day. A probe that fails or times out is
//! read as "no match" for that iteration, which moves `lo` forward and can
//! miss a hit on transient errors. Authentication failures are the exception
//! and abort the search.

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::config::SearchConfig;
use crate::error::Result;
use crate::models::window::SearchWindow;
use crate::storage::MessageStore;

/// Existence predicate over day ranges, plus the authoritative lookup of the
/// earliest match.
#[async_trait]
pub trait RangeProbe: Send + Sync {
    /// Whether a match exists in `[start, end_exclusive)`.
    async fn exists(&self, start: NaiveDate, end_exclusive: NaiveDate) -> Result<bool>;

    /// Server timestamp of the earliest match in `[start, end_exclusive)`.
    async fn earliest(&self, start: NaiveDate, end_exclusive: NaiveDate) -> Result<Option<i64>>;
}

/// One query tier bound to a message store.
pub struct QueryProbe<'a> {
    store: &'a dyn MessageStore,
    query: &'a str,
}

impl<'a> QueryProbe<'a> {
    pub fn new(store: &'a dyn MessageStore, query: &'a str) -> Self {
        Self { store, query }
    }
}

#[async_trait]
impl RangeProbe for QueryProbe<'_> {
    async fn exists(&self, start: NaiveDate, end_exclusive: NaiveDate) -> Result<bool> {
        self.store
            .exists_in_range(self.query, start, end_exclusive)
            .await
    }

    async fn earliest(&self, start: NaiveDate, end_exclusive: NaiveDate) -> Result<Option<i64>> {
        Ok(self
            .store
            .fetch_earliest_in_range(self.query, start, end_exclusive)
            .await?
            .map(|item| item.timestamp_ms))
    }
}

#[derive(Debug, Clone)]
pub struct LocatorConfig {
    /// Hard cap on halvings; 32 reaches day resolution over any realistic window.
    pub max_iterations: u32,
    /// Stop once `hi - lo` is at most this many days.
    pub resolution_days: u32,
    /// Deadline for a single remote call, capped by the run's budget.
    pub probe_timeout: Duration,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 32,
            resolution_days: 1,
            probe_timeout: Duration::from_secs(1),
        }
    }
}

impl From<&SearchConfig> for LocatorConfig {
    fn from(config: &SearchConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            resolution_days: config.resolution_days.max(1),
            probe_timeout: config.probe_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BisectionLocator {
    config: LocatorConfig,
}

impl BisectionLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Earliest matching timestamp in `window`, or `None` if no probe ever
    /// confirmed a match before the iteration cap or `budget` ran out.
    pub async fn locate_earliest(
        &self,
        probe: &dyn RangeProbe,
        window: SearchWindow,
        budget: Duration,
    ) -> Result<Option<i64>> {
        let deadline = Instant::now() + budget;
        let resolution = i64::from(self.config.resolution_days.max(1));
        let mut lo = window.start();
        let mut hi = window.end_exclusive();
        let mut best: Option<i64> = None;
        let mut converged = false;

        for iteration in 0..self.config.max_iterations {
            let span = (hi - lo).num_days();
            if span <= resolution {
                converged = true;
                break;
            }
            if Instant::now() >= deadline {
                info!(iteration, %lo, %hi, ?best, "Bisection budget exhausted");
                break;
            }

            let Some(mid) = lo.checked_add_days(Days::new((span / 2) as u64)) else {
                break;
            };

            let found = self.call(deadline, probe.exists(lo, mid)).await?;
            debug!(iteration, %lo, %mid, %hi, ?found, "Bisection probe");

            if found == Some(true) {
                if let Some(Some(ts)) = self.call(deadline, probe.earliest(lo, mid)).await? {
                    best = Some(best.map_or(ts, |b| b.min(ts)));
                }
                hi = mid;
            } else {
                lo = mid;
            }
        }

        // Nothing confirmed before `lo`; the last cell has never been probed.
        if converged && best.is_none() && lo < hi && Instant::now() < deadline {
            if self.call(deadline, probe.exists(lo, hi)).await? == Some(true) {
                best = self.call(deadline, probe.earliest(lo, hi)).await?.flatten();
            }
        }

        Ok(best)
    }

    /// Runs one remote call under a hard deadline.
    ///
    /// `Ok(None)` means the call failed or timed out and the caller should
    /// treat it as no match.
    async fn call<T>(
        &self,
        deadline: Instant,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<Option<T>> {
        let call_deadline = deadline.min(Instant::now() + self.config.probe_timeout);
        match tokio::time::timeout_at(call_deadline, fut).await {
            Ok(Ok(value)) => Ok(Some(value)),
            Ok(Err(e)) if e.is_authentication() => Err(e),
            Ok(Err(e)) => {
                warn!(error = %e, "Probe failed, treating as no match");
                Ok(None)
            }
            Err(_) => {
                warn!("Probe timed out, treating as no match");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::time::{date_to_ms, ms_to_date};
    use crate::storage::{InMemoryStore, MockMessageStore};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window(start: NaiveDate, end: NaiveDate) -> SearchWindow {
        SearchWindow::new(start, end).unwrap()
    }

    fn generous() -> Duration {
        Duration::from_secs(60)
    }

    #[tokio::test]
    async fn test_finds_earliest_day_within_one_day() {
        let earliest = date(2009, 8, 17);
        let store = InMemoryStore::new()
            .with_page_size(3)
            .with_message_on("first", earliest, &[])
            .with_message_on("later-1", date(2011, 2, 3), &[])
            .with_message_on("later-2", date(2015, 12, 24), &[])
            .with_message_on("later-3", date(2020, 6, 1), &[]);
        let probe = QueryProbe::new(&store, "");
        let locator = BisectionLocator::default();

        let ts = locator
            .locate_earliest(&probe, window(date(2004, 1, 1), date(2024, 1, 1)), generous())
            .await
            .unwrap()
            .unwrap();

        let found = ms_to_date(ts);
        assert!((found - earliest).num_days().abs() <= 1, "found {}", found);
    }

    #[tokio::test]
    async fn test_earliest_on_window_edges() {
        let locator = BisectionLocator::default();

        let first_day = date(2004, 1, 1);
        let store = InMemoryStore::new().with_message_on("edge", first_day, &[]);
        let ts = locator
            .locate_earliest(&QueryProbe::new(&store, ""), window(first_day, date(2024, 1, 1)), generous())
            .await
            .unwrap();
        assert_eq!(ts.map(ms_to_date), Some(first_day));

        let last_day = date(2023, 12, 31);
        let store = InMemoryStore::new().with_message_on("edge", last_day, &[]);
        let ts = locator
            .locate_earliest(&QueryProbe::new(&store, ""), window(first_day, date(2024, 1, 1)), generous())
            .await
            .unwrap();
        assert_eq!(ts.map(ms_to_date), Some(last_day));
    }

    #[tokio::test]
    async fn test_no_match_returns_none() {
        let store = InMemoryStore::new().with_message_on("other", date(2010, 1, 1), &["other"]);
        let locator = BisectionLocator::default();

        let ts = locator
            .locate_earliest(
                &QueryProbe::new(&store, "welcome"),
                window(date(2004, 1, 1), date(2024, 1, 1)),
                generous(),
            )
            .await
            .unwrap();
        assert!(ts.is_none());
    }

    #[tokio::test]
    async fn test_result_is_consistent_with_monotonic_probe() {
        let store = InMemoryStore::new()
            .with_message_on("a", date(2012, 5, 9), &["q"])
            .with_message_on("b", date(2013, 1, 1), &["q"])
            .with_message_on("c", date(2007, 3, 3), &["other"]);
        let probe = QueryProbe::new(&store, "q");
        let start = date(2004, 1, 1);
        let locator = BisectionLocator::default();

        let ts = locator
            .locate_earliest(&probe, window(start, date(2024, 1, 1)), generous())
            .await
            .unwrap()
            .unwrap();
        let day = ms_to_date(ts);

        // A match exists up to and including the returned day, and none before it.
        assert!(probe.exists(start, day.succ_opt().unwrap()).await.unwrap());
        assert!(!probe.exists(start, day).await.unwrap());

        // Extending the right edge never loses the match.
        for extra in [1u64, 30, 365] {
            let end = day.checked_add_days(Days::new(extra)).unwrap();
            assert!(probe.exists(start, end).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_auth_failure_propagates() {
        let store = InMemoryStore::new().reject_credentials();
        let locator = BisectionLocator::default();

        let err = locator
            .locate_earliest(
                &QueryProbe::new(&store, ""),
                window(date(2004, 1, 1), date(2024, 1, 1)),
                generous(),
            )
            .await
            .unwrap_err();
        assert!(err.is_authentication());
    }

    #[tokio::test]
    async fn test_transient_failures_are_absorbed() {
        let mut store = MockMessageStore::new();
        store
            .expect_exists_in_range()
            .returning(|_, _, _| Err(AppError::Upstream("503 backend error".into())));
        store.expect_fetch_earliest_in_range().never();

        let locator = BisectionLocator::new(LocatorConfig {
            max_iterations: 8,
            ..LocatorConfig::default()
        });
        let ts = locator
            .locate_earliest(
                &QueryProbe::new(&store, ""),
                window(date(2004, 1, 1), date(2024, 1, 1)),
                generous(),
            )
            .await
            .unwrap();
        assert!(ts.is_none());
    }

    #[tokio::test]
    async fn test_search_continues_after_one_failed_call() {
        // The first halving fails and moves `lo` up, so the message sits in
        // the upper half of the window.
        let joined = date(2018, 5, 20);
        let store = InMemoryStore::new()
            .with_message_on("welcome", joined, &["q"])
            .with_message_on("noise", date(2008, 2, 2), &["other"])
            .fail_next_calls(1);
        let locator = BisectionLocator::default();

        let ts = locator
            .locate_earliest(
                &QueryProbe::new(&store, "q"),
                window(date(2004, 1, 1), date(2024, 1, 1)),
                generous(),
            )
            .await
            .unwrap();

        assert_eq!(ts.map(ms_to_date), Some(joined));
        assert!(store.call_count() > 2);
    }

    #[tokio::test]
    async fn test_keeps_earliest_timestamp_across_iterations() {
        let mut store = MockMessageStore::new();
        store.expect_exists_in_range().returning(|_, _, _| Ok(true));
        // An inconsistent store reports a later item on a narrower range; the
        // earlier one seen first must survive.
        let mut calls = 0;
        store
            .expect_fetch_earliest_in_range()
            .returning(move |_, _, _| {
                calls += 1;
                let day = if calls == 1 { date(2010, 1, 1) } else { date(2011, 1, 1) };
                Ok(Some(crate::storage::StoredItem {
                    id: format!("m{}", calls),
                    timestamp_ms: date_to_ms(day),
                }))
            });

        let locator = BisectionLocator::default();
        let ts = locator
            .locate_earliest(
                &QueryProbe::new(&store, ""),
                window(date(2004, 1, 1), date(2024, 1, 1)),
                generous(),
            )
            .await
            .unwrap();
        assert_eq!(ts, Some(date_to_ms(date(2010, 1, 1))));
    }

    #[tokio::test]
    async fn test_iteration_cap() {
        let store = InMemoryStore::new().with_message_on("a", date(2015, 7, 4), &[]);
        let locator = BisectionLocator::new(LocatorConfig {
            max_iterations: 3,
            ..LocatorConfig::default()
        });

        locator
            .locate_earliest(
                &QueryProbe::new(&store, ""),
                window(date(2004, 1, 1), date(2024, 1, 1)),
                generous(),
            )
            .await
            .unwrap();

        // Each iteration is one existence probe plus at most one fetch.
        assert!(store.call_count() <= 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_stops_slow_probes() {
        let store = InMemoryStore::new()
            .with_message_on("a", date(2015, 7, 4), &[])
            .with_latency(Duration::from_millis(400));
        let locator = BisectionLocator::default();

        let started = Instant::now();
        locator
            .locate_earliest(
                &QueryProbe::new(&store, ""),
                window(date(2004, 1, 1), date(2024, 1, 1)),
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        assert!(started.elapsed() <= Duration::from_millis(1100));
        assert!(store.call_count() <= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout_caps_single_call() {
        let store = InMemoryStore::new()
            .with_message_on("a", date(2015, 7, 4), &[])
            .with_latency(Duration::from_secs(30));
        let locator = BisectionLocator::new(LocatorConfig {
            probe_timeout: Duration::from_millis(200),
            ..LocatorConfig::default()
        });

        let started = Instant::now();
        let ts = locator
            .locate_earliest(
                &QueryProbe::new(&store, ""),
                window(date(2004, 1, 1), date(2024, 1, 1)),
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        assert!(ts.is_none());
        assert!(started.elapsed() <= Duration::from_millis(1200));
    }
}
