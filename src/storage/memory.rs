//! In-memory paginated store
//!
//! Mirrors the Gmail listing contract (newest first, opaque page tokens) so the
//! search code can be exercised without a mailbox. Latency, transient failures
//! and credential rejection can be injected.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::time::{date_to_ms, ms_to_date};
use crate::storage::{MessageStore, StoredItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: String,
    pub timestamp_ms: i64,
    /// Query patterns this message satisfies. The empty pattern matches
    /// every message.
    pub labels: Vec<String>,
}

impl StoredMessage {
    fn matches(&self, query: &str) -> bool {
        query.trim().is_empty() || self.labels.iter().any(|l| l == query)
    }

    fn within(&self, start: NaiveDate, end_exclusive: NaiveDate) -> bool {
        let day = ms_to_date(self.timestamp_ms);
        day >= start && day < end_exclusive
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    /// Sorted newest first.
    messages: Vec<StoredMessage>,
    page_size: usize,
    latency: Duration,
    query_latency: HashMap<String, Duration>,
    failures_remaining: AtomicUsize,
    reject_credentials: AtomicBool,
    calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            page_size: 500,
            ..Default::default()
        }
    }

    pub fn with_message(mut self, id: &str, timestamp_ms: i64, labels: &[&str]) -> Self {
        self.messages.push(StoredMessage {
            id: id.to_string(),
            timestamp_ms,
            labels: labels.iter().map(|l| l.to_string()).collect(),
        });
        self.messages
            .sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
        self
    }

    /// Adds a message received at UTC noon of `date`.
    pub fn with_message_on(self, id: &str, date: NaiveDate, labels: &[&str]) -> Self {
        self.with_message(id, date_to_ms(date) + 12 * 3_600_000, labels)
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Delay applied to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Delay applied to calls for one query pattern, instead of the default.
    pub fn with_query_latency(mut self, query: &str, latency: Duration) -> Self {
        self.query_latency.insert(query.to_string(), latency);
        self
    }

    /// The next `n` calls fail with an upstream error.
    pub fn fail_next_calls(self, n: usize) -> Self {
        self.failures_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// Every call fails with an authentication error.
    pub fn reject_credentials(self) -> Self {
        self.reject_credentials.store(true, Ordering::SeqCst);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, query: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let latency = self
            .query_latency
            .get(query)
            .copied()
            .unwrap_or(self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.reject_credentials.load(Ordering::SeqCst) {
            return Err(AppError::Authentication("credentials rejected".into()));
        }
        let failed = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(AppError::Upstream("injected transient failure".into()));
        }
        Ok(())
    }

    fn matching<'a>(
        &'a self,
        query: &'a str,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> impl Iterator<Item = &'a StoredMessage> + 'a {
        self.messages
            .iter()
            .filter(move |m| m.matches(query) && m.within(start, end_exclusive))
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn exists_in_range(
        &self,
        query: &str,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<bool> {
        self.enter(query).await?;
        Ok(self.matching(query, start, end_exclusive).next().is_some())
    }

    async fn fetch_earliest_in_range(
        &self,
        query: &str,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<Option<StoredItem>> {
        self.enter(query).await?;
        let matches: Vec<&StoredMessage> = self.matching(query, start, end_exclusive).collect();

        // Walk pages the way a client would and keep the tail of the last one.
        let last = matches
            .chunks(self.page_size)
            .last()
            .and_then(|page| page.last());

        Ok(last.map(|m| StoredItem {
            id: m.id.clone(),
            timestamp_ms: m.timestamp_ms,
        }))
    }

    async fn get_item_timestamp(&self, id: &str) -> Result<i64> {
        self.enter("").await?;
        self.messages
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.timestamp_ms)
            .ok_or_else(|| AppError::NotFound(format!("message {}", id)))
    }
}
