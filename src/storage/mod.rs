//! 消息存储模块
//!
//! 远端分页消息存储的访问契约，以及 Gmail 与内存两种实现。

pub mod gmail;
pub mod memory;

pub use gmail::GmailStore;
pub use memory::{InMemoryStore, StoredMessage};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// An item located by `fetch_earliest_in_range`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredItem {
    pub id: String,
    /// Server-assigned receive time.
    pub timestamp_ms: i64,
}

/// Remote, paginated message store.
///
/// Implementations must list matches newest first, so that the last element
/// of the final page is the oldest match. `fetch_earliest_in_range` depends
/// on that ordering.
///
/// The existence probe is assumed monotonic for the duration of a search: if
/// a match exists before day `d`, it exists before every later day.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Whether any item matches `query` in `[start, end_exclusive)`.
    async fn exists_in_range(
        &self,
        query: &str,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<bool>;

    /// Oldest matching item in `[start, end_exclusive)`, read from the last
    /// element of the final results page.
    async fn fetch_earliest_in_range(
        &self,
        query: &str,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<Option<StoredItem>>;

    /// Authoritative server time of an item.
    async fn get_item_timestamp(&self, id: &str) -> Result<i64>;
}

/// Gmail search syntax for a tier pattern restricted to a day range.
pub fn dated_query(base: &str, start: NaiveDate, end_exclusive: NaiveDate) -> String {
    let range = format!(
        "after:{} before:{}",
        start.format("%Y/%m/%d"),
        end_exclusive.format("%Y/%m/%d")
    );
    let base = base.trim();
    if base.is_empty() {
        range
    } else {
        format!("{} {}", base, range)
    }
}
