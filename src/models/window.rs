use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Half-open UTC day range `[start, end_exclusive)` searched by the locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchWindow {
    start: NaiveDate,
    end_exclusive: NaiveDate,
}

impl SearchWindow {
    pub fn new(start: NaiveDate, end_exclusive: NaiveDate) -> Result<Self> {
        if start >= end_exclusive {
            return Err(AppError::Validation(format!(
                "search window start {} must precede end {}",
                start, end_exclusive
            )));
        }
        Ok(Self {
            start,
            end_exclusive,
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end_exclusive(&self) -> NaiveDate {
        self.end_exclusive
    }

    pub fn days(&self) -> i64 {
        (self.end_exclusive - self.start).num_days()
    }

    /// Shrinks the end bound to `end_exclusive` when that is tighter.
    ///
    /// Returns `None` when nothing of the window would remain.
    pub fn truncated(&self, end_exclusive: NaiveDate) -> Option<Self> {
        Self::new(self.start, self.end_exclusive.min(end_exclusive)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_rejects_empty_range() {
        assert!(SearchWindow::new(date(2010, 1, 1), date(2010, 1, 1)).is_err());
        assert!(SearchWindow::new(date(2010, 1, 2), date(2010, 1, 1)).is_err());

        let window = SearchWindow::new(date(2010, 1, 1), date(2010, 1, 31)).unwrap();
        assert_eq!(window.days(), 30);
    }

    #[test]
    fn test_truncated_keeps_tighter_end() {
        let window = SearchWindow::new(date(2010, 1, 1), date(2011, 1, 1)).unwrap();

        let narrowed = window.truncated(date(2010, 3, 1)).unwrap();
        assert_eq!(narrowed.end_exclusive(), date(2010, 3, 1));

        let unchanged = window.truncated(date(2012, 1, 1)).unwrap();
        assert_eq!(unchanged, window);

        assert!(window.truncated(date(2010, 1, 1)).is_none());
    }
}
