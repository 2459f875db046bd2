//! Epoch-millisecond helpers shared by the search and ranking code.
//!
//! All timestamps in this crate are UTC milliseconds since the epoch, the unit
//! Gmail reports `internalDate` in.

use chrono::{Datelike, NaiveDate, NaiveTime, TimeZone, Utc};

/// UTC midnight of `date` in epoch milliseconds.
pub fn date_to_ms(date: NaiveDate) -> i64 {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
        .timestamp_millis()
}

/// Calendar day (UTC) containing `ms`.
pub fn ms_to_date(ms: i64) -> NaiveDate {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.date_naive())
        .unwrap_or(NaiveDate::MIN)
}

/// `YYYY-MM-DD` rendering used in reports.
pub fn ms_to_datestr(ms: i64) -> String {
    ms_to_date(ms).format("%Y-%m-%d").to_string()
}

/// Current UTC time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Absolute distance in calendar months, ignoring the day of month.
///
/// 2010-01-31 and 2010-02-01 are one month apart.
pub fn months_between(a_ms: i64, b_ms: i64) -> u32 {
    let month_index = |ms: i64| {
        let date = ms_to_date(ms);
        i64::from(date.year()) * 12 + i64::from(date.month0())
    };
    (month_index(a_ms) - month_index(b_ms)).unsigned_abs() as u32
}
