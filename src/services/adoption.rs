//! Adoption curve model
//!
//! Stateless lookups over an [`AdoptionCurve`]: users at a point in time,
//! users today and the display series.

use chrono::NaiveDate;

use crate::models::curve::AdoptionCurve;
use crate::models::report::SeriesPoint;
use crate::models::time::ms_to_date;

/// Users on the platform at `timestamp_ms`.
///
/// Flat outside the observed control points, linear in between, rounded to
/// the nearest integer.
pub fn users_at(curve: &AdoptionCurve, timestamp_ms: i64) -> u64 {
    let points = curve.points();
    let first = curve.first();
    let last = curve.last();

    if timestamp_ms <= first.timestamp_ms() {
        return first.users;
    }
    if timestamp_ms >= last.timestamp_ms() {
        return last.users;
    }

    // First point strictly after the timestamp; the bounds checks above keep
    // it inside 1..len.
    let upper = points.partition_point(|p| p.timestamp_ms() <= timestamp_ms);
    let (p0, p1) = (&points[upper - 1], &points[upper]);

    let (t0, t1) = (p0.timestamp_ms(), p1.timestamp_ms());
    let fraction = (timestamp_ms - t0) as f64 / (t1 - t0) as f64;
    let users = p0.users as f64 + fraction * (p1.users as f64 - p0.users as f64);
    users.round().max(0.0) as u64
}

pub fn users_today(curve: &AdoptionCurve) -> u64 {
    curve.last().users
}

/// Control points scaled by `unit`, plus a trailing point at `now_ms` when
/// the newest observation is older than today.
pub fn timeline_series(curve: &AdoptionCurve, now_ms: i64, unit: u64) -> Vec<SeriesPoint> {
    let unit = unit.max(1) as f64;
    let mut series: Vec<SeriesPoint> = curve
        .points()
        .iter()
        .map(|p| SeriesPoint {
            date: p.date,
            value: p.users as f64 / unit,
        })
        .collect();

    let today: NaiveDate = ms_to_date(now_ms);
    if curve.last().date < today {
        series.push(SeriesPoint {
            date: today,
            value: curve.last().users as f64 / unit,
        });
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::curve::TimelinePoint;
    use crate::models::time::date_to_ms;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn two_point_curve() -> AdoptionCurve {
        AdoptionCurve::new(
            date(2020, 1, 1),
            vec![
                TimelinePoint::new(date(2020, 1, 1), 0),
                TimelinePoint::new(date(2021, 1, 1), 100),
            ],
        )
        .unwrap()
    }

    #[rstest]
    #[case::midpoint(date(2020, 7, 2), 50)]
    #[case::before_first(date(2019, 6, 1), 0)]
    #[case::on_first(date(2020, 1, 1), 0)]
    #[case::on_last(date(2021, 1, 1), 100)]
    #[case::after_last(date(2023, 1, 1), 100)]
    fn test_users_at(#[case] when: NaiveDate, #[case] expected: u64) {
        assert_eq!(users_at(&two_point_curve(), date_to_ms(when)), expected);
    }

    #[test]
    fn test_users_at_picks_bracketing_pair() {
        let curve = AdoptionCurve::new(
            date(2010, 1, 1),
            vec![
                TimelinePoint::new(date(2010, 1, 1), 0),
                TimelinePoint::new(date(2011, 1, 1), 1_000),
                TimelinePoint::new(date(2012, 1, 1), 3_000),
            ],
        )
        .unwrap();

        assert_eq!(users_at(&curve, date_to_ms(date(2011, 1, 1))), 1_000);
        let mid_2011 = date_to_ms(date(2011, 7, 2)) + 12 * 3_600_000;
        assert_eq!(users_at(&curve, mid_2011), 2_000);
    }

    #[test]
    fn test_single_point_curve_is_flat() {
        let curve = AdoptionCurve::new(
            date(2015, 1, 1),
            vec![TimelinePoint::new(date(2015, 1, 1), 42)],
        )
        .unwrap();
        assert_eq!(users_at(&curve, date_to_ms(date(2010, 1, 1))), 42);
        assert_eq!(users_at(&curve, date_to_ms(date(2020, 1, 1))), 42);
        assert_eq!(users_today(&curve), 42);
    }

    #[test]
    fn test_timeline_series_appends_today() {
        let series = timeline_series(&two_point_curve(), date_to_ms(date(2024, 5, 1)), 10);

        assert_eq!(series.len(), 3);
        assert_eq!(series[1].value, 10.0);
        assert_eq!(series[2].date, date(2024, 5, 1));
        assert_eq!(series[2].value, 10.0);
    }

    #[test]
    fn test_timeline_series_current_curve_has_no_extra_point() {
        let series = timeline_series(&two_point_curve(), date_to_ms(date(2021, 1, 1)), 1);
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].value, 100.0);
    }
}
