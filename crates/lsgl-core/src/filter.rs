// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::records::{DateField, Dated, Timestamp};
use chrono::{Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Source of "today" for window filters.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Current UTC calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A frozen date, for reproducible windows.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// The active query window. Explicit bounds win over `days` when both are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub days: u32,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
}

impl Default for DateRange {
    fn default() -> Self {
        Self {
            days: DEFAULT_WINDOW_DAYS,
            start: None,
            end: None,
        }
    }
}

impl DateRange {
    pub fn new(days: u32, start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        Self { days, start, end }
    }

    pub fn bounds(&self) -> Option<(Timestamp, Timestamp)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

pub fn midnight(day: NaiveDate) -> Timestamp {
    day.and_time(NaiveTime::default()).and_utc()
}

/// Lower edge of a `window_days` window: midnight of `today - window_days`.
pub fn window_cutoff(today: NaiveDate, window_days: u32) -> Timestamp {
    let day = today
        .checked_sub_days(Days::new(u64::from(window_days)))
        .unwrap_or(NaiveDate::MIN);
    midnight(day)
}

/// Records whose `field` is on or after the window cutoff. No upper bound.
pub fn filter_by_days<'a, R: Dated>(
    records: &'a [R],
    window_days: u32,
    field: DateField,
    today: NaiveDate,
) -> Vec<&'a R> {
    let cutoff = window_cutoff(today, window_days);
    records
        .iter()
        .filter(|r| r.date(field).is_some_and(|d| d >= cutoff))
        .collect()
}

/// Records whose `field` lies in `[start, end]`.
pub fn filter_by_bounds<'a, R: Dated>(
    records: &'a [R],
    start: Timestamp,
    end: Timestamp,
    field: DateField,
) -> Vec<&'a R> {
    records
        .iter()
        .filter(|r| r.date(field).is_some_and(|d| d >= start && d <= end))
        .collect()
}

pub fn filter_by_range<'a, R: Dated>(
    records: &'a [R],
    range: &DateRange,
    field: DateField,
    today: NaiveDate,
) -> Vec<&'a R> {
    match range.bounds() {
        Some((start, end)) => filter_by_bounds(records, start, end, field),
        None => filter_by_days(records, range.days, field, today),
    }
}

/// Keeps the last `keep` items in source order.
pub fn retain_last<T>(mut items: Vec<T>, keep: usize) -> Vec<T> {
    if items.len() > keep {
        let excess = items.len() - keep;
        items.drain(..excess);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{normalize_flights, FlightRecord, FlightType, RawRow, RawValue};
    use chrono::TimeZone;

    fn arrivals(dates: &[&str]) -> Vec<FlightRecord> {
        let rows = dates
            .iter()
            .map(|d| {
                let mut row = RawRow::new();
                row.insert("arrival_date".into(), RawValue::Text(d.to_string()));
                row
            })
            .collect();
        normalize_flights(rows, FlightType::Arrival)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_cutoff_is_midnight() {
        let cutoff = window_cutoff(day(2024, 1, 10), 7);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap());
        assert_eq!(window_cutoff(day(2024, 1, 10), u32::MAX), midnight(NaiveDate::MIN));
    }

    #[test]
    fn test_zero_day_window_is_today_only() {
        let records = arrivals(&["2024-01-09 23:59:59", "2024-01-10", "2024-01-10 18:00:00"]);
        let hits = filter_by_days(&records, 0, DateField::ArrivalDate, day(2024, 1, 10));
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_window_has_no_upper_bound() {
        let records = arrivals(&["2030-06-01", "2023-12-01"]);
        let hits = filter_by_days(&records, 7, DateField::ArrivalDate, day(2024, 1, 10));
        assert_eq!(hits.len(), 1);
        assert_eq!(
            hits[0].arrival_date,
            Some(Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_absent_dates_are_excluded() {
        let records = arrivals(&["", "garbage", "2024-01-10"]);
        let hits = filter_by_days(&records, 3650, DateField::ArrivalDate, day(2024, 1, 10));
        assert_eq!(hits.len(), 1);

        let start = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            filter_by_bounds(&records, start, end, DateField::ArrivalDate).len(),
            1
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let records = arrivals(&["2024-01-01", "2024-01-05", "2024-01-05 00:00:01"]);
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let hits = filter_by_bounds(&records, start, end, DateField::ArrivalDate);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_range_prefers_bounds() {
        let records = arrivals(&["2020-01-01", "2024-01-10"]);
        let start = Utc.with_ymd_and_hms(2019, 12, 31, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();

        let bounded = DateRange::new(0, Some(start), Some(end));
        let hits = filter_by_range(&records, &bounded, DateField::ArrivalDate, day(2024, 1, 10));
        assert_eq!(hits.len(), 1);

        // Half-open bounds fall back to the day window
        let half = DateRange::new(0, Some(start), None);
        let hits = filter_by_range(&records, &half, DateField::ArrivalDate, day(2024, 1, 10));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].arrival_date.map(|d| d.date_naive()), Some(day(2024, 1, 10)));
    }

    #[test]
    fn test_retain_last() {
        assert_eq!(retain_last(vec![1, 2, 3, 4, 5], 2), vec![4, 5]);
        assert_eq!(retain_last(vec![1, 2], 5), vec![1, 2]);
        assert!(retain_last(vec![1, 2], 0).is_empty());
    }
}
