//! crates/tahfiz_core/src/stats.rs
//!
//! Time-bucketed rollups of completed session durations. All functions
//! work on already-localized timestamps; the service decides what "local"
//! means before calling in.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::domain::SessionKind;

/// Reporting period / bucket granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

/// The slice of a completed session that stats care about.
#[derive(Debug, Clone, Copy)]
pub struct SessionStat {
    pub kind: SessionKind,
    /// Session start, in the caller's local time.
    pub start_local: NaiveDateTime,
    /// Planned duration in minutes.
    pub minutes: i64,
}

/// Minutes per session kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindMinutes {
    pub ziyadah: i64,
    pub revision: i64,
    pub murajaah: i64,
}

impl KindMinutes {
    pub fn total(&self) -> i64 {
        self.ziyadah + self.revision + self.murajaah
    }

    fn add(&mut self, kind: SessionKind, minutes: i64) {
        match kind {
            SessionKind::Ziyadah => self.ziyadah += minutes,
            SessionKind::Revision => self.revision += minutes,
            SessionKind::Murajaah => self.murajaah += minutes,
        }
    }
}

/// Sums minutes per kind over a flat list of completed sessions.
pub fn sum_by_kind(sessions: &[SessionStat]) -> KindMinutes {
    let mut totals = KindMinutes::default();
    for s in sessions {
        totals.add(s.kind, s.minutes);
    }
    totals
}

/// The half-open local date range `[start, end)` of the period containing
/// `reference`. Weeks start on Sunday.
pub fn period_range(period: Period, reference: NaiveDate) -> (NaiveDate, NaiveDate) {
    match period {
        Period::Daily => (reference, reference + chrono::Days::new(1)),
        Period::Weekly => {
            let start =
                reference - chrono::Days::new(u64::from(reference.weekday().num_days_from_sunday()));
            (start, start + chrono::Days::new(7))
        }
        Period::Monthly => {
            let start = reference.with_day(1).expect("day 1 is always valid");
            let end = if start.month() == 12 {
                NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
            }
            .expect("first of month is always valid");
            (start, end)
        }
    }
}

/// One output bucket: key plus per-kind and total minutes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketTotals {
    pub key: String,
    pub ziyadah: i64,
    pub revision: i64,
    pub murajaah: i64,
    pub total: i64,
}

fn bucket_of(period: Period, date: NaiveDate) -> ((i32, u32, u32), String) {
    match period {
        Period::Daily => (
            (date.year(), date.month(), date.day()),
            date.format("%Y-%m-%d").to_string(),
        ),
        Period::Monthly => (
            (date.year(), date.month(), 0),
            date.format("%Y-%m").to_string(),
        ),
        Period::Weekly => {
            let iso = date.iso_week();
            // Sorted numerically by (iso year, week); the textual key is
            // unpadded, so lexicographic order would be wrong here.
            (
                (iso.year(), iso.week(), 0),
                format!("{}-W{}", iso.year(), iso.week()),
            )
        }
    }
}

/// Groups completed sessions into calendar buckets and sums planned
/// minutes per kind. Every bucket carries all three kinds (zero when a
/// kind is absent); buckets come back in ascending calendar order.
pub fn bucket_sessions(sessions: &[SessionStat], period: Period) -> Vec<BucketTotals> {
    let mut buckets: BTreeMap<(i32, u32, u32), (String, KindMinutes)> = BTreeMap::new();
    for s in sessions {
        let (sort_key, label) = bucket_of(period, s.start_local.date());
        buckets
            .entry(sort_key)
            .or_insert_with(|| (label, KindMinutes::default()))
            .1
            .add(s.kind, s.minutes);
    }
    buckets
        .into_values()
        .map(|(key, totals)| BucketTotals {
            key,
            ziyadah: totals.ziyadah,
            revision: totals.revision,
            murajaah: totals.murajaah,
            total: totals.total(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn daily_bucket_sums_kinds_and_defaults_missing_ones_to_zero() {
        let sessions = [
            SessionStat {
                kind: SessionKind::Ziyadah,
                start_local: at(2025, 3, 10, 9),
                minutes: 25,
            },
            SessionStat {
                kind: SessionKind::Revision,
                start_local: at(2025, 3, 10, 14),
                minutes: 15,
            },
        ];
        let buckets = bucket_sessions(&sessions, Period::Daily);
        assert_eq!(
            buckets,
            vec![BucketTotals {
                key: "2025-03-10".into(),
                ziyadah: 25,
                revision: 15,
                murajaah: 0,
                total: 40,
            }]
        );
    }

    #[test]
    fn weekly_buckets_sort_numerically_not_lexicographically() {
        let sessions = [
            SessionStat {
                kind: SessionKind::Ziyadah,
                // ISO week 10 of 2025.
                start_local: at(2025, 3, 5, 9),
                minutes: 25,
            },
            SessionStat {
                kind: SessionKind::Murajaah,
                // ISO week 9 of 2025.
                start_local: at(2025, 2, 26, 9),
                minutes: 25,
            },
        ];
        let keys: Vec<String> = bucket_sessions(&sessions, Period::Weekly)
            .into_iter()
            .map(|b| b.key)
            .collect();
        assert_eq!(keys, vec!["2025-W9".to_string(), "2025-W10".to_string()]);
    }

    #[test]
    fn monthly_buckets_are_dense_unions_across_kinds() {
        let sessions = [
            SessionStat {
                kind: SessionKind::Revision,
                start_local: at(2025, 1, 20, 9),
                minutes: 10,
            },
            SessionStat {
                kind: SessionKind::Murajaah,
                start_local: at(2025, 2, 2, 9),
                minutes: 25,
            },
            SessionStat {
                kind: SessionKind::Revision,
                start_local: at(2025, 1, 5, 9),
                minutes: 20,
            },
        ];
        let buckets = bucket_sessions(&sessions, Period::Monthly);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].key, "2025-01");
        assert_eq!(buckets[0].revision, 30);
        assert_eq!(buckets[0].murajaah, 0);
        assert_eq!(buckets[1].key, "2025-02");
        assert_eq!(buckets[1].total, 25);
    }

    #[test]
    fn period_ranges() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap(); // a Wednesday
        let (start, end) = period_range(Period::Daily, d);
        assert_eq!((start, end), (d, NaiveDate::from_ymd_opt(2025, 3, 13).unwrap()));

        let (start, end) = period_range(Period::Weekly, d);
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()); // Sunday
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 3, 16).unwrap());

        let (start, end) = period_range(Period::Monthly, d);
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());

        let dec = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        let (_, end) = period_range(Period::Monthly, dec);
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }

    #[test]
    fn sum_by_kind_totals() {
        let sessions = [
            SessionStat {
                kind: SessionKind::Ziyadah,
                start_local: at(2025, 3, 10, 9),
                minutes: 25,
            },
            SessionStat {
                kind: SessionKind::Revision,
                start_local: at(2025, 3, 10, 10),
                minutes: 15,
            },
        ];
        let totals = sum_by_kind(&sessions);
        assert_eq!(totals.ziyadah, 25);
        assert_eq!(totals.revision, 15);
        assert_eq!(totals.murajaah, 0);
        assert_eq!(totals.total(), 40);
    }
}
