//! crates/tahfiz_core/src/ledger.rs
//!
//! Consolidation math for the memorized-content ledger: planning which
//! (surah, juz) records a verified range lands in, widening existing
//! records, and grouping a user's records for presentation.

use chrono::{DateTime, Utc};

use crate::domain::{DomainError, RevisionRecord, VerifiedMemorization};
use crate::quran::{self, VerseRange};

/// One pending write against the ledger: the range to fold into the
/// record keyed by (user, surah, juz).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerUpsert {
    pub surah_number: u16,
    pub juz_number: u8,
    pub range: VerseRange,
}

/// Plans the ledger writes for one verified range of one surah, split on
/// juz boundaries.
pub fn consolidation_plan(
    surah_number: u16,
    range: VerseRange,
) -> Result<Vec<LedgerUpsert>, DomainError> {
    let parts = quran::split_by_juz(surah_number, range)?;
    Ok(parts
        .into_iter()
        .map(|(juz_number, range)| LedgerUpsert {
            surah_number,
            juz_number,
            range,
        })
        .collect())
}

/// Plans the ledger writes covering a whole juz: one upsert per surah the
/// juz touches, skipping surahs that contribute no verses.
pub fn full_juz_plan(juz_number: u8) -> Result<Vec<LedgerUpsert>, DomainError> {
    let segments = quran::juz_segments(juz_number)?;
    Ok(segments
        .into_iter()
        .map(|(surah_number, range)| LedgerUpsert {
            surah_number,
            juz_number,
            range,
        })
        .collect())
}

impl VerifiedMemorization {
    /// Widens the record's range to cover `range`. Never shrinks.
    pub fn absorb(&mut self, range: VerseRange) {
        self.range = self.range.merge(range);
    }

    /// Appends a revision and recomputes the derived fields: the average
    /// is the true mean over all revision ratings, the last-revision date
    /// the maximum seen.
    pub fn record_revision(&mut self, revision: RevisionRecord) {
        self.last_revision_date = Some(match self.last_revision_date {
            Some(prev) => prev.max(revision.date),
            None => revision.date,
        });
        self.revisions.push(revision);
        let sum: u32 = self.revisions.iter().map(|r| u32::from(r.rating)).sum();
        self.average_rating = Some(f64::from(sum) / self.revisions.len() as f64);
    }

    /// Stamps a revision pass that carried no grade (a murajaah session
    /// completing through the lazy status check).
    pub fn mark_revised(&mut self, now: DateTime<Utc>) {
        self.last_revision_date = Some(match self.last_revision_date {
            Some(prev) => prev.max(now),
            None => now,
        });
    }
}

/// A user's memorized content for one surah, folded across its juz
/// records.
#[derive(Debug, Clone)]
pub struct SurahGroup {
    pub surah_number: u16,
    pub surah_name: &'static str,
    pub verses: Vec<VerseRange>,
    pub last_revision_date: Option<DateTime<Utc>>,
    pub average_rating: Option<f64>,
}

/// A surah's ranges inside one juz group.
#[derive(Debug, Clone)]
pub struct JuzSurahGroup {
    pub surah_number: u16,
    pub surah_name: &'static str,
    pub verses: Vec<VerseRange>,
}

/// A user's memorized content for one juz, nested by surah.
#[derive(Debug, Clone)]
pub struct JuzGroup {
    pub juz_number: u8,
    pub surahs: Vec<JuzSurahGroup>,
    pub last_revision_date: Option<DateTime<Utc>>,
    pub average_rating: Option<f64>,
}

fn fold_date(acc: Option<DateTime<Utc>>, next: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (acc, next) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn mean_rating(entries: &[&VerifiedMemorization]) -> Option<f64> {
    let rated: Vec<f64> = entries.iter().filter_map(|e| e.average_rating).collect();
    if rated.is_empty() {
        None
    } else {
        Some(rated.iter().sum::<f64>() / rated.len() as f64)
    }
}

fn surah_name(number: u16) -> &'static str {
    quran::Surah::by_number(number).map(|s| s.name).unwrap_or("")
}

/// Groups ledger records by surah, sorted by surah number with ranges in
/// ascending verse order. Group-level date/rating are true aggregates
/// over the members (max date, mean rating).
pub fn group_by_surah(entries: &[VerifiedMemorization]) -> Vec<SurahGroup> {
    let mut sorted: Vec<&VerifiedMemorization> = entries.iter().collect();
    sorted.sort_by_key(|e| (e.surah_number, e.range.from_verse));

    let mut groups: Vec<SurahGroup> = Vec::new();
    for entry in sorted {
        match groups.last_mut() {
            Some(group) if group.surah_number == entry.surah_number => {
                group.verses.push(entry.range);
                group.last_revision_date =
                    fold_date(group.last_revision_date, entry.last_revision_date);
            }
            _ => groups.push(SurahGroup {
                surah_number: entry.surah_number,
                surah_name: surah_name(entry.surah_number),
                verses: vec![entry.range],
                last_revision_date: entry.last_revision_date,
                average_rating: None,
            }),
        }
    }
    for group in &mut groups {
        let members: Vec<&VerifiedMemorization> = entries
            .iter()
            .filter(|e| e.surah_number == group.surah_number)
            .collect();
        group.average_rating = mean_rating(&members);
    }
    groups
}

/// Groups ledger records by juz, nesting surahs within each juz, sorted
/// ascending on both levels. Group-level date/rating are true aggregates.
pub fn group_by_juz(entries: &[VerifiedMemorization]) -> Vec<JuzGroup> {
    let mut sorted: Vec<&VerifiedMemorization> = entries.iter().collect();
    sorted.sort_by_key(|e| (e.juz_number, e.surah_number, e.range.from_verse));

    let mut groups: Vec<JuzGroup> = Vec::new();
    for entry in sorted {
        if groups.last().map(|g| g.juz_number) != Some(entry.juz_number) {
            groups.push(JuzGroup {
                juz_number: entry.juz_number,
                surahs: Vec::new(),
                last_revision_date: None,
                average_rating: None,
            });
        }
        let group = groups.last_mut().expect("group pushed above");
        group.last_revision_date = fold_date(group.last_revision_date, entry.last_revision_date);
        match group.surahs.last_mut() {
            Some(s) if s.surah_number == entry.surah_number => s.verses.push(entry.range),
            _ => group.surahs.push(JuzSurahGroup {
                surah_number: entry.surah_number,
                surah_name: surah_name(entry.surah_number),
                verses: vec![entry.range],
            }),
        }
    }
    for group in &mut groups {
        let members: Vec<&VerifiedMemorization> = entries
            .iter()
            .filter(|e| e.juz_number == group.juz_number)
            .collect();
        group.average_rating = mean_rating(&members);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn entry(
        surah_number: u16,
        juz_number: u8,
        from: u16,
        to: u16,
        rating: Option<f64>,
        revised_day: Option<u32>,
    ) -> VerifiedMemorization {
        VerifiedMemorization {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            surah_number,
            juz_number,
            range: VerseRange::raw(from, to),
            verification_date: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            revisions: Vec::new(),
            last_revision_date: revised_day
                .map(|d| Utc.with_ymd_and_hms(2025, 2, d, 0, 0, 0).unwrap()),
            average_rating: rating,
        }
    }

    #[test]
    fn plan_for_a_range_inside_one_juz() {
        let plan = consolidation_plan(2, VerseRange::raw(1, 5)).unwrap();
        assert_eq!(
            plan,
            vec![LedgerUpsert {
                surah_number: 2,
                juz_number: 1,
                range: VerseRange::raw(1, 5),
            }]
        );
    }

    #[test]
    fn plan_for_a_straddling_range() {
        let plan = consolidation_plan(2, VerseRange::raw(140, 150)).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].juz_number, 1);
        assert_eq!(plan[0].range, VerseRange::raw(140, 141));
        assert_eq!(plan[1].juz_number, 2);
        assert_eq!(plan[1].range, VerseRange::raw(142, 150));
    }

    #[test]
    fn full_juz_plan_covers_every_touched_surah() {
        let plan = full_juz_plan(1).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].surah_number, 1);
        assert_eq!(plan[0].range, VerseRange::raw(1, 7));
        assert_eq!(plan[1].surah_number, 2);
        assert_eq!(plan[1].range, VerseRange::raw(1, 141));
    }

    #[test]
    fn absorb_only_widens() {
        let mut e = entry(2, 1, 10, 20, None, None);
        e.absorb(VerseRange::raw(15, 18));
        assert_eq!(e.range, VerseRange::raw(10, 20));
        e.absorb(VerseRange::raw(5, 25));
        assert_eq!(e.range, VerseRange::raw(5, 25));
    }

    #[test]
    fn revisions_drive_a_true_mean_and_max_date() {
        let mut e = entry(2, 1, 1, 5, Some(5.0), None);
        let d1 = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2025, 2, 3, 0, 0, 0).unwrap();
        e.record_revision(RevisionRecord {
            date: d2,
            rating: 4,
            duration_minutes: 25,
            notes: None,
        });
        e.record_revision(RevisionRecord {
            date: d1,
            rating: 3,
            duration_minutes: 15,
            notes: None,
        });
        assert_eq!(e.average_rating, Some(3.5));
        // An out-of-order revision never moves the date backwards.
        assert_eq!(e.last_revision_date, Some(d2));
    }

    #[test]
    fn surah_grouping_aggregates_members() {
        let entries = vec![
            entry(2, 1, 1, 141, Some(5.0), Some(2)),
            entry(2, 2, 142, 200, Some(3.0), Some(5)),
            entry(1, 1, 1, 7, Some(4.0), None),
        ];
        let groups = group_by_surah(&entries);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].surah_number, 1);
        assert_eq!(groups[1].surah_number, 2);
        assert_eq!(groups[1].verses.len(), 2);
        assert_eq!(groups[1].average_rating, Some(4.0));
        assert_eq!(
            groups[1].last_revision_date,
            Some(Utc.with_ymd_and_hms(2025, 2, 5, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn juz_grouping_nests_surahs() {
        let entries = vec![
            entry(1, 1, 1, 7, Some(5.0), None),
            entry(2, 1, 1, 141, Some(4.0), Some(2)),
            entry(2, 2, 142, 252, None, None),
        ];
        let groups = group_by_juz(&entries);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].juz_number, 1);
        assert_eq!(groups[0].surahs.len(), 2);
        assert_eq!(groups[0].surahs[0].surah_number, 1);
        assert_eq!(groups[0].surahs[1].surah_number, 2);
        assert_eq!(groups[0].average_rating, Some(4.5));
        assert_eq!(groups[1].juz_number, 2);
        assert_eq!(groups[1].average_rating, None);
    }
}
