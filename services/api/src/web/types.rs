//! services/api/src/web/types.rs
//!
//! JSON response shapes shared across the REST handlers, with their
//! conversions from the core domain types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use tahfiz_core::domain::{
    EntryStatus, MemorizationEntry, SessionKind, StudySession, VaultEntry, VaultStatus,
    VerifiedMemorization,
};
use tahfiz_core::ledger::{JuzGroup, SurahGroup};
use tahfiz_core::quran::{Surah, VerseRange};
use tahfiz_core::stats::{BucketTotals, KindMinutes};

fn status_label(status: EntryStatus) -> &'static str {
    match status {
        EntryStatus::InProgress => "in_progress",
        EntryStatus::Completed => "completed",
        EntryStatus::Reviewing => "reviewing",
    }
}

fn kind_label(kind: SessionKind) -> &'static str {
    match kind {
        SessionKind::Ziyadah => "ziyadah",
        SessionKind::Revision => "revision",
        SessionKind::Murajaah => "murajaah",
    }
}

fn surah_name(number: u16) -> &'static str {
    Surah::by_number(number).map(|s| s.name).unwrap_or("")
}

//=========================================================================================
// Reference data
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct SurahResponse {
    pub number: u16,
    pub name: String,
    pub meaning: String,
    pub verse_count: u16,
    pub revelation: String,
}

impl From<&Surah> for SurahResponse {
    fn from(surah: &Surah) -> Self {
        Self {
            number: surah.number,
            name: surah.name.to_string(),
            meaning: surah.meaning.to_string(),
            verse_count: surah.verse_count,
            revelation: format!("{:?}", surah.revelation),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct RangeDto {
    pub from_verse: u16,
    pub to_verse: u16,
}

impl From<VerseRange> for RangeDto {
    fn from(range: VerseRange) -> Self {
        Self {
            from_verse: range.from_verse,
            to_verse: range.to_verse,
        }
    }
}

//=========================================================================================
// Memorization entries and sessions
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ReviewEventDto {
    pub date: DateTime<Utc>,
    pub rating: u8,
}

#[derive(Serialize, ToSchema)]
pub struct EntryResponse {
    pub id: Uuid,
    pub surah_number: u16,
    pub surah_name: String,
    pub from_verse: u16,
    pub to_verse: u16,
    pub date_started: DateTime<Utc>,
    pub date_completed: Option<DateTime<Utc>>,
    pub status: String,
    pub confidence_level: Option<u8>,
    pub notes: Option<String>,
    pub total_sessions_completed: u32,
    pub total_time_minutes: u32,
    pub review_events: Vec<ReviewEventDto>,
}

impl From<MemorizationEntry> for EntryResponse {
    fn from(entry: MemorizationEntry) -> Self {
        Self {
            id: entry.id,
            surah_number: entry.surah_number,
            surah_name: surah_name(entry.surah_number).to_string(),
            from_verse: entry.range.from_verse,
            to_verse: entry.range.to_verse,
            date_started: entry.date_started,
            date_completed: entry.date_completed,
            status: status_label(entry.status).to_string(),
            confidence_level: entry.confidence_level,
            notes: entry.notes,
            total_sessions_completed: entry.total_sessions_completed,
            total_time_minutes: entry.total_time_minutes,
            review_events: entry
                .review_events
                .into_iter()
                .map(|e| ReviewEventDto {
                    date: e.date,
                    rating: e.rating,
                })
                .collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: Uuid,
    pub kind: String,
    pub entry_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: u32,
    pub completed: bool,
    pub is_paused: bool,
    pub total_pause_seconds: i64,
    /// Study seconds left before the session is due; 0 once completed.
    pub remaining_seconds: i64,
    pub rating: Option<u8>,
}

impl SessionResponse {
    pub fn at(session: &StudySession, now: DateTime<Utc>) -> Self {
        let remaining = if session.completed {
            0
        } else {
            (i64::from(session.duration_minutes) * 60 - session.effective_elapsed_seconds(now))
                .max(0)
        };
        Self {
            id: session.id,
            kind: kind_label(session.kind).to_string(),
            entry_id: session.entry_id,
            start_time: session.start_time,
            end_time: session.end_time,
            duration_minutes: session.duration_minutes,
            completed: session.completed,
            is_paused: session.is_paused,
            total_pause_seconds: session.total_pause_seconds,
            remaining_seconds: remaining,
            rating: session.rating,
        }
    }
}

//=========================================================================================
// Vault and ledger
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct VaultVerseDto {
    pub from_verse: u16,
    pub to_verse: u16,
    pub date_added: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct VerificationDto {
    pub verified_by: Uuid,
    pub date: DateTime<Utc>,
    pub rating: u8,
    pub notes: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct VaultResponse {
    pub id: Uuid,
    pub surah_number: u16,
    pub surah_name: String,
    pub verses: Vec<VaultVerseDto>,
    /// Bounding envelope of everything staged for this surah.
    pub consolidated: RangeDto,
    pub status: String,
    pub verification: Option<VerificationDto>,
    pub created_at: DateTime<Utc>,
}

impl From<VaultEntry> for VaultResponse {
    fn from(entry: VaultEntry) -> Self {
        Self {
            id: entry.id,
            surah_number: entry.surah_number,
            surah_name: surah_name(entry.surah_number).to_string(),
            verses: entry
                .verses
                .into_iter()
                .map(|v| VaultVerseDto {
                    from_verse: v.range.from_verse,
                    to_verse: v.range.to_verse,
                    date_added: v.date_added,
                })
                .collect(),
            consolidated: entry.consolidated.into(),
            status: match entry.status {
                VaultStatus::Pending => "pending".to_string(),
                VaultStatus::Verified => "verified".to_string(),
            },
            verification: entry.verification.map(|v| VerificationDto {
                verified_by: v.verified_by,
                date: v.date,
                rating: v.rating,
                notes: v.notes,
            }),
            created_at: entry.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct RevisionRecordDto {
    pub date: DateTime<Utc>,
    pub rating: u8,
    pub duration_minutes: u32,
    pub notes: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LedgerResponse {
    pub id: Uuid,
    pub surah_number: u16,
    pub surah_name: String,
    pub juz_number: u8,
    pub from_verse: u16,
    pub to_verse: u16,
    pub verification_date: DateTime<Utc>,
    pub last_revision_date: Option<DateTime<Utc>>,
    pub average_rating: Option<f64>,
    pub revisions: Vec<RevisionRecordDto>,
}

impl From<VerifiedMemorization> for LedgerResponse {
    fn from(entry: VerifiedMemorization) -> Self {
        Self {
            id: entry.id,
            surah_number: entry.surah_number,
            surah_name: surah_name(entry.surah_number).to_string(),
            juz_number: entry.juz_number,
            from_verse: entry.range.from_verse,
            to_verse: entry.range.to_verse,
            verification_date: entry.verification_date,
            last_revision_date: entry.last_revision_date,
            average_rating: entry.average_rating,
            revisions: entry
                .revisions
                .into_iter()
                .map(|r| RevisionRecordDto {
                    date: r.date,
                    rating: r.rating,
                    duration_minutes: r.duration_minutes,
                    notes: r.notes,
                })
                .collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SurahGroupResponse {
    pub surah_number: u16,
    pub surah_name: String,
    pub verses: Vec<RangeDto>,
    pub last_revision_date: Option<DateTime<Utc>>,
    pub average_rating: Option<f64>,
}

impl From<SurahGroup> for SurahGroupResponse {
    fn from(group: SurahGroup) -> Self {
        Self {
            surah_number: group.surah_number,
            surah_name: group.surah_name.to_string(),
            verses: group.verses.into_iter().map(Into::into).collect(),
            last_revision_date: group.last_revision_date,
            average_rating: group.average_rating,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct JuzSurahGroupResponse {
    pub surah_number: u16,
    pub surah_name: String,
    pub verses: Vec<RangeDto>,
}

#[derive(Serialize, ToSchema)]
pub struct JuzGroupResponse {
    pub juz_number: u8,
    pub surahs: Vec<JuzSurahGroupResponse>,
    pub last_revision_date: Option<DateTime<Utc>>,
    pub average_rating: Option<f64>,
}

impl From<JuzGroup> for JuzGroupResponse {
    fn from(group: JuzGroup) -> Self {
        Self {
            juz_number: group.juz_number,
            surahs: group
                .surahs
                .into_iter()
                .map(|s| JuzSurahGroupResponse {
                    surah_number: s.surah_number,
                    surah_name: s.surah_name.to_string(),
                    verses: s.verses.into_iter().map(Into::into).collect(),
                })
                .collect(),
            last_revision_date: group.last_revision_date,
            average_rating: group.average_rating,
        }
    }
}

//=========================================================================================
// Stats
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct KindStatDto {
    pub minutes: i64,
    pub hours: f64,
}

impl KindStatDto {
    fn from_minutes(minutes: i64) -> Self {
        Self {
            minutes,
            hours: minutes as f64 / 60.0,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub period: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub ziyadah: KindStatDto,
    pub revision: KindStatDto,
    pub murajaah: KindStatDto,
    pub total: KindStatDto,
}

impl StatsResponse {
    pub fn new(period: &str, start_date: NaiveDate, end_date: NaiveDate, totals: KindMinutes) -> Self {
        Self {
            period: period.to_string(),
            start_date,
            end_date,
            ziyadah: KindStatDto::from_minutes(totals.ziyadah),
            revision: KindStatDto::from_minutes(totals.revision),
            murajaah: KindStatDto::from_minutes(totals.murajaah),
            total: KindStatDto::from_minutes(totals.total()),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct BucketDto {
    pub key: String,
    pub ziyadah_minutes: i64,
    pub revision_minutes: i64,
    pub murajaah_minutes: i64,
    pub total_minutes: i64,
}

impl From<BucketTotals> for BucketDto {
    fn from(bucket: BucketTotals) -> Self {
        Self {
            key: bucket.key,
            ziyadah_minutes: bucket.ziyadah,
            revision_minutes: bucket.revision,
            murajaah_minutes: bucket.murajaah,
            total_minutes: bucket.total,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct BreakdownResponse {
    pub granularity: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub buckets: Vec<BucketDto>,
}
