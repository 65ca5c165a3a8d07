//! crates/tahfiz_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::quran::VerseRange;

/// Errors produced by the core domain rules.
///
/// Validation failures and state conflicts are both local-return failures;
/// nothing here is retried or auto-resolved by the core.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("invalid surah number: {0}")]
    InvalidSurah(u16),

    #[error("invalid juz number: {0}")]
    InvalidJuz(u16),

    #[error("verse numbers must be between 1 and {max}")]
    InvalidVerseRange { from: u16, to: u16, max: u16 },

    #[error("invalid duration: must be 10, 15, 20, or 25 minutes")]
    InvalidDuration(u32),

    #[error("session is already completed")]
    SessionCompleted,

    #[error("previous session is still in progress")]
    SessionInProgress,

    #[error("maximum of {0} sessions reached")]
    SessionLimitExceeded(u32),

    #[error("cannot revise uncompleted memorization")]
    PrematureRevision,

    #[error("no verified memorizations found")]
    NoMemorizedContent,
}

// Represents a user - used throughout the app.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<String>,
}

// Only used internally for login/signup - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// Lifecycle status of a memorization entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    InProgress,
    Completed,
    Reviewing,
}

/// A dated rating left after a per-entry revision session.
#[derive(Debug, Clone, Copy)]
pub struct ReviewEvent {
    pub date: DateTime<Utc>,
    pub rating: u8,
}

/// One piece of new memorization work: a verse range of a single surah,
/// worked through timed sessions until the user marks it finished.
///
/// Entries are a history record; they are never deleted.
#[derive(Debug, Clone)]
pub struct MemorizationEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub surah_number: u16,
    pub range: VerseRange,
    pub date_started: DateTime<Utc>,
    pub date_completed: Option<DateTime<Utc>>,
    pub status: EntryStatus,
    /// Self-assessed confidence (1-5), set only when the entry is finished.
    pub confidence_level: Option<u8>,
    pub notes: Option<String>,
    pub total_sessions_completed: u32,
    pub total_time_minutes: u32,
    pub review_events: Vec<ReviewEvent>,
}

/// The three kinds of timed study sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    /// New memorization.
    Ziyadah,
    /// Per-entry revision of a finished memorization.
    Revision,
    /// Recall over already-consolidated content.
    Murajaah,
}

/// One bounded study interval.
///
/// All three session kinds share this shape and the same
/// pause/elapsed/completion contract (see the `session` module).
#[derive(Debug, Clone)]
pub struct StudySession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: SessionKind,
    /// The owning memorization entry; `None` for murajaah sessions,
    /// which target ledger entries instead.
    pub entry_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Planned length in minutes.
    pub duration_minutes: u32,
    pub completed: bool,
    pub is_paused: bool,
    pub pause_started_at: Option<DateTime<Utc>>,
    pub total_pause_seconds: i64,
    pub rating: Option<u8>,
}

/// Staging status of a vault entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultStatus {
    Pending,
    Verified,
}

/// One raw range added to a vault entry, with the date it landed.
#[derive(Debug, Clone, Copy)]
pub struct RangeAddition {
    pub range: VerseRange,
    pub date_added: DateTime<Utc>,
}

/// A reviewer's confirmation of staged content.
#[derive(Debug, Clone)]
pub struct ReviewerVerification {
    pub verified_by: Uuid,
    pub date: DateTime<Utc>,
    pub rating: u8,
    pub notes: Option<String>,
}

/// A staging record holding finished-but-unverified content for one
/// (user, surah) pair, awaiting a reviewer's confirmation.
#[derive(Debug, Clone)]
pub struct VaultEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub surah_number: u16,
    pub verses: Vec<RangeAddition>,
    /// Bounding envelope of everything staged so far.
    pub consolidated: VerseRange,
    pub status: VaultStatus,
    pub verification: Option<ReviewerVerification>,
    pub created_at: DateTime<Utc>,
}

impl VaultEntry {
    /// Stages another range: appends the raw addition and widens the
    /// consolidated envelope.
    pub fn stage(&mut self, range: VerseRange, now: DateTime<Utc>) {
        self.verses.push(RangeAddition {
            range,
            date_added: now,
        });
        self.consolidated = self.consolidated.merge(range);
    }
}

/// One revision of a ledger entry, recorded when a murajaah session over it
/// completes with a grade.
#[derive(Debug, Clone)]
pub struct RevisionRecord {
    pub date: DateTime<Utc>,
    pub rating: u8,
    pub duration_minutes: u32,
    pub notes: Option<String>,
}

/// The canonical memorized-content record for one (user, surah, juz):
/// a single bounding verse range plus revision history.
///
/// Entries are only ever widened, never shrunk or deleted.
#[derive(Debug, Clone)]
pub struct VerifiedMemorization {
    pub id: Uuid,
    pub user_id: Uuid,
    pub surah_number: u16,
    pub juz_number: u8,
    pub range: VerseRange,
    pub verification_date: DateTime<Utc>,
    pub revisions: Vec<RevisionRecord>,
    pub last_revision_date: Option<DateTime<Utc>>,
    pub average_rating: Option<f64>,
}
