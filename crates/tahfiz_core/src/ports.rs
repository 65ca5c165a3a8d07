//! crates/tahfiz_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    MemorizationEntry, ReviewEvent, RevisionRecord, SessionKind, StudySession, User,
    UserCredentials, VaultEntry, VerifiedMemorization,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Persistence Port
//=========================================================================================

/// Everything the service needs from durable storage. All state is scoped
/// to one user; no entity is shared across users.
#[async_trait]
pub trait MemorizationStore: Send + Sync {
    // --- Auth ---
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Memorization entries ---
    async fn insert_entry(&self, entry: &MemorizationEntry) -> PortResult<()>;

    async fn get_entry(&self, entry_id: Uuid) -> PortResult<MemorizationEntry>;

    /// Persists the entry's mutable fields (status, completion data,
    /// counters). Review events travel separately.
    async fn update_entry(&self, entry: &MemorizationEntry) -> PortResult<()>;

    async fn add_review_event(&self, entry_id: Uuid, event: &ReviewEvent) -> PortResult<()>;

    async fn list_completed_entries(&self, user_id: Uuid) -> PortResult<Vec<MemorizationEntry>>;

    async fn count_completed_entries(&self, user_id: Uuid) -> PortResult<u32>;

    async fn list_entries_started_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> PortResult<Vec<MemorizationEntry>>;

    // --- Study sessions ---
    async fn insert_session(&self, session: &StudySession) -> PortResult<()>;

    /// Fetches a session, guarded by kind so one kind's endpoints cannot
    /// operate on another kind's sessions.
    async fn get_session(&self, session_id: Uuid, kind: SessionKind) -> PortResult<StudySession>;

    async fn update_session(&self, session: &StudySession) -> PortResult<()>;

    /// The entry's most recent non-completed session of the given kind,
    /// optionally restricted to sessions started at or after `since`.
    async fn find_open_session(
        &self,
        entry_id: Uuid,
        kind: SessionKind,
        since: Option<DateTime<Utc>>,
    ) -> PortResult<Option<StudySession>>;

    async fn count_completed_sessions(
        &self,
        entry_id: Uuid,
        kind: SessionKind,
        since: Option<DateTime<Utc>>,
    ) -> PortResult<u32>;

    /// All sessions of a kind ever created for the entry, completed or not.
    async fn count_sessions(&self, entry_id: Uuid, kind: SessionKind) -> PortResult<u32>;

    async fn list_sessions_for_entry(
        &self,
        entry_id: Uuid,
        kind: SessionKind,
    ) -> PortResult<Vec<StudySession>>;

    async fn list_completed_sessions_between(
        &self,
        user_id: Uuid,
        kind: SessionKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<Vec<StudySession>>;

    // --- Murajaah session targets ---
    async fn set_murajaah_targets(&self, session_id: Uuid, targets: &[Uuid]) -> PortResult<()>;

    async fn get_murajaah_targets(&self, session_id: Uuid) -> PortResult<Vec<Uuid>>;

    // --- Temporary vault ---
    async fn find_pending_vault_entry(
        &self,
        user_id: Uuid,
        surah_number: u16,
    ) -> PortResult<Option<VaultEntry>>;

    async fn insert_vault_entry(&self, entry: &VaultEntry) -> PortResult<()>;

    async fn update_vault_entry(&self, entry: &VaultEntry) -> PortResult<()>;

    async fn get_vault_entry(&self, vault_id: Uuid) -> PortResult<VaultEntry>;

    async fn list_pending_vault_entries(&self, user_id: Uuid) -> PortResult<Vec<VaultEntry>>;

    // --- Memorized-content ledger ---
    async fn find_ledger_entry(
        &self,
        user_id: Uuid,
        surah_number: u16,
        juz_number: u8,
    ) -> PortResult<Option<VerifiedMemorization>>;

    async fn get_ledger_entry(&self, id: Uuid) -> PortResult<VerifiedMemorization>;

    async fn insert_ledger_entry(&self, entry: &VerifiedMemorization) -> PortResult<()>;

    /// Persists the entry's scalar fields (range, dates, average rating).
    /// Revision history rows travel via [`Self::append_ledger_revision`].
    async fn update_ledger_entry(&self, entry: &VerifiedMemorization) -> PortResult<()>;

    async fn append_ledger_revision(
        &self,
        ledger_id: Uuid,
        revision: &RevisionRecord,
    ) -> PortResult<()>;

    async fn list_ledger_entries(&self, user_id: Uuid) -> PortResult<Vec<VerifiedMemorization>>;

    async fn list_ledger_entries_for_surah(
        &self,
        user_id: Uuid,
        surah_number: u16,
    ) -> PortResult<Vec<VerifiedMemorization>>;

    async fn list_ledger_entries_for_juz(
        &self,
        user_id: Uuid,
        juz_number: u8,
    ) -> PortResult<Vec<VerifiedMemorization>>;
}
