//! services/api/src/adapters/db.rs
//!
//! SQLite-backed implementation of the `MemorizationStore` port.
//!
//! UUIDs are stored as text, timestamps as RFC 3339 UTC text (read and
//! written through sqlx's chrono support). Child rows (review events,
//! vault verses, ledger revisions, murajaah targets) live in side tables
//! and are loaded alongside their parent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

use tahfiz_core::domain::{
    EntryStatus, MemorizationEntry, RangeAddition, ReviewEvent, ReviewerVerification,
    RevisionRecord, SessionKind, StudySession, User, UserCredentials, VaultEntry, VaultStatus,
    VerifiedMemorization,
};
use tahfiz_core::ports::{MemorizationStore, PortError, PortResult};
use tahfiz_core::quran::VerseRange;

/// The concrete storage adapter.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens the database and runs pending migrations.
    ///
    /// A single connection serves all queries: SQLite allows one writer at
    /// a time anyway, and `sqlite::memory:` databases are per-connection.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON;").execute(conn).await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }
}

fn unexpected(e: impl std::fmt::Display) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn parse_uuid(s: &str) -> PortResult<Uuid> {
    Uuid::parse_str(s).map_err(unexpected)
}

fn kind_str(kind: SessionKind) -> &'static str {
    match kind {
        SessionKind::Ziyadah => "ziyadah",
        SessionKind::Revision => "revision",
        SessionKind::Murajaah => "murajaah",
    }
}

fn parse_kind(s: &str) -> PortResult<SessionKind> {
    match s {
        "ziyadah" => Ok(SessionKind::Ziyadah),
        "revision" => Ok(SessionKind::Revision),
        "murajaah" => Ok(SessionKind::Murajaah),
        other => Err(unexpected(format!("unknown session kind '{other}'"))),
    }
}

fn status_str(status: EntryStatus) -> &'static str {
    match status {
        EntryStatus::InProgress => "in_progress",
        EntryStatus::Completed => "completed",
        EntryStatus::Reviewing => "reviewing",
    }
}

fn parse_status(s: &str) -> PortResult<EntryStatus> {
    match s {
        "in_progress" => Ok(EntryStatus::InProgress),
        "completed" => Ok(EntryStatus::Completed),
        "reviewing" => Ok(EntryStatus::Reviewing),
        other => Err(unexpected(format!("unknown entry status '{other}'"))),
    }
}

fn vault_status_str(status: VaultStatus) -> &'static str {
    match status {
        VaultStatus::Pending => "pending",
        VaultStatus::Verified => "verified",
    }
}

fn parse_vault_status(s: &str) -> PortResult<VaultStatus> {
    match s {
        "pending" => Ok(VaultStatus::Pending),
        "verified" => Ok(VaultStatus::Verified),
        other => Err(unexpected(format!("unknown vault status '{other}'"))),
    }
}

fn entry_from_row(row: &SqliteRow) -> PortResult<MemorizationEntry> {
    let id: String = row.try_get("id").map_err(unexpected)?;
    let user_id: String = row.try_get("user_id").map_err(unexpected)?;
    let status: String = row.try_get("status").map_err(unexpected)?;
    Ok(MemorizationEntry {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        surah_number: row.try_get("surah_number").map_err(unexpected)?,
        range: VerseRange::raw(
            row.try_get("from_verse").map_err(unexpected)?,
            row.try_get("to_verse").map_err(unexpected)?,
        ),
        date_started: row.try_get("date_started").map_err(unexpected)?,
        date_completed: row.try_get("date_completed").map_err(unexpected)?,
        status: parse_status(&status)?,
        confidence_level: row.try_get("confidence_level").map_err(unexpected)?,
        notes: row.try_get("notes").map_err(unexpected)?,
        total_sessions_completed: row
            .try_get("total_sessions_completed")
            .map_err(unexpected)?,
        total_time_minutes: row.try_get("total_time_minutes").map_err(unexpected)?,
        review_events: Vec::new(),
    })
}

fn session_from_row(row: &SqliteRow) -> PortResult<StudySession> {
    let id: String = row.try_get("id").map_err(unexpected)?;
    let user_id: String = row.try_get("user_id").map_err(unexpected)?;
    let kind: String = row.try_get("kind").map_err(unexpected)?;
    let entry_id: Option<String> = row.try_get("entry_id").map_err(unexpected)?;
    Ok(StudySession {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        kind: parse_kind(&kind)?,
        entry_id: entry_id.as_deref().map(parse_uuid).transpose()?,
        start_time: row.try_get("start_time").map_err(unexpected)?,
        end_time: row.try_get("end_time").map_err(unexpected)?,
        duration_minutes: row.try_get("duration_minutes").map_err(unexpected)?,
        completed: row.try_get("completed").map_err(unexpected)?,
        is_paused: row.try_get("is_paused").map_err(unexpected)?,
        pause_started_at: row.try_get("pause_started_at").map_err(unexpected)?,
        total_pause_seconds: row.try_get("total_pause_seconds").map_err(unexpected)?,
        rating: row.try_get("rating").map_err(unexpected)?,
    })
}

fn vault_from_row(row: &SqliteRow) -> PortResult<VaultEntry> {
    let id: String = row.try_get("id").map_err(unexpected)?;
    let user_id: String = row.try_get("user_id").map_err(unexpected)?;
    let status: String = row.try_get("status").map_err(unexpected)?;
    let verified_by: Option<String> = row.try_get("verified_by").map_err(unexpected)?;
    let verification = match verified_by {
        Some(reviewer) => Some(ReviewerVerification {
            verified_by: parse_uuid(&reviewer)?,
            date: row.try_get("verification_date").map_err(unexpected)?,
            rating: row.try_get("verification_rating").map_err(unexpected)?,
            notes: row.try_get("verification_notes").map_err(unexpected)?,
        }),
        None => None,
    };
    Ok(VaultEntry {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        surah_number: row.try_get("surah_number").map_err(unexpected)?,
        verses: Vec::new(),
        consolidated: VerseRange::raw(
            row.try_get("consolidated_from").map_err(unexpected)?,
            row.try_get("consolidated_to").map_err(unexpected)?,
        ),
        status: parse_vault_status(&status)?,
        verification,
        created_at: row.try_get("created_at").map_err(unexpected)?,
    })
}

fn ledger_from_row(row: &SqliteRow) -> PortResult<VerifiedMemorization> {
    let id: String = row.try_get("id").map_err(unexpected)?;
    let user_id: String = row.try_get("user_id").map_err(unexpected)?;
    Ok(VerifiedMemorization {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        surah_number: row.try_get("surah_number").map_err(unexpected)?,
        juz_number: row.try_get("juz_number").map_err(unexpected)?,
        range: VerseRange::raw(
            row.try_get("from_verse").map_err(unexpected)?,
            row.try_get("to_verse").map_err(unexpected)?,
        ),
        verification_date: row.try_get("verification_date").map_err(unexpected)?,
        revisions: Vec::new(),
        last_revision_date: row.try_get("last_revision_date").map_err(unexpected)?,
        average_rating: row.try_get("average_rating").map_err(unexpected)?,
    })
}

impl SqliteStore {
    async fn load_review_events(&self, entry: &mut MemorizationEntry) -> PortResult<()> {
        let rows = sqlx::query(
            "SELECT date, rating FROM entry_reviews WHERE entry_id = ?1 ORDER BY date",
        )
        .bind(entry.id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        for row in rows {
            entry.review_events.push(ReviewEvent {
                date: row.try_get("date").map_err(unexpected)?,
                rating: row.try_get("rating").map_err(unexpected)?,
            });
        }
        Ok(())
    }

    async fn load_vault_verses(&self, entry: &mut VaultEntry) -> PortResult<()> {
        let rows = sqlx::query(
            "SELECT from_verse, to_verse, date_added FROM vault_verses \
             WHERE vault_id = ?1 ORDER BY date_added",
        )
        .bind(entry.id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        for row in rows {
            entry.verses.push(RangeAddition {
                range: VerseRange::raw(
                    row.try_get("from_verse").map_err(unexpected)?,
                    row.try_get("to_verse").map_err(unexpected)?,
                ),
                date_added: row.try_get("date_added").map_err(unexpected)?,
            });
        }
        Ok(())
    }

    async fn load_ledger_revisions(&self, entry: &mut VerifiedMemorization) -> PortResult<()> {
        let rows = sqlx::query(
            "SELECT date, rating, duration_minutes, notes FROM ledger_revisions \
             WHERE ledger_id = ?1 ORDER BY date",
        )
        .bind(entry.id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        for row in rows {
            entry.revisions.push(RevisionRecord {
                date: row.try_get("date").map_err(unexpected)?,
                rating: row.try_get("rating").map_err(unexpected)?,
                duration_minutes: row.try_get("duration_minutes").map_err(unexpected)?,
                notes: row.try_get("notes").map_err(unexpected)?,
            });
        }
        Ok(())
    }

    /// Rewrites the vault's verse rows to match the in-memory entry.
    async fn sync_vault_verses(&self, entry: &VaultEntry) -> PortResult<()> {
        sqlx::query("DELETE FROM vault_verses WHERE vault_id = ?1")
            .bind(entry.id.to_string())
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        for addition in &entry.verses {
            sqlx::query(
                "INSERT INTO vault_verses (vault_id, from_verse, to_verse, date_added) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(entry.id.to_string())
            .bind(addition.range.from_verse)
            .bind(addition.range.to_verse)
            .bind(addition.date_added)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        }
        Ok(())
    }
}

#[async_trait]
impl MemorizationStore for SqliteStore {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let user_id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (user_id, email, hashed_password) VALUES (?1, ?2, ?3)")
            .bind(user_id.to_string())
            .bind(email)
            .bind(hashed_password)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(User {
            user_id,
            email: Some(email.to_string()),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let row = sqlx::query(
            "SELECT user_id, email, hashed_password FROM users WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("user with email {email}")))?;
        let user_id: String = row.try_get("user_id").map_err(unexpected)?;
        Ok(UserCredentials {
            user_id: parse_uuid(&user_id)?,
            email: row.try_get("email").map_err(unexpected)?,
            hashed_password: row.try_get("hashed_password").map_err(unexpected)?,
        })
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES (?1, ?2, ?3)")
            .bind(session_id)
            .bind(user_id.to_string())
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let row = sqlx::query("SELECT user_id, expires_at FROM auth_sessions WHERE id = ?1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or(PortError::Unauthorized)?;
        let expires_at: DateTime<Utc> = row.try_get("expires_at").map_err(unexpected)?;
        if expires_at <= Utc::now() {
            self.delete_auth_session(session_id).await?;
            return Err(PortError::Unauthorized);
        }
        let user_id: String = row.try_get("user_id").map_err(unexpected)?;
        parse_uuid(&user_id)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn insert_entry(&self, entry: &MemorizationEntry) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO entries (id, user_id, surah_number, from_verse, to_verse, \
             date_started, date_completed, status, confidence_level, notes, \
             total_sessions_completed, total_time_minutes) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(entry.id.to_string())
        .bind(entry.user_id.to_string())
        .bind(entry.surah_number)
        .bind(entry.range.from_verse)
        .bind(entry.range.to_verse)
        .bind(entry.date_started)
        .bind(entry.date_completed)
        .bind(status_str(entry.status))
        .bind(entry.confidence_level)
        .bind(entry.notes.as_deref())
        .bind(entry.total_sessions_completed)
        .bind(entry.total_time_minutes)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_entry(&self, entry_id: Uuid) -> PortResult<MemorizationEntry> {
        let row = sqlx::query("SELECT * FROM entries WHERE id = ?1")
            .bind(entry_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("memorization entry {entry_id}")))?;
        let mut entry = entry_from_row(&row)?;
        self.load_review_events(&mut entry).await?;
        Ok(entry)
    }

    async fn update_entry(&self, entry: &MemorizationEntry) -> PortResult<()> {
        sqlx::query(
            "UPDATE entries SET date_completed = ?2, status = ?3, confidence_level = ?4, \
             notes = ?5, total_sessions_completed = ?6, total_time_minutes = ?7 \
             WHERE id = ?1",
        )
        .bind(entry.id.to_string())
        .bind(entry.date_completed)
        .bind(status_str(entry.status))
        .bind(entry.confidence_level)
        .bind(entry.notes.as_deref())
        .bind(entry.total_sessions_completed)
        .bind(entry.total_time_minutes)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn add_review_event(&self, entry_id: Uuid, event: &ReviewEvent) -> PortResult<()> {
        sqlx::query("INSERT INTO entry_reviews (entry_id, date, rating) VALUES (?1, ?2, ?3)")
            .bind(entry_id.to_string())
            .bind(event.date)
            .bind(event.rating)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_completed_entries(&self, user_id: Uuid) -> PortResult<Vec<MemorizationEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM entries WHERE user_id = ?1 AND status IN ('completed', 'reviewing') \
             ORDER BY date_completed DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut entry = entry_from_row(row)?;
            self.load_review_events(&mut entry).await?;
            entries.push(entry);
        }
        Ok(entries)
    }

    async fn count_completed_entries(&self, user_id: Uuid) -> PortResult<u32> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM entries \
             WHERE user_id = ?1 AND status IN ('completed', 'reviewing')",
        )
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        row.try_get("n").map_err(unexpected)
    }

    async fn list_entries_started_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> PortResult<Vec<MemorizationEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM entries WHERE user_id = ?1 AND date_started >= ?2 \
             ORDER BY date_started DESC",
        )
        .bind(user_id.to_string())
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut entry = entry_from_row(row)?;
            self.load_review_events(&mut entry).await?;
            entries.push(entry);
        }
        Ok(entries)
    }

    async fn insert_session(&self, session: &StudySession) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, kind, entry_id, start_time, end_time, \
             duration_minutes, completed, is_paused, pause_started_at, total_pause_seconds, \
             rating) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(session.id.to_string())
        .bind(session.user_id.to_string())
        .bind(kind_str(session.kind))
        .bind(session.entry_id.map(|id| id.to_string()))
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(session.duration_minutes)
        .bind(session.completed)
        .bind(session.is_paused)
        .bind(session.pause_started_at)
        .bind(session.total_pause_seconds)
        .bind(session.rating)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_session(&self, session_id: Uuid, kind: SessionKind) -> PortResult<StudySession> {
        let row = sqlx::query("SELECT * FROM sessions WHERE id = ?1 AND kind = ?2")
            .bind(session_id.to_string())
            .bind(kind_str(kind))
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| {
                PortError::NotFound(format!("{} session {session_id}", kind_str(kind)))
            })?;
        session_from_row(&row)
    }

    async fn update_session(&self, session: &StudySession) -> PortResult<()> {
        // Completed is terminal: a stale writer that loaded the session
        // before a racing completion cannot flip it back to running.
        sqlx::query(
            "UPDATE sessions SET end_time = ?2, completed = ?3, is_paused = ?4, \
             pause_started_at = ?5, total_pause_seconds = ?6, rating = ?7 \
             WHERE id = ?1 AND (completed = 0 OR ?3 = 1)",
        )
        .bind(session.id.to_string())
        .bind(session.end_time)
        .bind(session.completed)
        .bind(session.is_paused)
        .bind(session.pause_started_at)
        .bind(session.total_pause_seconds)
        .bind(session.rating)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn find_open_session(
        &self,
        entry_id: Uuid,
        kind: SessionKind,
        since: Option<DateTime<Utc>>,
    ) -> PortResult<Option<StudySession>> {
        let row = sqlx::query(
            "SELECT * FROM sessions WHERE entry_id = ?1 AND kind = ?2 AND completed = 0 \
             AND (?3 IS NULL OR start_time >= ?3) \
             ORDER BY start_time DESC LIMIT 1",
        )
        .bind(entry_id.to_string())
        .bind(kind_str(kind))
        .bind(since)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        row.as_ref().map(session_from_row).transpose()
    }

    async fn count_completed_sessions(
        &self,
        entry_id: Uuid,
        kind: SessionKind,
        since: Option<DateTime<Utc>>,
    ) -> PortResult<u32> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM sessions \
             WHERE entry_id = ?1 AND kind = ?2 AND completed = 1 \
             AND (?3 IS NULL OR start_time >= ?3)",
        )
        .bind(entry_id.to_string())
        .bind(kind_str(kind))
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        row.try_get("n").map_err(unexpected)
    }

    async fn count_sessions(&self, entry_id: Uuid, kind: SessionKind) -> PortResult<u32> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM sessions WHERE entry_id = ?1 AND kind = ?2",
        )
        .bind(entry_id.to_string())
        .bind(kind_str(kind))
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        row.try_get("n").map_err(unexpected)
    }

    async fn list_sessions_for_entry(
        &self,
        entry_id: Uuid,
        kind: SessionKind,
    ) -> PortResult<Vec<StudySession>> {
        let rows = sqlx::query(
            "SELECT * FROM sessions WHERE entry_id = ?1 AND kind = ?2 ORDER BY start_time",
        )
        .bind(entry_id.to_string())
        .bind(kind_str(kind))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        rows.iter().map(session_from_row).collect()
    }

    async fn list_completed_sessions_between(
        &self,
        user_id: Uuid,
        kind: SessionKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<Vec<StudySession>> {
        let rows = sqlx::query(
            "SELECT * FROM sessions WHERE user_id = ?1 AND kind = ?2 AND completed = 1 \
             AND start_time >= ?3 AND start_time < ?4 ORDER BY start_time",
        )
        .bind(user_id.to_string())
        .bind(kind_str(kind))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        rows.iter().map(session_from_row).collect()
    }

    async fn set_murajaah_targets(&self, session_id: Uuid, targets: &[Uuid]) -> PortResult<()> {
        sqlx::query("DELETE FROM murajaah_targets WHERE session_id = ?1")
            .bind(session_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        for target in targets {
            sqlx::query("INSERT INTO murajaah_targets (session_id, ledger_id) VALUES (?1, ?2)")
                .bind(session_id.to_string())
                .bind(target.to_string())
                .execute(&self.pool)
                .await
                .map_err(unexpected)?;
        }
        Ok(())
    }

    async fn get_murajaah_targets(&self, session_id: Uuid) -> PortResult<Vec<Uuid>> {
        let rows = sqlx::query("SELECT ledger_id FROM murajaah_targets WHERE session_id = ?1")
            .bind(session_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        rows.iter()
            .map(|row| {
                let id: String = row.try_get("ledger_id").map_err(unexpected)?;
                parse_uuid(&id)
            })
            .collect()
    }

    async fn find_pending_vault_entry(
        &self,
        user_id: Uuid,
        surah_number: u16,
    ) -> PortResult<Option<VaultEntry>> {
        let row = sqlx::query(
            "SELECT * FROM vault_entries \
             WHERE user_id = ?1 AND surah_number = ?2 AND status = 'pending'",
        )
        .bind(user_id.to_string())
        .bind(surah_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        match row {
            Some(row) => {
                let mut entry = vault_from_row(&row)?;
                self.load_vault_verses(&mut entry).await?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    async fn insert_vault_entry(&self, entry: &VaultEntry) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO vault_entries (id, user_id, surah_number, consolidated_from, \
             consolidated_to, status, verified_by, verification_date, verification_rating, \
             verification_notes, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(entry.id.to_string())
        .bind(entry.user_id.to_string())
        .bind(entry.surah_number)
        .bind(entry.consolidated.from_verse)
        .bind(entry.consolidated.to_verse)
        .bind(vault_status_str(entry.status))
        .bind(entry.verification.as_ref().map(|v| v.verified_by.to_string()))
        .bind(entry.verification.as_ref().map(|v| v.date))
        .bind(entry.verification.as_ref().map(|v| v.rating))
        .bind(entry.verification.as_ref().and_then(|v| v.notes.as_deref()))
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        self.sync_vault_verses(entry).await
    }

    async fn update_vault_entry(&self, entry: &VaultEntry) -> PortResult<()> {
        sqlx::query(
            "UPDATE vault_entries SET consolidated_from = ?2, consolidated_to = ?3, \
             status = ?4, verified_by = ?5, verification_date = ?6, verification_rating = ?7, \
             verification_notes = ?8 WHERE id = ?1",
        )
        .bind(entry.id.to_string())
        .bind(entry.consolidated.from_verse)
        .bind(entry.consolidated.to_verse)
        .bind(vault_status_str(entry.status))
        .bind(entry.verification.as_ref().map(|v| v.verified_by.to_string()))
        .bind(entry.verification.as_ref().map(|v| v.date))
        .bind(entry.verification.as_ref().map(|v| v.rating))
        .bind(entry.verification.as_ref().and_then(|v| v.notes.as_deref()))
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        self.sync_vault_verses(entry).await
    }

    async fn get_vault_entry(&self, vault_id: Uuid) -> PortResult<VaultEntry> {
        let row = sqlx::query("SELECT * FROM vault_entries WHERE id = ?1")
            .bind(vault_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("vault entry {vault_id}")))?;
        let mut entry = vault_from_row(&row)?;
        self.load_vault_verses(&mut entry).await?;
        Ok(entry)
    }

    async fn list_pending_vault_entries(&self, user_id: Uuid) -> PortResult<Vec<VaultEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM vault_entries WHERE user_id = ?1 AND status = 'pending' \
             ORDER BY created_at",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut entry = vault_from_row(row)?;
            self.load_vault_verses(&mut entry).await?;
            entries.push(entry);
        }
        Ok(entries)
    }

    async fn find_ledger_entry(
        &self,
        user_id: Uuid,
        surah_number: u16,
        juz_number: u8,
    ) -> PortResult<Option<VerifiedMemorization>> {
        let row = sqlx::query(
            "SELECT * FROM verified_memorizations \
             WHERE user_id = ?1 AND surah_number = ?2 AND juz_number = ?3",
        )
        .bind(user_id.to_string())
        .bind(surah_number)
        .bind(juz_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        match row {
            Some(row) => {
                let mut entry = ledger_from_row(&row)?;
                self.load_ledger_revisions(&mut entry).await?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    async fn get_ledger_entry(&self, id: Uuid) -> PortResult<VerifiedMemorization> {
        let row = sqlx::query("SELECT * FROM verified_memorizations WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("verified memorization {id}")))?;
        let mut entry = ledger_from_row(&row)?;
        self.load_ledger_revisions(&mut entry).await?;
        Ok(entry)
    }

    async fn insert_ledger_entry(&self, entry: &VerifiedMemorization) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO verified_memorizations (id, user_id, surah_number, juz_number, \
             from_verse, to_verse, verification_date, last_revision_date, average_rating) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(entry.id.to_string())
        .bind(entry.user_id.to_string())
        .bind(entry.surah_number)
        .bind(entry.juz_number)
        .bind(entry.range.from_verse)
        .bind(entry.range.to_verse)
        .bind(entry.verification_date)
        .bind(entry.last_revision_date)
        .bind(entry.average_rating)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn update_ledger_entry(&self, entry: &VerifiedMemorization) -> PortResult<()> {
        sqlx::query(
            "UPDATE verified_memorizations SET from_verse = ?2, to_verse = ?3, \
             verification_date = ?4, last_revision_date = ?5, average_rating = ?6 \
             WHERE id = ?1",
        )
        .bind(entry.id.to_string())
        .bind(entry.range.from_verse)
        .bind(entry.range.to_verse)
        .bind(entry.verification_date)
        .bind(entry.last_revision_date)
        .bind(entry.average_rating)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn append_ledger_revision(
        &self,
        ledger_id: Uuid,
        revision: &RevisionRecord,
    ) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO ledger_revisions (ledger_id, date, rating, duration_minutes, notes) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(ledger_id.to_string())
        .bind(revision.date)
        .bind(revision.rating)
        .bind(revision.duration_minutes)
        .bind(revision.notes.as_deref())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_ledger_entries(&self, user_id: Uuid) -> PortResult<Vec<VerifiedMemorization>> {
        let rows = sqlx::query(
            "SELECT * FROM verified_memorizations WHERE user_id = ?1 \
             ORDER BY surah_number, juz_number",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut entry = ledger_from_row(row)?;
            self.load_ledger_revisions(&mut entry).await?;
            entries.push(entry);
        }
        Ok(entries)
    }

    async fn list_ledger_entries_for_surah(
        &self,
        user_id: Uuid,
        surah_number: u16,
    ) -> PortResult<Vec<VerifiedMemorization>> {
        let rows = sqlx::query(
            "SELECT * FROM verified_memorizations WHERE user_id = ?1 AND surah_number = ?2 \
             ORDER BY juz_number",
        )
        .bind(user_id.to_string())
        .bind(surah_number)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut entry = ledger_from_row(row)?;
            self.load_ledger_revisions(&mut entry).await?;
            entries.push(entry);
        }
        Ok(entries)
    }

    async fn list_ledger_entries_for_juz(
        &self,
        user_id: Uuid,
        juz_number: u8,
    ) -> PortResult<Vec<VerifiedMemorization>> {
        let rows = sqlx::query(
            "SELECT * FROM verified_memorizations WHERE user_id = ?1 AND juz_number = ?2 \
             ORDER BY surah_number",
        )
        .bind(user_id.to_string())
        .bind(juz_number)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut entry = ledger_from_row(row)?;
            self.load_ledger_revisions(&mut entry).await?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:")
            .await
            .expect("in-memory store")
    }

    async fn make_user(store: &SqliteStore) -> Uuid {
        let email = format!("{}@example.com", Uuid::new_v4());
        store
            .create_user_with_email(&email, "hash")
            .await
            .expect("create user")
            .user_id
    }

    fn sample_entry(user_id: Uuid) -> MemorizationEntry {
        MemorizationEntry {
            id: Uuid::new_v4(),
            user_id,
            surah_number: 2,
            range: VerseRange::raw(1, 5),
            date_started: Utc::now(),
            date_completed: None,
            status: EntryStatus::InProgress,
            confidence_level: None,
            notes: None,
            total_sessions_completed: 0,
            total_time_minutes: 0,
            review_events: Vec::new(),
        }
    }

    #[tokio::test]
    async fn user_roundtrip_and_lookup() {
        let store = store().await;
        let user = store
            .create_user_with_email("a@example.com", "hashed")
            .await
            .expect("create");
        let creds = store.get_user_by_email("a@example.com").await.expect("get");
        assert_eq!(creds.user_id, user.user_id);
        assert_eq!(creds.hashed_password, "hashed");

        let err = store.get_user_by_email("nobody@example.com").await;
        assert!(matches!(err, Err(PortError::NotFound(_))));
    }

    #[tokio::test]
    async fn auth_session_validation_and_expiry() {
        let store = store().await;
        let user_id = make_user(&store).await;

        store
            .create_auth_session("live", user_id, Utc::now() + Duration::hours(1))
            .await
            .expect("create live");
        assert_eq!(
            store.validate_auth_session("live").await.expect("valid"),
            user_id
        );

        store
            .create_auth_session("stale", user_id, Utc::now() - Duration::hours(1))
            .await
            .expect("create stale");
        assert!(matches!(
            store.validate_auth_session("stale").await,
            Err(PortError::Unauthorized)
        ));
        // The expired row is gone afterward.
        assert!(matches!(
            store.validate_auth_session("stale").await,
            Err(PortError::Unauthorized)
        ));

        store.delete_auth_session("live").await.expect("delete");
        assert!(matches!(
            store.validate_auth_session("live").await,
            Err(PortError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn entry_update_and_review_events() {
        let store = store().await;
        let user_id = make_user(&store).await;
        let mut entry = sample_entry(user_id);
        store.insert_entry(&entry).await.expect("insert");

        entry.status = EntryStatus::Completed;
        entry.date_completed = Some(Utc::now());
        entry.confidence_level = Some(4);
        entry.total_sessions_completed = 3;
        entry.total_time_minutes = 75;
        store.update_entry(&entry).await.expect("update");

        let event = ReviewEvent {
            date: Utc::now(),
            rating: 5,
        };
        store.add_review_event(entry.id, &event).await.expect("review");

        let loaded = store.get_entry(entry.id).await.expect("get");
        assert_eq!(loaded.status, EntryStatus::Completed);
        assert_eq!(loaded.confidence_level, Some(4));
        assert_eq!(loaded.total_time_minutes, 75);
        assert_eq!(loaded.review_events.len(), 1);
        assert_eq!(loaded.review_events[0].rating, 5);

        assert_eq!(store.count_completed_entries(user_id).await.expect("count"), 1);
        let completed = store.list_completed_entries(user_id).await.expect("list");
        assert_eq!(completed.len(), 1);
    }

    #[tokio::test]
    async fn open_session_lookup_respects_kind_and_since() {
        let store = store().await;
        let user_id = make_user(&store).await;
        let entry = sample_entry(user_id);
        store.insert_entry(&entry).await.expect("insert entry");

        let now = Utc::now();
        let mut old = StudySession {
            id: Uuid::new_v4(),
            user_id,
            kind: SessionKind::Ziyadah,
            entry_id: Some(entry.id),
            start_time: now - Duration::days(2),
            end_time: None,
            duration_minutes: 25,
            completed: false,
            is_paused: false,
            pause_started_at: None,
            total_pause_seconds: 0,
            rating: None,
        };
        store.insert_session(&old).await.expect("insert old");

        let found = store
            .find_open_session(entry.id, SessionKind::Ziyadah, None)
            .await
            .expect("find");
        assert_eq!(found.map(|s| s.id), Some(old.id));

        // A `since` in between hides the older session.
        let found = store
            .find_open_session(entry.id, SessionKind::Ziyadah, Some(now - Duration::days(1)))
            .await
            .expect("find since");
        assert!(found.is_none());

        // Completing it removes it from the open set.
        old.completed = true;
        old.end_time = Some(now);
        store.update_session(&old).await.expect("update");
        let found = store
            .find_open_session(entry.id, SessionKind::Ziyadah, None)
            .await
            .expect("find completed");
        assert!(found.is_none());

        assert_eq!(
            store
                .count_completed_sessions(entry.id, SessionKind::Ziyadah, None)
                .await
                .expect("count"),
            1
        );
        assert_eq!(
            store
                .count_sessions(entry.id, SessionKind::Revision)
                .await
                .expect("count other kind"),
            0
        );
        assert!(matches!(
            store.get_session(old.id, SessionKind::Revision).await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn vault_staging_persists_verses_and_envelope() {
        let store = store().await;
        let user_id = make_user(&store).await;
        let now = Utc::now();

        let mut vault = VaultEntry {
            id: Uuid::new_v4(),
            user_id,
            surah_number: 2,
            verses: vec![RangeAddition {
                range: VerseRange::raw(1, 5),
                date_added: now,
            }],
            consolidated: VerseRange::raw(1, 5),
            status: VaultStatus::Pending,
            verification: None,
            created_at: now,
        };
        store.insert_vault_entry(&vault).await.expect("insert");

        vault.stage(VerseRange::raw(3, 10), now + Duration::minutes(1));
        store.update_vault_entry(&vault).await.expect("update");

        let loaded = store
            .find_pending_vault_entry(user_id, 2)
            .await
            .expect("find")
            .expect("present");
        assert_eq!(loaded.verses.len(), 2);
        assert_eq!(loaded.consolidated, VerseRange::raw(1, 10));

        vault.status = VaultStatus::Verified;
        vault.verification = Some(ReviewerVerification {
            verified_by: user_id,
            date: now + Duration::minutes(2),
            rating: 5,
            notes: Some("solid".to_string()),
        });
        store.update_vault_entry(&vault).await.expect("verify");

        assert!(store
            .find_pending_vault_entry(user_id, 2)
            .await
            .expect("find verified")
            .is_none());
        let loaded = store.get_vault_entry(vault.id).await.expect("get");
        assert_eq!(loaded.status, VaultStatus::Verified);
        let verification = loaded.verification.expect("verification");
        assert_eq!(verification.rating, 5);
        assert_eq!(verification.notes.as_deref(), Some("solid"));
    }

    #[tokio::test]
    async fn ledger_roundtrip_with_revisions() {
        let store = store().await;
        let user_id = make_user(&store).await;
        let now = Utc::now();

        let mut ledger = VerifiedMemorization {
            id: Uuid::new_v4(),
            user_id,
            surah_number: 2,
            juz_number: 1,
            range: VerseRange::raw(1, 50),
            verification_date: now,
            revisions: Vec::new(),
            last_revision_date: None,
            average_rating: Some(5.0),
        };
        store.insert_ledger_entry(&ledger).await.expect("insert");

        let revision = RevisionRecord {
            date: now + Duration::days(1),
            rating: 4,
            duration_minutes: 25,
            notes: None,
        };
        store
            .append_ledger_revision(ledger.id, &revision)
            .await
            .expect("revision");
        ledger.range = ledger.range.merge(VerseRange::raw(40, 100));
        ledger.last_revision_date = Some(revision.date);
        ledger.average_rating = Some(4.0);
        store.update_ledger_entry(&ledger).await.expect("update");

        let loaded = store
            .find_ledger_entry(user_id, 2, 1)
            .await
            .expect("find")
            .expect("present");
        assert_eq!(loaded.range, VerseRange::raw(1, 100));
        assert_eq!(loaded.revisions.len(), 1);
        assert_eq!(loaded.average_rating, Some(4.0));

        assert_eq!(
            store
                .list_ledger_entries_for_surah(user_id, 2)
                .await
                .expect("by surah")
                .len(),
            1
        );
        assert_eq!(
            store
                .list_ledger_entries_for_juz(user_id, 1)
                .await
                .expect("by juz")
                .len(),
            1
        );
        assert!(store
            .list_ledger_entries_for_juz(user_id, 2)
            .await
            .expect("other juz")
            .is_empty());
    }

    #[tokio::test]
    async fn murajaah_targets_roundtrip() {
        let store = store().await;
        let user_id = make_user(&store).await;
        let now = Utc::now();

        let mut targets = Vec::new();
        for juz in 1..=2u8 {
            let ledger = VerifiedMemorization {
                id: Uuid::new_v4(),
                user_id,
                surah_number: 2,
                juz_number: juz,
                range: VerseRange::raw(1, 10),
                verification_date: now,
                revisions: Vec::new(),
                last_revision_date: None,
                average_rating: None,
            };
            store.insert_ledger_entry(&ledger).await.expect("ledger");
            targets.push(ledger.id);
        }

        let session = StudySession {
            id: Uuid::new_v4(),
            user_id,
            kind: SessionKind::Murajaah,
            entry_id: None,
            start_time: now,
            end_time: None,
            duration_minutes: 25,
            completed: false,
            is_paused: false,
            pause_started_at: None,
            total_pause_seconds: 0,
            rating: None,
        };
        store.insert_session(&session).await.expect("session");
        store
            .set_murajaah_targets(session.id, &targets)
            .await
            .expect("set targets");

        let loaded = store.get_murajaah_targets(session.id).await.expect("get");
        assert_eq!(loaded, targets);
    }
}
