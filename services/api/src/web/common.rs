//! services/api/src/web/common.rs
//!
//! Shared handler plumbing: error-to-status mapping, the session
//! settlement step every status/pause endpoint runs, and the ledger
//! upsert loop shared by the vault and direct-add flows.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use tahfiz_core::domain::{DomainError, SessionKind, StudySession, VerifiedMemorization};
use tahfiz_core::ledger::LedgerUpsert;
use tahfiz_core::ports::{MemorizationStore, PortError};

/// The error shape every handler rejects with.
pub type Rejection = (StatusCode, String);

pub fn domain_rejection(err: DomainError) -> Rejection {
    let status = match err {
        DomainError::InvalidSurah(_)
        | DomainError::InvalidJuz(_)
        | DomainError::InvalidVerseRange { .. }
        | DomainError::InvalidDuration(_) => StatusCode::BAD_REQUEST,
        DomainError::SessionCompleted
        | DomainError::SessionInProgress
        | DomainError::SessionLimitExceeded(_)
        | DomainError::PrematureRevision => StatusCode::CONFLICT,
        DomainError::NoMemorizedContent => StatusCode::NOT_FOUND,
    };
    (status, err.to_string())
}

pub fn port_rejection(err: PortError) -> Rejection {
    match err {
        PortError::NotFound(what) => (StatusCode::NOT_FOUND, format!("Not found: {what}")),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(e) => {
            error!("Storage failure: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

/// Resources belonging to another user read as absent, not forbidden.
pub fn ensure_owner(resource_user: Uuid, user_id: Uuid) -> Result<(), Rejection> {
    if resource_user == user_id {
        Ok(())
    } else {
        Err((StatusCode::NOT_FOUND, "Not found".to_string()))
    }
}

pub fn validate_rating(rating: u8) -> Result<(), Rejection> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err((
            StatusCode::BAD_REQUEST,
            "rating must be between 1 and 5".to_string(),
        ))
    }
}

/// Midnight of the calendar day containing `now`.
pub fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|d| d.and_utc())
        .unwrap_or(now)
}

/// Runs the lazy completion check on `session` and persists the result.
/// On the completion transition of a ziyadah session, bumps the parent
/// entry's completed-session counter exactly once.
///
/// Returns whether the session transitioned to completed here.
pub async fn settle_session(
    store: &Arc<dyn MemorizationStore>,
    session: &mut StudySession,
    now: DateTime<Utc>,
) -> Result<bool, Rejection> {
    if !session.check(now) {
        return Ok(false);
    }
    store.update_session(session).await.map_err(port_rejection)?;
    if session.kind == SessionKind::Ziyadah {
        if let Some(entry_id) = session.entry_id {
            let mut entry = store.get_entry(entry_id).await.map_err(port_rejection)?;
            entry.total_sessions_completed += 1;
            store.update_entry(&entry).await.map_err(port_rejection)?;
        }
    }
    Ok(true)
}

/// Applies a consolidation plan to the user's ledger: existing
/// (surah, juz) records are widened, missing ones created with the given
/// seed rating. Returns the records as they stand after the writes.
pub async fn apply_ledger_plan(
    store: &Arc<dyn MemorizationStore>,
    user_id: Uuid,
    plan: &[LedgerUpsert],
    seed_rating: Option<u8>,
    now: DateTime<Utc>,
) -> Result<Vec<VerifiedMemorization>, Rejection> {
    let mut applied = Vec::with_capacity(plan.len());
    for upsert in plan {
        let existing = store
            .find_ledger_entry(user_id, upsert.surah_number, upsert.juz_number)
            .await
            .map_err(port_rejection)?;
        let entry = match existing {
            Some(mut entry) => {
                entry.absorb(upsert.range);
                store
                    .update_ledger_entry(&entry)
                    .await
                    .map_err(port_rejection)?;
                entry
            }
            None => {
                let entry = VerifiedMemorization {
                    id: Uuid::new_v4(),
                    user_id,
                    surah_number: upsert.surah_number,
                    juz_number: upsert.juz_number,
                    range: upsert.range,
                    verification_date: now,
                    revisions: Vec::new(),
                    last_revision_date: None,
                    average_rating: seed_rating.map(f64::from),
                };
                store
                    .insert_ledger_entry(&entry)
                    .await
                    .map_err(port_rejection)?;
                entry
            }
        };
        applied.push(entry);
    }
    Ok(applied)
}
