//! services/api/src/web/murajaah.rs
//!
//! Murajaah sessions: 25-minute recall passes over a selection of the
//! user's verified ledger records, chosen by surah or by juz.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::common::{
    domain_rejection, ensure_owner, port_rejection, settle_session, validate_rating, Rejection,
};
use crate::web::memorization::PauseResponse;
use crate::web::state::AppState;
use crate::web::types::{LedgerResponse, SessionResponse};
use tahfiz_core::domain::{DomainError, RevisionRecord, SessionKind, StudySession};
use tahfiz_core::quran::Surah;
use tahfiz_core::session::{PauseChange, MURAJAAH_SESSION_MINUTES};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MurajaahTarget {
    Surah,
    Juz,
}

#[derive(Deserialize, ToSchema)]
pub struct StartMurajaahRequest {
    pub target: MurajaahTarget,
    /// Surah number (1-114) or juz number (1-30), depending on `target`.
    pub identifier: u16,
}

#[derive(Deserialize, ToSchema)]
pub struct CompleteMurajaahRequest {
    pub rating: u8,
    pub notes: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct MurajaahResponse {
    pub session: SessionResponse,
    pub targets: Vec<LedgerResponse>,
}

/// Stamps a revision pass on every target of the session.
async fn stamp_targets(
    state: &AppState,
    session_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), Rejection> {
    let targets = state
        .store
        .get_murajaah_targets(session_id)
        .await
        .map_err(port_rejection)?;
    for ledger_id in targets {
        let mut entry = state
            .store
            .get_ledger_entry(ledger_id)
            .await
            .map_err(port_rejection)?;
        entry.mark_revised(now);
        state
            .store
            .update_ledger_entry(&entry)
            .await
            .map_err(port_rejection)?;
    }
    Ok(())
}

/// Start a murajaah session over the ledger records of one surah or juz.
#[utoipa::path(
    post,
    path = "/murajaah",
    request_body = StartMurajaahRequest,
    responses(
        (status = 201, description = "Session created", body = MurajaahResponse),
        (status = 400, description = "Invalid surah or juz number"),
        (status = 404, description = "The selection matches no verified content")
    )
)]
pub async fn start_murajaah_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<StartMurajaahRequest>,
) -> Result<impl IntoResponse, Rejection> {
    let targets = match req.target {
        MurajaahTarget::Surah => {
            Surah::get(req.identifier).map_err(domain_rejection)?;
            state
                .store
                .list_ledger_entries_for_surah(user_id, req.identifier)
                .await
                .map_err(port_rejection)?
        }
        MurajaahTarget::Juz => {
            // Validate before narrowing: 257 must not wrap to juz 1.
            if !(1..=30).contains(&req.identifier) {
                return Err(domain_rejection(DomainError::InvalidJuz(req.identifier)));
            }
            state
                .store
                .list_ledger_entries_for_juz(user_id, req.identifier as u8)
                .await
                .map_err(port_rejection)?
        }
    };
    if targets.is_empty() {
        return Err(domain_rejection(DomainError::NoMemorizedContent));
    }

    let now = Utc::now();
    let session = StudySession::start(
        user_id,
        SessionKind::Murajaah,
        None,
        MURAJAAH_SESSION_MINUTES,
        now,
    );
    state
        .store
        .insert_session(&session)
        .await
        .map_err(port_rejection)?;
    let target_ids: Vec<Uuid> = targets.iter().map(|t| t.id).collect();
    state
        .store
        .set_murajaah_targets(session.id, &target_ids)
        .await
        .map_err(port_rejection)?;

    Ok((
        StatusCode::CREATED,
        Json(MurajaahResponse {
            session: SessionResponse::at(&session, now),
            targets: targets.into_iter().map(Into::into).collect(),
        }),
    ))
}

/// Toggle pause on a murajaah session.
#[utoipa::path(
    post,
    path = "/murajaah/{session_id}/pause",
    params(("session_id" = Uuid, Path, description = "The murajaah session")),
    responses(
        (status = 200, description = "Pause toggled", body = PauseResponse),
        (status = 404, description = "No such session"),
        (status = 409, description = "Session is already completed")
    )
)]
pub async fn pause_murajaah_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, Rejection> {
    let mut session = state
        .store
        .get_session(session_id, SessionKind::Murajaah)
        .await
        .map_err(port_rejection)?;
    ensure_owner(session.user_id, user_id)?;

    let now = Utc::now();
    if settle_session(&state.store, &mut session, now).await? {
        stamp_targets(&state, session.id, now).await?;
    }
    let change = session.toggle_pause(now).map_err(domain_rejection)?;
    state
        .store
        .update_session(&session)
        .await
        .map_err(port_rejection)?;

    Ok(Json(PauseResponse {
        state: match change {
            PauseChange::Paused => "paused".to_string(),
            PauseChange::Resumed => "resumed".to_string(),
        },
        session: SessionResponse::at(&session, now),
    }))
}

/// Run the lazy completion check; on completion, every target gets its
/// last-revision date stamped.
#[utoipa::path(
    get,
    path = "/murajaah/{session_id}/status",
    params(("session_id" = Uuid, Path, description = "The murajaah session")),
    responses(
        (status = 200, description = "Current session state", body = SessionResponse),
        (status = 404, description = "No such session")
    )
)]
pub async fn murajaah_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, Rejection> {
    let mut session = state
        .store
        .get_session(session_id, SessionKind::Murajaah)
        .await
        .map_err(port_rejection)?;
    ensure_owner(session.user_id, user_id)?;

    let now = Utc::now();
    if settle_session(&state.store, &mut session, now).await? {
        stamp_targets(&state, session.id, now).await?;
    }

    Ok(Json(SessionResponse::at(&session, now)))
}

/// Complete a murajaah session with a grade, recording a revision on each
/// target and recomputing its average rating.
#[utoipa::path(
    post,
    path = "/murajaah/{session_id}/complete",
    params(("session_id" = Uuid, Path, description = "The murajaah session")),
    request_body = CompleteMurajaahRequest,
    responses(
        (status = 200, description = "Session completed and graded", body = MurajaahResponse),
        (status = 400, description = "Invalid rating"),
        (status = 404, description = "No such session")
    )
)]
pub async fn complete_murajaah_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<CompleteMurajaahRequest>,
) -> Result<impl IntoResponse, Rejection> {
    validate_rating(req.rating)?;

    let mut session = state
        .store
        .get_session(session_id, SessionKind::Murajaah)
        .await
        .map_err(port_rejection)?;
    ensure_owner(session.user_id, user_id)?;

    let now = Utc::now();
    session.force_complete(now);
    session.rating = Some(req.rating);
    state
        .store
        .update_session(&session)
        .await
        .map_err(port_rejection)?;

    let target_ids = state
        .store
        .get_murajaah_targets(session.id)
        .await
        .map_err(port_rejection)?;
    let mut targets = Vec::with_capacity(target_ids.len());
    for ledger_id in target_ids {
        let mut entry = state
            .store
            .get_ledger_entry(ledger_id)
            .await
            .map_err(port_rejection)?;
        let revision = RevisionRecord {
            date: now,
            rating: req.rating,
            duration_minutes: session.duration_minutes,
            notes: req.notes.clone(),
        };
        entry.record_revision(revision.clone());
        state
            .store
            .update_ledger_entry(&entry)
            .await
            .map_err(port_rejection)?;
        state
            .store
            .append_ledger_revision(entry.id, &revision)
            .await
            .map_err(port_rejection)?;
        targets.push(entry);
    }

    Ok(Json(MurajaahResponse {
        session: SessionResponse::at(&session, now),
        targets: targets.into_iter().map(Into::into).collect(),
    }))
}
