//! services/api/src/web/revision.rs
//!
//! Per-entry revision sessions: short graded passes over an already
//! finished memorization, capped at five per entry over its lifetime.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::common::{
    domain_rejection, ensure_owner, port_rejection, settle_session, validate_rating, Rejection,
};
use crate::web::memorization::PauseResponse;
use crate::web::state::AppState;
use crate::web::types::SessionResponse;
use tahfiz_core::domain::{
    DomainError, EntryStatus, ReviewEvent, SessionKind, StudySession,
};
use tahfiz_core::session::{ensure_revision_slot, validate_revision_duration, PauseChange};

#[derive(Deserialize, ToSchema)]
pub struct StartRevisionRequest {
    pub duration_minutes: u32,
}

#[derive(Deserialize, ToSchema)]
pub struct CompleteRevisionRequest {
    pub rating: u8,
}

/// Start a revision session for a finished entry.
#[utoipa::path(
    post,
    path = "/memorizations/{entry_id}/revisions",
    params(("entry_id" = Uuid, Path, description = "The memorization entry")),
    request_body = StartRevisionRequest,
    responses(
        (status = 201, description = "Revision session created", body = SessionResponse),
        (status = 400, description = "Duration is not one of 10, 15, 20, 25"),
        (status = 404, description = "No such entry"),
        (status = 409, description = "Entry not finished, a session is running, or the lifetime cap is reached")
    )
)]
pub async fn start_revision_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(entry_id): Path<Uuid>,
    Json(req): Json<StartRevisionRequest>,
) -> Result<impl IntoResponse, Rejection> {
    validate_revision_duration(req.duration_minutes).map_err(domain_rejection)?;

    let mut entry = state.store.get_entry(entry_id).await.map_err(port_rejection)?;
    ensure_owner(entry.user_id, user_id)?;
    let parent_completed = entry.status != EntryStatus::InProgress;

    let now = Utc::now();
    if let Some(mut open) = state
        .store
        .find_open_session(entry.id, SessionKind::Revision, None)
        .await
        .map_err(port_rejection)?
    {
        settle_session(&state.store, &mut open, now).await?;
        if !open.completed && !open.is_paused {
            return Err(domain_rejection(DomainError::SessionInProgress));
        }
    }

    let existing = state
        .store
        .count_sessions(entry.id, SessionKind::Revision)
        .await
        .map_err(port_rejection)?;
    ensure_revision_slot(parent_completed, existing).map_err(domain_rejection)?;

    let session = StudySession::start(
        user_id,
        SessionKind::Revision,
        Some(entry.id),
        req.duration_minutes,
        now,
    );
    state
        .store
        .insert_session(&session)
        .await
        .map_err(port_rejection)?;

    // The first revision moves the entry from completed to reviewing.
    if entry.status == EntryStatus::Completed {
        entry.status = EntryStatus::Reviewing;
        state.store.update_entry(&entry).await.map_err(port_rejection)?;
    }

    Ok((StatusCode::CREATED, Json(SessionResponse::at(&session, now))))
}

/// Complete a revision session with a grade, appending a review event to
/// the parent entry.
#[utoipa::path(
    post,
    path = "/revisions/{session_id}/complete",
    params(("session_id" = Uuid, Path, description = "The revision session")),
    request_body = CompleteRevisionRequest,
    responses(
        (status = 200, description = "Session completed and graded", body = SessionResponse),
        (status = 400, description = "Invalid rating"),
        (status = 404, description = "No such session")
    )
)]
pub async fn complete_revision_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<CompleteRevisionRequest>,
) -> Result<impl IntoResponse, Rejection> {
    validate_rating(req.rating)?;

    let mut session = state
        .store
        .get_session(session_id, SessionKind::Revision)
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

    if let Some(entry_id) = session.entry_id {
        let event = ReviewEvent {
            date: now,
            rating: req.rating,
        };
        state
            .store
            .add_review_event(entry_id, &event)
            .await
            .map_err(port_rejection)?;
    }

    Ok(Json(SessionResponse::at(&session, now)))
}

/// Toggle pause on a revision session.
#[utoipa::path(
    post,
    path = "/revisions/{session_id}/pause",
    params(("session_id" = Uuid, Path, description = "The revision session")),
    responses(
        (status = 200, description = "Pause toggled", body = PauseResponse),
        (status = 404, description = "No such session"),
        (status = 409, description = "Session is already completed")
    )
)]
pub async fn pause_revision_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, Rejection> {
    let mut session = state
        .store
        .get_session(session_id, SessionKind::Revision)
        .await
        .map_err(port_rejection)?;
    ensure_owner(session.user_id, user_id)?;

    let now = Utc::now();
    settle_session(&state.store, &mut session, now).await?;
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

/// Run the lazy completion check and report the revision session.
#[utoipa::path(
    get,
    path = "/revisions/{session_id}/status",
    params(("session_id" = Uuid, Path, description = "The revision session")),
    responses(
        (status = 200, description = "Current session state", body = SessionResponse),
        (status = 404, description = "No such session")
    )
)]
pub async fn revision_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, Rejection> {
    let mut session = state
        .store
        .get_session(session_id, SessionKind::Revision)
        .await
        .map_err(port_rejection)?;
    ensure_owner(session.user_id, user_id)?;

    let now = Utc::now();
    settle_session(&state.store, &mut session, now).await?;

    Ok(Json(SessionResponse::at(&session, now)))
}
