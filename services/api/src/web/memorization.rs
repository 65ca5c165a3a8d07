//! services/api/src/web/memorization.rs
//!
//! New-memorization (ziyadah) endpoints: entries, their timed sessions,
//! and the finish flow that stages a completed range into the vault.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::common::{
    day_start, domain_rejection, ensure_owner, port_rejection, settle_session, validate_rating,
    Rejection,
};
use crate::web::state::AppState;
use crate::web::types::{EntryResponse, SessionResponse, VaultResponse};
use tahfiz_core::domain::{
    EntryStatus, MemorizationEntry, RangeAddition, SessionKind, StudySession, VaultEntry,
    VaultStatus,
};
use tahfiz_core::quran::{Surah, VerseRange};
use tahfiz_core::session::{ensure_ziyadah_slot, PauseChange, ZIYADAH_SESSION_MINUTES};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct StartMemorizationRequest {
    pub surah_number: u16,
    pub from_verse: u16,
    pub to_verse: u16,
}

#[derive(Serialize, ToSchema)]
pub struct StartMemorizationResponse {
    pub entry: EntryResponse,
    pub session: SessionResponse,
}

#[derive(Serialize, ToSchema)]
pub struct ProgressResponse {
    pub entry: EntryResponse,
    pub sessions: Vec<SessionResponse>,
    pub completed_sessions: u32,
    pub total_sessions: u32,
}

#[derive(Serialize, ToSchema)]
pub struct PauseResponse {
    pub state: String,
    pub session: SessionResponse,
}

#[derive(Deserialize, ToSchema)]
pub struct FinishRequest {
    pub confidence_level: u8,
    pub notes: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct FinishResponse {
    pub entry: EntryResponse,
    pub vault: VaultResponse,
}

#[derive(Serialize, ToSchema)]
pub struct CountResponse {
    pub count: u32,
}

async fn owned_entry(
    state: &AppState,
    user_id: Uuid,
    entry_id: Uuid,
) -> Result<MemorizationEntry, Rejection> {
    let entry = state.store.get_entry(entry_id).await.map_err(port_rejection)?;
    ensure_owner(entry.user_id, user_id)?;
    Ok(entry)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Start memorizing a verse range: creates the entry and its first
/// 25-minute session.
#[utoipa::path(
    post,
    path = "/memorizations",
    request_body = StartMemorizationRequest,
    responses(
        (status = 201, description = "Entry and first session created", body = StartMemorizationResponse),
        (status = 400, description = "Invalid surah or verse range")
    )
)]
pub async fn start_memorization_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<StartMemorizationRequest>,
) -> Result<impl IntoResponse, Rejection> {
    let surah = Surah::get(req.surah_number).map_err(domain_rejection)?;
    let range = VerseRange::new(surah, req.from_verse, req.to_verse).map_err(domain_rejection)?;

    let now = Utc::now();
    let entry = MemorizationEntry {
        id: Uuid::new_v4(),
        user_id,
        surah_number: req.surah_number,
        range,
        date_started: now,
        date_completed: None,
        status: EntryStatus::InProgress,
        confidence_level: None,
        notes: None,
        total_sessions_completed: 0,
        total_time_minutes: 0,
        review_events: Vec::new(),
    };
    state.store.insert_entry(&entry).await.map_err(port_rejection)?;

    let session = StudySession::start(
        user_id,
        SessionKind::Ziyadah,
        Some(entry.id),
        ZIYADAH_SESSION_MINUTES,
        now,
    );
    state
        .store
        .insert_session(&session)
        .await
        .map_err(port_rejection)?;

    Ok((
        StatusCode::CREATED,
        Json(StartMemorizationResponse {
            entry: entry.into(),
            session: SessionResponse::at(&session, now),
        }),
    ))
}

/// Start another session for an entry, subject to the series rules: a
/// running session blocks, a paused one does not, and at most four
/// sessions may complete per day.
#[utoipa::path(
    post,
    path = "/memorizations/{entry_id}/sessions",
    params(("entry_id" = Uuid, Path, description = "The memorization entry")),
    responses(
        (status = 201, description = "Session created", body = SessionResponse),
        (status = 404, description = "No such entry"),
        (status = 409, description = "A session is in progress or the daily cap is reached")
    )
)]
pub async fn new_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, Rejection> {
    let entry = owned_entry(&state, user_id, entry_id).await?;
    let now = Utc::now();

    // Settle the entry's open session first: it may have run to completion
    // since anyone last looked.
    let mut open = state
        .store
        .find_open_session(entry.id, SessionKind::Ziyadah, None)
        .await
        .map_err(port_rejection)?;
    if let Some(session) = open.as_mut() {
        settle_session(&state.store, session, now).await?;
    }

    let completed_today = state
        .store
        .count_completed_sessions(entry.id, SessionKind::Ziyadah, Some(day_start(now)))
        .await
        .map_err(port_rejection)?;
    ensure_ziyadah_slot(open.as_ref(), completed_today).map_err(domain_rejection)?;

    let session = StudySession::start(
        user_id,
        SessionKind::Ziyadah,
        Some(entry.id),
        ZIYADAH_SESSION_MINUTES,
        now,
    );
    state
        .store
        .insert_session(&session)
        .await
        .map_err(port_rejection)?;

    Ok((StatusCode::CREATED, Json(SessionResponse::at(&session, now))))
}

/// The entry with its full session history and counts.
#[utoipa::path(
    get,
    path = "/memorizations/{entry_id}/progress",
    params(("entry_id" = Uuid, Path, description = "The memorization entry")),
    responses(
        (status = 200, description = "Progress report", body = ProgressResponse),
        (status = 404, description = "No such entry")
    )
)]
pub async fn progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, Rejection> {
    let entry = owned_entry(&state, user_id, entry_id).await?;
    let now = Utc::now();

    let sessions = state
        .store
        .list_sessions_for_entry(entry.id, SessionKind::Ziyadah)
        .await
        .map_err(port_rejection)?;
    let completed_sessions = state
        .store
        .count_completed_sessions(entry.id, SessionKind::Ziyadah, None)
        .await
        .map_err(port_rejection)?;
    let total_sessions = sessions.len() as u32;

    Ok(Json(ProgressResponse {
        sessions: sessions
            .iter()
            .map(|s| SessionResponse::at(s, now))
            .collect(),
        entry: entry.into(),
        completed_sessions,
        total_sessions,
    }))
}

/// Toggle pause on a running ziyadah session.
#[utoipa::path(
    post,
    path = "/sessions/{session_id}/pause",
    params(("session_id" = Uuid, Path, description = "The session")),
    responses(
        (status = 200, description = "Pause toggled", body = PauseResponse),
        (status = 404, description = "No such session"),
        (status = 409, description = "Session is already completed")
    )
)]
pub async fn pause_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, Rejection> {
    let mut session = state
        .store
        .get_session(session_id, SessionKind::Ziyadah)
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

/// Run the lazy completion check and report the session.
#[utoipa::path(
    get,
    path = "/sessions/{session_id}/status",
    params(("session_id" = Uuid, Path, description = "The session")),
    responses(
        (status = 200, description = "Current session state", body = SessionResponse),
        (status = 404, description = "No such session")
    )
)]
pub async fn session_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, Rejection> {
    let mut session = state
        .store
        .get_session(session_id, SessionKind::Ziyadah)
        .await
        .map_err(port_rejection)?;
    ensure_owner(session.user_id, user_id)?;

    let now = Utc::now();
    settle_session(&state.store, &mut session, now).await?;

    Ok(Json(SessionResponse::at(&session, now)))
}

/// Finish an entry: close any open session, mark the entry completed, and
/// stage its range into the pending vault entry for the surah.
#[utoipa::path(
    post,
    path = "/memorizations/{entry_id}/finish",
    params(("entry_id" = Uuid, Path, description = "The memorization entry")),
    request_body = FinishRequest,
    responses(
        (status = 200, description = "Entry finished and staged", body = FinishResponse),
        (status = 400, description = "Invalid confidence level"),
        (status = 404, description = "No such entry"),
        (status = 409, description = "Entry is already finished")
    )
)]
pub async fn finish_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(entry_id): Path<Uuid>,
    Json(req): Json<FinishRequest>,
) -> Result<impl IntoResponse, Rejection> {
    validate_rating(req.confidence_level)?;
    let mut entry = owned_entry(&state, user_id, entry_id).await?;
    if entry.status != EntryStatus::InProgress {
        return Err((
            StatusCode::CONFLICT,
            "memorization is already finished".to_string(),
        ));
    }

    let now = Utc::now();
    if let Some(mut session) = state
        .store
        .find_open_session(entry.id, SessionKind::Ziyadah, None)
        .await
        .map_err(port_rejection)?
    {
        session.force_complete(now);
        state
            .store
            .update_session(&session)
            .await
            .map_err(port_rejection)?;
    }

    let completed_sessions = state
        .store
        .count_completed_sessions(entry.id, SessionKind::Ziyadah, None)
        .await
        .map_err(port_rejection)?;

    entry.status = EntryStatus::Completed;
    entry.date_completed = Some(now);
    entry.confidence_level = Some(req.confidence_level);
    entry.notes = req.notes;
    entry.total_sessions_completed = completed_sessions;
    entry.total_time_minutes = completed_sessions * ZIYADAH_SESSION_MINUTES;
    state.store.update_entry(&entry).await.map_err(port_rejection)?;

    // Stage the finished range for reviewer confirmation, widening the
    // surah's pending envelope if one exists.
    let vault = match state
        .store
        .find_pending_vault_entry(user_id, entry.surah_number)
        .await
        .map_err(port_rejection)?
    {
        Some(mut vault) => {
            vault.stage(entry.range, now);
            state
                .store
                .update_vault_entry(&vault)
                .await
                .map_err(port_rejection)?;
            vault
        }
        None => {
            let vault = VaultEntry {
                id: Uuid::new_v4(),
                user_id,
                surah_number: entry.surah_number,
                verses: vec![RangeAddition {
                    range: entry.range,
                    date_added: now,
                }],
                consolidated: entry.range,
                status: VaultStatus::Pending,
                verification: None,
                created_at: now,
            };
            state
                .store
                .insert_vault_entry(&vault)
                .await
                .map_err(port_rejection)?;
            vault
        }
    };

    Ok(Json(FinishResponse {
        entry: entry.into(),
        vault: vault.into(),
    }))
}

/// All finished entries, newest first.
#[utoipa::path(
    get,
    path = "/memorizations/completed",
    responses(
        (status = 200, description = "Finished entries", body = [EntryResponse])
    )
)]
pub async fn completed_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, Rejection> {
    let entries = state
        .store
        .list_completed_entries(user_id)
        .await
        .map_err(port_rejection)?;
    let entries: Vec<EntryResponse> = entries.into_iter().map(Into::into).collect();
    Ok(Json(entries))
}

/// How many entries the user has finished.
#[utoipa::path(
    get,
    path = "/memorizations/completed/count",
    responses(
        (status = 200, description = "Finished entry count", body = CountResponse)
    )
)]
pub async fn completed_count_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, Rejection> {
    let count = state
        .store
        .count_completed_entries(user_id)
        .await
        .map_err(port_rejection)?;
    Ok(Json(CountResponse { count }))
}

/// Entries started today.
#[utoipa::path(
    get,
    path = "/memorizations/today",
    responses(
        (status = 200, description = "Entries started today", body = [EntryResponse])
    )
)]
pub async fn today_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, Rejection> {
    let entries = state
        .store
        .list_entries_started_since(user_id, day_start(Utc::now()))
        .await
        .map_err(port_rejection)?;
    let entries: Vec<EntryResponse> = entries.into_iter().map(Into::into).collect();
    Ok(Json(entries))
}
