//! services/api/src/web/memorized.rs
//!
//! The memorized-content ledger: direct additions of previously verified
//! content and the grouped listings.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::common::{apply_ledger_plan, domain_rejection, port_rejection, Rejection};
use crate::web::state::AppState;
use crate::web::types::{JuzGroupResponse, LedgerResponse, SurahGroupResponse};
use tahfiz_core::ledger::{consolidation_plan, full_juz_plan, group_by_juz, group_by_surah};
use tahfiz_core::quran::{Surah, VerseRange};

/// Seed rating for content the user vouches for directly.
const DIRECT_ADD_RATING: u8 = 5;

#[derive(Deserialize, ToSchema)]
pub struct AddSurahRequest {
    pub surah_number: u16,
    pub from_verse: u16,
    pub to_verse: u16,
}

#[derive(Deserialize, ToSchema)]
pub struct AddJuzRequest {
    pub juz_number: u8,
}

#[derive(Serialize, ToSchema)]
pub struct GroupedLedgerResponse {
    pub by_surah: Vec<SurahGroupResponse>,
    pub by_juz: Vec<JuzGroupResponse>,
}

/// Add previously memorized verses of one surah straight to the ledger.
#[utoipa::path(
    post,
    path = "/memorized/surah",
    request_body = AddSurahRequest,
    responses(
        (status = 201, description = "Ledger records written", body = [LedgerResponse]),
        (status = 400, description = "Invalid surah or verse range")
    )
)]
pub async fn add_surah_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<AddSurahRequest>,
) -> Result<impl IntoResponse, Rejection> {
    let surah = Surah::get(req.surah_number).map_err(domain_rejection)?;
    let range = VerseRange::new(surah, req.from_verse, req.to_verse).map_err(domain_rejection)?;

    let plan = consolidation_plan(req.surah_number, range).map_err(domain_rejection)?;
    let ledger = apply_ledger_plan(
        &state.store,
        user_id,
        &plan,
        Some(DIRECT_ADD_RATING),
        Utc::now(),
    )
    .await?;

    let ledger: Vec<LedgerResponse> = ledger.into_iter().map(Into::into).collect();
    Ok((StatusCode::CREATED, Json(ledger)))
}

/// Add a whole previously memorized juz straight to the ledger.
#[utoipa::path(
    post,
    path = "/memorized/juz",
    request_body = AddJuzRequest,
    responses(
        (status = 201, description = "Ledger records written", body = [LedgerResponse]),
        (status = 400, description = "Invalid juz number")
    )
)]
pub async fn add_juz_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<AddJuzRequest>,
) -> Result<impl IntoResponse, Rejection> {
    let plan = full_juz_plan(req.juz_number).map_err(domain_rejection)?;
    let ledger = apply_ledger_plan(
        &state.store,
        user_id,
        &plan,
        Some(DIRECT_ADD_RATING),
        Utc::now(),
    )
    .await?;

    let ledger: Vec<LedgerResponse> = ledger.into_iter().map(Into::into).collect();
    Ok((StatusCode::CREATED, Json(ledger)))
}

/// The whole ledger, grouped both by surah and by juz.
#[utoipa::path(
    get,
    path = "/memorized",
    responses(
        (status = 200, description = "Grouped ledger", body = GroupedLedgerResponse)
    )
)]
pub async fn list_memorized_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, Rejection> {
    let entries = state
        .store
        .list_ledger_entries(user_id)
        .await
        .map_err(port_rejection)?;
    Ok(Json(GroupedLedgerResponse {
        by_surah: group_by_surah(&entries).into_iter().map(Into::into).collect(),
        by_juz: group_by_juz(&entries).into_iter().map(Into::into).collect(),
    }))
}

/// The ledger grouped by surah.
#[utoipa::path(
    get,
    path = "/memorized/by-surah",
    responses(
        (status = 200, description = "Surah groups", body = [SurahGroupResponse])
    )
)]
pub async fn list_by_surah_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, Rejection> {
    let entries = state
        .store
        .list_ledger_entries(user_id)
        .await
        .map_err(port_rejection)?;
    let groups: Vec<SurahGroupResponse> = group_by_surah(&entries)
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(groups))
}

/// The ledger grouped by juz, nesting surahs.
#[utoipa::path(
    get,
    path = "/memorized/by-juz",
    responses(
        (status = 200, description = "Juz groups", body = [JuzGroupResponse])
    )
)]
pub async fn list_by_juz_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, Rejection> {
    let entries = state
        .store
        .list_ledger_entries(user_id)
        .await
        .map_err(port_rejection)?;
    let groups: Vec<JuzGroupResponse> = group_by_juz(&entries)
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(groups))
}
