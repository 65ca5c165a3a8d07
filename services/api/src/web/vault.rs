//! services/api/src/web/vault.rs
//!
//! The temporary vault: finished-but-unverified content staged per
//! (user, surah), waiting for a reviewer to confirm it into the ledger.

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
    apply_ledger_plan, domain_rejection, ensure_owner, port_rejection, validate_rating, Rejection,
};
use crate::web::state::AppState;
use crate::web::types::{LedgerResponse, VaultResponse};
use tahfiz_core::domain::{
    RangeAddition, ReviewerVerification, VaultEntry, VaultStatus,
};
use tahfiz_core::ledger::consolidation_plan;
use tahfiz_core::quran::{Surah, VerseRange};

#[derive(Deserialize, ToSchema)]
pub struct StageRequest {
    pub surah_number: u16,
    pub from_verse: u16,
    pub to_verse: u16,
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyRequest {
    pub rating: u8,
    pub notes: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct VerifyResponse {
    pub vault: VaultResponse,
    pub ledger: Vec<LedgerResponse>,
}

/// Stage a verse range directly into the vault.
#[utoipa::path(
    post,
    path = "/vault",
    request_body = StageRequest,
    responses(
        (status = 201, description = "Range staged", body = VaultResponse),
        (status = 400, description = "Invalid surah or verse range")
    )
)]
pub async fn stage_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<StageRequest>,
) -> Result<impl IntoResponse, Rejection> {
    let surah = Surah::get(req.surah_number).map_err(domain_rejection)?;
    let range = VerseRange::new(surah, req.from_verse, req.to_verse).map_err(domain_rejection)?;

    let now = Utc::now();
    let vault = match state
        .store
        .find_pending_vault_entry(user_id, req.surah_number)
        .await
        .map_err(port_rejection)?
    {
        Some(mut vault) => {
            vault.stage(range, now);
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
                surah_number: req.surah_number,
                verses: vec![RangeAddition {
                    range,
                    date_added: now,
                }],
                consolidated: range,
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

    Ok((StatusCode::CREATED, Json(VaultResponse::from(vault))))
}

/// The user's pending vault entries, sorted by surah.
#[utoipa::path(
    get,
    path = "/vault",
    responses(
        (status = 200, description = "Pending vault entries", body = [VaultResponse])
    )
)]
pub async fn list_vault_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, Rejection> {
    let mut entries = state
        .store
        .list_pending_vault_entries(user_id)
        .await
        .map_err(port_rejection)?;
    entries.sort_by_key(|e| e.surah_number);
    let entries: Vec<VaultResponse> = entries.into_iter().map(Into::into).collect();
    Ok(Json(entries))
}

/// Reviewer confirmation: folds the staged envelope into the ledger
/// (seeded with the reviewer's rating) and marks the vault entry verified.
#[utoipa::path(
    post,
    path = "/vault/{vault_id}/verify",
    params(("vault_id" = Uuid, Path, description = "The vault entry")),
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Content verified into the ledger", body = VerifyResponse),
        (status = 400, description = "Invalid rating"),
        (status = 404, description = "No such vault entry"),
        (status = 409, description = "Entry is already verified")
    )
)]
pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(vault_id): Path<Uuid>,
    Json(req): Json<VerifyRequest>,
) -> Result<impl IntoResponse, Rejection> {
    validate_rating(req.rating)?;

    let mut vault = state
        .store
        .get_vault_entry(vault_id)
        .await
        .map_err(port_rejection)?;
    ensure_owner(vault.user_id, user_id)?;
    if vault.status != VaultStatus::Pending {
        return Err((
            StatusCode::CONFLICT,
            "vault entry is already verified".to_string(),
        ));
    }

    let now = Utc::now();
    let plan =
        consolidation_plan(vault.surah_number, vault.consolidated).map_err(domain_rejection)?;
    let ledger =
        apply_ledger_plan(&state.store, user_id, &plan, Some(req.rating), now).await?;

    vault.status = VaultStatus::Verified;
    vault.verification = Some(ReviewerVerification {
        verified_by: user_id,
        date: now,
        rating: req.rating,
        notes: req.notes,
    });
    state
        .store
        .update_vault_entry(&vault)
        .await
        .map_err(port_rejection)?;

    Ok(Json(VerifyResponse {
        vault: vault.into(),
        ledger: ledger.into_iter().map(Into::into).collect(),
    }))
}
