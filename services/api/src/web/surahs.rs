//! services/api/src/web/surahs.rs
//!
//! Read-only reference endpoints over the static surah table.

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Json},
};

use crate::web::types::SurahResponse;
use tahfiz_core::quran::{Surah, SURAHS};

/// List all 114 surahs.
#[utoipa::path(
    get,
    path = "/surahs",
    responses(
        (status = 200, description = "The full surah table", body = [SurahResponse])
    )
)]
pub async fn list_surahs_handler() -> impl IntoResponse {
    let surahs: Vec<SurahResponse> = SURAHS.iter().map(Into::into).collect();
    Json(surahs)
}

/// Look up one surah by its 1-based number.
#[utoipa::path(
    get,
    path = "/surahs/{number}",
    params(("number" = u16, Path, description = "Surah number, 1 through 114")),
    responses(
        (status = 200, description = "The surah", body = SurahResponse),
        (status = 404, description = "No such surah")
    )
)]
pub async fn get_surah_handler(
    Path(number): Path<u16>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let surah = Surah::by_number(number)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no surah {number}")))?;
    Ok(Json(SurahResponse::from(surah)))
}
