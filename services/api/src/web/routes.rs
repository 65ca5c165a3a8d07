//! services/api/src/web/routes.rs
//!
//! The router wiring for the whole HTTP surface and the master OpenAPI
//! definition.

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;
use crate::web::state::AppState;
use crate::web::{auth, memorization, memorized, middleware, murajaah, revision, stats, surahs, vault};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::surahs::list_surahs_handler,
        crate::web::surahs::get_surah_handler,
        crate::web::memorization::start_memorization_handler,
        crate::web::memorization::new_session_handler,
        crate::web::memorization::progress_handler,
        crate::web::memorization::pause_session_handler,
        crate::web::memorization::session_status_handler,
        crate::web::memorization::finish_handler,
        crate::web::memorization::completed_handler,
        crate::web::memorization::completed_count_handler,
        crate::web::memorization::today_handler,
        crate::web::revision::start_revision_handler,
        crate::web::revision::complete_revision_handler,
        crate::web::revision::pause_revision_handler,
        crate::web::revision::revision_status_handler,
        crate::web::vault::stage_handler,
        crate::web::vault::list_vault_handler,
        crate::web::vault::verify_handler,
        crate::web::memorized::add_surah_handler,
        crate::web::memorized::add_juz_handler,
        crate::web::memorized::list_memorized_handler,
        crate::web::memorized::list_by_surah_handler,
        crate::web::memorized::list_by_juz_handler,
        crate::web::murajaah::start_murajaah_handler,
        crate::web::murajaah::pause_murajaah_handler,
        crate::web::murajaah::murajaah_status_handler,
        crate::web::murajaah::complete_murajaah_handler,
        crate::web::stats::stats_handler,
        crate::web::stats::daily_breakdown_handler,
        crate::web::stats::weekly_breakdown_handler,
        crate::web::stats::monthly_breakdown_handler,
    ),
    components(schemas(
        crate::web::auth::SignupRequest,
        crate::web::auth::LoginRequest,
        crate::web::auth::AuthResponse,
        crate::web::types::SurahResponse,
        crate::web::types::RangeDto,
        crate::web::types::ReviewEventDto,
        crate::web::types::EntryResponse,
        crate::web::types::SessionResponse,
        crate::web::types::VaultVerseDto,
        crate::web::types::VerificationDto,
        crate::web::types::VaultResponse,
        crate::web::types::RevisionRecordDto,
        crate::web::types::LedgerResponse,
        crate::web::types::SurahGroupResponse,
        crate::web::types::JuzSurahGroupResponse,
        crate::web::types::JuzGroupResponse,
        crate::web::types::KindStatDto,
        crate::web::types::StatsResponse,
        crate::web::types::BucketDto,
        crate::web::types::BreakdownResponse,
        crate::web::memorization::StartMemorizationRequest,
        crate::web::memorization::StartMemorizationResponse,
        crate::web::memorization::ProgressResponse,
        crate::web::memorization::PauseResponse,
        crate::web::memorization::FinishRequest,
        crate::web::memorization::FinishResponse,
        crate::web::memorization::CountResponse,
        crate::web::revision::StartRevisionRequest,
        crate::web::revision::CompleteRevisionRequest,
        crate::web::vault::StageRequest,
        crate::web::vault::VerifyRequest,
        crate::web::vault::VerifyResponse,
        crate::web::memorized::AddSurahRequest,
        crate::web::memorized::AddJuzRequest,
        crate::web::memorized::GroupedLedgerResponse,
        crate::web::murajaah::MurajaahTarget,
        crate::web::murajaah::StartMurajaahRequest,
        crate::web::murajaah::CompleteMurajaahRequest,
        crate::web::murajaah::MurajaahResponse,
    )),
    tags(
        (name = "Tahfiz API", description = "Quran memorization tracking: timed study sessions, verified-content ledger, and study statistics.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router
//=========================================================================================

/// Builds the full application router around the shared state, including
/// CORS and the Swagger UI mount.
pub fn build_router(state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("invalid CORS origin: {e}")))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/surahs", get(surahs::list_surahs_handler))
        .route("/surahs/{number}", get(surahs::get_surah_handler))
        .route(
            "/memorizations",
            post(memorization::start_memorization_handler),
        )
        .route(
            "/memorizations/completed",
            get(memorization::completed_handler),
        )
        .route(
            "/memorizations/completed/count",
            get(memorization::completed_count_handler),
        )
        .route("/memorizations/today", get(memorization::today_handler))
        .route(
            "/memorizations/{entry_id}/sessions",
            post(memorization::new_session_handler),
        )
        .route(
            "/memorizations/{entry_id}/progress",
            get(memorization::progress_handler),
        )
        .route(
            "/memorizations/{entry_id}/finish",
            post(memorization::finish_handler),
        )
        .route(
            "/memorizations/{entry_id}/revisions",
            post(revision::start_revision_handler),
        )
        .route(
            "/sessions/{session_id}/pause",
            post(memorization::pause_session_handler),
        )
        .route(
            "/sessions/{session_id}/status",
            get(memorization::session_status_handler),
        )
        .route(
            "/revisions/{session_id}/complete",
            post(revision::complete_revision_handler),
        )
        .route(
            "/revisions/{session_id}/pause",
            post(revision::pause_revision_handler),
        )
        .route(
            "/revisions/{session_id}/status",
            get(revision::revision_status_handler),
        )
        .route(
            "/vault",
            get(vault::list_vault_handler).post(vault::stage_handler),
        )
        .route("/vault/{vault_id}/verify", post(vault::verify_handler))
        .route("/memorized", get(memorized::list_memorized_handler))
        .route("/memorized/surah", post(memorized::add_surah_handler))
        .route("/memorized/juz", post(memorized::add_juz_handler))
        .route("/memorized/by-surah", get(memorized::list_by_surah_handler))
        .route("/memorized/by-juz", get(memorized::list_by_juz_handler))
        .route("/murajaah", post(murajaah::start_murajaah_handler))
        .route(
            "/murajaah/{session_id}/pause",
            post(murajaah::pause_murajaah_handler),
        )
        .route(
            "/murajaah/{session_id}/status",
            get(murajaah::murajaah_status_handler),
        )
        .route(
            "/murajaah/{session_id}/complete",
            post(murajaah::complete_murajaah_handler),
        )
        .route("/stats", get(stats::stats_handler))
        .route(
            "/stats/daily-breakdown",
            get(stats::daily_breakdown_handler),
        )
        .route(
            "/stats/weekly-breakdown",
            get(stats::weekly_breakdown_handler),
        )
        .route(
            "/stats/monthly-breakdown",
            get(stats::monthly_breakdown_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(state);

    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
