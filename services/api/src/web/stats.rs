//! services/api/src/web/stats.rs
//!
//! Study-time statistics: per-period totals and calendar breakdowns of
//! completed session minutes, split by session kind.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::web::common::{port_rejection, Rejection};
use crate::web::state::AppState;
use crate::web::types::{BreakdownResponse, StatsResponse};
use tahfiz_core::domain::SessionKind;
use tahfiz_core::stats::{bucket_sessions, period_range, sum_by_kind, Period, SessionStat};

#[derive(Deserialize, IntoParams)]
pub struct StatsQuery {
    /// One of `daily`, `weekly`, `monthly`. Defaults to `daily`.
    pub period: Option<String>,
    /// Reference date (YYYY-MM-DD). Defaults to today.
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams)]
pub struct BreakdownQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

fn parse_period(label: &str) -> Result<Period, Rejection> {
    match label {
        "daily" => Ok(Period::Daily),
        "weekly" => Ok(Period::Weekly),
        "monthly" => Ok(Period::Monthly),
        other => Err((
            StatusCode::BAD_REQUEST,
            format!("unknown period '{other}'"),
        )),
    }
}

fn utc_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|d| d.and_utc())
        .unwrap_or_else(Utc::now)
}

/// Completed sessions of all three kinds within `[start, end)`.
async fn collect_stats(
    state: &AppState,
    user_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<SessionStat>, Rejection> {
    let mut stats = Vec::new();
    for kind in [
        SessionKind::Ziyadah,
        SessionKind::Revision,
        SessionKind::Murajaah,
    ] {
        let sessions = state
            .store
            .list_completed_sessions_between(user_id, kind, start, end)
            .await
            .map_err(port_rejection)?;
        stats.extend(sessions.iter().map(|s| SessionStat {
            kind,
            start_local: s.start_time.naive_utc(),
            minutes: i64::from(s.duration_minutes),
        }));
    }
    Ok(stats)
}

/// Total study minutes per kind for the period containing the reference
/// date.
#[utoipa::path(
    get,
    path = "/stats",
    params(StatsQuery),
    responses(
        (status = 200, description = "Per-kind totals for the period", body = StatsResponse),
        (status = 400, description = "Unknown period")
    )
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, Rejection> {
    let label = query.period.unwrap_or_else(|| "daily".to_string());
    let period = parse_period(&label)?;
    let reference = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let (start, end) = period_range(period, reference);

    let sessions =
        collect_stats(&state, user_id, utc_midnight(start), utc_midnight(end)).await?;
    let totals = sum_by_kind(&sessions);

    Ok(Json(StatsResponse::new(&label, start, end, totals)))
}

async fn breakdown(
    state: &AppState,
    user_id: Uuid,
    period: Period,
    label: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Json<BreakdownResponse>, Rejection> {
    // `end` is inclusive in the API, so query up to the following midnight.
    let sessions = collect_stats(
        state,
        user_id,
        utc_midnight(start),
        utc_midnight(end + Days::new(1)),
    )
    .await?;
    Ok(Json(BreakdownResponse {
        granularity: label.to_string(),
        start_date: start,
        end_date: end,
        buckets: bucket_sessions(&sessions, period)
            .into_iter()
            .map(Into::into)
            .collect(),
    }))
}

/// Day-by-day minutes; defaults to the last 7 days.
#[utoipa::path(
    get,
    path = "/stats/daily-breakdown",
    params(BreakdownQuery),
    responses(
        (status = 200, description = "Daily buckets", body = BreakdownResponse)
    )
)]
pub async fn daily_breakdown_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<BreakdownQuery>,
) -> Result<impl IntoResponse, Rejection> {
    let end = query.end_date.unwrap_or_else(|| Utc::now().date_naive());
    let start = query.start_date.unwrap_or(end - Days::new(6));
    breakdown(&state, user_id, Period::Daily, "daily", start, end).await
}

/// Week-by-week minutes; defaults to the last 4 weeks.
#[utoipa::path(
    get,
    path = "/stats/weekly-breakdown",
    params(BreakdownQuery),
    responses(
        (status = 200, description = "Weekly buckets", body = BreakdownResponse)
    )
)]
pub async fn weekly_breakdown_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<BreakdownQuery>,
) -> Result<impl IntoResponse, Rejection> {
    let end = query.end_date.unwrap_or_else(|| Utc::now().date_naive());
    let start = query.start_date.unwrap_or(end - Days::new(27));
    breakdown(&state, user_id, Period::Weekly, "weekly", start, end).await
}

/// Month-by-month minutes; defaults to the last 3 calendar months.
#[utoipa::path(
    get,
    path = "/stats/monthly-breakdown",
    params(BreakdownQuery),
    responses(
        (status = 200, description = "Monthly buckets", body = BreakdownResponse)
    )
)]
pub async fn monthly_breakdown_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<BreakdownQuery>,
) -> Result<impl IntoResponse, Rejection> {
    let end = query.end_date.unwrap_or_else(|| Utc::now().date_naive());
    let start = query.start_date.unwrap_or_else(|| {
        let back = end.checked_sub_months(Months::new(2)).unwrap_or(end);
        back.with_day0(0).unwrap_or(back)
    });
    breakdown(&state, user_id, Period::Monthly, "monthly", start, end).await
}
