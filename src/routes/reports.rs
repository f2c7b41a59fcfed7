// Report routes: dashboard aggregates over the caller's bets

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app_state::SharedState;
use crate::auth::OwnerId;
use crate::error::ApiError;
use crate::query::{Page, DASHBOARD_PAGE_SIZE};
use crate::summary::{
    balance_curve, daily_summary, house_breakdown, monthly_summary, recent_bets, window_summary,
    MAX_WINDOW_DAYS,
};

#[derive(Debug, Default, Deserialize)]
pub struct WindowParams {
    /// Overrides the configured window length.
    pub days: Option<u32>,
}

/// GET /reports/daily
pub async fn daily(State(state): State<SharedState>, owner: OwnerId) -> Result<Json<Value>, ApiError> {
    let bets = state.owner_bets(owner.as_str()).await?;
    Ok(Json(json!({ "success": true, "days": daily_summary(&bets, &state.tz) })))
}

/// GET /reports/monthly
pub async fn monthly(State(state): State<SharedState>, owner: OwnerId) -> Result<Json<Value>, ApiError> {
    let bets = state.owner_bets(owner.as_str()).await?;
    Ok(Json(json!({ "success": true, "months": monthly_summary(&bets, &state.tz) })))
}

/// GET /reports/summary?days=
pub async fn summary(
    State(state): State<SharedState>,
    owner: OwnerId,
    Query(params): Query<WindowParams>,
) -> Result<Json<Value>, ApiError> {
    let bets = state.owner_bets(owner.as_str()).await?;
    let days = params.days.unwrap_or(state.config.summary_window_days).clamp(1, MAX_WINDOW_DAYS);
    let summary = window_summary(&bets, &state.tz, state.today(), days);
    Ok(Json(json!({ "success": true, "summary": summary })))
}

/// GET /reports/balance?days=
pub async fn balance(
    State(state): State<SharedState>,
    owner: OwnerId,
    Query(params): Query<WindowParams>,
) -> Result<Json<Value>, ApiError> {
    let bets = state.owner_bets(owner.as_str()).await?;
    let days = params.days.unwrap_or(state.config.summary_window_days).clamp(1, MAX_WINDOW_DAYS);
    let points = balance_curve(&bets, &state.tz, state.today(), days);
    Ok(Json(json!({ "success": true, "days": days, "points": points })))
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentParams {
    pub today_page: Option<usize>,
    pub month_page: Option<usize>,
    pub last_30_page: Option<usize>,
}

/// GET /reports/recent
/// Each table is paged independently, 10 rows per page.
pub async fn recent(
    State(state): State<SharedState>,
    owner: OwnerId,
    Query(params): Query<RecentParams>,
) -> Result<Json<Value>, ApiError> {
    let bets = state.owner_bets(owner.as_str()).await?;
    let recent = recent_bets(&bets, &state.tz, state.today());

    let today = Page::slice(recent.today, params.today_page.unwrap_or(0), DASHBOARD_PAGE_SIZE);
    let month = Page::slice(recent.current_month, params.month_page.unwrap_or(0), DASHBOARD_PAGE_SIZE);
    let last_30 = Page::slice(recent.last_30_days, params.last_30_page.unwrap_or(0), DASHBOARD_PAGE_SIZE);

    Ok(Json(json!({
        "success": true,
        "today": { "page_count": today.page_count(), "page": today },
        "current_month": { "page_count": month.page_count(), "page": month },
        "last_30_days": { "page_count": last_30.page_count(), "page": last_30 },
    })))
}

/// GET /reports/houses
pub async fn houses(State(state): State<SharedState>, owner: OwnerId) -> Result<Json<Value>, ApiError> {
    let bets = state.owner_bets(owner.as_str()).await?;
    Ok(Json(json!({ "success": true, "houses": house_breakdown(&bets) })))
}
