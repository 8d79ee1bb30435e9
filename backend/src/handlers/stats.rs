//! Statistics handlers

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::StatsService;
use crate::AppState;
use shared::models::{DashboardStats, GlobalStats};

/// Platform-wide totals, served from the in-process cache
pub async fn global_stats(State(state): State<AppState>) -> AppResult<Json<GlobalStats>> {
    let service = StatsService::new(state.db.clone());
    Ok(Json(service.global(&state.stats_cache).await?))
}

/// Role-specific dashboard for the current user
pub async fn dashboard_stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<DashboardStats>> {
    let service = StatsService::new(state.db.clone());
    Ok(Json(service.dashboard(&user.actor()).await?))
}
