//! Reference data handlers (public)

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::services::{ReferenceService, UserService};
use crate::AppState;
use shared::models::{CollectionPoint, WasteType, NEIGHBORHOODS};

pub async fn waste_types(State(state): State<AppState>) -> AppResult<Json<Vec<WasteType>>> {
    let service = ReferenceService::new(state.db.clone());
    Ok(Json(service.waste_types().await?))
}

pub async fn neighborhoods() -> Json<Vec<&'static str>> {
    Json(NEIGHBORHOODS.to_vec())
}

/// Collectors and recyclers that have a GPS position
pub async fn collection_points(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CollectionPoint>>> {
    let service = UserService::new(state.db.clone());
    Ok(Json(service.collection_points().await?))
}
