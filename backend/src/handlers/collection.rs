//! Collection handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::json::AppJson;
use crate::middleware::CurrentUser;
use crate::services::collection::{CreateCollectionInput, UpdateCollectionInput};
use crate::services::CollectionService;
use crate::AppState;
use shared::models::Collection;

/// Collections where the user is citizen or collector
pub async fn list_collections(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Collection>>> {
    let service = CollectionService::new(state.db.clone());
    Ok(Json(service.list_for_user(user.user_id).await?))
}

pub async fn citizen_collections(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Collection>>> {
    let service = CollectionService::new(state.db.clone());
    Ok(Json(service.list_for_citizen(user.user_id).await?))
}

/// Collector inbox: assigned active jobs plus open requests
pub async fn collector_collections(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Collection>>> {
    let service = CollectionService::new(state.db.clone());
    Ok(Json(service.list_for_collector(user.user_id).await?))
}

pub async fn collector_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Collection>>> {
    let service = CollectionService::new(state.db.clone());
    Ok(Json(service.collector_history(user.user_id).await?))
}

pub async fn create_collection(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(body): AppJson<CreateCollectionInput>,
) -> AppResult<(StatusCode, Json<Collection>)> {
    let service = CollectionService::new(state.db.clone());
    let collection = service.create(&user.actor(), body).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

pub async fn update_collection(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(collection_id): Path<Uuid>,
    AppJson(body): AppJson<UpdateCollectionInput>,
) -> AppResult<Json<Collection>> {
    let service = CollectionService::new(state.db.clone());
    let collection = service
        .update_status(&user.actor(), collection_id, body)
        .await?;
    Ok(Json(collection))
}

pub async fn accept_collection(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(collection_id): Path<Uuid>,
) -> AppResult<Json<Collection>> {
    let service = CollectionService::new(state.db.clone());
    Ok(Json(service.accept(&user.actor(), collection_id).await?))
}

pub async fn reject_collection(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(collection_id): Path<Uuid>,
) -> AppResult<Json<Collection>> {
    let service = CollectionService::new(state.db.clone());
    Ok(Json(service.reject(&user.actor(), collection_id).await?))
}

pub async fn start_collection(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(collection_id): Path<Uuid>,
) -> AppResult<Json<Collection>> {
    let service = CollectionService::new(state.db.clone());
    Ok(Json(service.start(&user.actor(), collection_id).await?))
}
