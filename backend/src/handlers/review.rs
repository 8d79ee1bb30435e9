//! Review handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::error::AppResult;
use crate::handlers::json::AppJson;
use crate::middleware::CurrentUser;
use crate::services::review::CreateReviewInput;
use crate::services::ReviewService;
use crate::AppState;
use shared::models::Review;

pub async fn received_reviews(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Review>>> {
    let service = ReviewService::new(state.db.clone());
    Ok(Json(service.received(user.user_id).await?))
}

pub async fn given_reviews(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Review>>> {
    let service = ReviewService::new(state.db.clone());
    Ok(Json(service.given(user.user_id).await?))
}

pub async fn create_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(body): AppJson<CreateReviewInput>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let service = ReviewService::new(state.db.clone());
    let review = service.submit(user.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(review)))
}
