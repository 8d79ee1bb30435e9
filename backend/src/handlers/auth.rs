//! Authentication and profile handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::error::AppResult;
use crate::handlers::json::AppJson;
use crate::middleware::CurrentUser;
use crate::services::auth::{AuthResponse, LoginInput, RegisterInput};
use crate::services::user::UpdateProfileInput;
use crate::services::{AuthService, UserService};
use crate::AppState;
use shared::models::UserProfile;

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

/// Register endpoint handler
pub async fn register(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegisterInput>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let response = auth_service.register(body).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginInput>,
) -> AppResult<Json<AuthResponse>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let response = auth_service.login(body).await?;
    Ok(Json(response))
}

/// Revoke the token used for this request
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<MessageResponse>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    auth_service.logout(&user.jti, user.expires_at).await?;
    tracing::info!("User {} logged out", user.user_id);
    Ok(MessageResponse::new("Logged out successfully"))
}

/// Current user resource
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<UserProfile>> {
    let profile = UserService::new(state.db.clone())
        .get_profile(user.user_id)
        .await?;
    Ok(Json(profile))
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub message: String,
    pub user: UserProfile,
}

/// Update the current user's profile
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(body): AppJson<UpdateProfileInput>,
) -> AppResult<Json<ProfileResponse>> {
    let profile = UserService::new(state.db.clone())
        .update_profile(user.user_id, body, &state.storage)
        .await?;

    Ok(Json(ProfileResponse {
        message: "Profile updated successfully".to_string(),
        user: profile,
    }))
}
