//! Authentication middleware
//!
//! Bearer token validation and the `CurrentUser` extractor

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::AuthService;
use crate::AppState;
use shared::models::{Actor, Role};

/// Authenticated user information extracted from the token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
    /// Token id, needed to revoke the token on logout
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

/// Authentication middleware that validates bearer tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string);

    match authenticate(&state, token).await {
        Ok(auth_user) => {
            request.extensions_mut().insert(auth_user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

async fn authenticate(state: &AppState, token: Option<String>) -> Result<AuthUser, AppError> {
    let token = token.ok_or_else(|| AppError::Unauthenticated("Unauthenticated.".to_string()))?;

    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let claims = auth_service.validate_token(&token)?;

    if auth_service.is_revoked(&claims.jti).await? {
        tracing::debug!("Rejected revoked token for user {}", claims.sub);
        return Err(AppError::InvalidToken);
    }

    Ok(AuthUser {
        user_id: claims.user_id()?,
        role: claims.role()?,
        expires_at: claims.expires_at(),
        jti: claims.jti,
    })
}

/// Token part of an `Authorization: Bearer <token>` header
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthenticated("Authentication required".to_string()))
    }
}
