//! Authentication service for registration, login and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::error::{is_unique_violation, AppError, AppResult};
use crate::services::user::{phone_taken, UserRow, USER_COLUMNS};
use shared::models::{Role, UserProfile};
use shared::validation::{validate_password, validate_togo_phone};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
}

/// Input for creating an account
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 32, message = "The phone field is required"))]
    pub phone: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 255, message = "The name field is required"))]
    pub name: String,
    pub role: String,
    #[validate(length(min = 1, max = 255, message = "The neighborhood field is required"))]
    pub neighborhood: String,
    #[serde(default, alias = "companyName")]
    #[validate(length(max = 255))]
    pub company_name: Option<String>,
    #[serde(default, alias = "responsibleName")]
    #[validate(length(max = 255))]
    pub responsible_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(length(min = 1, message = "The phone field is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "The password field is required"))]
    pub password: String,
}

/// Profile plus bearer token, returned by register and login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub role: String,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
        }
    }

    /// Create an account and sign it in
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthResponse> {
        input.validate()?;
        validate_togo_phone(&input.phone)?;
        validate_password(&input.password)?;

        let role = Role::parse(&input.role).ok_or_else(|| {
            AppError::validation("role", "The selected role is invalid", "Le rôle choisi est invalide")
        })?;

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let query = format!(
            r#"
            INSERT INTO users (phone, password_hash, name, role, neighborhood, company_name, responsible_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, UserRow>(&query)
            .bind(input.phone.trim())
            .bind(&password_hash)
            .bind(input.name.trim())
            .bind(role.as_str())
            .bind(&input.neighborhood)
            .bind(&input.company_name)
            .bind(&input.responsible_name)
            .fetch_one(&self.db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    phone_taken()
                } else {
                    AppError::DatabaseError(e)
                }
            })?;

        tracing::info!("Registered {} account {}", role.as_str(), user.id);

        let token = self.generate_token(user.id, role)?;
        Ok(AuthResponse {
            user: user.into_profile()?,
            token,
        })
    }

    /// Authenticate with phone and password
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthResponse> {
        input.validate()?;

        let query = format!(
            "SELECT {}, password_hash FROM users WHERE phone = $1",
            USER_COLUMNS
        );

        let row = sqlx::query_as::<_, CredentialRow>(&query)
            .bind(input.phone.trim())
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let valid = verify(&input.password, &row.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            tracing::warn!("Failed login for user {}", row.user.id);
            return Err(AppError::InvalidCredentials);
        }

        let profile = row.user.into_profile()?;
        let token = self.generate_token(profile.id, profile.role)?;

        Ok(AuthResponse {
            user: profile,
            token,
        })
    }

    /// Revoke the token identified by `jti` until it would have expired anyway
    pub async fn logout(&self, jti: &str, expires_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (jti_hash, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (jti_hash) DO NOTHING
            "#,
        )
        .bind(hash_jti(jti))
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        // Opportunistic cleanup of entries whose tokens have expired
        sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < NOW()")
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Whether a token id has been revoked by logout
    pub async fn is_revoked(&self, jti: &str) -> AppResult<bool> {
        let revoked = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE jti_hash = $1)",
        )
        .bind(hash_jti(jti))
        .fetch_one(&self.db)
        .await?;

        Ok(revoked)
    }

    /// Validate access token and return claims
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        decode_claims(token, &self.jwt_secret)
    }

    /// Issue a signed access token
    pub fn generate_token(&self, user_id: Uuid, role: Role) -> AppResult<String> {
        encode_claims(user_id, role, &self.jwt_secret, self.access_token_expiry)
    }
}

/// Credentials lookup: a profile row plus its password hash
#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Hex SHA-256 of a token id, as stored in revoked_tokens
pub fn hash_jti(jti: &str) -> String {
    hex::encode(Sha256::digest(jti.as_bytes()))
}

/// Sign claims for a user with a fresh token id
pub fn encode_claims(user_id: Uuid, role: Role, secret: &str, expiry_secs: i64) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        jti: Uuid::new_v4().to_string(),
        exp: (now + Duration::seconds(expiry_secs)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Decode and validate a token
pub fn decode_claims(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

impl Claims {
    pub fn user_id(&self) -> AppResult<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::InvalidToken)
    }

    pub fn role(&self) -> AppResult<Role> {
        Role::parse(&self.role).ok_or(AppError::InvalidToken)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}
