//! User directory: profiles, profile updates and map positions

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{is_unique_violation, AppError, AppResult};
use crate::services::storage::{StorageService, AVATARS_DIR};
use shared::models::{display_name, CollectionPoint, CollectionPointType, Role, UserProfile};
use shared::validation::{
    is_http_url, parse_image_data_url, validate_togo_phone, AVATAR_EXTENSIONS,
};

/// Columns selected for every `UserRow` query
pub const USER_COLUMNS: &str = "id, phone, name, role, neighborhood, avatar, rating, \
     review_count, badges, wallet, company_name, responsible_name, location_lat, location_lng";

/// User row from database
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub phone: String,
    pub name: String,
    pub role: String,
    pub neighborhood: String,
    pub avatar: Option<String>,
    pub rating: Option<Decimal>,
    pub review_count: i32,
    pub badges: Json<Vec<String>>,
    pub wallet: Decimal,
    pub company_name: Option<String>,
    pub responsible_name: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
}

impl UserRow {
    pub fn role(&self) -> AppResult<Role> {
        Role::parse(&self.role)
            .ok_or_else(|| AppError::Internal(format!("Unknown role stored: {}", self.role)))
    }

    pub fn into_profile(self) -> AppResult<UserProfile> {
        let role = self.role()?;
        Ok(UserProfile {
            id: self.id,
            phone: self.phone,
            name: self.name,
            role,
            neighborhood: self.neighborhood,
            avatar: self.avatar,
            rating: self.rating,
            review_count: self.review_count,
            badges: self.badges.0,
            wallet: self.wallet,
            company_name: self.company_name,
            responsible_name: self.responsible_name,
        })
    }

    /// Map marker for business accounts that published a position
    pub fn into_collection_point(self) -> AppResult<Option<CollectionPoint>> {
        let role = self.role()?;
        let (Some(lat), Some(lng)) = (self.location_lat, self.location_lng) else {
            return Ok(None);
        };

        Ok(Some(CollectionPoint {
            id: self.id,
            name: display_name(&self.name, self.company_name.as_deref()).to_string(),
            lat,
            lng,
            point_type: CollectionPointType::from(role),
            neighborhood: self.neighborhood,
            avatar: self.avatar,
            phone: self.phone,
            rating: self.rating,
        }))
    }
}

/// Profile update. Clients send either camelCase or snake_case names.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 255, message = "The name field is required"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub neighborhood: Option<String>,
    #[serde(default, alias = "companyName")]
    #[validate(length(max = 255))]
    pub company_name: Option<String>,
    #[serde(default, alias = "responsibleName")]
    #[validate(length(max = 255))]
    pub responsible_name: Option<String>,
    pub avatar: Option<String>,
}

/// User service
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_row(&self, user_id: Uuid) -> AppResult<UserRow> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&query)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    /// Current user resource
    pub async fn get_profile(&self, user_id: Uuid) -> AppResult<UserProfile> {
        self.find_row(user_id).await?.into_profile()
    }

    /// Name shown to counterparts: company name for businesses, else the person's name
    pub async fn get_display_name(&self, user_id: Uuid) -> AppResult<String> {
        let row = sqlx::query_as::<_, (String, Option<String>)>(
            "SELECT name, company_name FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        Ok(display_name(&row.0, row.1.as_deref()).to_string())
    }

    /// Update the editable profile fields, storing an inline avatar if one is sent
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        input: UpdateProfileInput,
        storage: &StorageService,
    ) -> AppResult<UserProfile> {
        input.validate()?;

        let phone = match input.phone.as_deref().map(str::trim) {
            Some(phone) => {
                validate_togo_phone(phone)?;
                let taken = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS (SELECT 1 FROM users WHERE phone = $1 AND id <> $2)",
                )
                .bind(phone)
                .bind(user_id)
                .fetch_one(&self.db)
                .await?;
                if taken {
                    return Err(phone_taken());
                }
                Some(phone.to_string())
            }
            None => None,
        };

        let avatar = match input.avatar.as_deref() {
            Some(value) => Some(self.resolve_avatar(user_id, value, storage).await?),
            None => None,
        };

        let query = format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                neighborhood = COALESCE($4, neighborhood),
                company_name = COALESCE($5, company_name),
                responsible_name = COALESCE($6, responsible_name),
                avatar = COALESCE($7, avatar),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(user_id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(&phone)
            .bind(&input.neighborhood)
            .bind(&input.company_name)
            .bind(&input.responsible_name)
            .bind(&avatar)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    phone_taken()
                } else {
                    AppError::DatabaseError(e)
                }
            })?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        tracing::info!("Profile updated for user {}", user_id);
        row.into_profile()
    }

    /// Turn an avatar value into a stored URL.
    ///
    /// Data URLs are decoded and written to storage, absolute URLs are kept.
    async fn resolve_avatar(
        &self,
        user_id: Uuid,
        value: &str,
        storage: &StorageService,
    ) -> AppResult<String> {
        if let Some((ext, payload)) = parse_image_data_url(value) {
            if !AVATAR_EXTENSIONS.contains(&ext.as_str()) {
                return Err(AppError::validation(
                    "avatar",
                    "Unsupported image format",
                    "Format d'image non pris en charge",
                ));
            }

            let bytes = STANDARD.decode(payload).map_err(|_| {
                AppError::validation("avatar", "Invalid image data", "Données d'image invalides")
            })?;

            if bytes.len() > storage.image_max_bytes() {
                return Err(AppError::validation(
                    "avatar",
                    "The avatar may not be greater than 2 MB",
                    "L'avatar ne doit pas dépasser 2 Mo",
                ));
            }

            let filename = format!("user_{}_{}.{}", user_id, chrono::Utc::now().timestamp(), ext);
            let stored = storage.store_named(AVATARS_DIR, &filename, &bytes).await?;
            return Ok(stored.url);
        }

        if is_http_url(value) {
            return Ok(value.to_string());
        }

        Err(AppError::validation(
            "avatar",
            "The avatar must be an image or a URL",
            "L'avatar doit être une image ou une URL",
        ))
    }

    /// Collectors and recyclers with a known GPS position
    pub async fn collection_points(&self) -> AppResult<Vec<CollectionPoint>> {
        let query = format!(
            r#"
            SELECT {}
            FROM users
            WHERE role IN ('collector', 'recycler')
              AND location_lat IS NOT NULL
              AND location_lng IS NOT NULL
            ORDER BY name
            "#,
            USER_COLUMNS
        );

        let rows = sqlx::query_as::<_, UserRow>(&query)
            .fetch_all(&self.db)
            .await?;

        let mut points = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(point) = row.into_collection_point()? {
                points.push(point);
            }
        }
        Ok(points)
    }
}

pub(crate) fn phone_taken() -> AppError {
    AppError::validation(
        "phone",
        "The phone has already been taken.",
        "Ce numéro de téléphone est déjà utilisé.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: &str, lat: Option<f64>) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            phone: "90123456".to_string(),
            name: "Kossi".to_string(),
            role: role.to_string(),
            neighborhood: "Bè".to_string(),
            avatar: None,
            rating: None,
            review_count: 0,
            badges: Json(vec!["Ponctuel".to_string()]),
            wallet: Decimal::ZERO,
            company_name: Some("Lomé Recyclage".to_string()),
            responsible_name: None,
            location_lat: lat,
            location_lng: Some(1.22),
        }
    }

    #[test]
    fn test_row_into_profile() {
        let profile = row("collector", None).into_profile().unwrap();
        assert_eq!(profile.role, Role::Collector);
        assert_eq!(profile.badges, vec!["Ponctuel".to_string()]);
    }

    #[test]
    fn test_unknown_role_is_internal_error() {
        assert!(matches!(
            row("admin", None).into_profile(),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn test_collection_point_requires_position() {
        assert!(row("recycler", None).into_collection_point().unwrap().is_none());

        let point = row("recycler", Some(6.13)).into_collection_point().unwrap().unwrap();
        assert_eq!(point.point_type, CollectionPointType::Recycler);
        assert_eq!(point.name, "Lomé Recyclage");
    }

    #[test]
    fn test_profile_input_accepts_both_casings() {
        let camel: UpdateProfileInput =
            serde_json::from_str(r#"{"companyName":"Eco","responsibleName":"Yao"}"#).unwrap();
        let snake: UpdateProfileInput =
            serde_json::from_str(r#"{"company_name":"Eco","responsible_name":"Yao"}"#).unwrap();
        assert_eq!(camel.company_name, snake.company_name);
        assert_eq!(camel.responsible_name.as_deref(), Some("Yao"));
    }
}
