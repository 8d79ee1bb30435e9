//! Review service
//!
//! Reviews are append-only. Each submission recomputes the cached rating of
//! the reviewed user inside the same transaction.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::models::{
    ensure_not_self_review, normalize_badges, validate_rating, RatingSummary, Review,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewInput {
    #[serde(alias = "toUserId")]
    pub to_user_id: Uuid,
    pub rating: i32,
    #[serde(default)]
    pub badges: Option<Vec<String>>,
    #[serde(default)]
    #[validate(length(max = 1000, message = "The comment may not be greater than 1000 characters"))]
    pub comment: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    from_user_id: Uuid,
    from_user_name: Option<String>,
    to_user_id: Uuid,
    rating: i32,
    badges: Json<Vec<String>>,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id,
            from_user_id: row.from_user_id,
            from_user_name: row.from_user_name,
            to_user_id: row.to_user_id,
            rating: row.rating,
            badges: row.badges.0,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

/// Review service
#[derive(Clone)]
pub struct ReviewService {
    db: PgPool,
}

impl ReviewService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a review and refresh the target's rating summary
    pub async fn submit(&self, from_user_id: Uuid, input: CreateReviewInput) -> AppResult<Review> {
        input.validate()?;
        validate_rating(input.rating)?;
        ensure_not_self_review(from_user_id, input.to_user_id)?;

        let badges = normalize_badges(input.badges.unwrap_or_default());
        let comment = input
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let mut tx = self.db.begin().await?;

        // Lock the reviewed user so concurrent reviews recompute in sequence
        let target = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(input.to_user_id)
            .fetch_optional(&mut *tx)
            .await?;

        if target.is_none() {
            return Err(AppError::validation(
                "to_user_id",
                "The selected user does not exist",
                "L'utilisateur sélectionné n'existe pas",
            ));
        }

        let from_user_name = sqlx::query_scalar::<_, String>("SELECT name FROM users WHERE id = $1")
            .bind(from_user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        let row = sqlx::query_as::<_, ReviewRow>(
            r#"
            INSERT INTO reviews (from_user_id, from_user_name, to_user_id, rating, badges, comment)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, from_user_id, from_user_name, to_user_id, rating, badges, comment, created_at
            "#,
        )
        .bind(from_user_id)
        .bind(&from_user_name)
        .bind(input.to_user_id)
        .bind(input.rating)
        .bind(Json(&badges))
        .bind(&comment)
        .fetch_one(&mut *tx)
        .await?;

        let ratings = sqlx::query_scalar::<_, i32>("SELECT rating FROM reviews WHERE to_user_id = $1")
            .bind(input.to_user_id)
            .fetch_all(&mut *tx)
            .await?;

        let summary = RatingSummary::from_ratings(&ratings);

        sqlx::query(
            "UPDATE users SET rating = $2, review_count = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(input.to_user_id)
        .bind(summary.rating)
        .bind(summary.review_count)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Review {} from {} to {}: rating now {:?} over {} reviews",
            row.id,
            from_user_id,
            input.to_user_id,
            summary.rating,
            summary.review_count
        );

        Ok(row.into())
    }

    /// Reviews received by a user, newest first
    pub async fn received(&self, user_id: Uuid) -> AppResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT r.id, r.from_user_id, COALESCE(u.name, r.from_user_name) AS from_user_name,
                   r.to_user_id, r.rating, r.badges, r.comment, r.created_at
            FROM reviews r
            LEFT JOIN users u ON u.id = r.from_user_id
            WHERE r.to_user_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Review::from).collect())
    }

    /// Reviews written by a user, newest first
    pub async fn given(&self, user_id: Uuid) -> AppResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT id, from_user_id, from_user_name, to_user_id, rating, badges, comment, created_at
            FROM reviews
            WHERE from_user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Review::from).collect())
    }

    /// Whether a citizen already reviewed a collector
    pub async fn has_rated(&self, citizen_id: Uuid, collector_id: Uuid) -> AppResult<bool> {
        let rated = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM reviews WHERE from_user_id = $1 AND to_user_id = $2)",
        )
        .bind(citizen_id)
        .bind(collector_id)
        .fetch_one(&self.db)
        .await?;

        Ok(rated)
    }
}
