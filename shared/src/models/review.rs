//! Reviews and the rating aggregate they feed

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// A rating left by one user for another
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub from_user_name: Option<String>,
    pub to_user_id: Uuid,
    pub rating: i32,
    pub badges: Vec<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Cached rating fields stored on the reviewed user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSummary {
    /// Mean rating rounded to one decimal, `None` before the first review
    pub rating: Option<Decimal>,
    pub review_count: i32,
}

impl RatingSummary {
    /// Recompute the summary from every rating a user has received
    pub fn from_ratings(ratings: &[i32]) -> Self {
        if ratings.is_empty() {
            return Self {
                rating: None,
                review_count: 0,
            };
        }

        let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
        let mean = Decimal::from(sum) / Decimal::from(ratings.len() as i64);

        Self {
            rating: Some(mean.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)),
            review_count: ratings.len() as i32,
        }
    }
}

/// Ratings are whole stars from 1 to 5
pub fn validate_rating(rating: i32) -> DomainResult<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(DomainError::Invalid {
            field: "rating",
            message: "Rating must be between 1 and 5",
        });
    }
    Ok(())
}

/// Users cannot rate themselves
pub fn ensure_not_self_review(from_user_id: Uuid, to_user_id: Uuid) -> DomainResult<()> {
    if from_user_id == to_user_id {
        return Err(DomainError::Invalid {
            field: "to_user_id",
            message: "You cannot review yourself",
        });
    }
    Ok(())
}

/// Trim badges, drop empty ones and duplicates while keeping order
pub fn normalize_badges(badges: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(badges.len());
    for badge in badges {
        let badge = badge.trim().to_string();
        if !badge.is_empty() && !seen.contains(&badge) {
            seen.push(badge);
        }
    }
    seen
}
