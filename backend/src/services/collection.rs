//! Collection service for waste pickup requests
//!
//! Status changes follow the state machine in `shared::models::collection`
//! and are persisted with a compare-and-swap on the current status.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};
use crate::services::UserService;
use shared::models::{
    Actor, Collection, CollectionState, CollectionStatus, CollectionTransition, Role, MAX_PRICE,
};
use shared::types::Location;

/// Columns of a collection row plus whether the citizen reviewed the collector
const COLLECTION_COLUMNS: &str = r#"
    c.id, c.citizen_id, c.citizen_name, c.collector_id, c.collector_name,
    c.waste_type, c.quantity, c.status, c.location_lat, c.location_lng,
    c.location_address, c.amount, c.completed_at, c.created_at,
    EXISTS (
        SELECT 1 FROM reviews r
        WHERE r.from_user_id = c.citizen_id AND r.to_user_id = c.collector_id
    ) AS has_rated
"#;

/// Input for creating a pickup request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCollectionInput {
    #[serde(alias = "wasteType")]
    #[validate(length(min = 1, max = 255, message = "The waste type field is required"))]
    pub waste_type: String,
    #[validate(length(min = 1, max = 255, message = "The quantity field is required"))]
    pub quantity: String,
    #[serde(alias = "locationLat")]
    #[validate(custom = "validate_latitude")]
    pub location_lat: f64,
    #[serde(alias = "locationLng")]
    #[validate(custom = "validate_longitude")]
    pub location_lng: f64,
    #[serde(alias = "locationAddress")]
    #[validate(length(min = 1, message = "The location address field is required"))]
    pub location_address: String,
    #[serde(default)]
    #[validate(custom = "validate_amount")]
    pub amount: Option<Decimal>,
}

/// Requested status change through `PATCH /collections/{id}`
#[derive(Debug, Deserialize)]
pub struct UpdateCollectionInput {
    pub status: Option<String>,
    #[serde(default, alias = "collectorId")]
    pub collector_id: Option<Uuid>,
}

fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if !(-90.0..=90.0).contains(&lat) {
        let mut err = ValidationError::new("range");
        err.message = Some("Latitude must be between -90 and 90".into());
        return Err(err);
    }
    Ok(())
}

fn validate_longitude(lng: f64) -> Result<(), ValidationError> {
    if !(-180.0..=180.0).contains(&lng) {
        let mut err = ValidationError::new("range");
        err.message = Some("Longitude must be between -180 and 180".into());
        return Err(err);
    }
    Ok(())
}

fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() {
        let mut err = ValidationError::new("amount");
        err.message = Some("The amount must be at least 0".into());
        return Err(err);
    }
    if *amount > MAX_PRICE {
        let mut err = ValidationError::new("amount");
        err.message = Some("The amount may not be greater than 9999999999.99".into());
        return Err(err);
    }
    Ok(())
}

/// Collection row from database
#[derive(Debug, sqlx::FromRow)]
struct CollectionRow {
    id: Uuid,
    citizen_id: Uuid,
    citizen_name: String,
    collector_id: Option<Uuid>,
    collector_name: Option<String>,
    waste_type: String,
    quantity: String,
    status: String,
    location_lat: f64,
    location_lng: f64,
    location_address: String,
    amount: Option<Decimal>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    has_rated: bool,
}

impl TryFrom<CollectionRow> for Collection {
    type Error = AppError;

    fn try_from(row: CollectionRow) -> AppResult<Self> {
        let status = CollectionStatus::parse(&row.status).ok_or_else(|| {
            AppError::Internal(format!("Unknown collection status: {}", row.status))
        })?;

        Ok(Collection {
            id: row.id,
            citizen_id: row.citizen_id,
            citizen_name: row.citizen_name,
            collector_id: row.collector_id,
            collector_name: row.collector_name,
            waste_type: row.waste_type,
            quantity: row.quantity,
            status,
            location: Location::new(row.location_lat, row.location_lng, row.location_address),
            created_at: row.created_at,
            completed_at: row.completed_at,
            amount: row.amount,
            has_rated: row.has_rated,
        })
    }
}

fn into_collections(rows: Vec<CollectionRow>) -> AppResult<Vec<Collection>> {
    rows.into_iter().map(Collection::try_from).collect()
}

/// Collection service
#[derive(Clone)]
pub struct CollectionService {
    db: PgPool,
}

impl CollectionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a pending pickup request for a citizen
    pub async fn create(&self, actor: &Actor, input: CreateCollectionInput) -> AppResult<Collection> {
        if actor.role != Role::Citizen {
            return Err(AppError::Forbidden(
                "Only citizens can request a collection".to_string(),
            ));
        }
        input.validate()?;

        let citizen_name = UserService::new(self.db.clone())
            .get_profile(actor.id)
            .await?
            .name;

        let query = format!(
            r#"
            INSERT INTO collections AS c
                (citizen_id, citizen_name, waste_type, quantity, status,
                 location_lat, location_lng, location_address, amount)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8)
            RETURNING {}
            "#,
            COLLECTION_COLUMNS
        );

        let row = sqlx::query_as::<_, CollectionRow>(&query)
            .bind(actor.id)
            .bind(&citizen_name)
            .bind(input.waste_type.trim())
            .bind(input.quantity.trim())
            .bind(input.location_lat)
            .bind(input.location_lng)
            .bind(input.location_address.trim())
            .bind(input.amount)
            .fetch_one(&self.db)
            .await?;

        tracing::info!("Collection {} requested by citizen {}", row.id, actor.id);
        row.try_into()
    }

    /// Collections the user takes part in, as citizen or collector
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Collection>> {
        let query = format!(
            r#"
            SELECT {}
            FROM collections c
            WHERE c.citizen_id = $1 OR c.collector_id = $1
            ORDER BY c.created_at DESC
            "#,
            COLLECTION_COLUMNS
        );

        let rows = sqlx::query_as::<_, CollectionRow>(&query)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;
        into_collections(rows)
    }

    /// Requests created by a citizen
    pub async fn list_for_citizen(&self, citizen_id: Uuid) -> AppResult<Vec<Collection>> {
        let query = format!(
            r#"
            SELECT {}
            FROM collections c
            WHERE c.citizen_id = $1
            ORDER BY c.created_at DESC
            "#,
            COLLECTION_COLUMNS
        );

        let rows = sqlx::query_as::<_, CollectionRow>(&query)
            .bind(citizen_id)
            .fetch_all(&self.db)
            .await?;
        into_collections(rows)
    }

    /// Collector inbox: own active jobs plus every unclaimed request
    pub async fn list_for_collector(&self, collector_id: Uuid) -> AppResult<Vec<Collection>> {
        let query = format!(
            r#"
            SELECT {}
            FROM collections c
            WHERE (c.collector_id = $1 AND c.status IN ('accepted', 'in_progress'))
               OR (c.status = 'pending' AND c.collector_id IS NULL)
            ORDER BY c.created_at DESC
            "#,
            COLLECTION_COLUMNS
        );

        let rows = sqlx::query_as::<_, CollectionRow>(&query)
            .bind(collector_id)
            .fetch_all(&self.db)
            .await?;
        into_collections(rows)
    }

    /// Completed jobs of a collector, most recent first
    pub async fn collector_history(&self, collector_id: Uuid) -> AppResult<Vec<Collection>> {
        let query = format!(
            r#"
            SELECT {}
            FROM collections c
            WHERE c.collector_id = $1 AND c.status = 'completed'
            ORDER BY c.completed_at DESC
            "#,
            COLLECTION_COLUMNS
        );

        let rows = sqlx::query_as::<_, CollectionRow>(&query)
            .bind(collector_id)
            .fetch_all(&self.db)
            .await?;
        into_collections(rows)
    }

    pub async fn accept(&self, actor: &Actor, collection_id: Uuid) -> AppResult<Collection> {
        self.transition(actor, collection_id, CollectionTransition::Accept)
            .await
    }

    pub async fn reject(&self, actor: &Actor, collection_id: Uuid) -> AppResult<Collection> {
        self.transition(actor, collection_id, CollectionTransition::Reject)
            .await
    }

    pub async fn start(&self, actor: &Actor, collection_id: Uuid) -> AppResult<Collection> {
        self.transition(actor, collection_id, CollectionTransition::Start)
            .await
    }

    /// Status change requested through the generic update endpoint.
    ///
    /// Only completion by the assigned collector and cancellation by the
    /// owning citizen are reachable this way.
    pub async fn update_status(
        &self,
        actor: &Actor,
        collection_id: Uuid,
        input: UpdateCollectionInput,
    ) -> AppResult<Collection> {
        if input.collector_id.is_some() {
            return Err(AppError::validation(
                "collector_id",
                "The collector cannot be reassigned",
                "Le collecteur ne peut pas être réassigné",
            ));
        }

        let requested = input.status.ok_or_else(|| {
            AppError::validation(
                "status",
                "The status field is required",
                "Le champ statut est obligatoire",
            )
        })?;

        let status = CollectionStatus::parse(&requested).ok_or_else(|| {
            AppError::validation(
                "status",
                "The selected status is invalid",
                "Le statut choisi est invalide",
            )
        })?;

        let transition = CollectionTransition::for_requested_status(status)?;
        self.transition(actor, collection_id, transition).await
    }

    async fn load_state(&self, collection_id: Uuid) -> AppResult<CollectionState> {
        let (status, citizen_id, collector_id) = sqlx::query_as::<_, (String, Uuid, Option<Uuid>)>(
            "SELECT status, citizen_id, collector_id FROM collections WHERE id = $1",
        )
        .bind(collection_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Collection".to_string()))?;

        let status = CollectionStatus::parse(&status)
            .ok_or_else(|| AppError::Internal(format!("Unknown collection status: {}", status)))?;

        Ok(CollectionState {
            status,
            citizen_id,
            collector_id,
        })
    }

    /// Check a transition against the current row, then swap the status
    /// only if nobody changed it in between.
    async fn transition(
        &self,
        actor: &Actor,
        collection_id: Uuid,
        transition: CollectionTransition,
    ) -> AppResult<Collection> {
        let state = self.load_state(collection_id).await?;

        if let Err(e) = state.check(actor, transition) {
            tracing::warn!(
                "Refused {:?} on collection {} by {}: {}",
                transition,
                collection_id,
                actor.id,
                e
            );
            return Err(e.into());
        }

        let (collector_id, collector_name) = if transition == CollectionTransition::Accept {
            let name = UserService::new(self.db.clone())
                .get_display_name(actor.id)
                .await?;
            (Some(actor.id), Some(name))
        } else {
            (None, None)
        };

        let target = transition.target();
        let query = format!(
            r#"
            UPDATE collections AS c SET
                status = $3,
                collector_id = COALESCE($4, c.collector_id),
                collector_name = COALESCE($5, c.collector_name),
                completed_at = CASE WHEN $3 = 'completed' THEN NOW() ELSE c.completed_at END,
                updated_at = NOW()
            WHERE c.id = $1 AND c.status = $2
            RETURNING {}
            "#,
            COLLECTION_COLUMNS
        );

        let row = sqlx::query_as::<_, CollectionRow>(&query)
            .bind(collection_id)
            .bind(transition.source().as_str())
            .bind(target.as_str())
            .bind(collector_id)
            .bind(collector_name)
            .fetch_optional(&self.db)
            .await?;

        let Some(row) = row else {
            tracing::warn!(
                "Lost race applying {:?} to collection {}",
                transition,
                collection_id
            );
            return Err(AppError::InvalidState(
                "Collection was updated by another request".to_string(),
            ));
        };

        tracing::info!(
            "Collection {} moved to {} by {}",
            collection_id,
            target.as_str(),
            actor.id
        );
        row.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_input_accepts_both_casings() {
        let snake: CreateCollectionInput = serde_json::from_str(
            r#"{"waste_type":"plastic","quantity":"50kg","location_lat":6.13,
                "location_lng":1.22,"location_address":"Bè, Lomé"}"#,
        )
        .unwrap();
        let camel: CreateCollectionInput = serde_json::from_str(
            r#"{"wasteType":"plastic","quantity":"50kg","locationLat":6.13,
                "locationLng":1.22,"locationAddress":"Bè, Lomé","amount":1500}"#,
        )
        .unwrap();

        assert_eq!(snake.waste_type, camel.waste_type);
        assert_eq!(snake.location_address, camel.location_address);
        assert!(snake.amount.is_none());
        assert_eq!(camel.amount, Some(Decimal::from(1500)));
        assert!(camel.validate().is_ok());
    }

    #[test]
    fn test_create_input_validation() {
        let input = CreateCollectionInput {
            waste_type: String::new(),
            quantity: "50kg".to_string(),
            location_lat: 120.0,
            location_lng: 1.22,
            location_address: "Tokoin".to_string(),
            amount: Some(Decimal::from(-5)),
        };
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("waste_type"));
        assert!(fields.contains_key("location_lat"));
        assert!(fields.contains_key("amount"));
    }

    #[test]
    fn test_amount_ceiling() {
        assert!(validate_amount(&MAX_PRICE).is_ok());
        assert!(validate_amount(&Decimal::new(1_000_000_000_000, 2)).is_err());
    }

    #[test]
    fn test_row_conversion() {
        let row = CollectionRow {
            id: Uuid::new_v4(),
            citizen_id: Uuid::new_v4(),
            citizen_name: "Afi".to_string(),
            collector_id: None,
            collector_name: None,
            waste_type: "Plastique".to_string(),
            quantity: "50kg".to_string(),
            status: "in_progress".to_string(),
            location_lat: 6.13,
            location_lng: 1.22,
            location_address: "Bè".to_string(),
            amount: None,
            completed_at: None,
            created_at: Utc::now(),
            has_rated: false,
        };

        let collection = Collection::try_from(row).unwrap();
        assert_eq!(collection.status, CollectionStatus::InProgress);
        assert_eq!(collection.location.address, "Bè");
    }
}
