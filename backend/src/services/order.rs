//! Marketplace order service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::{ProductService, UserService};
use shared::models::{
    checked_order_total, ensure_not_self_trade, Actor, MarketplaceOrder, OrderState, OrderStatus,
    OrderTransition, ProductType, Role,
};

/// Order columns joined with both parties' display names.
/// Expects the order relation aliased as `o`.
const ORDER_SELECT: &str = r#"
    o.id, o.product_id, o.buyer_id, b.name AS buyer_name, o.seller_id,
    COALESCE(s.company_name, s.name) AS seller_name, o.product_name, o.product_type,
    o.quantity, o.unit, o.price_per_unit, o.total_amount, o.buyer_message, o.buyer_phone,
    o.status, o.accepted_at, o.completed_at, o.created_at, o.updated_at
"#;

const ORDER_JOINS: &str = r#"
    LEFT JOIN users b ON b.id = o.buyer_id
    LEFT JOIN users s ON s.id = o.seller_id
"#;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderInput {
    #[serde(alias = "productId")]
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "The quantity must be at least 1"))]
    pub quantity: i32,
    #[serde(default)]
    #[validate(length(max = 500, message = "The message may not be greater than 500 characters"))]
    pub message: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20, message = "The phone may not be greater than 20 characters"))]
    pub phone: Option<String>,
}

/// Order plus a human readable outcome
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub message: String,
    pub order: MarketplaceOrder,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    product_id: Uuid,
    buyer_id: Uuid,
    buyer_name: Option<String>,
    seller_id: Uuid,
    seller_name: Option<String>,
    product_name: String,
    product_type: String,
    quantity: i32,
    unit: String,
    price_per_unit: Decimal,
    total_amount: Decimal,
    buyer_message: Option<String>,
    buyer_phone: Option<String>,
    status: String,
    accepted_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for MarketplaceOrder {
    type Error = AppError;

    fn try_from(row: OrderRow) -> AppResult<Self> {
        let status = OrderStatus::parse(&row.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown order status: {}", row.status)))?;
        let product_type = ProductType::parse(&row.product_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown product type: {}", row.product_type))
        })?;

        Ok(MarketplaceOrder {
            id: row.id,
            product_id: row.product_id,
            buyer_id: row.buyer_id,
            buyer_name: row.buyer_name,
            seller_id: row.seller_id,
            seller_name: row.seller_name,
            product_name: row.product_name,
            product_type,
            quantity: row.quantity,
            unit: row.unit,
            price_per_unit: row.price_per_unit,
            total_amount: row.total_amount,
            buyer_message: row.buyer_message,
            buyer_phone: row.buyer_phone,
            status,
            accepted_at: row.accepted_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_orders(rows: Vec<OrderRow>) -> AppResult<Vec<MarketplaceOrder>> {
    rows.into_iter().map(MarketplaceOrder::try_from).collect()
}

fn outcome_message(transition: OrderTransition) -> &'static str {
    match transition {
        OrderTransition::Accept => "Order accepted",
        OrderTransition::Reject => "Order rejected",
        OrderTransition::Complete => "Order completed",
        OrderTransition::Cancel => "Order cancelled",
    }
}

/// Order service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
}

impl OrderService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Place an order, snapshotting the product's price and total
    pub async fn create(&self, buyer_id: Uuid, input: CreateOrderInput) -> AppResult<OrderResponse> {
        input.validate()?;

        let product = ProductService::new(self.db.clone())
            .find_row(input.product_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::validation(
                    "product_id",
                    "The selected product does not exist",
                    "Le produit choisi n'existe pas",
                ),
                other => other,
            })?;

        ensure_not_self_trade(buyer_id, product.seller_id)?;

        if !product.available {
            return Err(AppError::InvalidState(
                "This product is not available".to_string(),
            ));
        }

        let buyer_phone = match input.phone.filter(|p| !p.trim().is_empty()) {
            Some(phone) => phone,
            None => UserService::new(self.db.clone()).get_profile(buyer_id).await?.phone,
        };

        let total_amount = checked_order_total(input.quantity, product.price_per_unit)?;

        let query = format!(
            r#"
            WITH o AS (
                INSERT INTO marketplace_orders
                    (product_id, buyer_id, seller_id, product_name, product_type, quantity, unit,
                     price_per_unit, total_amount, buyer_message, buyer_phone, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'pending')
                RETURNING *
            )
            SELECT {} FROM o {}
            "#,
            ORDER_SELECT, ORDER_JOINS
        );

        let row = sqlx::query_as::<_, OrderRow>(&query)
            .bind(product.id)
            .bind(buyer_id)
            .bind(product.seller_id)
            .bind(&product.name)
            .bind(&product.product_type)
            .bind(input.quantity)
            .bind(&product.unit)
            .bind(product.price_per_unit)
            .bind(total_amount)
            .bind(&input.message)
            .bind(&buyer_phone)
            .fetch_one(&self.db)
            .await?;

        tracing::info!(
            "Order {} placed by {} on product {} for {}",
            row.id,
            buyer_id,
            product.id,
            total_amount
        );

        Ok(OrderResponse {
            message: "Order created successfully".to_string(),
            order: row.try_into()?,
        })
    }

    /// Orders placed by a buyer
    pub async fn my_orders(&self, buyer_id: Uuid) -> AppResult<Vec<MarketplaceOrder>> {
        let query = format!(
            "SELECT {} FROM marketplace_orders o {} WHERE o.buyer_id = $1 ORDER BY o.created_at DESC",
            ORDER_SELECT, ORDER_JOINS
        );
        let rows = sqlx::query_as::<_, OrderRow>(&query)
            .bind(buyer_id)
            .fetch_all(&self.db)
            .await?;
        into_orders(rows)
    }

    /// Orders received by a recycler on their products
    pub async fn received_orders(&self, actor: &Actor) -> AppResult<Vec<MarketplaceOrder>> {
        if actor.role != Role::Recycler {
            return Err(AppError::Forbidden("Unauthorized".to_string()));
        }

        let query = format!(
            "SELECT {} FROM marketplace_orders o {} WHERE o.seller_id = $1 ORDER BY o.created_at DESC",
            ORDER_SELECT, ORDER_JOINS
        );
        let rows = sqlx::query_as::<_, OrderRow>(&query)
            .bind(actor.id)
            .fetch_all(&self.db)
            .await?;
        into_orders(rows)
    }

    pub async fn accept(&self, actor_id: Uuid, order_id: Uuid) -> AppResult<OrderResponse> {
        self.transition(actor_id, order_id, OrderTransition::Accept)
            .await
    }

    pub async fn reject(&self, actor_id: Uuid, order_id: Uuid) -> AppResult<OrderResponse> {
        self.transition(actor_id, order_id, OrderTransition::Reject)
            .await
    }

    pub async fn complete(&self, actor_id: Uuid, order_id: Uuid) -> AppResult<OrderResponse> {
        self.transition(actor_id, order_id, OrderTransition::Complete)
            .await
    }

    pub async fn cancel(&self, actor_id: Uuid, order_id: Uuid) -> AppResult<OrderResponse> {
        self.transition(actor_id, order_id, OrderTransition::Cancel)
            .await
    }

    async fn load_state(&self, order_id: Uuid) -> AppResult<OrderState> {
        let (status, buyer_id, seller_id) = sqlx::query_as::<_, (String, Uuid, Uuid)>(
            "SELECT status, buyer_id, seller_id FROM marketplace_orders WHERE id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let status = OrderStatus::parse(&status)
            .ok_or_else(|| AppError::Internal(format!("Unknown order status: {}", status)))?;

        Ok(OrderState {
            status,
            buyer_id,
            seller_id,
        })
    }

    /// Check the transition, then swap the status only from an allowed source.
    /// Amounts are never touched here.
    async fn transition(
        &self,
        actor_id: Uuid,
        order_id: Uuid,
        transition: OrderTransition,
    ) -> AppResult<OrderResponse> {
        let state = self.load_state(order_id).await?;

        if let Err(e) = state.check(actor_id, transition) {
            tracing::warn!(
                "Refused {:?} on order {} by {}: {}",
                transition,
                order_id,
                actor_id,
                e
            );
            return Err(e.into());
        }

        let sources: Vec<String> = transition
            .sources()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        let target = transition.target();

        let query = format!(
            r#"
            WITH o AS (
                UPDATE marketplace_orders SET
                    status = $3,
                    accepted_at = CASE WHEN $3 = 'accepted' THEN NOW() ELSE accepted_at END,
                    completed_at = CASE WHEN $3 = 'completed' THEN NOW() ELSE completed_at END,
                    updated_at = NOW()
                WHERE id = $1 AND status = ANY($2)
                RETURNING *
            )
            SELECT {} FROM o {}
            "#,
            ORDER_SELECT, ORDER_JOINS
        );

        let row = sqlx::query_as::<_, OrderRow>(&query)
            .bind(order_id)
            .bind(&sources)
            .bind(target.as_str())
            .fetch_optional(&self.db)
            .await?;

        let Some(row) = row else {
            tracing::warn!("Lost race applying {:?} to order {}", transition, order_id);
            return Err(AppError::InvalidState(
                "Order was updated by another request".to_string(),
            ));
        };

        tracing::info!(
            "Order {} moved to {} by {}",
            order_id,
            target.as_str(),
            actor_id
        );

        Ok(OrderResponse {
            message: outcome_message(transition).to_string(),
            order: row.try_into()?,
        })
    }
}
