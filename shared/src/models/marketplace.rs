//! Marketplace catalog and order models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Kind of product listed by a recycler
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    RawMaterial,
    FinishedProduct,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::RawMaterial => "raw_material",
            ProductType::FinishedProduct => "finished_product",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "raw_material" => Some(ProductType::RawMaterial),
            "finished_product" => Some(ProductType::FinishedProduct),
            _ => None,
        }
    }
}

/// A product listed on the marketplace
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceProduct {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub seller_name: String,
    pub seller_type: String,
    pub product_type: ProductType,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub image_urls: Option<Vec<String>>,
    pub quantity: i32,
    pub unit: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_per_unit: Decimal,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status of a marketplace order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "accepted" => Some(OrderStatus::Accepted),
            "rejected" => Some(OrderStatus::Rejected),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Rejected | OrderStatus::Completed | OrderStatus::Cancelled
        )
    }
}

/// A status change requested on an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderTransition {
    Accept,
    Reject,
    Complete,
    Cancel,
}

impl OrderTransition {
    pub const ALL: [OrderTransition; 4] = [
        OrderTransition::Accept,
        OrderTransition::Reject,
        OrderTransition::Complete,
        OrderTransition::Cancel,
    ];

    /// Statuses this transition may leave from
    pub fn sources(&self) -> &'static [OrderStatus] {
        match self {
            OrderTransition::Accept | OrderTransition::Reject => &[OrderStatus::Pending],
            OrderTransition::Complete => &[OrderStatus::Accepted],
            OrderTransition::Cancel => &[OrderStatus::Pending, OrderStatus::Accepted],
        }
    }

    pub fn target(&self) -> OrderStatus {
        match self {
            OrderTransition::Accept => OrderStatus::Accepted,
            OrderTransition::Reject => OrderStatus::Rejected,
            OrderTransition::Complete => OrderStatus::Completed,
            OrderTransition::Cancel => OrderStatus::Cancelled,
        }
    }

    /// Cancellation belongs to the buyer, everything else to the seller
    pub fn performed_by_seller(&self) -> bool {
        !matches!(self, OrderTransition::Cancel)
    }

    fn wrong_state_message(&self) -> &'static str {
        match self {
            OrderTransition::Accept | OrderTransition::Reject => "Order is not pending",
            OrderTransition::Complete => "Order must be accepted first",
            OrderTransition::Cancel => "Cannot cancel this order",
        }
    }
}

/// The fields of an order that decide which transitions are allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderState {
    pub status: OrderStatus,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
}

impl OrderState {
    pub fn check(&self, actor_id: Uuid, transition: OrderTransition) -> DomainResult<()> {
        let party = if transition.performed_by_seller() {
            self.seller_id
        } else {
            self.buyer_id
        };
        if actor_id != party {
            return Err(DomainError::Forbidden("Unauthorized"));
        }
        if !transition.sources().contains(&self.status) {
            return Err(DomainError::InvalidState(transition.wrong_state_message()));
        }
        Ok(())
    }

    pub fn apply(&mut self, actor_id: Uuid, transition: OrderTransition) -> DomainResult<()> {
        self.check(actor_id, transition)?;
        self.status = transition.target();
        Ok(())
    }
}

/// Refuse orders where the buyer is the product's seller
pub fn ensure_not_self_trade(buyer_id: Uuid, seller_id: Uuid) -> DomainResult<()> {
    if buyer_id == seller_id {
        return Err(DomainError::InvalidState("You cannot order your own product"));
    }
    Ok(())
}

/// Total owed for an order, fixed at creation time
pub fn order_total(quantity: i32, price_per_unit: Decimal) -> Decimal {
    Decimal::from(quantity) * price_per_unit
}

/// Highest storable unit price or collection amount (9 999 999 999.99)
pub const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Highest storable order total (999 999 999 999.99)
pub const MAX_ORDER_TOTAL: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Order total, refused on `quantity` when it exceeds [`MAX_ORDER_TOTAL`]
pub fn checked_order_total(quantity: i32, price_per_unit: Decimal) -> DomainResult<Decimal> {
    Decimal::from(quantity)
        .checked_mul(price_per_unit)
        .filter(|total| *total <= MAX_ORDER_TOTAL)
        .ok_or(DomainError::Invalid {
            field: "quantity",
            message: "The order total is too large for this quantity",
        })
}

/// A buy request placed against a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceOrder {
    pub id: Uuid,
    pub product_id: Uuid,
    pub buyer_id: Uuid,
    pub buyer_name: Option<String>,
    pub seller_id: Uuid,
    pub seller_name: Option<String>,
    pub product_name: String,
    pub product_type: ProductType,
    pub quantity: i32,
    pub unit: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_per_unit: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub buyer_message: Option<String>,
    pub buyer_phone: Option<String>,
    pub status: OrderStatus,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
