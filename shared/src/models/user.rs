//! User and role models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform role chosen at registration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Produces waste and requests pickups
    Citizen,
    /// Fulfills pickups for payment
    Collector,
    /// Lists marketplace products and receives orders
    Recycler,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Collector => "collector",
            Role::Recycler => "recycler",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "citizen" => Some(Role::Citizen),
            "collector" => Some(Role::Collector),
            "recycler" => Some(Role::Recycler),
            _ => None,
        }
    }

    /// Collectors and recyclers operate as businesses
    pub fn is_business(&self) -> bool {
        matches!(self, Role::Collector | Role::Recycler)
    }
}

/// The user performing an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }
}

/// Public profile of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub phone: String,
    pub name: String,
    pub role: Role,
    pub neighborhood: String,
    pub avatar: Option<String>,
    pub rating: Option<Decimal>,
    pub review_count: i32,
    pub badges: Vec<String>,
    pub wallet: Decimal,
    pub company_name: Option<String>,
    pub responsible_name: Option<String>,
}

/// Name shown for a business: its company name when set, else the user name
pub fn display_name<'a>(name: &'a str, company_name: Option<&'a str>) -> &'a str {
    match company_name {
        Some(company) if !company.trim().is_empty() => company,
        _ => name,
    }
}
