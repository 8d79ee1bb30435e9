//! Reference data served to the client

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;

/// A category of waste with its indicative buying price
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WasteType {
    pub id: String,
    pub name: String,
    pub icon: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_per_kg: Decimal,
    pub recyclable: bool,
}

impl WasteType {
    fn new(id: &str, name: &str, icon: &str, price_per_kg: i64, recyclable: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            price_per_kg: Decimal::from(price_per_kg),
            recyclable,
        }
    }
}

/// Catalog served when no waste type has been configured in the database
pub fn default_waste_types() -> Vec<WasteType> {
    vec![
        WasteType::new("plastic", "Plastique", "♻️", 150, true),
        WasteType::new("glass", "Verre", "🫙", 100, true),
        WasteType::new("metal", "Métal", "🔩", 250, true),
        WasteType::new("organic", "Organique", "🌿", 50, false),
        WasteType::new("paper", "Papier/Carton", "📦", 80, true),
        WasteType::new("electronics", "Électronique", "📱", 500, true),
        WasteType::new("banana", "Troncs de bananier", "🍌", 120, true),
        WasteType::new("household", "Ordures ménagères", "🗑️", 30, false),
        WasteType::new("garden", "Déchets verts", "🌳", 40, false),
        WasteType::new("mixed", "Déchets mixtes", "🧹", 25, false),
    ]
}

/// Neighborhoods of Lomé covered by the service
pub const NEIGHBORHOODS: &[&str] = &[
    "Lomé Centre",
    "Bè",
    "Agoè-Nyivé",
    "Tokoin",
    "Kodjoviakopé",
    "Adidogomé",
    "Baguida",
    "Aflao",
];

/// Kind of drop-off point shown on the map
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CollectionPointType {
    Collection,
    Recycler,
}

impl From<Role> for CollectionPointType {
    fn from(role: Role) -> Self {
        match role {
            Role::Recycler => CollectionPointType::Recycler,
            _ => CollectionPointType::Collection,
        }
    }
}

/// A collector or recycler with a known GPS position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionPoint {
    pub id: Uuid,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "type")]
    pub point_type: CollectionPointType,
    pub neighborhood: String,
    pub avatar: Option<String>,
    pub phone: String,
    pub rating: Option<Decimal>,
}
