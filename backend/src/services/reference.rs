//! Reference data: waste types

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::AppResult;
use shared::models::{default_waste_types, WasteType};

#[derive(Debug, sqlx::FromRow)]
struct WasteTypeRow {
    id: String,
    name: String,
    icon: String,
    price_per_kg: Decimal,
    recyclable: bool,
}

impl From<WasteTypeRow> for WasteType {
    fn from(row: WasteTypeRow) -> Self {
        WasteType {
            id: row.id,
            name: row.name,
            icon: row.icon,
            price_per_kg: row.price_per_kg,
            recyclable: row.recyclable,
        }
    }
}

#[derive(Clone)]
pub struct ReferenceService {
    db: PgPool,
}

impl ReferenceService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Configured waste types, or the built-in catalog when none are set
    pub async fn waste_types(&self) -> AppResult<Vec<WasteType>> {
        let rows = sqlx::query_as::<_, WasteTypeRow>(
            "SELECT id, name, icon, price_per_kg, recyclable FROM waste_types ORDER BY sort_order, id",
        )
        .fetch_all(&self.db)
        .await?;

        if rows.is_empty() {
            return Ok(default_waste_types());
        }
        Ok(rows.into_iter().map(WasteType::from).collect())
    }
}
