//! Marketplace catalog service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};
use crate::services::UserService;
use shared::models::{Actor, MarketplaceProduct, ProductType, Role, MAX_PRICE};

const PRODUCT_COLUMNS: &str = "id, seller_id, seller_name, seller_type, product_type, name, \
     description, image_url, image_urls, quantity, unit, price_per_unit, available, created_at, updated_at";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[serde(alias = "productType")]
    pub product_type: String,
    #[validate(length(min = 1, max = 255, message = "The name field is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "The description field is required"))]
    pub description: String,
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default, alias = "imageUrls")]
    pub image_urls: Option<Vec<String>>,
    #[validate(range(min = 1, message = "The quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(length(min = 1, max = 50, message = "The unit field is required"))]
    pub unit: String,
    #[serde(alias = "pricePerUnit")]
    #[validate(custom = "validate_price")]
    pub price_per_unit: Decimal,
    #[serde(default)]
    pub available: Option<bool>,
}

/// Partial product update; absent fields keep their value
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[serde(default, alias = "productType")]
    pub product_type: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default, alias = "imageUrls")]
    pub image_urls: Option<Vec<String>>,
    #[validate(range(min = 0, message = "The quantity must be at least 0"))]
    pub quantity: Option<i32>,
    #[validate(length(min = 1, max = 50))]
    pub unit: Option<String>,
    #[serde(default, alias = "pricePerUnit")]
    #[validate(custom = "validate_price")]
    pub price_per_unit: Option<Decimal>,
    pub available: Option<bool>,
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        let mut err = ValidationError::new("range");
        err.message = Some("The price per unit must be at least 0".into());
        return Err(err);
    }
    if *price > MAX_PRICE {
        let mut err = ValidationError::new("range");
        err.message = Some("The price per unit may not be greater than 9999999999.99".into());
        return Err(err);
    }
    Ok(())
}

fn parse_product_type(value: &str) -> AppResult<ProductType> {
    ProductType::parse(value).ok_or_else(|| {
        AppError::validation(
            "product_type",
            "The selected product type is invalid",
            "Le type de produit choisi est invalide",
        )
    })
}

/// Product row from database
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub seller_name: String,
    pub seller_type: String,
    pub product_type: String,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub image_urls: Option<Json<Vec<String>>>,
    pub quantity: i32,
    pub unit: String,
    pub price_per_unit: Decimal,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for MarketplaceProduct {
    type Error = AppError;

    fn try_from(row: ProductRow) -> AppResult<Self> {
        let product_type = ProductType::parse(&row.product_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown product type: {}", row.product_type))
        })?;

        Ok(MarketplaceProduct {
            id: row.id,
            seller_id: row.seller_id,
            seller_name: row.seller_name,
            seller_type: row.seller_type,
            product_type,
            name: row.name,
            description: row.description,
            image_url: row.image_url,
            image_urls: row.image_urls.map(|urls| urls.0),
            quantity: row.quantity,
            unit: row.unit,
            price_per_unit: row.price_per_unit,
            available: row.available,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> AppResult<Vec<MarketplaceProduct>> {
    rows.into_iter().map(MarketplaceProduct::try_from).collect()
}

/// Product service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Public catalog: available products, newest first
    pub async fn list_available(&self) -> AppResult<Vec<MarketplaceProduct>> {
        let query = format!(
            "SELECT {} FROM marketplace_products WHERE available = TRUE ORDER BY created_at DESC",
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProductRow>(&query)
            .fetch_all(&self.db)
            .await?;
        into_products(rows)
    }

    /// Every product of a seller, available or not
    pub async fn my_products(&self, seller_id: Uuid) -> AppResult<Vec<MarketplaceProduct>> {
        let query = format!(
            "SELECT {} FROM marketplace_products WHERE seller_id = $1 ORDER BY created_at DESC",
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProductRow>(&query)
            .bind(seller_id)
            .fetch_all(&self.db)
            .await?;
        into_products(rows)
    }

    pub(crate) async fn find_row(&self, product_id: Uuid) -> AppResult<ProductRow> {
        let query = format!(
            "SELECT {} FROM marketplace_products WHERE id = $1",
            PRODUCT_COLUMNS
        );
        sqlx::query_as::<_, ProductRow>(&query)
            .bind(product_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// List a new product; recyclers only
    pub async fn create(&self, actor: &Actor, input: CreateProductInput) -> AppResult<MarketplaceProduct> {
        if actor.role != Role::Recycler {
            return Err(AppError::Forbidden(
                "Only recyclers can sell products".to_string(),
            ));
        }
        input.validate()?;
        let product_type = parse_product_type(&input.product_type)?;

        let seller_name = UserService::new(self.db.clone())
            .get_display_name(actor.id)
            .await?;

        let query = format!(
            r#"
            INSERT INTO marketplace_products
                (seller_id, seller_name, seller_type, product_type, name, description,
                 image_url, image_urls, quantity, unit, price_per_unit, available)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        );

        let row = sqlx::query_as::<_, ProductRow>(&query)
            .bind(actor.id)
            .bind(&seller_name)
            .bind(actor.role.as_str())
            .bind(product_type.as_str())
            .bind(input.name.trim())
            .bind(&input.description)
            .bind(&input.image_url)
            .bind(input.image_urls.map(Json))
            .bind(input.quantity)
            .bind(&input.unit)
            .bind(input.price_per_unit)
            .bind(input.available.unwrap_or(true))
            .fetch_one(&self.db)
            .await?;

        tracing::info!("Product {} listed by {}", row.id, actor.id);
        row.try_into()
    }

    /// Partial update by the owning seller
    pub async fn update(
        &self,
        actor: &Actor,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<MarketplaceProduct> {
        let existing = self.find_row(product_id).await?;
        if existing.seller_id != actor.id {
            return Err(AppError::Forbidden("Unauthorized".to_string()));
        }
        input.validate()?;

        let product_type = input
            .product_type
            .as_deref()
            .map(parse_product_type)
            .transpose()?;

        let query = format!(
            r#"
            UPDATE marketplace_products SET
                product_type = COALESCE($2, product_type),
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                image_url = COALESCE($5, image_url),
                image_urls = COALESCE($6, image_urls),
                quantity = COALESCE($7, quantity),
                unit = COALESCE($8, unit),
                price_per_unit = COALESCE($9, price_per_unit),
                available = COALESCE($10, available),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        );

        let row = sqlx::query_as::<_, ProductRow>(&query)
            .bind(product_id)
            .bind(product_type.map(|t| t.as_str()))
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.image_url)
            .bind(input.image_urls.map(Json))
            .bind(input.quantity)
            .bind(&input.unit)
            .bind(input.price_per_unit)
            .bind(input.available)
            .fetch_one(&self.db)
            .await?;

        tracing::info!("Product {} updated by {}", product_id, actor.id);
        row.try_into()
    }

    /// Remove a product; its orders go with it
    pub async fn delete(&self, actor: &Actor, product_id: Uuid) -> AppResult<()> {
        let existing = self.find_row(product_id).await?;
        if existing.seller_id != actor.id {
            return Err(AppError::Forbidden("Unauthorized".to_string()));
        }

        sqlx::query("DELETE FROM marketplace_products WHERE id = $1 AND seller_id = $2")
            .bind(product_id)
            .bind(actor.id)
            .execute(&self.db)
            .await?;

        tracing::info!("Product {} deleted by {}", product_id, actor.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_input(quantity: i32, price: i64) -> CreateProductInput {
        CreateProductInput {
            product_type: "raw_material".to_string(),
            name: "Granulés PET".to_string(),
            description: "Plastique broyé et lavé".to_string(),
            image_url: None,
            image_urls: None,
            quantity,
            unit: "kg".to_string(),
            price_per_unit: Decimal::from(price),
            available: None,
        }
    }

    #[test]
    fn test_create_validation() {
        assert!(create_input(100, 500).validate().is_ok());
        assert!(create_input(0, 500).validate().is_err());
        assert!(create_input(10, -1).validate().is_err());
    }

    #[test]
    fn test_price_ceiling() {
        assert!(create_input(10, 9_999_999_999).validate().is_ok());
        assert!(create_input(10, 10_000_000_000).validate().is_err());

        let input = UpdateProductInput {
            price_per_unit: Some(Decimal::from(20_000_000_000i64)),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_update_allows_zero_quantity() {
        let input = UpdateProductInput {
            quantity: Some(0),
            ..Default::default()
        };
        assert!(input.validate().is_ok());

        let input = UpdateProductInput {
            quantity: Some(-1),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_camel_case_fields() {
        let input: CreateProductInput = serde_json::from_str(
            r#"{"productType":"finished_product","name":"Pavés","description":"Pavés en plastique recyclé",
                "quantity":20,"unit":"pièce","pricePerUnit":750,"imageUrls":["https://x.tg/a.png"]}"#,
        )
        .unwrap();
        assert_eq!(parse_product_type(&input.product_type).unwrap(), ProductType::FinishedProduct);
        assert_eq!(input.price_per_unit, Decimal::from(750));
        assert_eq!(input.image_urls.unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_product_type() {
        assert!(matches!(
            parse_product_type("service"),
            Err(AppError::Validation { .. })
        ));
    }
}
