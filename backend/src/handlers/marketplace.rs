//! Marketplace handlers: product listings and orders

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::auth::MessageResponse;
use crate::handlers::json::AppJson;
use crate::middleware::CurrentUser;
use crate::services::order::{CreateOrderInput, OrderResponse};
use crate::services::product::{CreateProductInput, UpdateProductInput};
use crate::services::{OrderService, ProductService};
use crate::AppState;
use shared::models::{MarketplaceOrder, MarketplaceProduct};

/// Public catalogue of available products
pub async fn list_products(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<MarketplaceProduct>>> {
    let service = ProductService::new(state.db.clone());
    Ok(Json(service.list_available().await?))
}

pub async fn my_products(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<MarketplaceProduct>>> {
    let service = ProductService::new(state.db.clone());
    Ok(Json(service.my_products(user.user_id).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(body): AppJson<CreateProductInput>,
) -> AppResult<(StatusCode, Json<MarketplaceProduct>)> {
    let service = ProductService::new(state.db.clone());
    let product = service.create(&user.actor(), body).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
    AppJson(body): AppJson<UpdateProductInput>,
) -> AppResult<Json<MarketplaceProduct>> {
    let service = ProductService::new(state.db.clone());
    Ok(Json(service.update(&user.actor(), product_id, body).await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let service = ProductService::new(state.db.clone());
    service.delete(&user.actor(), product_id).await?;
    Ok(MessageResponse::new("Product deleted successfully"))
}

pub async fn create_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(body): AppJson<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<OrderResponse>)> {
    let service = OrderService::new(state.db.clone());
    let response = service.create(user.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn my_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<MarketplaceOrder>>> {
    let service = OrderService::new(state.db.clone());
    Ok(Json(service.my_orders(user.user_id).await?))
}

/// Orders on the current recycler's products
pub async fn received_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<MarketplaceOrder>>> {
    let service = OrderService::new(state.db.clone());
    Ok(Json(service.received_orders(&user.actor()).await?))
}

pub async fn accept_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderResponse>> {
    let service = OrderService::new(state.db.clone());
    Ok(Json(service.accept(user.user_id, order_id).await?))
}

pub async fn reject_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderResponse>> {
    let service = OrderService::new(state.db.clone());
    Ok(Json(service.reject(user.user_id, order_id).await?))
}

pub async fn complete_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderResponse>> {
    let service = OrderService::new(state.db.clone());
    Ok(Json(service.complete(user.user_id, order_id).await?))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderResponse>> {
    let service = OrderService::new(state.db.clone());
    Ok(Json(service.cancel(user.user_id, order_id).await?))
}
