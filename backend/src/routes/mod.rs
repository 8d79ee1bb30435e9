//! Route definitions for the SikaGreen API

use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        // Reference data (public)
        .route("/waste-types", get(handlers::waste_types))
        .route("/neighborhoods", get(handlers::neighborhoods))
        .route("/collection-points", get(handlers::collection_points))
        // Platform stats (public, cached)
        .route("/stats/global", get(handlers::global_stats))
        // Product catalogue (public)
        .route("/marketplace/products", get(handlers::list_products))
        .route("/marketplace-products", get(handlers::list_products))
        // Everything else requires a bearer token
        .merge(protected_routes(state))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(account_routes())
        .nest("/collections", collection_routes())
        .nest("/reviews", review_routes())
        .nest("/marketplace", marketplace_routes())
        .nest("/conversations", conversation_routes())
        .route("/stats/dashboard", get(handlers::dashboard_stats))
        .route("/upload/image", post(handlers::upload_image))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Session and profile routes
fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/logout", post(handlers::logout))
        .route("/user", get(handlers::me))
        .route("/profile", put(handlers::update_profile))
        .route("/user/profile", put(handlers::update_profile))
}

/// Collection routes
fn collection_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_collections).post(handlers::create_collection),
        )
        .route("/citizen", get(handlers::citizen_collections))
        .route("/collector", get(handlers::collector_collections))
        .route("/collector/history", get(handlers::collector_history))
        .route("/:collection_id", patch(handlers::update_collection))
        .route("/:collection_id/accept", post(handlers::accept_collection))
        .route("/:collection_id/reject", post(handlers::reject_collection))
        .route("/:collection_id/start", post(handlers::start_collection))
}

/// Review routes
fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_review))
        .route("/received", get(handlers::received_reviews))
        .route("/given", get(handlers::given_reviews))
}

/// Marketplace routes, except the public catalogue
fn marketplace_routes() -> Router<AppState> {
    Router::new()
        .route("/my-products", get(handlers::my_products))
        .route("/products", post(handlers::create_product))
        .route(
            "/products/:product_id",
            patch(handlers::update_product).delete(handlers::delete_product),
        )
        .route("/orders", post(handlers::create_order))
        .route("/orders/my-orders", get(handlers::my_orders))
        .route("/orders/received", get(handlers::received_orders))
        .route("/orders/:order_id/accept", post(handlers::accept_order))
        .route("/orders/:order_id/reject", post(handlers::reject_order))
        .route("/orders/:order_id/complete", post(handlers::complete_order))
        .route("/orders/:order_id/cancel", post(handlers::cancel_order))
}

/// Conversation routes
fn conversation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_conversations).post(handlers::create_conversation),
        )
        .route(
            "/:conversation_id/messages",
            get(handlers::get_messages).post(handlers::send_message),
        )
}
