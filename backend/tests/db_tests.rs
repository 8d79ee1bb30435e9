//! Database-backed scenario tests
//!
//! These run the services against a real PostgreSQL database and are
//! ignored by default. Run with:
//!
//! ```text
//! TEST_DATABASE_URL=postgres://localhost/sikagreen_test cargo test -- --ignored
//! ```

use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use sikagreen_backend::config::{
    Config, DatabaseConfig, JwtConfig, ServerConfig, StatsConfig, StorageConfig,
};
use sikagreen_backend::error::AppError;
use sikagreen_backend::services::auth::RegisterInput;
use sikagreen_backend::services::chat::SendMessageInput;
use sikagreen_backend::services::collection::{CreateCollectionInput, UpdateCollectionInput};
use sikagreen_backend::services::order::CreateOrderInput;
use sikagreen_backend::services::product::CreateProductInput;
use sikagreen_backend::services::storage::UploadedFile;
use sikagreen_backend::services::review::CreateReviewInput;
use sikagreen_backend::services::{
    AuthService, ChatService, CollectionService, OrderService, ProductService, ReviewService,
    StorageService, UserService,
};
use shared::{Actor, CollectionStatus, MediaType, OrderStatus, Role, UserProfile};

fn test_config(url: String) -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
        },
        database: DatabaseConfig {
            url,
            max_connections: 5,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry: 3600,
        },
        storage: StorageConfig {
            root: std::env::temp_dir()
                .join("sikagreen-db-tests")
                .to_string_lossy()
                .into_owned(),
            public_base_url: "http://localhost:8000".to_string(),
            image_max_bytes: 2 * 1024 * 1024,
            media_max_bytes: 10 * 1024 * 1024,
        },
        stats: StatsConfig { cache_ttl_secs: 300 },
    }
}

async fn setup() -> (PgPool, Config) {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let config = test_config(url);
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .expect("database connection");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
    (pool, config)
}

fn random_phone() -> String {
    format!("9{:07}", rand::random::<u32>() % 10_000_000)
}

async fn register(pool: &PgPool, config: &Config, name: &str, role: Role) -> (Actor, UserProfile) {
    let auth = AuthService::new(pool.clone(), config);
    let response = auth
        .register(RegisterInput {
            phone: random_phone(),
            password: "secret123".to_string(),
            name: name.to_string(),
            role: role.as_str().to_string(),
            neighborhood: "Bè".to_string(),
            company_name: role.is_business().then(|| format!("{} SARL", name)),
            responsible_name: None,
        })
        .await
        .expect("registration");
    (Actor::new(response.user.id, role), response.user)
}

fn pickup_request() -> CreateCollectionInput {
    CreateCollectionInput {
        waste_type: "Plastique".to_string(),
        quantity: "50kg".to_string(),
        location_lat: 6.1319,
        location_lng: 1.2228,
        location_address: "Rue du Commerce, Lomé".to_string(),
        amount: Some(Decimal::from(1500)),
    }
}

// ============================================================================
// Collections and Reviews
// ============================================================================

#[tokio::test]
#[ignore] // Requires database connection
async fn test_pickup_and_review_scenario() {
    let (pool, config) = setup().await;
    let (citizen, _) = register(&pool, &config, "Ama", Role::Citizen).await;
    let (collector_a, _) = register(&pool, &config, "Kossi", Role::Collector).await;
    let (collector_b, _) = register(&pool, &config, "Yawa", Role::Collector).await;

    let collections = CollectionService::new(pool.clone());
    let created = collections.create(&citizen, pickup_request()).await.unwrap();
    assert_eq!(created.status, CollectionStatus::Pending);
    assert_eq!(created.collector_id, None);

    let accepted = collections.accept(&collector_a, created.id).await.unwrap();
    assert_eq!(accepted.status, CollectionStatus::Accepted);
    assert_eq!(accepted.collector_id, Some(collector_a.id));

    let late = collections.accept(&collector_b, created.id).await;
    assert!(matches!(late, Err(AppError::InvalidState(_))));

    let started = collections.start(&collector_a, created.id).await.unwrap();
    assert_eq!(started.status, CollectionStatus::InProgress);

    let completed = collections
        .update_status(
            &collector_a,
            created.id,
            UpdateCollectionInput {
                status: Some("completed".to_string()),
                collector_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(completed.status, CollectionStatus::Completed);
    assert!(completed.completed_at.is_some());

    let reviews = ReviewService::new(pool.clone());
    assert!(!reviews.has_rated(citizen.id, collector_a.id).await.unwrap());

    reviews
        .submit(
            citizen.id,
            CreateReviewInput {
                to_user_id: collector_a.id,
                rating: 5,
                badges: Some(vec!["Ponctuel".to_string()]),
                comment: Some("Très rapide".to_string()),
            },
        )
        .await
        .unwrap();

    assert!(reviews.has_rated(citizen.id, collector_a.id).await.unwrap());

    let profile = UserService::new(pool.clone())
        .get_profile(collector_a.id)
        .await
        .unwrap();
    assert_eq!(profile.rating, Some(Decimal::from(5)));
    assert_eq!(profile.review_count, 1);

    let history = collections.list_for_citizen(citizen.id).await.unwrap();
    let mine = history.iter().find(|c| c.id == created.id).unwrap();
    assert!(mine.has_rated);
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_rating_is_recomputed_per_review() {
    let (pool, config) = setup().await;
    let (collector, _) = register(&pool, &config, "Edem", Role::Collector).await;
    let reviews = ReviewService::new(pool.clone());

    for (name, rating) in [("Afi", 5), ("Kodjo", 4), ("Sena", 4)] {
        let (citizen, _) = register(&pool, &config, name, Role::Citizen).await;
        reviews
            .submit(
                citizen.id,
                CreateReviewInput {
                    to_user_id: collector.id,
                    rating,
                    badges: None,
                    comment: None,
                },
            )
            .await
            .unwrap();
    }

    let profile = UserService::new(pool.clone())
        .get_profile(collector.id)
        .await
        .unwrap();
    // 13 / 3 = 4.33
    assert_eq!(profile.rating, Some(Decimal::new(43, 1)));
    assert_eq!(profile.review_count, 3);
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_concurrent_accepts_have_one_winner() {
    let (pool, config) = setup().await;
    let (citizen, _) = register(&pool, &config, "Abla", Role::Citizen).await;
    let (collector_a, _) = register(&pool, &config, "Koffi", Role::Collector).await;
    let (collector_b, _) = register(&pool, &config, "Enyonam", Role::Collector).await;

    let collections = CollectionService::new(pool.clone());
    let created = collections.create(&citizen, pickup_request()).await.unwrap();

    let first = CollectionService::new(pool.clone());
    let second = CollectionService::new(pool.clone());
    let (a, b) = tokio::join!(
        first.accept(&collector_a, created.id),
        second.accept(&collector_b, created.id)
    );

    let (winner, accepted, lost) = match (a, b) {
        (Ok(accepted), Err(lost)) => (collector_a, accepted, lost),
        (Err(lost), Ok(accepted)) => (collector_b, accepted, lost),
        other => panic!("expected exactly one accept to succeed: {:?}", other),
    };
    assert!(matches!(lost, AppError::InvalidState(_)));
    assert_eq!(accepted.collector_id, Some(winner.id));

    let stored = collections
        .list_for_citizen(citizen.id)
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.id == created.id)
        .unwrap();
    assert_eq!(stored.status, CollectionStatus::Accepted);
    assert_eq!(stored.collector_id, Some(winner.id));
}

// ============================================================================
// Marketplace
// ============================================================================

#[tokio::test]
#[ignore] // Requires database connection
async fn test_order_then_cancel_scenario() {
    let (pool, config) = setup().await;
    let (recycler, _) = register(&pool, &config, "EcoPlast", Role::Recycler).await;
    let (buyer, _) = register(&pool, &config, "Mawuli", Role::Citizen).await;

    let product = ProductService::new(pool.clone())
        .create(
            &recycler,
            CreateProductInput {
                product_type: "raw_material".to_string(),
                name: "Granulés PET".to_string(),
                description: "Granulés de plastique recyclé".to_string(),
                image_url: None,
                image_urls: None,
                quantity: 100,
                unit: "kg".to_string(),
                price_per_unit: Decimal::from(500),
                available: None,
            },
        )
        .await
        .unwrap();

    let orders = OrderService::new(pool.clone());
    let placed = orders
        .create(
            buyer.id,
            CreateOrderInput {
                product_id: product.id,
                quantity: 10,
                message: None,
                phone: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(placed.order.total_amount, Decimal::from(5000));
    assert_eq!(placed.order.status, OrderStatus::Pending);

    // Only the seller decides
    let by_buyer = orders.accept(buyer.id, placed.order.id).await;
    assert!(matches!(by_buyer, Err(AppError::Forbidden(_))));

    let accepted = orders.accept(recycler.id, placed.order.id).await.unwrap();
    assert_eq!(accepted.order.status, OrderStatus::Accepted);
    assert!(accepted.order.accepted_at.is_some());

    let cancelled = orders.cancel(buyer.id, placed.order.id).await.unwrap();
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.order.total_amount, Decimal::from(5000));

    let self_order = orders
        .create(
            recycler.id,
            CreateOrderInput {
                product_id: product.id,
                quantity: 1,
                message: None,
                phone: None,
            },
        )
        .await;
    assert!(matches!(self_order, Err(AppError::InvalidState(_))));
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_concurrent_seller_decisions_have_one_winner() {
    let (pool, config) = setup().await;
    let (recycler, _) = register(&pool, &config, "RecyLomé", Role::Recycler).await;
    let (buyer, _) = register(&pool, &config, "Sélom", Role::Citizen).await;

    let product = ProductService::new(pool.clone())
        .create(
            &recycler,
            CreateProductInput {
                product_type: "finished_product".to_string(),
                name: "Pavés recyclés".to_string(),
                description: "Pavés en plastique fondu".to_string(),
                image_url: None,
                image_urls: None,
                quantity: 40,
                unit: "pièce".to_string(),
                price_per_unit: Decimal::from(1200),
                available: None,
            },
        )
        .await
        .unwrap();

    let orders = OrderService::new(pool.clone());
    let placed = orders
        .create(
            buyer.id,
            CreateOrderInput {
                product_id: product.id,
                quantity: 2,
                message: None,
                phone: None,
            },
        )
        .await
        .unwrap();

    let first = OrderService::new(pool.clone());
    let second = OrderService::new(pool.clone());
    let (accepted, rejected) = tokio::join!(
        first.accept(recycler.id, placed.order.id),
        second.reject(recycler.id, placed.order.id)
    );

    let (final_status, lost) = match (accepted, rejected) {
        (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won.order.status, lost),
        other => panic!("expected exactly one decision to succeed: {:?}", other),
    };
    assert!(matches!(lost, AppError::InvalidState(_)));

    let stored = orders
        .my_orders(buyer.id)
        .await
        .unwrap()
        .into_iter()
        .find(|o| o.id == placed.order.id)
        .unwrap();
    assert_eq!(stored.status, final_status);
    assert_eq!(stored.total_amount, Decimal::from(2400));
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_oversized_order_is_a_validation_error() {
    let (pool, config) = setup().await;
    let (recycler, _) = register(&pool, &config, "PlastiTogo", Role::Recycler).await;
    let (buyer, _) = register(&pool, &config, "Edoh", Role::Citizen).await;

    let product = ProductService::new(pool.clone())
        .create(
            &recycler,
            CreateProductInput {
                product_type: "raw_material".to_string(),
                name: "Paillettes PEHD".to_string(),
                description: "Paillettes triées".to_string(),
                image_url: None,
                image_urls: None,
                quantity: 10,
                unit: "kg".to_string(),
                price_per_unit: Decimal::from(1000),
                available: None,
            },
        )
        .await
        .unwrap();

    let refused = OrderService::new(pool.clone())
        .create(
            buyer.id,
            CreateOrderInput {
                product_id: product.id,
                quantity: 2_000_000_000,
                message: None,
                phone: None,
            },
        )
        .await;

    match refused {
        Err(AppError::Validation { field, .. }) => assert_eq!(field, "quantity"),
        other => panic!("expected a quantity validation error: {:?}", other),
    }
}

// ============================================================================
// Chat
// ============================================================================

#[tokio::test]
#[ignore] // Requires database connection
async fn test_conversation_and_seen_marking() {
    let (pool, config) = setup().await;
    let (citizen, _) = register(&pool, &config, "Akossiwa", Role::Citizen).await;
    let (collector, _) = register(&pool, &config, "Komlan", Role::Collector).await;

    let chat = ChatService::new(pool.clone());
    let storage = StorageService::new(&config.storage);

    let first = chat.create_or_get(citizen.id, collector.id).await.unwrap();
    let second = chat.create_or_get(collector.id, citizen.id).await.unwrap();
    assert_eq!(first.id, second.id);

    chat.send_message(
        first.id,
        citizen.id,
        SendMessageInput {
            content: Some("Bonjour, vous passez quand ?".to_string()),
            ..Default::default()
        },
        &storage,
    )
    .await
    .unwrap();
    chat.send_message(
        first.id,
        collector.id,
        SendMessageInput {
            content: Some("Demain matin".to_string()),
            ..Default::default()
        },
        &storage,
    )
    .await
    .unwrap();

    // The collector reads: only the citizen's message flips
    let seen_by_collector = chat.get_messages(first.id, collector.id).await.unwrap();
    assert!(seen_by_collector[0].seen);
    assert!(!seen_by_collector[1].seen);

    let summaries = chat.get_conversations(citizen.id).await.unwrap();
    let summary = summaries.iter().find(|s| s.id == first.id).unwrap();
    assert_eq!(summary.unread_count, 1);

    let (stranger, _) = register(&pool, &config, "Dela", Role::Citizen).await;
    let denied = chat.get_messages(first.id, stranger.id).await;
    assert!(matches!(denied, Err(AppError::NotFound(_))));
}

fn stored_file_count(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_refused_attachment_leaves_no_file() {
    let (pool, config) = setup().await;
    let (citizen, _) = register(&pool, &config, "Kafui", Role::Citizen).await;
    let (collector, _) = register(&pool, &config, "Mensah", Role::Collector).await;

    let chat = ChatService::new(pool.clone());
    let storage = StorageService::new(&config.storage);
    let conversation = chat.create_or_get(citizen.id, collector.id).await.unwrap();

    let media_dir = std::path::Path::new(&config.storage.root).join("chat_media");
    let before = stored_file_count(&media_dir);

    let refused = chat
        .send_message(
            conversation.id,
            citizen.id,
            SendMessageInput {
                content: None,
                media_type: Some("video".to_string()),
                media: Some(UploadedFile {
                    filename: "note.ogg".to_string(),
                    bytes: vec![1; 8],
                }),
            },
            &storage,
        )
        .await;
    match refused {
        Err(AppError::Validation { field, .. }) => assert_eq!(field, "media_type"),
        other => panic!("expected a media type validation error: {:?}", other),
    }
    assert_eq!(stored_file_count(&media_dir), before);

    // A media type without an attachment is plain text
    let text = chat
        .send_message(
            conversation.id,
            citizen.id,
            SendMessageInput {
                content: Some("La photo arrive".to_string()),
                media_type: Some("image".to_string()),
                media: None,
            },
            &storage,
        )
        .await
        .unwrap();
    assert_eq!(text.media_type, MediaType::Text);
    assert!(text.media_url.is_none());
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
#[ignore] // Requires database connection
async fn test_logout_revokes_token() {
    let (pool, config) = setup().await;
    let (citizen, _) = register(&pool, &config, "Yao", Role::Citizen).await;

    let auth = AuthService::new(pool.clone(), &config);
    let token = auth.generate_token(citizen.id, Role::Citizen).unwrap();
    let claims = auth.validate_token(&token).unwrap();
    assert!(!auth.is_revoked(&claims.jti).await.unwrap());

    auth.logout(&claims.jti, claims.expires_at()).await.unwrap();
    assert!(auth.is_revoked(&claims.jti).await.unwrap());
}
