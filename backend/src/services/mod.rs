//! Business logic services for the SikaGreen platform

pub mod auth;
pub mod chat;
pub mod collection;
pub mod order;
pub mod product;
pub mod reference;
pub mod review;
pub mod stats;
pub mod storage;
pub mod user;

pub use auth::AuthService;
pub use chat::ChatService;
pub use collection::CollectionService;
pub use order::OrderService;
pub use product::ProductService;
pub use reference::ReferenceService;
pub use review::ReviewService;
pub use stats::{StatsCache, StatsService};
pub use storage::StorageService;
pub use user::UserService;
