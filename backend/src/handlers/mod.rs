//! HTTP handlers

pub mod auth;
pub mod chat;
pub mod collection;
pub mod health;
pub mod json;
pub mod marketplace;
pub mod reference;
pub mod review;
pub mod stats;
pub mod upload;

pub use auth::*;
pub use chat::*;
pub use collection::*;
pub use health::*;
pub use json::*;
pub use marketplace::*;
pub use reference::*;
pub use review::*;
pub use stats::*;
pub use upload::*;
