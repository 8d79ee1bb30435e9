//! Domain models for the SikaGreen platform

mod chat;
mod collection;
mod marketplace;
mod reference;
mod review;
mod stats;
mod user;

pub use chat::*;
pub use collection::*;
pub use marketplace::*;
pub use reference::*;
pub use review::*;
pub use stats::*;
pub use user::*;
