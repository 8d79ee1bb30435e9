//! Shared types and models for the SikaGreen platform
//!
//! This crate contains the domain rules shared between the backend, the
//! web client (via WASM), and the test suites: status state machines,
//! rating aggregation, quantity parsing and input validation.

pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
