//! Domain rule violations

use thiserror::Error;

/// A request that breaks a domain rule.
///
/// The backend maps these onto HTTP statuses; the WASM module surfaces the
/// message to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The actor is not allowed to perform this action
    #[error("{0}")]
    Forbidden(&'static str),

    /// The entity is not in a state that allows this action
    #[error("{0}")]
    InvalidState(&'static str),

    /// Malformed or out-of-range input
    #[error("{field}: {message}")]
    Invalid {
        field: &'static str,
        message: &'static str,
    },
}

pub type DomainResult<T> = Result<T, DomainError>;
