//! Authentication tests
//!
//! Property-based and unit tests for:
//! - Togolese phone number formats
//! - Password length rule
//! - Access token claims and revocation hashes

use proptest::prelude::*;
use shared::{validate_password, validate_togo_phone, Role};
use sikagreen_backend::error::AppError;
use sikagreen_backend::services::auth::{decode_claims, encode_claims, hash_jti};
use uuid::Uuid;

const SECRET: &str = "property-secret";

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Generate valid Togolese phone numbers in the formats people type
fn togo_phone_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        // Bare subscriber number: 90123456
        "9[0-9]{7}",
        // Grouped by pairs: 90 12 34 56
        "9[0-9] [0-9]{2} [0-9]{2} [0-9]{2}",
        // International: +228 90123456
        "\\+228 ?9[0-9]{7}",
        // International with 00: 0022890123456
        "00228[0-9]{8}",
    ]
}

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Citizen),
        Just(Role::Collector),
        Just(Role::Recycler),
    ]
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Every common Togolese format is accepted
    #[test]
    fn test_togo_phone_formats(phone in togo_phone_strategy()) {
        prop_assert!(validate_togo_phone(&phone).is_ok(), "{} should be valid", phone);
    }

    /// Numbers that are too short are refused
    #[test]
    fn test_short_numbers_rejected(phone in "[0-9]{1,7}") {
        prop_assert!(validate_togo_phone(&phone).is_err());
    }

    /// Letters are never part of a phone number
    #[test]
    fn test_letters_rejected(phone in "[0-9]{0,4}[a-zA-Z]{1,4}[0-9]{0,4}") {
        prop_assert!(validate_togo_phone(&phone).is_err());
    }

    /// Passwords need at least 6 characters
    #[test]
    fn test_password_length(password in "[a-zA-Z0-9!@#$%]{0,20}") {
        prop_assert_eq!(validate_password(&password).is_ok(), password.chars().count() >= 6);
    }

    /// Claims survive a sign/verify cycle for every role
    #[test]
    fn test_token_round_trip(bytes in any::<u128>(), role in role_strategy()) {
        let user_id = Uuid::from_u128(bytes);
        let token = encode_claims(user_id, role, SECRET, 3600).unwrap();
        let claims = decode_claims(&token, SECRET).unwrap();

        prop_assert_eq!(claims.user_id().unwrap(), user_id);
        prop_assert_eq!(claims.role().unwrap(), role);
        prop_assert!(!claims.jti.is_empty());
    }

    /// Revocation keys are 64 hex characters and stable
    #[test]
    fn test_jti_hash_shape(jti in "[a-f0-9-]{1,64}") {
        let hashed = hash_jti(&jti);
        prop_assert_eq!(hashed.len(), 64);
        prop_assert!(hashed.chars().all(|c| c.is_ascii_hexdigit()));
        prop_assert_eq!(hashed, hash_jti(&jti));
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_tampered_token_is_invalid() {
    let token = encode_claims(Uuid::new_v4(), Role::Citizen, SECRET, 3600).unwrap();
    let tampered = format!("{}x", token);
    assert!(matches!(
        decode_claims(&tampered, SECRET),
        Err(AppError::InvalidToken)
    ));
}

#[test]
fn test_expired_token_reports_expiry() {
    let token = encode_claims(Uuid::new_v4(), Role::Recycler, SECRET, -600).unwrap();
    assert!(matches!(
        decode_claims(&token, SECRET),
        Err(AppError::TokenExpired)
    ));
}

#[test]
fn test_each_token_gets_its_own_jti() {
    let user_id = Uuid::new_v4();
    let a = decode_claims(&encode_claims(user_id, Role::Citizen, SECRET, 60).unwrap(), SECRET).unwrap();
    let b = decode_claims(&encode_claims(user_id, Role::Citizen, SECRET, 60).unwrap(), SECRET).unwrap();
    assert_ne!(a.jti, b.jti);
    assert_ne!(hash_jti(&a.jti), hash_jti(&b.jti));
}
