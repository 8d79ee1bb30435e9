//! WebAssembly module for the SikaGreen platform
//!
//! Provides client-side computation for:
//! - Order totals before checkout
//! - Waste weight parsing and CO2 totals for dashboards
//! - Which collection and order actions to offer
//! - Offline form validation

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use shared::models::{
    checked_order_total, co2_avoided_kg, parse_quantity_kg, round_to, total_weight_kg, CollectionStatus,
    CollectionTransition, OrderStatus, OrderTransition, RatingSummary,
};
use shared::validation::{validate_password, validate_togo_phone};

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Total in FCFA for `quantity` units at `price_per_unit`
#[wasm_bindgen]
pub fn calculate_order_total(quantity: i32, price_per_unit: f64) -> Result<f64, JsValue> {
    let price = Decimal::try_from(price_per_unit)
        .map_err(|e| JsValue::from_str(&format!("Invalid price: {}", e)))?;
    checked_order_total(quantity, price)
        .map(to_f64)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Kilograms read from a free-text quantity such as "50kg"
#[wasm_bindgen]
pub fn parse_waste_quantity(quantity: &str) -> f64 {
    to_f64(parse_quantity_kg(quantity))
}

/// Estimated CO2 avoided, in kilograms, for a recycled weight
#[wasm_bindgen]
pub fn estimate_co2_avoided(waste_kg: f64) -> f64 {
    let waste = Decimal::try_from(waste_kg).unwrap_or(Decimal::ZERO);
    to_f64(co2_avoided_kg(waste))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WasteSummary {
    total_kg: f64,
    co2_avoided_kg: f64,
}

/// Weight and CO2 totals for a JSON array of free-text quantities,
/// rounded to two decimals like the dashboard
#[wasm_bindgen]
pub fn summarize_waste(quantities_json: &str) -> Result<String, JsValue> {
    let quantities: Vec<String> = serde_json::from_str(quantities_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid quantities JSON: {}", e)))?;

    let total = total_weight_kg(quantities.iter().map(String::as_str));
    let summary = WasteSummary {
        total_kg: to_f64(round_to(total, 2)),
        co2_avoided_kg: to_f64(round_to(co2_avoided_kg(total), 2)),
    };

    serde_json::to_string(&summary).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Mean rating rounded to one decimal, or `undefined` with no ratings
#[wasm_bindgen]
pub fn average_rating(ratings: &[i32]) -> Option<f64> {
    RatingSummary::from_ratings(ratings).rating.map(to_f64)
}

fn collection_action(action: &str) -> Option<CollectionTransition> {
    match action {
        "accept" => Some(CollectionTransition::Accept),
        "reject" => Some(CollectionTransition::Reject),
        "start" => Some(CollectionTransition::Start),
        "complete" => Some(CollectionTransition::Complete),
        "cancel" => Some(CollectionTransition::Cancel),
        _ => None,
    }
}

fn order_action(action: &str) -> Option<OrderTransition> {
    match action {
        "accept" => Some(OrderTransition::Accept),
        "reject" => Some(OrderTransition::Reject),
        "complete" => Some(OrderTransition::Complete),
        "cancel" => Some(OrderTransition::Cancel),
        _ => None,
    }
}

/// Status a collection moves to after `action`, if `status` allows it
#[wasm_bindgen]
pub fn collection_next_status(status: &str, action: &str) -> Option<String> {
    let status = CollectionStatus::parse(status)?;
    let transition = collection_action(action)?;
    (transition.source() == status).then(|| transition.target().as_str().to_string())
}

/// Whether an order in `status` still offers `action`
#[wasm_bindgen]
pub fn order_action_allowed(status: &str, action: &str) -> bool {
    match (OrderStatus::parse(status), order_action(action)) {
        (Some(status), Some(transition)) => transition.sources().contains(&status),
        _ => false,
    }
}

/// Validate a Togolese phone number
#[wasm_bindgen]
pub fn is_valid_phone(phone: &str) -> bool {
    validate_togo_phone(phone).is_ok()
}

#[wasm_bindgen]
pub fn is_valid_password(password: &str) -> bool {
    validate_password(password).is_ok()
}
