//! Platform statistics

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Rough estimate: each kilogram recycled avoids half a kilogram of CO2
pub const CO2_KG_PER_WASTE_KG: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Heaviest single pickup counted by the statistics; larger values count as 0
pub const MAX_QUANTITY_KG: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Extract a weight in kilograms from a free-text quantity.
///
/// Every character other than digits and dots is dropped, then the longest
/// leading decimal number is read. "50kg" gives 50, "2,5 kg" gives 25,
/// "1.5.2" gives 1.5 and text without digits gives 0. Numbers that do not
/// fit a `Decimal` or exceed [`MAX_QUANTITY_KG`] also give 0.
pub fn parse_quantity_kg(quantity: &str) -> Decimal {
    let kept: String = quantity
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut number = String::with_capacity(kept.len() + 1);
    let mut seen_dot = false;
    for c in kept.chars() {
        if c == '.' {
            if seen_dot {
                break;
            }
            seen_dot = true;
        }
        number.push(c);
    }

    let number = number.trim_end_matches('.');
    if number.is_empty() {
        return Decimal::ZERO;
    }
    let number = if number.starts_with('.') {
        format!("0{}", number)
    } else {
        number.to_string()
    };

    match Decimal::from_str(&number) {
        Ok(kg) if kg <= MAX_QUANTITY_KG => kg,
        _ => Decimal::ZERO,
    }
}

/// Total weight of a set of quantities, as used by the dashboards.
/// Saturates at `Decimal::MAX` instead of overflowing.
pub fn total_weight_kg<'a>(quantities: impl IntoIterator<Item = &'a str>) -> Decimal {
    quantities
        .into_iter()
        .map(parse_quantity_kg)
        .fold(Decimal::ZERO, |total, kg| {
            total.checked_add(kg).unwrap_or(Decimal::MAX)
        })
}

pub fn co2_avoided_kg(waste_kg: Decimal) -> Decimal {
    waste_kg
        .checked_mul(CO2_KG_PER_WASTE_KG)
        .unwrap_or(Decimal::MAX)
}

/// Round half away from zero, as the dashboards display
pub fn round_to(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Landing page counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_waste_recycled: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub co2_avoided: Decimal,
    pub families_engaged: i64,
    pub active_collectors: i64,
}

impl GlobalStats {
    pub fn compute(waste_kg: Decimal, families_engaged: i64, active_collectors: i64) -> Self {
        Self {
            total_waste_recycled: round_to(waste_kg, 0),
            co2_avoided: round_to(co2_avoided_kg(waste_kg), 0),
            families_engaged,
            active_collectors,
        }
    }
}

/// Dashboard counters for citizens and collectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDashboard {
    pub pending_collections: i64,
    pub completed_this_month: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_weight: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_earnings: Decimal,
}

/// Dashboard counters for recyclers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecyclerDashboard {
    pub total_sales: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
    pub active_products: i64,
    pub total_products: i64,
}

/// Role-dependent dashboard payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DashboardStats {
    Collections(CollectionDashboard),
    Recycler(RecyclerDashboard),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_common_quantities() {
        assert_eq!(parse_quantity_kg("50kg"), dec("50"));
        assert_eq!(parse_quantity_kg("12.5 kg"), dec("12.5"));
        assert_eq!(parse_quantity_kg("environ 3 sacs"), dec("3"));
    }

    #[test]
    fn test_parse_degenerate_quantities() {
        assert_eq!(parse_quantity_kg(""), Decimal::ZERO);
        assert_eq!(parse_quantity_kg("beaucoup"), Decimal::ZERO);
        assert_eq!(parse_quantity_kg("."), Decimal::ZERO);
        assert_eq!(parse_quantity_kg(".5kg"), dec("0.5"));
        assert_eq!(parse_quantity_kg("5."), dec("5"));
        assert_eq!(parse_quantity_kg("1.5.2"), dec("1.5"));
        // The comma is dropped like any other character
        assert_eq!(parse_quantity_kg("2,5 kg"), dec("25"));
    }

    #[test]
    fn test_total_weight() {
        assert_eq!(total_weight_kg(["50kg", "20 kg", "?"]), dec("70"));
    }

    #[test]
    fn test_oversized_quantities_count_as_nothing() {
        assert_eq!(parse_quantity_kg("1000000kg"), dec("1000000"));
        assert_eq!(parse_quantity_kg("1000000.5kg"), Decimal::ZERO);
        assert_eq!(parse_quantity_kg("70000000000000000000000000000kg"), Decimal::ZERO);
        assert_eq!(parse_quantity_kg(&"9".repeat(200)), Decimal::ZERO);
    }

    #[test]
    fn test_co2_is_half_the_weight() {
        assert_eq!(co2_avoided_kg(dec("125.5")), dec("62.75"));
    }

    #[test]
    fn test_global_stats_rounding() {
        let stats = GlobalStats::compute(dec("101.4"), 12, 3);
        assert_eq!(stats.total_waste_recycled, dec("101"));
        // 50.7 rounds up
        assert_eq!(stats.co2_avoided, dec("51"));
        assert_eq!(stats.families_engaged, 12);
    }

    #[test]
    fn test_dashboard_serializes_flat() {
        let stats = DashboardStats::Recycler(RecyclerDashboard {
            total_sales: 2,
            total_revenue: dec("5000"),
            active_products: 1,
            total_products: 3,
        });
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalSales"], 2);
        assert_eq!(json["totalRevenue"], 5000.0);
    }
}
