//! Property-based tests for the forecast pipeline.
//!
//! These check invariants that must hold for any order history: bounded
//! confidence, the quantity floor, and deterministic model fits.

use chrono::{Duration, TimeZone, Utc, Weekday};
use proptest::prelude::*;
use serde_json::json;

use stateset_forecast::ml::trend::{predict_daily_demand, LinearModel};
use stateset_forecast::ml::{
    buffered_quantity, forecast_item, FeatureTable, Observation, MAX_CONFIDENCE,
    MIN_SUGGESTED_QTY,
};
use stateset_forecast::models::{LineItem, Order, Reference};

// Strategies for generating test data
fn quantity_strategy() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        4 => (0u32..500).prop_map(|q| Some(f64::from(q))),
        1 => Just(None),
    ]
}

fn price_strategy() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        4 => (0u32..10_000).prop_map(|cents| Some(f64::from(cents) / 100.0)),
        1 => Just(None),
    ]
}

fn created_at_strategy() -> impl Strategy<Value = Option<serde_json::Value>> {
    prop_oneof![
        6 => (0i64..7 * 24).prop_map(|hours| {
            let start = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
            Some(json!((start + Duration::hours(hours)).to_rfc3339()))
        }),
        1 => Just(Some(json!("not a date"))),
        1 => Just(None),
    ]
}

fn line_strategy() -> impl Strategy<Value = LineItem> {
    (
        prop_oneof!["X", "Y"],
        quantity_strategy(),
        price_strategy(),
    )
        .prop_map(|(item_id, quantity, price)| LineItem {
            item: Some(Reference::id(item_id)),
            quantity,
            price,
        })
}

fn order_strategy() -> impl Strategy<Value = Order> {
    (
        created_at_strategy(),
        prop::collection::vec(line_strategy(), 0..4),
    )
        .prop_map(|(created_at, items)| Order {
            id: None,
            store: Some(Reference::id("s1")),
            created_at,
            items,
        })
}

fn weekday_strategy() -> impl Strategy<Value = Weekday> {
    (0u8..7).prop_map(|d| (0..d).fold(Weekday::Mon, |day, _| day.succ()))
}

// Property: every forecast is bounded
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn confidence_and_quantity_are_bounded(
        orders in prop::collection::vec(order_strategy(), 0..20),
        today in weekday_strategy(),
    ) {
        let result = forecast_item(&orders, "X", today);

        prop_assert!(result.confidence >= 0.3, "confidence {} below base", result.confidence);
        prop_assert!(result.confidence <= MAX_CONFIDENCE, "confidence {} above cap", result.confidence);
        prop_assert!(result.suggested_qty >= MIN_SUGGESTED_QTY);
        prop_assert!(!result.reasoning.is_empty());
    }

    #[test]
    fn forecasts_are_deterministic(
        orders in prop::collection::vec(order_strategy(), 0..20),
        today in weekday_strategy(),
    ) {
        prop_assert_eq!(
            forecast_item(&orders, "X", today),
            forecast_item(&orders, "X", today)
        );
    }
}

// Property: buffering rule
proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn buffered_quantity_matches_rule(rate in 0.0f64..100_000.0) {
        let expected = ((rate * 1.2).ceil() as i64).max(5);
        prop_assert_eq!(buffered_quantity(rate), expected);
    }
}

// Property: regression is a pure function of its input
proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn refitting_gives_identical_model(
        rows in prop::collection::vec((0u32..7, 0.0f64..1_000.0, 0.0f64..500.0), 2..30)
    ) {
        let inputs: Vec<[f64; 2]> = rows.iter().map(|(d, _, p)| [f64::from(*d), *p]).collect();
        let targets: Vec<f64> = rows.iter().map(|(_, q, _)| *q).collect();

        let first = LinearModel::fit(&inputs, &targets);
        let second = LinearModel::fit(&inputs, &targets);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn constant_features_predict_mean_quantity(
        quantities in prop::collection::vec(0.0f64..1_000.0, 2..30),
        price in 0.0f64..100.0,
    ) {
        let monday = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        let rows: Vec<Observation> = quantities
            .iter()
            .map(|q| Observation::new(monday, *q, price))
            .collect();
        let table = FeatureTable::from_observations(rows).unwrap();

        let mean = quantities.iter().sum::<f64>() / quantities.len() as f64;
        let predicted = predict_daily_demand(&table, Weekday::Mon).unwrap();
        prop_assert!((predicted - mean).abs() < 1e-6 * mean.max(1.0));
    }
}
