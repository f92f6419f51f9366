//! Order extraction and feature building.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use super::{ModelFault, MIN_OBSERVATIONS};
use crate::models::Order;

/// One cleaned sale row for an item.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: DateTime<Utc>,
    pub quantity: f64,
    pub price: f64,
    /// Monday = 0 … Sunday = 6.
    pub day_of_week: u32,
}

impl Observation {
    pub fn new(date: DateTime<Utc>, quantity: f64, price: f64) -> Self {
        Self {
            date,
            quantity,
            price,
            day_of_week: date.weekday().num_days_from_monday(),
        }
    }
}

/// Orders with at least one line for `item_id`. Callers scope `orders` to a
/// store first.
///
/// Each order appears once no matter how many of its lines match.
pub fn relevant_orders<'a>(orders: &'a [Order], item_id: &str) -> Vec<&'a Order> {
    orders
        .iter()
        .filter(|order| order.contains_item(item_id))
        .collect()
}

/// One observation per matching line item. Rows whose order date does not
/// parse are dropped; quantity and price are already coerced to 0.0.
pub fn observations<'a, I>(orders: I, item_id: &str) -> Vec<Observation>
where
    I: IntoIterator<Item = &'a Order>,
{
    let mut rows = Vec::new();
    for order in orders {
        let Some(date) = order.created_at.as_ref().and_then(parse_timestamp) else {
            continue;
        };
        for line in order.lines_for(item_id) {
            rows.push(Observation::new(date, line.quantity(), line.unit_price()));
        }
    }
    rows
}

/// Observation table with enough rows to attempt a model fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    rows: Vec<Observation>,
}

impl FeatureTable {
    /// Builds the table for `item_id`, failing with
    /// [`ModelFault::InsufficientData`] when fewer than two rows survive cleaning.
    pub fn build<'a, I>(orders: I, item_id: &str) -> Result<Self, ModelFault>
    where
        I: IntoIterator<Item = &'a Order>,
    {
        Self::from_observations(observations(orders, item_id))
    }

    pub fn from_observations(rows: Vec<Observation>) -> Result<Self, ModelFault> {
        if rows.len() < MIN_OBSERVATIONS {
            return Err(ModelFault::InsufficientData {
                required: MIN_OBSERVATIONS,
                actual: rows.len(),
            });
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn mean_price(&self) -> f64 {
        self.rows.iter().map(|r| r.price).sum::<f64>() / self.rows.len() as f64
    }
}

/// Accepts RFC 3339, naive ISO-8601 (read as UTC), bare dates and epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => parse_timestamp_str(raw.trim()),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn orders(value: Value) -> Vec<Order> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn extractor_counts_each_order_once() {
        let orders = orders(json!([
            { "store": { "_id": "s1" }, "items": [
                { "item": { "_id": "X" }, "quantity": 1 },
                { "item": { "_id": "X" }, "quantity": 2 }
            ]},
            { "store": { "_id": "s1" }, "items": [{ "item": { "_id": "Y" }, "quantity": 4 }] },
            { "store": { "_id": "s2" }, "items": [{ "item": { "_id": "X" }, "quantity": 8 }] }
        ]));

        assert_eq!(relevant_orders(&orders, "X").len(), 2);
        assert!(relevant_orders(&orders, "Z").is_empty());
    }

    #[test]
    fn builder_emits_row_per_matching_line() {
        let orders = orders(json!([
            { "createdAt": "2024-03-04T09:00:00Z", "items": [
                { "item": { "_id": "X", "price": 2.0 }, "quantity": 1 },
                { "item": { "_id": "X", "price": 2.0 }, "quantity": 3 }
            ]},
            { "createdAt": "2024-03-10T09:00:00Z", "items": [
                { "item": { "_id": "X" }, "quantity": "n/a", "price": 1.5 }
            ]}
        ]));

        let table = FeatureTable::build(&orders, "X").unwrap();
        assert_eq!(table.len(), 3);

        let rows = table.rows();
        assert_eq!(rows[0].day_of_week, 0);
        assert_eq!(rows[1].quantity, 3.0);
        assert_eq!(rows[2].day_of_week, 6);
        assert_eq!(rows[2].quantity, 0.0);
        assert_eq!(rows[2].price, 1.5);
        assert!((table.mean_price() - 5.5 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn unparseable_dates_are_dropped_not_defaulted() {
        let orders = orders(json!([
            { "createdAt": "not a date", "items": [{ "item": { "_id": "X" }, "quantity": 5 }] },
            { "items": [{ "item": { "_id": "X" }, "quantity": 5 }] },
            { "createdAt": "2024-03-05", "items": [{ "item": { "_id": "X" }, "quantity": 5 }] }
        ]));

        let rows = observations(&orders, "X");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].day_of_week, 1);

        assert_eq!(
            FeatureTable::build(&orders, "X"),
            Err(ModelFault::InsufficientData {
                required: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 4, 10, 30, 0).unwrap();
        assert_eq!(
            parse_timestamp(&json!("2024-03-04T10:30:00.000Z")),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(&json!("2024-03-04T12:30:00+02:00")),
            Some(expected)
        );
        assert_eq!(parse_timestamp(&json!("2024-03-04T10:30:00")), Some(expected));
        assert_eq!(
            parse_timestamp(&json!(expected.timestamp_millis())),
            Some(expected)
        );
        assert_eq!(parse_timestamp(&json!("")), None);
        assert_eq!(parse_timestamp(&json!("2024-13-45")), None);
        assert_eq!(parse_timestamp(&json!(true)), None);
    }
}
