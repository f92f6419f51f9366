//! Forecast orchestration: picks the trend model or a fallback for one item.

use chrono::Weekday;
use tracing::{debug, warn};

use super::{features, heuristic, trend, FeatureTable, ForecastResult, ModelFault};
use crate::models::Order;

/// Outcome of the forecast ladder. Guards are evaluated in declaration order;
/// each failure names the condition that selected the next rung.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// No order mentions the item.
    NoRelevantOrders,
    /// Fewer than two usable observations after cleaning.
    InsufficientObservations(ModelFault),
    /// The model could not be trusted.
    ModelRejected(ModelFault),
    /// The model produced a usable estimate.
    Model(ForecastResult),
}

/// Walks the ladder for one item. `orders` is the store-scoped collection,
/// not yet filtered by item.
pub fn decide(orders: &[Order], item_id: &str, today: Weekday) -> Decision {
    let relevant = features::relevant_orders(orders, item_id);
    if relevant.is_empty() {
        return Decision::NoRelevantOrders;
    }

    let table = match FeatureTable::build(relevant, item_id) {
        Ok(table) => table,
        Err(fault) => return Decision::InsufficientObservations(fault),
    };

    match trend::estimate(&table, today) {
        Ok(result) => Decision::Model(result),
        Err(fault) => Decision::ModelRejected(fault),
    }
}

/// Forecast for one item. Never fails: every internal fault moves further
/// down the ladder, ending at the heuristic.
pub fn forecast_item(orders: &[Order], item_id: &str, today: Weekday) -> ForecastResult {
    match decide(orders, item_id, today) {
        Decision::NoRelevantOrders => {
            debug!(item_id, "no relevant orders, using default suggestion");
            ForecastResult::no_data()
        }
        Decision::InsufficientObservations(fault) => {
            debug!(item_id, reason = %fault, "using heuristic");
            heuristic::estimate(orders, item_id)
        }
        Decision::ModelRejected(fault) => {
            warn!(item_id, error = %fault, "trend model rejected, falling back to heuristic");
            heuristic::estimate(orders, item_id).after_model_fault(&fault)
        }
        Decision::Model(result) => result,
    }
}
