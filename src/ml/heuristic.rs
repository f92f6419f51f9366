//! Totals-based estimator. Always produces a result.

use super::{
    buffered_quantity, scaled_confidence, ForecastMethod, ForecastResult, BASE_CONFIDENCE,
    LOOKBACK_DAYS,
};
use crate::models::Order;

const CONFIDENCE_PER_ORDER: f64 = 0.1;

/// Raw totals the heuristic is computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalesTotals {
    pub total_sold: f64,
    pub matching_orders: usize,
}

impl SalesTotals {
    /// Sums sales of `item_id` over `orders`.
    ///
    /// Only the first matching line of each order is counted, both towards
    /// the quantity and the order count. Later matching lines in the same
    /// order are ignored.
    pub fn collect<'a, I>(orders: I, item_id: &str) -> Self
    where
        I: IntoIterator<Item = &'a Order>,
    {
        let mut totals = SalesTotals {
            total_sold: 0.0,
            matching_orders: 0,
        };
        for order in orders {
            if let Some(line) = order.lines_for(item_id).next() {
                totals.total_sold += line.quantity();
                totals.matching_orders += 1;
            }
        }
        totals
    }

    pub fn average_daily(&self) -> f64 {
        self.total_sold / f64::from(LOOKBACK_DAYS)
    }
}

/// Heuristic forecast for `item_id` from the full (store-scoped) order set.
pub fn estimate<'a, I>(orders: I, item_id: &str) -> ForecastResult
where
    I: IntoIterator<Item = &'a Order>,
{
    from_totals(SalesTotals::collect(orders, item_id))
}

pub fn from_totals(totals: SalesTotals) -> ForecastResult {
    let average_daily = totals.average_daily();
    let confidence = if totals.matching_orders == 0 {
        BASE_CONFIDENCE
    } else {
        scaled_confidence(CONFIDENCE_PER_ORDER, totals.matching_orders)
    };

    ForecastResult {
        suggested_qty: buffered_quantity(average_daily),
        confidence,
        reasoning: format!(
            "Fallback heuristic: Based on {} units sold in the last {} days ({:.1}/day).",
            totals.total_sold, LOOKBACK_DAYS, average_daily
        ),
        method: ForecastMethod::Heuristic,
    }
}
