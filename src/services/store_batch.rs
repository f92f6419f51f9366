//! Fan-out of the single-item forecast over every item of a store.

use serde::Serialize;
use std::any::Any;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::warn;

use crate::ml::ForecastResult;
use crate::models::Item;

/// A per-item failure inside a batch. Absorbed into that item's entry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ItemFault {
    #[error("item has no id")]
    MissingItemId,

    #[error("{0}")]
    Panicked(String),

    #[error("forecast task was cancelled")]
    Cancelled,
}

impl From<JoinError> for ItemFault {
    fn from(err: JoinError) -> Self {
        if err.is_panic() {
            ItemFault::Panicked(panic_message(err.into_panic()))
        } else {
            ItemFault::Cancelled
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unexpected fault".to_string())
}

/// Forecast for one stocked item, as reported in a store batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerItemForecast {
    pub item_id: Option<String>,
    pub item_name: Option<String>,
    pub current_qty: Option<i64>,
    pub reorder_threshold: Option<i64>,
    #[serde(flatten)]
    pub forecast: ForecastResult,
}

impl PerItemForecast {
    fn new(item: Item, forecast: ForecastResult) -> Self {
        Self {
            item_id: item.id,
            item_name: item.name,
            current_qty: item.current_qty,
            reorder_threshold: item.reorder_threshold,
            forecast,
        }
    }
}

/// Runs `forecast` for each item on the blocking pool and collects the
/// results in item order. A fault in one item zeroes that item's entry and
/// never affects the others.
pub async fn run_store_batch<F>(items: Vec<Item>, forecast: F) -> Vec<PerItemForecast>
where
    F: Fn(&str) -> ForecastResult + Send + Sync + 'static,
{
    let forecast = Arc::new(forecast);

    let tasks: Vec<_> = items
        .into_iter()
        .map(|item| {
            let handle = item.id.clone().map(|item_id| {
                let forecast = Arc::clone(&forecast);
                tokio::task::spawn_blocking(move || forecast(&item_id))
            });
            (item, handle)
        })
        .collect();

    let mut forecasts = Vec::with_capacity(tasks.len());
    for (item, handle) in tasks {
        let outcome = match handle {
            Some(handle) => handle.await.map_err(ItemFault::from),
            None => Err(ItemFault::MissingItemId),
        };

        let result = outcome.unwrap_or_else(|fault| {
            warn!(item_id = ?item.id, error = %fault, "item forecast failed");
            crate::metrics::record_item_fault();
            ForecastResult::failed(&fault)
        });
        forecasts.push(PerItemForecast::new(item, result));
    }
    forecasts
}
