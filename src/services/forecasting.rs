use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use super::order_provider::OrderProvider;
use super::store_batch::{run_store_batch, PerItemForecast};
use crate::errors::ServiceError;
use crate::ml::{self, ForecastResult};
use crate::models::Order;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Forecasts for every item of a store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreForecast {
    pub store_id: String,
    pub forecasts: Vec<PerItemForecast>,
    pub timestamp: DateTime<Utc>,
}

/// Reorder forecasting over data fetched from an [`OrderProvider`].
///
/// Stateless between calls: every forecast works on freshly fetched orders.
#[derive(Clone)]
pub struct ForecastService {
    provider: Arc<dyn OrderProvider>,
    clock: Arc<dyn Clock>,
    lookback: Duration,
}

impl ForecastService {
    pub fn new(provider: Arc<dyn OrderProvider>) -> Self {
        Self {
            provider,
            clock: Arc::new(SystemClock),
            lookback: Duration::days(i64::from(ml::LOOKBACK_DAYS)),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback = Duration::days(i64::from(days));
        self
    }

    /// Reorder suggestion for one item of a store.
    #[instrument(skip(self))]
    pub async fn forecast_item(
        &self,
        store_id: &str,
        item_id: &str,
    ) -> Result<ForecastResult, ServiceError> {
        require_id("storeId", store_id)?;
        require_id("itemId", item_id)?;

        let now = self.clock.now();
        let orders = self
            .fetch_orders(Some(store_id), now - self.lookback)
            .await?;

        let result = ml::forecast_item(&orders, item_id, now.weekday());
        crate::metrics::record_outcome(result.method);
        info!(
            method = result.method.as_str(),
            suggested_qty = result.suggested_qty,
            confidence = result.confidence,
            "item forecast computed"
        );
        Ok(result)
    }

    /// Reorder suggestions for every item of a store.
    ///
    /// Fetch failures abort the whole batch; anything that goes wrong for a
    /// single item only zeroes that item's entry.
    #[instrument(skip(self))]
    pub async fn forecast_store(&self, store_id: &str) -> Result<StoreForecast, ServiceError> {
        require_id("storeId", store_id)?;

        let items = self
            .provider
            .fetch_store_items(store_id)
            .await
            .map_err(record_upstream)?;

        let now = self.clock.now();
        let orders = self.fetch_orders(None, now - self.lookback).await?;
        let store_orders: Arc<Vec<Order>> = Arc::new(
            orders
                .into_iter()
                .filter(|order| order.belongs_to_store(store_id))
                .collect(),
        );

        let today = now.weekday();
        let forecasts = run_store_batch(items, move |item_id| {
            let result = ml::forecast_item(&store_orders, item_id, today);
            crate::metrics::record_outcome(result.method);
            result
        })
        .await;

        info!(items = forecasts.len(), "store forecast computed");
        Ok(StoreForecast {
            store_id: store_id.to_string(),
            forecasts,
            timestamp: self.clock.now(),
        })
    }

    async fn fetch_orders(
        &self,
        store_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Order>, ServiceError> {
        self.provider
            .fetch_orders(store_id, since)
            .await
            .map_err(record_upstream)
    }
}

fn record_upstream(err: ServiceError) -> ServiceError {
    crate::metrics::record_upstream_error(&err);
    err
}

fn require_id(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}
