use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, instrument};
use url::Url;

use crate::errors::ServiceError;
use crate::models::{Item, ItemsEnvelope, Order, OrdersEnvelope};

/// Source of orders and store items.
#[async_trait]
pub trait OrderProvider: Send + Sync {
    /// Orders created at or after `since`, optionally limited to one store.
    async fn fetch_orders(
        &self,
        store_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Order>, ServiceError>;

    /// Active items of a store.
    async fn fetch_store_items(&self, store_id: &str) -> Result<Vec<Item>, ServiceError>;
}

/// [`OrderProvider`] backed by the commerce backend's JSON API.
#[derive(Clone)]
pub struct HttpOrderProvider {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpOrderProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ServiceError::InternalError(format!("invalid backend url: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::InternalError(format!(
                "backend url cannot be a base: {}",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ServiceError> {
        let response = request.send().await.map_err(|e| {
            error!(error = %e, "backend request failed");
            ServiceError::UpstreamUnavailable(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::UpstreamUnavailable(e.to_string()))?;

        if !status.is_success() {
            error!(status = status.as_u16(), body = %body, "backend returned error status");
            return Err(ServiceError::UpstreamError {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "backend payload could not be decoded");
            ServiceError::InvalidUpstreamPayload(e.to_string())
        })
    }
}

#[async_trait]
impl OrderProvider for HttpOrderProvider {
    #[instrument(skip(self))]
    async fn fetch_orders(
        &self,
        store_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Order>, ServiceError> {
        let url = self.endpoint(&["api", "orders", "ml", "public"]);
        let mut query = vec![("since", since.to_rfc3339_opts(SecondsFormat::Millis, true))];
        if let Some(store_id) = store_id {
            query.push(("storeId", store_id.to_string()));
        }

        let envelope: OrdersEnvelope = self.get_json(self.client.get(url).query(&query)).await?;
        debug!(count = envelope.orders.len(), "fetched orders");
        Ok(envelope.orders)
    }

    #[instrument(skip(self))]
    async fn fetch_store_items(&self, store_id: &str) -> Result<Vec<Item>, ServiceError> {
        let url = self.endpoint(&["api", "items", "store", store_id]);

        let envelope: ItemsEnvelope = self.get_json(self.client.get(url)).await?;
        debug!(count = envelope.items.len(), "fetched store items");
        Ok(envelope.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_extend_base_path() {
        let provider =
            HttpOrderProvider::new("http://127.0.0.1:5000", Duration::from_secs(1)).unwrap();
        assert_eq!(
            provider.endpoint(&["api", "orders", "ml", "public"]).as_str(),
            "http://127.0.0.1:5000/api/orders/ml/public"
        );

        let prefixed =
            HttpOrderProvider::new("http://backend.local/commerce/", Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            prefixed.endpoint(&["api", "items", "store", "s 1"]).as_str(),
            "http://backend.local/commerce/api/items/store/s%201"
        );
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(HttpOrderProvider::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HttpOrderProvider::new("mailto:ops@example.com", Duration::from_secs(1)).is_err());
    }
}
