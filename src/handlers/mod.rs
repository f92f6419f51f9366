pub mod forecasts;
pub mod health;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json, Router,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::errors::ServiceError;
pub use crate::AppState;

/// All HTTP routes of the service
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::health_routes())
        .merge(forecasts::forecast_routes())
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input.validate().map_err(ServiceError::from)
}

/// `Json` extractor whose rejections render as [`ServiceError`] bodies.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(rejection_to_error(rejection)),
        }
    }
}

fn rejection_to_error(rejection: JsonRejection) -> ServiceError {
    ServiceError::ValidationError(rejection.body_text())
}
