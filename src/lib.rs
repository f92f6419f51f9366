//! Stateset Forecast Service
//!
//! Reorder-quantity forecasting for store items, computed from recent order
//! history fetched from the commerce backend.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod middleware_helpers;
pub mod ml;
pub mod models;
pub mod services;
pub mod tracing;

use axum::Router;
use http::HeaderValue;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::services::{ForecastService, HttpOrderProvider};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub forecasts: Arc<ForecastService>,
}

impl AppState {
    pub fn new(config: AppConfig, forecasts: ForecastService) -> Self {
        Self {
            config,
            forecasts: Arc::new(forecasts),
        }
    }

    /// State wired to the HTTP backend named in `config`.
    pub fn from_config(config: AppConfig) -> Result<Self, ServiceError> {
        let provider = HttpOrderProvider::new(&config.backend_url, config.backend_timeout())?;
        let forecasts =
            ForecastService::new(Arc::new(provider)).with_lookback_days(config.lookback_days);
        Ok(Self::new(config, forecasts))
    }
}

/// CORS policy from config: explicit origins win, otherwise permissive when
/// allowed, otherwise same-origin only.
pub fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if config.should_allow_permissive_cors() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

/// Full application router with middleware applied.
pub fn app_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    handlers::routes()
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors)
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
