/*!
 * # Reorder Forecasting
 *
 * Turns raw order history into a bounded reorder suggestion:
 *
 * - `features`: order extraction and the cleaned observation table
 * - `heuristic`: totals-based estimator, the fallback of last resort
 * - `trend`: least-squares model over day-of-week and price
 * - `forecasting`: the decision ladder choosing between them
 *
 * Everything here is pure and synchronous; fetching lives in `services`.
 */

pub mod features;
pub mod forecasting;
pub mod heuristic;
pub mod trend;

pub use features::{relevant_orders, FeatureTable, Observation};
pub use forecasting::{decide, forecast_item, Decision};

use serde::Serialize;

/// Fixed lookback window the heuristic averages over, in days.
pub const LOOKBACK_DAYS: u32 = 7;
/// Safety buffer applied to every predicted daily rate.
pub const SAFETY_BUFFER: f64 = 1.2;
/// Smallest quantity ever suggested.
pub const MIN_SUGGESTED_QTY: i64 = 5;
pub const BASE_CONFIDENCE: f64 = 0.3;
pub const MAX_CONFIDENCE: f64 = 0.9;
/// Observations needed before the trend model is tried.
pub const MIN_OBSERVATIONS: usize = 2;

/// Which rung of the ladder produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    /// No relevant orders at all.
    Default,
    Heuristic,
    Model,
    /// Heuristic used after the model faulted.
    ModelFallback,
    /// Per-item fault in a store batch.
    Failed,
}

impl ForecastMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Heuristic => "heuristic",
            Self::Model => "model",
            Self::ModelFallback => "model_fallback",
            Self::Failed => "failed",
        }
    }
}

/// A reorder suggestion with its confidence and a human-readable rationale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    pub suggested_qty: i64,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(skip)]
    pub method: ForecastMethod,
}

impl ForecastResult {
    /// Result for an item with no relevant orders.
    pub fn no_data() -> Self {
        Self {
            suggested_qty: MIN_SUGGESTED_QTY,
            confidence: BASE_CONFIDENCE,
            reasoning: "No order data available, default suggestion.".to_string(),
            method: ForecastMethod::Default,
        }
    }

    /// Zeroed result recorded for an item whose computation faulted.
    pub fn failed(cause: impl std::fmt::Display) -> Self {
        Self {
            suggested_qty: 0,
            confidence: 0.0,
            reasoning: format!("Forecast failed: {}", cause),
            method: ForecastMethod::Failed,
        }
    }

    /// Marks a heuristic result as the fallback for a model fault.
    pub(crate) fn after_model_fault(mut self, fault: &ModelFault) -> Self {
        self.reasoning = format!("Fallback due to ML error: {}. {}", fault, self.reasoning);
        self.method = ForecastMethod::ModelFallback;
        self
    }
}

/// Why the trend model could not be used. Never surfaced to callers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelFault {
    #[error("Insufficient data for ML ({actual} usable records, need {required})")]
    InsufficientData { required: usize, actual: usize },

    #[error("Invalid prediction from ML model (non-finite value in {0})")]
    NonFinite(&'static str),

    #[error("Invalid prediction from ML model (negative demand {0:.2})")]
    NegativePrediction(f64),
}

/// `max(ceil(rate * 1.2), 5)`.
pub fn buffered_quantity(daily_rate: f64) -> i64 {
    let buffered = (daily_rate * SAFETY_BUFFER).ceil();
    // `as` saturates on overflow and maps NaN to 0; both land on the floor or a bounded value.
    (buffered as i64).max(MIN_SUGGESTED_QTY)
}

/// `min(0.9, 0.3 + step * count)`.
pub fn scaled_confidence(step: f64, count: usize) -> f64 {
    (BASE_CONFIDENCE + step * count as f64).min(MAX_CONFIDENCE)
}
