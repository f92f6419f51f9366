/*!
 * # Metrics Module
 *
 * Counters emitted by the forecast service through the `metrics` facade.
 * Nothing is recorded until the binary installs a recorder; the service
 * itself does not expose an exporter.
 *
 * - `forecast.outcome{method}`: one per forecast result
 * - `forecast.item_fault`: per-item faults absorbed inside a store batch
 * - `forecast.upstream_error{kind}`: failed backend fetches
 */

use metrics::counter;

use crate::errors::ServiceError;
use crate::ml::ForecastMethod;

pub const FORECAST_OUTCOME: &str = "forecast.outcome";
pub const FORECAST_ITEM_FAULT: &str = "forecast.item_fault";
pub const FORECAST_UPSTREAM_ERROR: &str = "forecast.upstream_error";

pub fn record_outcome(method: ForecastMethod) {
    counter!(FORECAST_OUTCOME, 1, "method" => method.as_str());
}

pub fn record_item_fault() {
    counter!(FORECAST_ITEM_FAULT, 1);
}

pub fn record_upstream_error(err: &ServiceError) {
    counter!(FORECAST_UPSTREAM_ERROR, 1, "kind" => upstream_kind(err));
}

fn upstream_kind(err: &ServiceError) -> &'static str {
    match err {
        ServiceError::UpstreamUnavailable(_) => "unavailable",
        ServiceError::UpstreamError { .. } => "status",
        ServiceError::InvalidUpstreamPayload(_) => "payload",
        _ => "other",
    }
}
