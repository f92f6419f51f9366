//! Least-squares trend estimator.
//!
//! Fits `quantity ~ intercept + b0 * day_of_week + b1 * price` and predicts
//! demand for today's weekday at the mean observed price.

use chrono::Weekday;

use super::{
    buffered_quantity, scaled_confidence, FeatureTable, ForecastMethod, ForecastResult,
    ModelFault, MIN_OBSERVATIONS,
};

const CONFIDENCE_PER_RECORD: f64 = 0.05;

/// Rounding slack, in ulps, tolerated when centering a column or scaling the
/// normal matrix.
const NOISE_ULPS: f64 = 64.0;

/// Fitted linear model over two regressors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: [f64; 2],
}

impl LinearModel {
    /// Ordinary least squares with an intercept.
    ///
    /// The problem is solved on mean-centered data. When the regressors are
    /// constant or collinear the minimum-norm solution is returned, so the
    /// fit itself only fails on non-finite input.
    pub fn fit(inputs: &[[f64; 2]], targets: &[f64]) -> Result<Self, ModelFault> {
        let n = inputs.len().min(targets.len());
        if n < MIN_OBSERVATIONS {
            return Err(ModelFault::InsufficientData {
                required: MIN_OBSERVATIONS,
                actual: n,
            });
        }
        let (inputs, targets) = (&inputs[..n], &targets[..n]);
        let count = n as f64;

        let mean_x = [
            inputs.iter().map(|x| x[0]).sum::<f64>() / count,
            inputs.iter().map(|x| x[1]).sum::<f64>() / count,
        ];
        let mean_y = targets.iter().sum::<f64>() / count;
        ensure_finite("means", &[mean_x[0], mean_x[1], mean_y])?;

        // Centered normal equations: S * b = t
        let (mut s00, mut s01, mut s11, mut t0, mut t1) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for (x, y) in inputs.iter().zip(targets) {
            let (d0, d1, dy) = (x[0] - mean_x[0], x[1] - mean_x[1], y - mean_y);
            s00 += d0 * d0;
            s01 += d0 * d1;
            s11 += d1 * d1;
            t0 += d0 * dy;
            t1 += d1 * dy;
        }
        ensure_finite("normal equations", &[s00, s01, s11, t0, t1])?;

        // Columns whose spread is only rounding noise from the mean are constant.
        let is_constant = |column: usize, spread: f64| {
            let magnitude = inputs.iter().map(|x| x[column].abs()).fold(0.0, f64::max);
            spread <= count * (NOISE_ULPS * f64::EPSILON * magnitude).powi(2)
        };
        if is_constant(0, s00) {
            (s00, s01, t0) = (0.0, 0.0, 0.0);
        }
        if is_constant(1, s11) {
            (s11, s01, t1) = (0.0, 0.0, 0.0);
        }

        let coefficients = solve_normal_equations(s00, s01, s11, [t0, t1], count);
        let intercept = mean_y - coefficients[0] * mean_x[0] - coefficients[1] * mean_x[1];
        ensure_finite("coefficients", &[coefficients[0], coefficients[1], intercept])?;

        Ok(Self {
            intercept,
            coefficients,
        })
    }

    pub fn predict(&self, x: [f64; 2]) -> f64 {
        self.intercept + self.coefficients[0] * x[0] + self.coefficients[1] * x[1]
    }
}

/// Minimum-norm solve of `[[s00, s01], [s01, s11]] * b = rhs`.
///
/// Rank is decided on the unit-norm design, so it does not depend on the units
/// of either column. The scaled normal matrix has eigenvalues `1 + |r|` and
/// `1 - |r|`; the smaller counts as zero once it is within rounding of the
/// larger.
fn solve_normal_equations(s00: f64, s01: f64, s11: f64, rhs: [f64; 2], count: f64) -> [f64; 2] {
    match (s00 > 0.0, s11 > 0.0) {
        (false, false) => return [0.0, 0.0],
        (true, false) => return [rhs[0] / s00, 0.0],
        (false, true) => return [0.0, rhs[1] / s11],
        (true, true) => {}
    }

    let (norm0, norm1) = (s00.sqrt(), s11.sqrt());
    let r = (s01 / (norm0 * norm1)).clamp(-1.0, 1.0);

    let tolerance = count.max(2.0) * NOISE_ULPS * f64::EPSILON;
    if 1.0 - r.abs() > tolerance * (1.0 + r.abs()) {
        let (z0, z1) = (rhs[0] / norm0, rhs[1] / norm1);
        let det = (1.0 - r) * (1.0 + r);
        return [(z0 - r * z1) / det / norm0, (z1 - r * z0) / det / norm1];
    }

    rank_one_solve(s00, s01, s11, rhs)
}

/// Collinear columns: project onto the single direction the matrix spans.
fn rank_one_solve(a: f64, b: f64, c: f64, rhs: [f64; 2]) -> [f64; 2] {
    let (v0, v1) = if a >= c { (a, b) } else { (b, c) };
    let norm = (v0 * v0 + v1 * v1).sqrt();
    let (v0, v1) = (v0 / norm, v1 / norm);
    let scale = (v0 * rhs[0] + v1 * rhs[1]) / (a + c);
    [v0 * scale, v1 * scale]
}

fn ensure_finite(stage: &'static str, values: &[f64]) -> Result<(), ModelFault> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ModelFault::NonFinite(stage))
    }
}

/// Predicted daily demand for `today`, before buffering.
pub fn predict_daily_demand(table: &FeatureTable, today: Weekday) -> Result<f64, ModelFault> {
    let inputs: Vec<[f64; 2]> = table
        .rows()
        .iter()
        .map(|row| [f64::from(row.day_of_week), row.price])
        .collect();
    let targets: Vec<f64> = table.rows().iter().map(|row| row.quantity).collect();

    let model = LinearModel::fit(&inputs, &targets)?;
    let prediction = model.predict([
        f64::from(today.num_days_from_monday()),
        table.mean_price(),
    ]);

    if !prediction.is_finite() {
        return Err(ModelFault::NonFinite("prediction"));
    }
    if prediction < 0.0 {
        return Err(ModelFault::NegativePrediction(prediction));
    }
    Ok(prediction)
}

/// Model-based forecast. Errors mean the caller must fall back.
pub fn estimate(table: &FeatureTable, today: Weekday) -> Result<ForecastResult, ModelFault> {
    let prediction = predict_daily_demand(table, today)?;

    Ok(ForecastResult {
        suggested_qty: buffered_quantity(prediction),
        confidence: scaled_confidence(CONFIDENCE_PER_RECORD, table.len()),
        reasoning: format!(
            "ML-based forecast using {} sales records. Predicted avg {:.2}/day with 20% buffer.",
            table.len(),
            prediction
        ),
        method: ForecastMethod::Model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::Observation;
    use chrono::{Duration, TimeZone, Utc};

    /// 2024-03-04 is a Monday.
    fn row(day_offset: i64, quantity: f64, price: f64) -> Observation {
        let monday = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();
        Observation::new(monday + Duration::days(day_offset), quantity, price)
    }

    fn table(rows: Vec<Observation>) -> FeatureTable {
        FeatureTable::from_observations(rows).unwrap()
    }

    #[test]
    fn recovers_exact_plane() {
        // quantity = 2 + 3 * dow - 1 * price
        let inputs = [[0.0, 1.0], [1.0, 2.0], [2.0, 1.0], [4.0, 3.0], [6.0, 2.0]];
        let targets: Vec<f64> = inputs.iter().map(|x| 2.0 + 3.0 * x[0] - x[1]).collect();

        let model = LinearModel::fit(&inputs, &targets).unwrap();
        assert!((model.intercept - 2.0).abs() < 1e-9);
        assert!((model.coefficients[0] - 3.0).abs() < 1e-9);
        assert!((model.coefficients[1] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn constant_price_falls_back_to_min_norm() {
        // Price never varies, so only the weekday slope is identifiable.
        let inputs = [[0.0, 4.0], [2.0, 4.0], [4.0, 4.0]];
        let targets = [1.0, 5.0, 9.0];

        let model = LinearModel::fit(&inputs, &targets).unwrap();
        assert!((model.coefficients[0] - 2.0).abs() < 1e-9);
        assert_eq!(model.coefficients[1], 0.0);
        assert!((model.predict([3.0, 4.0]) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn fully_constant_regressors_predict_the_mean() {
        let inputs = [[2.0, 1.0], [2.0, 1.0], [2.0, 1.0]];
        let targets = [3.0, 6.0, 9.0];

        let model = LinearModel::fit(&inputs, &targets).unwrap();
        assert_eq!(model.coefficients, [0.0, 0.0]);
        assert!((model.predict([5.0, 1.0]) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn price_on_a_large_scale_keeps_full_rank() {
        // quantity = 3 * dow + price / 1e6
        let inputs = [[0.0, 0.0], [1.0, 1e6], [2.0, 0.0], [3.0, 1e6]];
        let targets: Vec<f64> = inputs.iter().map(|x| 3.0 * x[0] + x[1] / 1e6).collect();

        let model = LinearModel::fit(&inputs, &targets).unwrap();
        assert!((model.coefficients[0] - 3.0).abs() < 1e-9);
        assert!((model.coefficients[1] - 1e-6).abs() < 1e-12);
        assert!((model.predict([6.0, 5e5]) - 18.5).abs() < 1e-6);
    }

    #[test]
    fn price_tracking_weekday_closely_keeps_full_rank() {
        // Price is 10 * dow plus a small wiggle; quantity = 2 * dow + 0.5 * price.
        let inputs: Vec<[f64; 2]> = (0..7)
            .map(|d| {
                let wiggle = if d % 2 == 0 { 0.001 } else { -0.001 };
                [f64::from(d), 10.0 * f64::from(d) + wiggle]
            })
            .collect();
        let targets: Vec<f64> = inputs.iter().map(|x| 2.0 * x[0] + 0.5 * x[1]).collect();

        let model = LinearModel::fit(&inputs, &targets).unwrap();
        assert!((model.predict([6.0, 30.0]) - 27.0).abs() < 1e-3);
    }

    #[test]
    fn exactly_collinear_columns_use_min_norm() {
        // price = 2 * dow, so only the combined direction is identifiable.
        let inputs = [[0.0, 0.0], [1.0, 2.0], [2.0, 4.0], [3.0, 6.0]];
        let targets = [1.0, 6.0, 11.0, 16.0];

        let model = LinearModel::fit(&inputs, &targets).unwrap();
        // Min-norm of b0 + 2 * b1 = 5 is (1, 2).
        assert!((model.coefficients[0] - 1.0).abs() < 1e-9);
        assert!((model.coefficients[1] - 2.0).abs() < 1e-9);
        assert!((model.predict([4.0, 8.0]) - 21.0).abs() < 1e-9);
    }

    #[test]
    fn fewer_than_two_rows_is_insufficient() {
        assert_eq!(
            LinearModel::fit(&[[1.0, 1.0]], &[3.0]),
            Err(ModelFault::InsufficientData {
                required: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn overflowing_input_is_a_model_fault() {
        let inputs = [[0.0, f64::MAX], [1.0, f64::MAX]];
        let result = LinearModel::fit(&inputs, &[1.0, 2.0]);
        assert!(matches!(result, Err(ModelFault::NonFinite(_))));
    }

    #[test]
    fn estimate_buffers_prediction() {
        // Same weekday every time, so the prediction is the mean quantity.
        let t = table(vec![row(0, 8.0, 2.0), row(7, 12.0, 2.0)]);

        let result = estimate(&t, Weekday::Mon).unwrap();
        assert_eq!(result.suggested_qty, 12);
        assert!((result.confidence - 0.4).abs() < 1e-9);
        assert_eq!(
            result.reasoning,
            "ML-based forecast using 2 sales records. Predicted avg 10.00/day with 20% buffer."
        );
        assert_eq!(result.method, ForecastMethod::Model);
    }

    #[test]
    fn negative_prediction_is_rejected() {
        // Demand falls two units per weekday; by Sunday the line is below zero.
        let t = table(vec![row(0, 10.0, 1.0), row(1, 8.0, 1.0), row(2, 6.0, 1.0)]);

        let result = estimate(&t, Weekday::Sun);
        assert!(matches!(result, Err(ModelFault::NegativePrediction(p)) if p < 0.0));
    }

    #[test]
    fn repeated_fits_are_identical() {
        let t = table(vec![
            row(0, 3.0, 1.5),
            row(1, 4.0, 1.0),
            row(3, 9.0, 2.5),
            row(5, 2.0, 0.5),
        ]);

        let first = predict_daily_demand(&t, Weekday::Thu).unwrap();
        let second = predict_daily_demand(&t, Weekday::Thu).unwrap();
        assert_eq!(first.to_bits(), second.to_bits());
    }
}
