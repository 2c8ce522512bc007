//! Метрики качества регрессии

use ndarray::Array1;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub r2: f64,
    pub rmse: f64,
}

impl ModelMetrics {
    pub fn evaluate(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        Self {
            r2: r2_score(y_true, y_pred),
            rmse: rmse(y_true, y_pred),
        }
    }
}

/// Коэффициент детерминации; для константной цели 1.0 при точном совпадении, иначе 0.0
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let mean = y_true.mean().unwrap_or(0.0);
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

pub fn rmse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    (y_true - y_pred)
        .mapv(|e| e * e)
        .mean()
        .unwrap_or(0.0)
        .sqrt()
}
