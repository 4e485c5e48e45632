// src/services/stats.rs
use crate::models::{AnnualReturn, Stats};
use crate::services::returns::{return_values, round2};

fn calculate_average(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (divisor n - 1); undefined below two values.
fn sample_std_dev(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let variance = values.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Descriptive statistics over return percentages, or `None` when empty.
pub fn summarize(values: &[f64]) -> Option<Stats> {
    if values.is_empty() {
        return None;
    }

    let mean = calculate_average(values);
    let std_dev = sample_std_dev(values, mean).map(round2);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(Stats {
        mean: round2(mean),
        std_dev,
        min: round2(min),
        max: round2(max),
        count: values.len(),
    })
}

pub fn summarize_annual(annual: &[AnnualReturn]) -> Option<Stats> {
    summarize(&return_values(annual))
}
