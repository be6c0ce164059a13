//! Small statistics helpers over `f64` samples.
//!
//! All functions return `None` for empty input instead of dividing by zero.

use std::cmp::Ordering;

fn sort_ascending(values: &mut [f64]) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Smallest and largest value, in that order.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;

    Some(values.iter().fold((first, first), |(min, max), &value| {
        (min.min(value), max.max(value))
    }))
}

/// Mean after dropping `floor(len * fraction)` values from each end of the
/// sorted set. When trimming would leave nothing, every value is kept.
pub fn trimmed_mean(values: &[f64], fraction: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sort_ascending(&mut sorted);

    let trim = (sorted.len() as f64 * fraction.max(0.0)).floor() as usize;

    if trim * 2 >= sorted.len() {
        return mean(&sorted);
    }

    mean(&sorted[trim..sorted.len() - trim])
}
