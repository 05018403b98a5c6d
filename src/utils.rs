//! Numeric helpers shared by calibration and filtering.

pub mod safe_cast;

/// Median of a slice, ignoring non-finite values
///
/// Returns `None` when no finite value is present.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = finite_sorted(values);
    if sorted.is_empty() {
        return None;
    }

    let len = sorted.len();
    let mid = len / 2;
    if len % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted.swap_remove(mid))
    }
}

/// Mean after dropping `fraction` of the samples from each end of the sorted data
///
/// `fraction` is clamped to `[0, 0.5)`. Returns `None` for empty input.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Sample counts are small
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // floor of a non-negative fraction
pub fn trimmed_mean(values: &[f64], fraction: f64) -> Option<f64> {
    let sorted = finite_sorted(values);
    if sorted.is_empty() {
        return None;
    }

    let fraction = if fraction.is_finite() { fraction.clamp(0.0, 0.49) } else { 0.0 };
    let drop = (sorted.len() as f64 * fraction).floor() as usize;
    let kept = &sorted[drop..sorted.len() - drop];

    Some(kept.iter().sum::<f64>() / kept.len() as f64)
}

fn finite_sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}
