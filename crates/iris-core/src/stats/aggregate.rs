//! NaN-aware order statistics over per-star values.

/// Finite values of `values`, sorted ascending.
fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    finite.sort_unstable_by(|a, b| a.total_cmp(b));
    finite
}

/// `p`-th percentile (0..=100) of the finite values, linearly interpolated
/// between closest ranks. NaN if there are no finite values.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    let sorted = sorted_finite(values);
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Median of the finite values. NaN if there are none.
pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}
