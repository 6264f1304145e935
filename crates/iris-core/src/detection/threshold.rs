use ndarray::Array2;

/// Clipping passes used by `clipped_mean_stddev`.
const CLIP_ITERATIONS: usize = 3;
/// Values beyond this many sigmas are rejected at each pass.
const CLIP_SIGMA: f64 = 3.0;

/// Mean and standard deviation of the finite pixel values.
pub fn compute_mean_stddev(data: &Array2<f32>) -> (f64, f64) {
    mean_stddev(data.iter().map(|&v| v as f64).filter(|v| v.is_finite()))
}

/// Mean and standard deviation of the sky, with stars rejected by
/// iterative sigma clipping.
pub fn clipped_mean_stddev(data: &Array2<f32>) -> (f64, f64) {
    let (mut mean, mut std) = compute_mean_stddev(data);
    for _ in 0..CLIP_ITERATIONS {
        if std <= 0.0 {
            break;
        }
        let (lo, hi) = (mean - CLIP_SIGMA * std, mean + CLIP_SIGMA * std);
        let (m, s) = mean_stddev(
            data.iter()
                .map(|&v| v as f64)
                .filter(|v| v.is_finite() && *v >= lo && *v <= hi),
        );
        if m.is_nan() {
            break;
        }
        mean = m;
        std = s;
    }
    (mean, std)
}

/// Detection threshold = sky mean + `sigma_mul` * sky stddev.
pub fn detection_threshold(data: &Array2<f32>, sigma_mul: f64) -> (f64, f64) {
    let (mean, std) = clipped_mean_stddev(data);
    (mean, mean + sigma_mul * std)
}

fn mean_stddev(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let (n, sum) = values.clone().fold((0usize, 0.0), |(n, s), v| (n + 1, s + v));
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let mean = sum / n as f64;
    let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_mean_stddev() {
        let data = Array2::from_shape_vec((2, 2), vec![0.0, 0.0, 1.0, 1.0]).unwrap();
        let (mean, std) = compute_mean_stddev(&data);
        assert!((mean - 0.5).abs() < 1e-6);
        assert!((std - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_nan_pixels_ignored() {
        let data = Array2::from_shape_vec((2, 2), vec![f32::NAN, 2.0, 2.0, 2.0]).unwrap();
        let (mean, std) = compute_mean_stddev(&data);
        assert!((mean - 2.0).abs() < 1e-9);
        assert!(std.abs() < 1e-9);
    }

    #[test]
    fn test_clipping_rejects_outlier() {
        let mut values = vec![10.0f32; 99];
        values.push(10_000.0);
        for (i, v) in values.iter_mut().enumerate().take(99) {
            *v += (i % 3) as f32 - 1.0;
        }
        let data = Array2::from_shape_vec((10, 10), values).unwrap();
        let (mean, std) = clipped_mean_stddev(&data);
        assert!((mean - 10.0).abs() < 0.1, "mean {mean}");
        assert!(std < 1.0, "std {std}");
    }
}
