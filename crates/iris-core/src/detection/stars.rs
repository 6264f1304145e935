use ndarray::Array2;
use tracing::debug;

use crate::config::DetectionConfig;
use crate::fit::moments::second_moment_fwhm;
use crate::frame::StarPosition;

use super::components::{label_blobs, touches_border};
use super::threshold::detection_threshold;

/// A star found by thresholding.
#[derive(Clone, Debug)]
pub struct DetectedStar {
    pub position: StarPosition,
    /// Background-subtracted flux over the detection footprint.
    pub flux: f64,
    pub peak: f64,
    /// Second-moment FWHM in pixels, NaN if it could not be measured.
    pub fwhm_pix: f64,
}

/// Detect stars above `mean + k * sigma` of the sky, brightest first.
///
/// Blobs smaller than `min_area` or touching the image border are dropped,
/// and at most `max_stars` are returned.
pub fn detect_stars(data: &Array2<f32>, config: &DetectionConfig) -> Vec<DetectedStar> {
    let (h, w) = data.dim();
    let (sky, threshold) = detection_threshold(data, config.sigma_multiplier);
    if !threshold.is_finite() {
        return Vec::new();
    }

    let mask = data.mapv(|v| v.is_finite() && v as f64 > threshold);
    let blobs = label_blobs(&mask, data, sky);
    let total = blobs.len();

    let stars: Vec<DetectedStar> = blobs
        .into_iter()
        .filter(|b| b.area >= config.min_area && !touches_border(b.bbox, h, w))
        .take(config.max_stars)
        .map(|b| {
            let (r0, r1, c0, c1) = b.bbox;
            let radius = ((r1 - r0).max(c1 - c0) as f64 + 1.0).max(3.0);
            DetectedStar {
                position: StarPosition::new(b.x, b.y),
                flux: b.flux,
                peak: b.peak,
                fwhm_pix: second_moment_fwhm(data, b.x, b.y, radius, sky).unwrap_or(f64::NAN),
            }
        })
        .collect();

    debug!(
        sky,
        threshold,
        candidates = total,
        kept = stars.len(),
        "Star detection"
    );
    stars
}
