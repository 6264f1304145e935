//! Default aligner: match detected stars between the two cameras.
//!
//! Camera 1 stars are projected into camera 2 through the initial guess and
//! paired with the nearest camera 2 detection inside the match radius. The
//! offset is then refined by the median pairing residual, a few times, with
//! rotation and zoom kept at their initial values.

use ndarray::Array2;
use tracing::{debug, info};

use crate::config::DetectionConfig;
use crate::detection::{detect_stars, DetectedStar};
use crate::error::{IrisError, Result};
use crate::frame::StarPosition;
use crate::stats::aggregate::median;

use super::model::AlignmentModel;
use super::{AlignmentResult, Aligner, InitialGuess};

const REFINE_ITERATIONS: usize = 3;

#[derive(Clone, Debug, Default)]
pub struct StarMatchAligner {
    pub detection: DetectionConfig,
}

impl StarMatchAligner {
    pub fn new(detection: DetectionConfig) -> Self {
        Self { detection }
    }
}

/// Index of the detection nearest to `p`, if within `radius`.
fn nearest(p: (f64, f64), candidates: &[DetectedStar], radius: f64) -> Option<usize> {
    let r2 = radius * radius;
    candidates
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let dx = s.position.x - p.0;
            let dy = s.position.y - p.1;
            (i, dx * dx + dy * dy)
        })
        .filter(|&(_, d2)| d2 <= r2)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// (camera 1 index, camera 2 index) pairs under `model`.
fn match_stars(
    stars1: &[DetectedStar],
    stars2: &[DetectedStar],
    model: &AlignmentModel,
    radius: f64,
) -> Vec<(usize, usize)> {
    stars1
        .iter()
        .enumerate()
        .filter_map(|(i, s)| {
            nearest(model.to_camera2(s.position.x, s.position.y), stars2, radius).map(|j| (i, j))
        })
        .collect()
}

impl Aligner for StarMatchAligner {
    fn compute_alignment(
        &self,
        im1: &Array2<f32>,
        im2: &Array2<f32>,
        guess: &InitialGuess,
    ) -> Result<AlignmentResult> {
        let stars1 = detect_stars(im1, &self.detection);
        if stars1.is_empty() {
            return Err(IrisError::Alignment("no star detected in camera 1".into()));
        }
        // Camera 2 may show stars outside the camera 1 field: keep more.
        let wide = DetectionConfig {
            max_stars: self.detection.max_stars * 2,
            ..self.detection.clone()
        };
        let stars2 = detect_stars(im2, &wide);
        if stars2.is_empty() {
            return Err(IrisError::Alignment("no star detected in camera 2".into()));
        }

        let (dimy, dimx) = im1.dim();
        let mut model = AlignmentModel {
            dx: guess.dx,
            dy: guess.dy,
            angle_deg: guess.angle_deg,
            rc: (dimx as f64 / 2.0, dimy as f64 / 2.0),
            zoom: (1.0, 1.0),
        };

        let mut pairs = Vec::new();
        for _ in 0..REFINE_ITERATIONS {
            pairs = match_stars(&stars1, &stars2, &model, self.detection.match_radius);
            if pairs.is_empty() {
                return Err(IrisError::Alignment(format!(
                    "none of {} camera 1 stars matched in camera 2 (dx={:.2}, dy={:.2})",
                    stars1.len(),
                    model.dx,
                    model.dy
                )));
            }
            let (res_x, res_y): (Vec<f64>, Vec<f64>) = pairs
                .iter()
                .map(|&(i, j)| {
                    let (px, py) = model.to_camera2(stars1[i].position.x, stars1[i].position.y);
                    (stars2[j].position.x - px, stars2[j].position.y - py)
                })
                .unzip();
            model.dx += median(&res_x);
            model.dy += median(&res_y);
            debug!(matched = pairs.len(), dx = model.dx, dy = model.dy, "Alignment refined");
        }

        let star_list1: Vec<StarPosition> = pairs.iter().map(|&(i, _)| stars1[i].position).collect();
        let star_list2: Vec<StarPosition> = pairs.iter().map(|&(_, j)| stars2[j].position).collect();

        let fwhm_pix: Vec<f64> = pairs.iter().map(|&(i, _)| stars1[i].fwhm_pix).collect();
        let fwhm_arc = match median(&fwhm_pix) * guess.pixel_scale {
            f if f.is_finite() && f > 0.0 => f,
            _ => guess.fwhm_arc,
        };

        info!(
            stars = star_list1.len(),
            dx = model.dx,
            dy = model.dy,
            angle = model.angle_deg,
            fwhm_arc,
            "Alignment computed"
        );
        Ok(AlignmentResult {
            model,
            star_list1,
            star_list2,
            fwhm_arc,
        })
    }
}
