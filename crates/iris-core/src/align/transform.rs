use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::merge::Window;

use super::model::AlignmentModel;

/// Resamples camera 2 into camera 1 geometry.
pub trait ImageTransform: Send + Sync {
    /// Camera 2 pixels seen through `model` over a camera 1 `window`.
    /// The patch has the window's shape; pixels that fall outside camera 2
    /// are NaN.
    fn warp_region(&self, image: &Array2<f32>, window: &Window, model: &AlignmentModel)
        -> Array2<f32>;
}

/// Default transform: bilinear interpolation at the mapped positions.
#[derive(Clone, Copy, Debug, Default)]
pub struct AffineTransform;

impl ImageTransform for AffineTransform {
    fn warp_region(
        &self,
        image: &Array2<f32>,
        window: &Window,
        model: &AlignmentModel,
    ) -> Array2<f32> {
        let (h, w) = (window.height(), window.width());
        let sample_at = |row: usize, col: usize| -> f32 {
            let x1 = (window.x_min + col) as f64;
            let y1 = (window.y_min + row) as f64;
            let (x2, y2) = model.to_camera2(x1, y1);
            bilinear_sample(image, y2, x2)
        };

        if h * w >= PARALLEL_PIXEL_THRESHOLD {
            let rows: Vec<Vec<f32>> = (0..h)
                .into_par_iter()
                .map(|row| (0..w).map(|col| sample_at(row, col)).collect())
                .collect();
            let mut patch = Array2::<f32>::zeros((h, w));
            for (row, values) in rows.into_iter().enumerate() {
                for (col, v) in values.into_iter().enumerate() {
                    patch[[row, col]] = v;
                }
            }
            patch
        } else {
            Array2::from_shape_fn((h, w), |(row, col)| sample_at(row, col))
        }
    }
}

/// Bilinear interpolation at fractional (y, x). NaN outside the image.
pub fn bilinear_sample(data: &Array2<f32>, y: f64, x: f64) -> f32 {
    let (h, w) = data.dim();
    if h == 0 || w == 0 || !(0.0..=(w - 1) as f64).contains(&x) || !(0.0..=(h - 1) as f64).contains(&y)
    {
        return f32::NAN;
    }

    let x0 = (x.floor() as usize).min(w - 1);
    let y0 = (y.floor() as usize).min(h - 1);
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);

    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let v00 = data[[y0, x0]];
    let v10 = data[[y0, x1]];
    let v01 = data[[y1, x0]];
    let v11 = data[[y1, x1]];

    v00 * (1.0 - fx) * (1.0 - fy) + v10 * fx * (1.0 - fy) + v01 * (1.0 - fx) * fy + v11 * fx * fy
}
