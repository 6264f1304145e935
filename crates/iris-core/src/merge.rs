//! Merged frame construction.
//!
//! Camera 2 is only registered onto camera 1 in a square window around each
//! reference star; everything outside those windows stays undefined (NaN).

use ndarray::{s, Array2};
use tracing::debug;

use crate::align::model::AlignmentModel;
use crate::align::transform::ImageTransform;
use crate::error::{IrisError, Result};
use crate::frame::StarPosition;

/// Half-open pixel rectangle `[x_min, x_max) x [y_min, y_max)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub x_min: usize,
    pub x_max: usize,
    pub y_min: usize,
    pub y_max: usize,
}

impl Window {
    pub fn width(&self) -> usize {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> usize {
        self.y_max - self.y_min
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x_min && x < self.x_max && y >= self.y_min && y < self.y_max
    }
}

/// Side of a star window in pixels.
pub fn window_side(multiplier: f64, fwhm_pix: f64) -> usize {
    let side = (multiplier * fwhm_pix).round();
    if side.is_finite() && side > 0.0 {
        side as usize
    } else {
        0
    }
}

/// Square window of `side` pixels centered on (x, y), clipped to a
/// `dimx` x `dimy` image. `None` if nothing of it lies on the image.
pub fn star_window(x: f64, y: f64, side: usize, dimx: usize, dimy: usize) -> Option<Window> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    let half = side as f64 / 2.0;
    let clip = |start: f64, dim: usize| -> (usize, usize) {
        let lo = start.floor();
        let hi = lo + side as f64;
        (lo.clamp(0.0, dim as f64) as usize, hi.clamp(0.0, dim as f64) as usize)
    };
    let (x_min, x_max) = clip(x - half, dimx);
    let (y_min, y_max) = clip(y - half, dimy);
    let window = Window {
        x_min,
        x_max,
        y_min,
        y_max,
    };
    (!window.is_empty()).then_some(window)
}

/// Build the merged frame of an exposure.
///
/// For each star of `stars` (camera 1 coordinates) the window of
/// `multiplier * fwhm_pix` pixels is set to camera 1 plus camera 2 warped
/// into camera 1 through `model`. Where windows overlap the later star wins.
pub fn merge_frames(
    im1: &Array2<f32>,
    im2: &Array2<f32>,
    stars: &[StarPosition],
    fwhm_pix: f64,
    multiplier: f64,
    model: &AlignmentModel,
    transform: &dyn ImageTransform,
) -> Result<Array2<f32>> {
    if im1.dim() != im2.dim() {
        let (h1, w1) = im1.dim();
        let (h2, w2) = im2.dim();
        return Err(IrisError::DimensionMismatch {
            expected_w: w1,
            expected_h: h1,
            w: w2,
            h: h2,
        });
    }
    let (dimy, dimx) = im1.dim();
    let side = window_side(multiplier, fwhm_pix);
    let mut merged = Array2::from_elem((dimy, dimx), f32::NAN);

    let mut used = 0usize;
    for star in stars {
        let Some(win) = star_window(star.x, star.y, side, dimx, dimy) else {
            continue;
        };
        let patch = transform.warp_region(im2, &win, model);
        let region = s![win.y_min..win.y_max, win.x_min..win.x_max];
        let mut target = merged.slice_mut(region);
        target.assign(&im1.slice(region));
        target += &patch;
        used += 1;
    }

    debug!(stars = stars.len(), windows = used, side, "Frames merged");
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_side_rounds() {
        assert_eq!(window_side(15.0, 2.0), 30);
        assert_eq!(window_side(15.0, 2.03), 30);
        assert_eq!(window_side(15.0, f64::NAN), 0);
    }

    #[test]
    fn test_window_inside_image() {
        let w = star_window(50.0, 40.0, 30, 200, 100).unwrap();
        assert_eq!((w.x_min, w.x_max, w.y_min, w.y_max), (35, 65, 25, 55));
        assert_eq!(w.width(), 30);
    }

    #[test]
    fn test_window_clipped_at_corner() {
        let w = star_window(3.0, 98.0, 30, 200, 100).unwrap();
        assert_eq!((w.x_min, w.x_max), (0, 18));
        assert_eq!((w.y_min, w.y_max), (83, 100));
    }

    #[test]
    fn test_window_off_image() {
        assert!(star_window(-100.0, 10.0, 30, 200, 100).is_none());
        assert!(star_window(f64::NAN, 10.0, 30, 200, 100).is_none());
    }
}
