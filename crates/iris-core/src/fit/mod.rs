//! Star fitting at fixed reference positions.

pub mod moments;

use ndarray::Array2;

use crate::error::Result;
use crate::frame::{StarFitResult, StarPosition};

pub use moments::MomentStarFitter;

/// What a fit recomputes for each star.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FitOptions {
    /// Re-measure the star centroid instead of keeping the given position.
    pub refit_position: bool,
    /// Re-measure the star FWHM.
    pub refit_shape: bool,
    /// Measure aperture flux and background.
    pub do_photometry: bool,
}

impl FitOptions {
    /// Position and shape, no aperture photometry (single cameras).
    pub fn full_fit() -> Self {
        Self {
            refit_position: true,
            refit_shape: true,
            do_photometry: false,
        }
    }

    /// Aperture photometry at fixed positions, no shape refit (merged frame).
    pub fn photometry_only() -> Self {
        Self {
            refit_position: false,
            refit_shape: false,
            do_photometry: true,
        }
    }
}

/// Per-camera fit seed: the reference star list and FWHM estimate.
#[derive(Clone, Debug)]
pub struct FitContext {
    pub stars: Vec<StarPosition>,
    pub fwhm_arc: f64,
    /// Arcseconds per pixel.
    pub pixel_scale: f64,
}

impl FitContext {
    pub fn new(stars: Vec<StarPosition>, fwhm_arc: f64, pixel_scale: f64) -> Self {
        Self {
            stars,
            fwhm_arc,
            pixel_scale,
        }
    }

    /// FWHM estimate in pixels.
    pub fn fwhm_pix(&self) -> f64 {
        self.fwhm_arc / self.pixel_scale
    }
}

/// Fits stars at known positions in one image.
pub trait StarFitter: Send + Sync {
    /// Returns exactly one entry per star of `context`, in the same order.
    fn fit_stars(
        &self,
        image: &Array2<f32>,
        context: &FitContext,
        options: FitOptions,
    ) -> Result<StarFitResult>;
}
