//! Camera 2 to camera 1 registration.

pub mod model;
pub mod star_match;
pub mod transform;

use ndarray::Array2;

use crate::error::Result;
use crate::frame::StarPosition;

pub use model::AlignmentModel;
pub use star_match::StarMatchAligner;
pub use transform::{AffineTransform, ImageTransform};

/// Starting point of an alignment, from the run configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InitialGuess {
    pub angle_deg: f64,
    pub dx: f64,
    pub dy: f64,
    /// Expected seeing, used when the stars give no usable FWHM.
    pub fwhm_arc: f64,
    /// Arcseconds per pixel.
    pub pixel_scale: f64,
}

/// Output of an alignment: the camera mapping, matched star lists (same
/// length, same order) and a FWHM estimate shared by both cameras.
#[derive(Clone, Debug)]
pub struct AlignmentResult {
    pub model: AlignmentModel,
    pub star_list1: Vec<StarPosition>,
    pub star_list2: Vec<StarPosition>,
    pub fwhm_arc: f64,
}

/// Computes the geometric alignment of camera 2 on camera 1.
pub trait Aligner: Send + Sync {
    fn compute_alignment(
        &self,
        im1: &Array2<f32>,
        im2: &Array2<f32>,
        guess: &InitialGuess,
    ) -> Result<AlignmentResult>;
}
