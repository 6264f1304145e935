use std::collections::BTreeMap;
use std::path::PathBuf;

use ndarray::Array2;

use crate::error::{IrisError, Result};

/// Camera slot of an image or a star fit.
///
/// Slot 0 is the merged frame, slots 1 and 2 the physical cameras.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Camera {
    Merged,
    One,
    Two,
}

impl Camera {
    pub const ALL: [Camera; 3] = [Camera::One, Camera::Two, Camera::Merged];

    pub fn index(self) -> u8 {
        match self {
            Self::Merged => 0,
            Self::One => 1,
            Self::Two => 2,
        }
    }

    pub fn from_index(index: u8) -> Result<Self> {
        match index {
            0 => Ok(Self::Merged),
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(IrisError::InvalidCamera(other)),
        }
    }

    /// Group name of this camera's star fit inside an odometer namespace.
    pub fn group_name(self) -> &'static str {
        match self {
            Self::Merged => "camM",
            Self::One => "cam1",
            Self::Two => "cam2",
        }
    }

    /// Suffix used in the output cube file name.
    pub fn cube_suffix(self) -> &'static str {
        match self {
            Self::Merged => "m",
            Self::One => "1",
            Self::Two => "2",
        }
    }
}

impl std::fmt::Display for Camera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Merged => write!(f, "Merged"),
            Self::One => write!(f, "Camera 1"),
            Self::Two => write!(f, "Camera 2"),
        }
    }
}

/// Star position in pixel coordinates (x = column, y = row).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StarPosition {
    pub x: f64,
    pub y: f64,
}

impl StarPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One raw dual-camera acquisition.
#[derive(Clone, Debug)]
pub struct Exposure {
    pub path: PathBuf,
    /// Camera 1 pixels, shape = (dimy, dimx)
    pub im1: Array2<f32>,
    /// Camera 2 pixels, same shape as `im1`
    pub im2: Array2<f32>,
    pub header: BTreeMap<String, String>,
    pub odometer: i64,
}

impl Exposure {
    pub fn dimx(&self) -> usize {
        self.im1.ncols()
    }
}

/// Named per-star fit parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StarParam {
    X,
    XErr,
    Y,
    YErr,
    FwhmPix,
    FwhmErr,
    FwhmArc,
    FwhmArcErr,
    ApertureFlux,
    ApertureFluxErr,
    ApertureBackground,
    ApertureBackgroundErr,
}

impl StarParam {
    pub const ALL: [StarParam; 12] = [
        StarParam::X,
        StarParam::XErr,
        StarParam::Y,
        StarParam::YErr,
        StarParam::FwhmPix,
        StarParam::FwhmErr,
        StarParam::FwhmArc,
        StarParam::FwhmArcErr,
        StarParam::ApertureFlux,
        StarParam::ApertureFluxErr,
        StarParam::ApertureBackground,
        StarParam::ApertureBackgroundErr,
    ];

    /// Dataset name of this parameter inside a star-fit group.
    pub fn name(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::XErr => "x_err",
            Self::Y => "y",
            Self::YErr => "y_err",
            Self::FwhmPix => "fwhm_pix",
            Self::FwhmErr => "fwhm_err",
            Self::FwhmArc => "fwhm_arc",
            Self::FwhmArcErr => "fwhm_arc_err",
            Self::ApertureFlux => "aperture_flux",
            Self::ApertureFluxErr => "aperture_flux_err",
            Self::ApertureBackground => "aperture_background",
            Self::ApertureBackgroundErr => "aperture_background_err",
        }
    }
}

/// Fitted parameters of a single star. Fields that were not fitted are NaN.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StarParams {
    pub x: f64,
    pub x_err: f64,
    pub y: f64,
    pub y_err: f64,
    pub fwhm_pix: f64,
    pub fwhm_err: f64,
    pub fwhm_arc: f64,
    pub fwhm_arc_err: f64,
    pub aperture_flux: f64,
    pub aperture_flux_err: f64,
    pub aperture_background: f64,
    pub aperture_background_err: f64,
}

impl StarParams {
    /// A star at a known position with nothing fitted yet.
    pub fn unfitted(position: StarPosition) -> Self {
        Self {
            x: position.x,
            x_err: f64::NAN,
            y: position.y,
            y_err: f64::NAN,
            fwhm_pix: f64::NAN,
            fwhm_err: f64::NAN,
            fwhm_arc: f64::NAN,
            fwhm_arc_err: f64::NAN,
            aperture_flux: f64::NAN,
            aperture_flux_err: f64::NAN,
            aperture_background: f64::NAN,
            aperture_background_err: f64::NAN,
        }
    }

    pub fn get(&self, param: StarParam) -> f64 {
        match param {
            StarParam::X => self.x,
            StarParam::XErr => self.x_err,
            StarParam::Y => self.y,
            StarParam::YErr => self.y_err,
            StarParam::FwhmPix => self.fwhm_pix,
            StarParam::FwhmErr => self.fwhm_err,
            StarParam::FwhmArc => self.fwhm_arc,
            StarParam::FwhmArcErr => self.fwhm_arc_err,
            StarParam::ApertureFlux => self.aperture_flux,
            StarParam::ApertureFluxErr => self.aperture_flux_err,
            StarParam::ApertureBackground => self.aperture_background,
            StarParam::ApertureBackgroundErr => self.aperture_background_err,
        }
    }

    pub fn set(&mut self, param: StarParam, value: f64) {
        let slot = match param {
            StarParam::X => &mut self.x,
            StarParam::XErr => &mut self.x_err,
            StarParam::Y => &mut self.y,
            StarParam::YErr => &mut self.y_err,
            StarParam::FwhmPix => &mut self.fwhm_pix,
            StarParam::FwhmErr => &mut self.fwhm_err,
            StarParam::FwhmArc => &mut self.fwhm_arc,
            StarParam::FwhmArcErr => &mut self.fwhm_arc_err,
            StarParam::ApertureFlux => &mut self.aperture_flux,
            StarParam::ApertureFluxErr => &mut self.aperture_flux_err,
            StarParam::ApertureBackground => &mut self.aperture_background,
            StarParam::ApertureBackgroundErr => &mut self.aperture_background_err,
        };
        *slot = value;
    }
}

/// Star fit of one camera slot of one exposure, one entry per reference star.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StarFitResult {
    pub stars: Vec<StarParams>,
}

impl StarFitResult {
    pub fn new(stars: Vec<StarParams>) -> Self {
        Self { stars }
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }

    /// All values of one parameter, in star order.
    pub fn column(&self, param: StarParam) -> Vec<f64> {
        self.stars.iter().map(|s| s.get(param)).collect()
    }

    /// Rebuild a fit from per-parameter columns. Columns shorter than the
    /// longest one leave the missing entries as NaN.
    pub fn from_columns(columns: &[(StarParam, Vec<f64>)]) -> Self {
        let n = columns.iter().map(|(_, c)| c.len()).max().unwrap_or(0);
        let mut stars = vec![StarParams::unfitted(StarPosition::new(f64::NAN, f64::NAN)); n];
        for (param, values) in columns {
            for (star, &v) in stars.iter_mut().zip(values.iter()) {
                star.set(*param, v);
            }
        }
        Self { stars }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_index_round_trip() {
        for camera in Camera::ALL {
            assert_eq!(Camera::from_index(camera.index()).unwrap(), camera);
        }
        assert!(matches!(Camera::from_index(3), Err(IrisError::InvalidCamera(3))));
    }

    #[test]
    fn test_from_columns_pads_with_nan() {
        let fit = StarFitResult::from_columns(&[
            (StarParam::X, vec![1.0, 2.0]),
            (StarParam::ApertureFlux, vec![10.0]),
        ]);
        assert_eq!(fit.len(), 2);
        assert_eq!(fit.column(StarParam::X), vec![1.0, 2.0]);
        assert_eq!(fit.stars[0].aperture_flux, 10.0);
        assert!(fit.stars[1].aperture_flux.is_nan());
        assert!(fit.stars[1].y.is_nan());
    }
}
