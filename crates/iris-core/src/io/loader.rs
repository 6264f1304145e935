use std::collections::BTreeMap;
use std::path::Path;

use ndarray::{s, Array2};
use tracing::debug;

use crate::error::{IrisError, Result};
use crate::frame::Exposure;
use crate::io::fits::{read_fits, HEADER_KEYWORDS};

/// Both camera images of a raw exposure plus its header, before validation.
#[derive(Clone, Debug)]
pub struct DecodedExposure {
    pub im1: Array2<f32>,
    pub im2: Array2<f32>,
    pub header: BTreeMap<String, String>,
}

/// Reads a raw dual-camera exposure from disk.
pub trait ImageDecoder: Send + Sync {
    /// Decode both camera images, keeping the header values of `keywords`
    /// that the file carries.
    fn read_dual_camera_exposure(&self, path: &Path, keywords: &[&str]) -> Result<DecodedExposure>;
}

/// Decoder for raw exposures stored as one FITS image with both cameras
/// side by side: camera 1 in the left half, camera 2 in the right half.
#[derive(Clone, Copy, Debug, Default)]
pub struct FitsDualCameraDecoder;

impl ImageDecoder for FitsDualCameraDecoder {
    fn read_dual_camera_exposure(&self, path: &Path, keywords: &[&str]) -> Result<DecodedExposure> {
        let fits = read_fits(path, keywords)?;
        let w = fits.data.ncols();
        if w % 2 != 0 {
            return Err(IrisError::InvalidFits(format!(
                "{}: width {} cannot be split into two cameras",
                path.display(),
                w
            )));
        }
        let half = w / 2;
        let im1 = fits.data.slice(s![.., ..half]).to_owned();
        let im2 = fits.data.slice(s![.., half..]).to_owned();
        Ok(DecodedExposure {
            im1,
            im2,
            header: fits.header.cards,
        })
    }
}

/// Read an exposure and resolve its odometer number from `odometer_keyword`.
///
/// A missing or unparsable odometer keyword is fatal for the exposure.
pub fn load_exposure(
    decoder: &dyn ImageDecoder,
    path: &Path,
    odometer_keyword: &str,
) -> Result<Exposure> {
    let mut keywords: Vec<&str> = HEADER_KEYWORDS.to_vec();
    if !keywords.contains(&odometer_keyword) {
        keywords.push(odometer_keyword);
    }
    let decoded = decoder.read_dual_camera_exposure(path, &keywords)?;

    let raw = decoded
        .header
        .get(odometer_keyword)
        .ok_or_else(|| IrisError::MissingKeyword {
            path: path.to_path_buf(),
            key: odometer_keyword.to_string(),
        })?;
    let odometer = parse_odometer(raw).ok_or_else(|| IrisError::InvalidKeyword {
        path: path.to_path_buf(),
        key: odometer_keyword.to_string(),
        value: raw.clone(),
    })?;

    let (h1, w1) = decoded.im1.dim();
    let (h2, w2) = decoded.im2.dim();
    if (h1, w1) != (h2, w2) {
        return Err(IrisError::DimensionMismatch {
            expected_w: w1,
            expected_h: h1,
            w: w2,
            h: h2,
        });
    }

    debug!(path = %path.display(), odometer, width = w1, height = h1, "Exposure loaded");
    Ok(Exposure {
        path: path.to_path_buf(),
        im1: decoded.im1,
        im2: decoded.im2,
        header: decoded.header,
        odometer,
    })
}

fn parse_odometer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}
