//! Primary-HDU image access for raw exposures, on top of `fitsio`.
//!
//! Rows are flipped on both read and write so that row 0 of an array is the
//! top of the image (FITS origin is bottom-left).

use std::collections::BTreeMap;
use std::path::Path;

use fitsio::compat::fitsfile::FitsFile;
use fitsio::compat::hdu::FitsHdu;
use fitsio::compat::images::{ImageDescription, ImageType, ReadImage, WriteImage};
use ndarray::{s, Array2};

use crate::error::{IrisError, Result};

/// Header keywords copied from every exposure, in addition to the ones a
/// caller asks for.
pub const HEADER_KEYWORDS: [&str; 4] = ["OBJECT", "FILTER", "EXPTIME", "DATE-OBS"];

/// Header values of a FITS HDU keyed by keyword, as text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FitsHeader {
    pub cards: BTreeMap<String, String>,
}

impl FitsHeader {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.cards.get(key).map(String::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        let raw = self.get(key)?.trim();
        raw.parse::<i64>()
            .ok()
            .or_else(|| raw.parse::<f64>().ok().map(|f| f as i64))
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key)?.trim().parse::<f64>().ok()
    }
}

/// A decoded primary HDU.
#[derive(Clone, Debug)]
pub struct FitsImage {
    pub header: FitsHeader,
    /// Pixels, shape = (NAXIS2, NAXIS1)
    pub data: Array2<f32>,
}

/// Read the primary image HDU of a FITS file, keeping the header values of
/// `keywords` that are present.
pub fn read_fits(path: &Path, keywords: &[&str]) -> Result<FitsImage> {
    let fptr = FitsFile::open(path)?;
    let hdu = fptr.hdu(0)?;

    let naxis = hdu.read_key::<i64>(&fptr, "NAXIS")?;
    if naxis != 2 {
        return Err(IrisError::InvalidFits(format!(
            "{}: expected a 2D image, got NAXIS = {}",
            path.display(),
            naxis
        )));
    }
    let axis_len = |key: &str| -> Result<usize> {
        let value = hdu.read_key::<i64>(&fptr, key)?;
        usize::try_from(value)
            .ok()
            .filter(|&v| v > 0)
            .ok_or_else(|| {
                IrisError::InvalidFits(format!("{}: invalid {} = {}", path.display(), key, value))
            })
    };
    let width = axis_len("NAXIS1")?;
    let height = axis_len("NAXIS2")?;
    let pixels = width.checked_mul(height).ok_or_else(|| {
        IrisError::InvalidFits(format!(
            "{}: image of {}x{} is too large",
            path.display(),
            width,
            height
        ))
    })?;

    let raw = f64::read_image(&fptr, &hdu)?;
    if raw.len() != pixels {
        return Err(IrisError::InvalidFits(format!(
            "{}: expected {} pixels, got {}",
            path.display(),
            pixels,
            raw.len()
        )));
    }
    let stored = Array2::from_shape_vec((height, width), raw)
        .map_err(|e| IrisError::InvalidFits(format!("{}: {}", path.display(), e)))?;
    let data = stored.slice(s![..;-1, ..]).mapv(|v| v as f32);

    let mut header = FitsHeader::default();
    for &key in keywords {
        if let Some(value) = read_card(&hdu, &fptr, key) {
            header.cards.insert(key.to_string(), value);
        }
    }
    Ok(FitsImage { header, data })
}

/// Text of a header value, whether it was written as a string or a number.
fn read_card(hdu: &FitsHdu, fptr: &FitsFile, key: &str) -> Option<String> {
    hdu.read_key::<String>(fptr, key)
        .map(|v| v.trim().to_string())
        .or_else(|_| hdu.read_key::<i64>(fptr, key).map(|v| v.to_string()))
        .or_else(|_| hdu.read_key::<f64>(fptr, key).map(|v| v.to_string()))
        .ok()
}

/// Builder for a single-HDU float image with extra header cards.
#[derive(Clone, Debug, Default)]
pub struct FitsWriter {
    cards: Vec<(String, String)>,
}

impl FitsWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn card(mut self, key: &str, value: impl ToString) -> Self {
        self.cards.push((key.to_string(), value.to_string()));
        self
    }

    /// Write `data` as the primary HDU, replacing any existing file.
    pub fn write(&self, path: &Path, data: &Array2<f32>) -> Result<()> {
        let (height, width) = data.dim();
        let mut fptr = FitsFile::create(path).overwrite().open()?;
        let description = ImageDescription {
            data_type: ImageType::Float,
            dimensions: vec![width, height],
        };
        let hdu = fptr.create_image("PRIMARY", &description)?;

        let flat: Vec<f32> = data.slice(s![..;-1, ..]).iter().copied().collect();
        f32::write_image(&mut fptr, &hdu, &flat)?;
        for (key, value) in &self.cards {
            hdu.write_key(&mut fptr, key, value)?;
        }
        Ok(())
    }
}
