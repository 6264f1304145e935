use std::path::Path;

use image::{GrayImage, ImageFormat, Luma};
use ndarray::Array2;

use crate::error::Result;

/// Linear stretch bounds over the finite pixels. `None` if there are none.
pub fn finite_range(data: &Array2<f32>) -> Option<(f32, f32)> {
    data.iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Map a pixel to [0, 1] given the stretch bounds. Undefined pixels become 0.
fn normalize(v: f32, (lo, hi): (f32, f32)) -> f32 {
    if !v.is_finite() || hi <= lo {
        return 0.0;
    }
    ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
}

/// Save a frame as 16-bit grayscale TIFF.
pub fn save_tiff(data: &Array2<f32>, path: &Path) -> Result<()> {
    let (h, w) = data.dim();
    let range = finite_range(data).unwrap_or((0.0, 0.0));

    let pixels: Vec<u16> = data
        .iter()
        .map(|&v| (normalize(v, range) * 65535.0) as u16)
        .collect();

    let img = image::ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .expect("buffer size matches dimensions");
    img.save_with_format(path, ImageFormat::Tiff)?;
    Ok(())
}

/// Save a frame as 8-bit grayscale PNG.
pub fn save_png(data: &Array2<f32>, path: &Path) -> Result<()> {
    let (h, w) = data.dim();
    let range = finite_range(data).unwrap_or((0.0, 0.0));

    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), &v) in data.indexed_iter() {
        let val = (normalize(v, range) * 255.0) as u8;
        img.put_pixel(col as u32, row as u32, Luma([val]));
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save a frame, choosing the format from the file extension.
pub fn save_frame(data: &Array2<f32>, path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => save_png(data, path),
        _ => save_tiff(data, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_range_skips_nan() {
        let data = Array2::from_shape_vec((2, 2), vec![f32::NAN, 2.0, -1.0, 5.0]).unwrap();
        assert_eq!(finite_range(&data), Some((-1.0, 5.0)));
    }

    #[test]
    fn test_normalize_undefined_is_black() {
        assert_eq!(normalize(f32::NAN, (0.0, 1.0)), 0.0);
        assert_eq!(normalize(0.5, (0.0, 1.0)), 0.5);
        assert_eq!(normalize(3.0, (1.0, 1.0)), 0.0);
    }
}
