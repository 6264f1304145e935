#![allow(dead_code)]

use std::path::{Path, PathBuf};

use iris_core::align::{AlignmentModel, AlignmentResult, Aligner, InitialGuess};
use iris_core::config::RunConfig;
use iris_core::error::Result;
use iris_core::fit::{FitContext, FitOptions, StarFitter};
use iris_core::frame::{StarFitResult, StarParams, StarPosition};
use iris_core::io::fits::FitsWriter;
use ndarray::{concatenate, Array2, Axis};

/// Per-camera image size used by the synthetic exposures.
pub const DIM: usize = 128;
pub const SKY: f64 = 100.0;
pub const SIGMA: f64 = 1.5;
pub const AMPLITUDE: f64 = 1000.0;

/// Camera 2 sees the field shifted by this much.
pub const CAM2_OFFSET: (f64, f64) = (3.0, -2.0);

/// Star positions in camera 1, well inside the frame and far apart.
pub fn star_field() -> Vec<(f64, f64)> {
    vec![
        (30.0, 30.0),
        (90.0, 35.0),
        (40.0, 95.0),
        (100.0, 100.0),
        (64.0, 64.0),
    ]
}

/// Deterministic pseudo-random noise in [-1, 1).
fn noise(index: usize, seed: u64) -> f64 {
    let mut x = (index as u64)
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(seed.wrapping_mul(1_442_695_040_888_963_407));
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    (x % 2000) as f64 / 1000.0 - 1.0
}

/// Gaussian stars on a flat, slightly noisy sky.
pub fn render_stars(stars: &[(f64, f64)], amplitude: f64, seed: u64) -> Array2<f32> {
    let two_s2 = 2.0 * SIGMA * SIGMA;
    Array2::from_shape_fn((DIM, DIM), |(row, col)| {
        let mut v = SKY + noise(row * DIM + col, seed);
        for &(x, y) in stars {
            let dx = col as f64 - x;
            let dy = row as f64 - y;
            v += amplitude * (-(dx * dx + dy * dy) / two_s2).exp();
        }
        v as f32
    })
}

/// Both camera images of an exposure whose camera 1 field is shifted by
/// `shift` and whose stars are scaled by `flux_scale`.
pub fn render_exposure(shift: (f64, f64), flux_scale: f64, seed: u64) -> (Array2<f32>, Array2<f32>) {
    let cam1: Vec<(f64, f64)> = star_field()
        .into_iter()
        .map(|(x, y)| (x + shift.0, y + shift.1))
        .collect();
    let cam2: Vec<(f64, f64)> = cam1
        .iter()
        .map(|&(x, y)| (x + CAM2_OFFSET.0, y + CAM2_OFFSET.1))
        .collect();
    (
        render_stars(&cam1, AMPLITUDE * flux_scale, seed),
        render_stars(&cam2, AMPLITUDE * flux_scale, seed + 1),
    )
}

/// Write a dual-camera FITS file: camera 1 on the left, camera 2 on the
/// right, with the odometer card if given.
pub fn write_exposure(path: &Path, im1: &Array2<f32>, im2: &Array2<f32>, odometer: Option<i64>) {
    let data = concatenate(Axis(1), &[im1.view(), im2.view()]).unwrap();
    let mut writer = FitsWriter::new().card("OBJECT", "M31");
    if let Some(odo) = odometer {
        writer = writer.card("EXPNUM", odo);
    }
    writer.write(path, &data).unwrap();
}

/// Render and write an exposure in `dir`, returning its path.
pub fn make_exposure(dir: &Path, odometer: i64, shift: (f64, f64), flux_scale: f64) -> PathBuf {
    let (im1, im2) = render_exposure(shift, flux_scale, odometer as u64);
    let path = dir.join(format!("{}o.fits", odometer));
    write_exposure(&path, &im1, &im2, Some(odometer));
    path
}

/// Run config rooted in `dir`.
pub fn test_config(dir: &Path) -> RunConfig {
    RunConfig {
        data_dir: dir.join("run"),
        ..RunConfig::default()
    }
}

/// Aligner returning a fixed result.
pub struct FixedAligner {
    pub result: AlignmentResult,
}

impl FixedAligner {
    pub fn identity(stars: &[(f64, f64)], fwhm_arc: f64) -> Self {
        let positions: Vec<StarPosition> =
            stars.iter().map(|&(x, y)| StarPosition::new(x, y)).collect();
        Self {
            result: AlignmentResult {
                model: AlignmentModel::translation(0.0, 0.0),
                star_list1: positions.clone(),
                star_list2: positions,
                fwhm_arc,
            },
        }
    }
}

impl Aligner for FixedAligner {
    fn compute_alignment(
        &self,
        _im1: &Array2<f32>,
        _im2: &Array2<f32>,
        _guess: &InitialGuess,
    ) -> Result<AlignmentResult> {
        Ok(self.result.clone())
    }
}

/// Fitter reporting every star at its reference position, with the image
/// value there as flux and fixed shape and errors.
pub struct EchoFitter;

impl StarFitter for EchoFitter {
    fn fit_stars(
        &self,
        image: &Array2<f32>,
        context: &FitContext,
        options: FitOptions,
    ) -> Result<StarFitResult> {
        let stars = context
            .stars
            .iter()
            .map(|&pos| {
                let mut star = StarParams::unfitted(pos);
                if options.refit_position {
                    star.x_err = 0.1;
                    star.y_err = 0.2;
                }
                if options.refit_shape {
                    star.fwhm_pix = 2.0;
                    star.fwhm_err = 0.05;
                    star.fwhm_arc = 2.0 * context.pixel_scale;
                    star.fwhm_arc_err = 0.05 * context.pixel_scale;
                }
                if options.do_photometry {
                    let v = image[[pos.y as usize, pos.x as usize]] as f64;
                    star.aperture_flux = v;
                    star.aperture_flux_err = 1.0;
                    star.aperture_background = 10.0;
                    star.aperture_background_err = 0.5;
                }
                star
            })
            .collect();
        Ok(StarFitResult::new(stars))
    }
}
