//! Moment-based star fitter.
//!
//! Each star is measured in a stamp around its reference position: sky from
//! the median of an annulus, centroid from background-subtracted intensity
//! weights, FWHM from the second-order moments and flux from a circular
//! aperture. Errors follow photon statistics of the aperture sum.

use std::ops::Range;

use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::{
    ANNULUS_INNER_FWHM_COEFF, ANNULUS_OUTER_FWHM_COEFF, APERTURE_FWHM_COEFF, EPSILON,
    FIT_BOX_FWHM_COEFF, FWHM_FACTOR,
};
use crate::error::Result;
use crate::frame::{StarFitResult, StarParams, StarPosition};

use super::{FitContext, FitOptions, StarFitter};

/// FWHM assumed when the context carries no usable estimate.
const FALLBACK_FWHM_PIX: f64 = 3.0;
/// Centroid refinement passes.
const CENTROID_ITERATIONS: usize = 2;

/// Default star fitter.
#[derive(Clone, Copy, Debug, Default)]
pub struct MomentStarFitter;

impl StarFitter for MomentStarFitter {
    fn fit_stars(
        &self,
        image: &Array2<f32>,
        context: &FitContext,
        options: FitOptions,
    ) -> Result<StarFitResult> {
        let fwhm0 = match context.fwhm_pix() {
            f if f.is_finite() && f > 0.0 => f,
            _ => FALLBACK_FWHM_PIX,
        };
        let stars = context
            .stars
            .par_iter()
            .map(|&pos| fit_star(image, pos, fwhm0, context.pixel_scale, options))
            .collect();
        Ok(StarFitResult::new(stars))
    }
}

fn fit_star(
    data: &Array2<f32>,
    pos: StarPosition,
    fwhm0: f64,
    pixel_scale: f64,
    options: FitOptions,
) -> StarParams {
    let mut star = StarParams::unfitted(pos);
    let Some(sky) = annulus_sky(
        data,
        pos.x,
        pos.y,
        ANNULUS_INNER_FWHM_COEFF * fwhm0,
        ANNULUS_OUTER_FWHM_COEFF * fwhm0,
    ) else {
        return star;
    };

    let aperture = (APERTURE_FWHM_COEFF * fwhm0).max(2.0);
    let (mut x, mut y) = (pos.x, pos.y);
    if options.refit_position {
        for _ in 0..CENTROID_ITERATIONS {
            match weighted_centroid(data, x, y, aperture, sky.level) {
                Some((cx, cy)) => {
                    x = cx;
                    y = cy;
                }
                None => {
                    star.x = f64::NAN;
                    star.y = f64::NAN;
                    return star;
                }
            }
        }
    }

    let (flux, npix) = aperture_sum(data, x, y, aperture, sky.level);
    let npix = npix as f64;
    let sky_var = sky.std * sky.std;
    let flux_err = (flux.max(0.0) + npix * sky_var * (1.0 + npix / sky.count as f64)).sqrt();
    let snr = if flux_err > EPSILON { flux / flux_err } else { f64::NAN };
    let per_snr = |v: f64| if snr > 0.0 { v / snr } else { f64::NAN };

    let fwhm = if options.refit_shape {
        second_moment_fwhm(data, x, y, FIT_BOX_FWHM_COEFF * fwhm0, sky.level).unwrap_or(f64::NAN)
    } else {
        f64::NAN
    };

    if options.refit_position {
        let sigma = (if fwhm.is_finite() { fwhm } else { fwhm0 }) / FWHM_FACTOR;
        star.x = x;
        star.y = y;
        star.x_err = per_snr(sigma);
        star.y_err = per_snr(sigma);
    }
    if options.refit_shape {
        star.fwhm_pix = fwhm;
        star.fwhm_err = per_snr(fwhm);
        star.fwhm_arc = fwhm * pixel_scale;
        star.fwhm_arc_err = star.fwhm_err * pixel_scale;
    }
    if options.do_photometry {
        star.aperture_flux = flux;
        star.aperture_flux_err = flux_err;
        star.aperture_background = sky.level;
        star.aperture_background_err = sky.std / (sky.count as f64).sqrt();
    }
    star
}

/// Rows or columns within `radius` of `center`, clipped to `[0, len)`.
fn pixel_range(center: f64, radius: f64, len: usize) -> Range<usize> {
    if !center.is_finite() || !radius.is_finite() {
        return 0..0;
    }
    let lo = (center - radius).floor().max(0.0);
    let hi = ((center + radius).ceil() + 1.0).min(len as f64);
    if lo < hi {
        lo as usize..hi as usize
    } else {
        0..0
    }
}

/// Visit every finite pixel whose squared distance to (cx, cy) lies in
/// `(r_min^2, r_max^2]` (or `[0, r_max^2]` when `r_min` is 0).
fn for_each_pixel(
    data: &Array2<f32>,
    cx: f64,
    cy: f64,
    r_min: f64,
    r_max: f64,
    mut f: impl FnMut(f64, f64, f64),
) {
    let (h, w) = data.dim();
    let (min2, max2) = (r_min * r_min, r_max * r_max);
    for row in pixel_range(cy, r_max, h) {
        for col in pixel_range(cx, r_max, w) {
            let v = data[[row, col]] as f64;
            if !v.is_finite() {
                continue;
            }
            let dx = col as f64 - cx;
            let dy = row as f64 - cy;
            let d2 = dx * dx + dy * dy;
            if d2 > max2 || (r_min > 0.0 && d2 <= min2) {
                continue;
            }
            f(col as f64, row as f64, v);
        }
    }
}

struct Sky {
    level: f64,
    std: f64,
    count: usize,
}

/// Median and standard deviation of an annulus around a star.
fn annulus_sky(data: &Array2<f32>, cx: f64, cy: f64, r_in: f64, r_out: f64) -> Option<Sky> {
    let mut values = Vec::new();
    for_each_pixel(data, cx, cy, r_in, r_out, |_, _, v| values.push(v));
    if values.is_empty() {
        return None;
    }
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64).sqrt();
    let level = crate::stats::aggregate::median(&values);
    Some(Sky {
        level,
        std,
        count: n,
    })
}

/// Background-subtracted sum within `radius`, and the pixel count.
fn aperture_sum(data: &Array2<f32>, cx: f64, cy: f64, radius: f64, background: f64) -> (f64, usize) {
    let mut sum = 0.0;
    let mut n = 0usize;
    for_each_pixel(data, cx, cy, 0.0, radius, |_, _, v| {
        sum += v - background;
        n += 1;
    });
    (sum, n)
}

/// Intensity-weighted centroid within `radius`, weights clipped at the
/// background. `None` if nothing rises above it.
pub fn weighted_centroid(
    data: &Array2<f32>,
    cx: f64,
    cy: f64,
    radius: f64,
    background: f64,
) -> Option<(f64, f64)> {
    let (mut sum_w, mut sum_x, mut sum_y) = (0.0, 0.0, 0.0);
    for_each_pixel(data, cx, cy, 0.0, radius, |x, y, v| {
        let weight = (v - background).max(0.0);
        sum_w += weight;
        sum_x += weight * x;
        sum_y += weight * y;
    });
    if sum_w < EPSILON {
        return None;
    }
    Some((sum_x / sum_w, sum_y / sum_w))
}

/// FWHM in pixels from the intensity-weighted second moments within
/// `radius`: `FWHM_FACTOR * sqrt(sigma_major * sigma_minor)`.
pub fn second_moment_fwhm(
    data: &Array2<f32>,
    cx: f64,
    cy: f64,
    radius: f64,
    background: f64,
) -> Option<f64> {
    let (mx, my) = weighted_centroid(data, cx, cy, radius, background)?;

    let (mut sum_w, mut m_xx, mut m_yy, mut m_xy) = (0.0, 0.0, 0.0, 0.0);
    for_each_pixel(data, mx, my, 0.0, radius, |x, y, v| {
        let weight = (v - background).max(0.0);
        let dx = x - mx;
        let dy = y - my;
        sum_w += weight;
        m_xx += weight * dx * dx;
        m_yy += weight * dy * dy;
        m_xy += weight * dx * dy;
    });
    if sum_w < EPSILON {
        return None;
    }
    m_xx /= sum_w;
    m_yy /= sum_w;
    m_xy /= sum_w;

    let trace = m_xx + m_yy;
    let det = m_xx * m_yy - m_xy * m_xy;
    let disc = (trace * trace - 4.0 * det).max(0.0).sqrt();
    let lambda_major = (trace + disc) * 0.5;
    let lambda_minor = (trace - disc) * 0.5;
    if lambda_major <= 0.0 || lambda_minor <= 0.0 {
        return None;
    }
    Some(FWHM_FACTOR * (lambda_major * lambda_minor).sqrt().sqrt())
}
