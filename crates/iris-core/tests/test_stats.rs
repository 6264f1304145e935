use iris_core::frame::{StarFitResult, StarParam, StarParams, StarPosition};
use iris_core::stats::aggregate::{median, percentile};
use iris_core::stats::{summarize_fits, CameraFits, FrameStatsRecord, Measure};

fn fit_from(columns: &[(StarParam, Vec<f64>)]) -> StarFitResult {
    StarFitResult::from_columns(columns)
}

/// Three stars, fitted in every camera with the given x offset and
/// merged flux.
fn fits(x_offset: f64, flux: f64) -> CameraFits {
    let camera = fit_from(&[
        (StarParam::X, vec![10.0 + x_offset, 20.0 + x_offset, 30.0 + x_offset]),
        (StarParam::XErr, vec![0.1, 0.2, 0.3]),
        (StarParam::Y, vec![5.0, 6.0, 7.0]),
        (StarParam::YErr, vec![0.05, 0.05, 0.05]),
        (StarParam::FwhmPix, vec![3.0, 3.2, 3.4]),
        (StarParam::FwhmErr, vec![0.1, 0.1, 0.1]),
        (StarParam::FwhmArc, vec![0.9, 0.96, 1.02]),
        (StarParam::FwhmArcErr, vec![0.03, 0.03, 0.03]),
    ]);
    let merged = fit_from(&[
        (StarParam::X, vec![10.0, 20.0, 30.0]),
        (StarParam::Y, vec![5.0, 6.0, 7.0]),
        (StarParam::ApertureFlux, vec![flux * 0.9, flux, flux * 1.1]),
        (StarParam::ApertureFluxErr, vec![1.0, 1.0, 1.0]),
        (StarParam::ApertureBackground, vec![9.0, 10.0, 11.0]),
        (StarParam::ApertureBackgroundErr, vec![0.5, 0.5, 0.5]),
    ]);
    CameraFits {
        cam1: camera.clone(),
        cam2: camera,
        merged,
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[test]
fn test_percentile_ignores_nan() {
    let fwhm = [1.0, 1.2, f64::NAN, 0.9, 1.1];
    let p10 = percentile(&fwhm, 10.0);
    // Over [0.9, 1.0, 1.1, 1.2]: rank 0.3 between 0.9 and 1.0.
    assert!((p10 - 0.93).abs() < 1e-12, "p10 = {p10}");
    assert_eq!(p10, percentile(&[0.9, 1.0, 1.1, 1.2], 10.0));
}

#[test]
fn test_median_ignores_nan() {
    assert_eq!(median(&[f64::NAN, 4.0, 1.0, f64::INFINITY, 2.0]), 2.0);
}

#[test]
fn test_all_nan_is_nan() {
    assert!(percentile(&[f64::NAN; 4], 10.0).is_nan());
}

// ---------------------------------------------------------------------------
// summarize_fits
// ---------------------------------------------------------------------------

#[test]
fn test_reference_frame_shift_is_exactly_zero() {
    let record = summarize_fits(10, &fits(3.7, 100.0), None, 10.0);
    for m in [
        record.dx_pix_1,
        record.dy_pix_1,
        record.dx_pix_2,
        record.dy_pix_2,
    ] {
        assert_eq!(m.value, 0.0);
    }
    // Error: median of the frame's own position errors.
    assert!((record.dx_pix_1.error - 0.2).abs() < 1e-12);
    assert!((record.dy_pix_1.error - 0.05).abs() < 1e-12);
    assert!(record.extinction.value.abs() < 1e-12);
}

#[test]
fn test_shift_against_reference() {
    let reference = fits(0.0, 100.0);
    let record = summarize_fits(11, &fits(1.5, 100.0), Some(&reference), 10.0);
    assert!((record.dx_pix_1.value - 1.5).abs() < 1e-12);
    assert!((record.dx_pix_2.value - 1.5).abs() < 1e-12);
    assert!(record.dy_pix_1.value.abs() < 1e-12);
    // Only the current frame's error, not combined with the reference.
    assert!((record.dx_pix_1.error - 0.2).abs() < 1e-12);
}

#[test]
fn test_extinction_of_half_flux() {
    let reference = fits(0.0, 100.0);
    let record = summarize_fits(12, &fits(0.0, 50.0), Some(&reference), 10.0);
    assert!((record.flux.value - 50.0).abs() < 1e-12);
    assert!(
        (record.extinction.value - 0.752_574_989).abs() < 1e-6,
        "extinction = {}",
        record.extinction.value
    );
    assert!(record.extinction.value > 0.0);
    let expected_err = 2.5 / std::f64::consts::LN_10 * (0.02f64.powi(2) + 0.01f64.powi(2)).sqrt();
    assert!((record.extinction.error - expected_err).abs() < 1e-9);
}

#[test]
fn test_fwhm_percentile_and_background() {
    let record = summarize_fits(13, &fits(0.0, 100.0), None, 10.0);
    // 10th percentile of [3.0, 3.2, 3.4]
    assert!((record.fwhm_pix_1.value - 3.04).abs() < 1e-12);
    assert!((record.fwhm_arc_2.value - 0.912).abs() < 1e-12);
    assert!((record.fwhm_arc_1.error - 0.03).abs() < 1e-12);
    assert_eq!(record.background, Measure::new(10.0, 0.5));
    assert_eq!(record.star_nb, 3);
    assert_eq!(record.odometer, 13);
}

#[test]
fn test_nan_stars_skipped() {
    let mut current = fits(0.0, 100.0);
    let mut fwhm = current.cam1.column(StarParam::FwhmPix);
    fwhm[0] = f64::NAN;
    for (star, v) in current.cam1.stars.iter_mut().zip(fwhm) {
        star.fwhm_pix = v;
    }
    current.merged.stars[2].aperture_flux = f64::NAN;

    let record = summarize_fits(14, &current, None, 10.0);
    // Over [3.2, 3.4]
    assert!((record.fwhm_pix_1.value - 3.22).abs() < 1e-12);
    // Over [90, 100]
    assert!((record.flux.value - 95.0).abs() < 1e-12);
}

#[test]
fn test_unfitted_frame_gives_undefined_stats() {
    let star = StarParams::unfitted(StarPosition::new(1.0, 1.0));
    let empty = StarFitResult::new(vec![star; 3]);
    let current = CameraFits {
        cam1: empty.clone(),
        cam2: empty.clone(),
        merged: empty,
    };
    let record = summarize_fits(15, &current, None, 10.0);
    assert!(record.fwhm_arc_1.value.is_nan());
    assert!(record.flux.value.is_nan());
    assert!(record.extinction.value.is_nan());
    assert_eq!(record.dx_pix_1.value, 0.0);
}

// ---------------------------------------------------------------------------
// FrameStatsRecord attributes
// ---------------------------------------------------------------------------

#[test]
fn test_record_attribute_lookup() {
    let record = summarize_fits(16, &fits(0.0, 100.0), None, 10.0);
    assert_eq!(record.get("odometer_nb").and_then(|v| v.as_i64()), Some(16));
    assert_eq!(record.get("star_nb").and_then(|v| v.as_i64()), Some(3));
    assert_eq!(record.get("background").map(|v| v.as_f64()), Some(10.0));
    assert_eq!(record.get("background_err").map(|v| v.as_f64()), Some(0.5));
    assert!(record.get("no-such-stat").is_none());

    let back = FrameStatsRecord::from_attributes(&record.to_attributes()).unwrap();
    assert_eq!(back.to_attributes(), record.to_attributes());
}
