mod common;

use iris_core::align::{Aligner, InitialGuess, StarMatchAligner};
use iris_core::config::DetectionConfig;
use iris_core::error::IrisError;
use ndarray::Array2;

use common::{render_exposure, star_field, CAM2_OFFSET, DIM, SKY};

fn guess() -> InitialGuess {
    InitialGuess {
        angle_deg: 0.0,
        dx: 0.0,
        dy: 0.0,
        fwhm_arc: 0.8,
        pixel_scale: 0.5,
    }
}

#[test]
fn test_recovers_camera_offset() {
    let (im1, im2) = render_exposure((0.0, 0.0), 1.0, 3);
    let result = StarMatchAligner::new(DetectionConfig::default())
        .compute_alignment(&im1, &im2, &guess())
        .unwrap();

    assert!((result.model.dx - CAM2_OFFSET.0).abs() < 0.2, "dx = {}", result.model.dx);
    assert!((result.model.dy - CAM2_OFFSET.1).abs() < 0.2, "dy = {}", result.model.dy);
    assert_eq!(result.star_list1.len(), star_field().len());
    assert_eq!(result.star_list1.len(), result.star_list2.len());
    for (s1, s2) in result.star_list1.iter().zip(&result.star_list2) {
        assert!((s2.x - s1.x - CAM2_OFFSET.0).abs() < 0.3);
        assert!((s2.y - s1.y - CAM2_OFFSET.1).abs() < 0.3);
    }
    // sigma 1.5 px -> FWHM about 3.5 px at 0.5 arcsec/px.
    assert!(result.fwhm_arc > 1.0 && result.fwhm_arc < 2.5, "fwhm = {}", result.fwhm_arc);
}

#[test]
fn test_blank_frame_fails() {
    let blank = Array2::from_elem((DIM, DIM), SKY as f32);
    let (im1, _) = render_exposure((0.0, 0.0), 1.0, 3);
    let aligner = StarMatchAligner::new(DetectionConfig::default());
    assert!(matches!(
        aligner.compute_alignment(&blank, &im1, &guess()),
        Err(IrisError::Alignment(_))
    ));
    assert!(matches!(
        aligner.compute_alignment(&im1, &blank, &guess()),
        Err(IrisError::Alignment(_))
    ));
}

#[test]
fn test_guess_too_far_fails() {
    let (im1, im2) = render_exposure((0.0, 0.0), 1.0, 3);
    let far = InitialGuess {
        dx: 40.0,
        dy: 40.0,
        ..guess()
    };
    let detection = DetectionConfig {
        match_radius: 3.0,
        ..DetectionConfig::default()
    };
    assert!(matches!(
        StarMatchAligner::new(detection).compute_alignment(&im1, &im2, &far),
        Err(IrisError::Alignment(_))
    ));
}
