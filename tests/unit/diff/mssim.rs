use super::*;

#[test]
fn identical_frames_score_one() {
    let a = FrameRGBA::filled_rgb(16, 16, [30, 90, 150]);
    let ssim = Mssim::mean_ssim(&a, &a.clone()).unwrap();
    assert!((ssim - 1.0).abs() < 1e-9);

    let result = Mssim::default().compare(&a, &a.clone()).unwrap();
    assert!(result.is_identical());
    assert_eq!(result.similar_pixels, 0);
}

#[test]
fn faint_noise_is_similar() {
    let a = FrameRGBA::filled_rgb(12, 12, [200, 200, 200]);
    let mut b = a.clone();
    b.set_pixel(5, 5, [201, 201, 201, 255]);

    let result = Mssim::default().compare(&a, &b).unwrap();
    assert_eq!(result.similar_pixels, 1);
    assert_eq!(result.different_pixels, 0);
    assert_eq!(
        result.delta.pixel(12 + 5, 5),
        Some(crate::diff::DELTA_SIMILAR)
    );
}

#[test]
fn structural_change_is_different() {
    let a = FrameRGBA::filled_rgb(12, 12, [0, 0, 0]);
    let mut b = a.clone();
    b.set_pixel(5, 5, [255, 255, 255, 255]);

    let result = Mssim::default().compare(&a, &b).unwrap();
    assert_eq!(result.different_pixels, 1);
    assert!(Mssim::mean_ssim(&a, &b).unwrap() < 1.0);
}

#[test]
fn windows_are_clipped_at_frame_edges() {
    // Smaller than one 11x11 window.
    let a = FrameRGBA::filled_rgb(3, 2, [10, 20, 30]);
    let mut b = a.clone();
    b.set_pixel(0, 0, [250, 250, 250, 255]);

    let ssim = Mssim::mean_ssim(&a, &b).unwrap();
    assert!(ssim.is_finite() && ssim < 1.0);
    let result = Mssim::default().compare(&a, &b).unwrap();
    assert_eq!(result.different_pixels, 1);
}

#[test]
fn lower_threshold_accepts_more() {
    let a = FrameRGBA::filled_rgb(8, 8, [100, 100, 100]);
    let mut b = a.clone();
    b.set_pixel(3, 3, [120, 120, 120, 255]);

    let strict = Mssim::new(0.999, AlphaPolicy::Strict)
        .compare(&a, &b)
        .unwrap();
    let loose = Mssim::new(-1.0, AlphaPolicy::Strict)
        .compare(&a, &b)
        .unwrap();
    assert_eq!(strict.different_pixels, 1);
    assert_eq!(loose.different_pixels, 0);
    assert_eq!(loose.similar_pixels, 1);
}

#[test]
fn empty_frames_score_one() {
    let a = FrameRGBA::transparent(0, 0);
    assert_eq!(Mssim::mean_ssim(&a, &a.clone()).unwrap(), 1.0);
}

#[test]
fn size_mismatch_is_a_validation_error() {
    let a = FrameRGBA::filled_rgb(2, 2, [0, 0, 0]);
    let b = FrameRGBA::filled_rgb(3, 2, [0, 0, 0]);
    let err = Mssim::mean_ssim(&a, &b).unwrap_err();
    assert!(matches!(err, ClipError::Validation(_)));
}
