use super::*;
use crate::raster::frame::FrameRGBA;

#[test]
fn empty_object_is_the_default_config() {
    let cfg = VerifyConfig::from_reader("{}".as_bytes()).unwrap();
    assert_eq!(cfg, VerifyConfig::default());
    assert_eq!(cfg.max_percent_difference, 0.0);
    assert_eq!(cfg.failure_dir, PathBuf::from(DEFAULT_FAILURE_DIR));
    assert_eq!(cfg.differ, DifferConfig::PixelPerfect);
    assert_eq!(cfg.alpha, AlphaPolicy::default());
}

#[test]
fn parses_differ_and_alpha_shapes() {
    let json = r#"{
        "max_percent_difference": 0.5,
        "failure_dir": "out/failures",
        "differ": { "kind": "off_by", "tolerance": 3 },
        "alpha": { "mode": "composite", "background": [255, 255, 255] }
    }"#;
    let cfg = VerifyConfig::from_reader(json.as_bytes()).unwrap();
    assert_eq!(cfg.max_percent_difference, 0.5);
    assert_eq!(cfg.failure_dir, PathBuf::from("out/failures"));
    assert_eq!(cfg.differ, DifferConfig::OffBy { tolerance: 3 });
    assert_eq!(
        cfg.alpha,
        AlphaPolicy::Composite {
            background: [255, 255, 255]
        }
    );

    let strict = VerifyConfig::from_reader(r#"{"alpha":{"mode":"strict"}}"#.as_bytes()).unwrap();
    assert_eq!(strict.alpha, AlphaPolicy::Strict);
}

#[test]
fn unknown_fields_are_rejected() {
    let err = VerifyConfig::from_reader(r#"{"max_diff": 1}"#.as_bytes()).unwrap_err();
    assert!(matches!(err, ClipError::Validation(_)));
    assert!(err.to_string().contains("parse verify config JSON"));
}

#[test]
fn validate_bounds_threshold_and_failure_dir() {
    for bad in [f64::NAN, f64::INFINITY, -0.1, 100.5] {
        let cfg = VerifyConfig {
            max_percent_difference: bad,
            ..VerifyConfig::default()
        };
        assert!(cfg.validate().is_err(), "{bad} accepted");
    }
    let cfg = VerifyConfig {
        max_percent_difference: 100.0,
        ..VerifyConfig::default()
    };
    cfg.validate().unwrap();

    let cfg = VerifyConfig {
        failure_dir: PathBuf::new(),
        ..VerifyConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn from_path_reports_missing_file() {
    let err = VerifyConfig::from_path("/definitely/not/here/clipcheck.json").unwrap_err();
    assert!(err.to_string().contains("open verify config"));
}

#[test]
fn build_differ_honors_kind_and_tolerance() {
    let expected = FrameRGBA::filled_rgb(2, 1, [100, 100, 100]);
    let actual = FrameRGBA::filled_rgb(2, 1, [102, 100, 100]);

    let strict = VerifyConfig::default().build_differ();
    assert_eq!(
        strict.compare(&expected, &actual).unwrap().different_pixels,
        2
    );

    let lenient = VerifyConfig {
        differ: DifferConfig::OffBy { tolerance: 2 },
        ..VerifyConfig::default()
    }
    .build_differ();
    let result = lenient.compare(&expected, &actual).unwrap();
    assert_eq!(result.different_pixels, 0);
    assert_eq!(result.similar_pixels, 2);
}

#[test]
fn snapshot_options_mirror_config() {
    let cfg = VerifyConfig {
        max_percent_difference: 1.0,
        failure_dir: PathBuf::from("x"),
        ..VerifyConfig::default()
    };
    let opts = cfg.snapshot_options();
    assert_eq!(opts.failure_dir, PathBuf::from("x"));
    assert_eq!(opts.max_percent_difference, 1.0);
}

#[test]
fn perceptual_differ_kinds_parse_with_default_thresholds() {
    let cfg = VerifyConfig::from_reader(r#"{ "differ": { "kind": "mssim" } }"#.as_bytes()).unwrap();
    assert_eq!(cfg.differ, DifferConfig::Mssim { threshold: 0.95 });

    let cfg =
        VerifyConfig::from_reader(r#"{ "differ": { "kind": "delta_e" } }"#.as_bytes()).unwrap();
    assert_eq!(cfg.differ, DifferConfig::DeltaE { threshold: 2.3 });

    let json = r#"{ "differ": { "kind": "delta_e", "threshold": 5.0 } }"#;
    let cfg = VerifyConfig::from_reader(json.as_bytes()).unwrap();
    assert_eq!(cfg.differ, DifferConfig::DeltaE { threshold: 5.0 });
}

#[test]
fn perceptual_thresholds_are_validated() {
    for differ in [
        DifferConfig::Mssim { threshold: 1.5 },
        DifferConfig::Mssim {
            threshold: f64::NAN,
        },
        DifferConfig::DeltaE { threshold: -1.0 },
        DifferConfig::DeltaE {
            threshold: f64::INFINITY,
        },
    ] {
        let cfg = VerifyConfig {
            differ,
            ..VerifyConfig::default()
        };
        assert!(cfg.validate().is_err(), "{differ:?}");
    }
}

#[test]
fn build_differ_covers_perceptual_kinds() {
    let expected = FrameRGBA::filled_rgb(4, 4, [100, 100, 100]);
    let mut actual = expected.clone();
    actual.set_pixel(1, 1, [101, 100, 100, 255]);

    for differ in [
        DifferConfig::Mssim { threshold: 0.95 },
        DifferConfig::DeltaE { threshold: 2.3 },
    ] {
        let result = VerifyConfig {
            differ,
            ..VerifyConfig::default()
        }
        .build_differ()
        .compare(&expected, &actual)
        .unwrap();
        assert_eq!(result.different_pixels, 0, "{differ:?}");
        assert_eq!(result.similar_pixels, 1, "{differ:?}");
    }
}
