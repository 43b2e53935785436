use super::*;
use crate::diff::PixelPerfect;
use crate::foundation::core::FrameDelay;
use std::path::Path;

fn temp_dir(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let dir = std::env::temp_dir().join(format!(
        "clipcheck_verifier_{name}_{}_{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn shade(v: u8) -> FrameRGBA {
    FrameRGBA::filled_rgb(2, 2, [v, v, v])
}

fn write_golden(path: &Path, fps: u32, frames: &[FrameRGBA]) {
    let mut w = ApngWriter::create(path, fps).unwrap();
    for f in frames {
        w.write_image(f).unwrap();
    }
    w.close().unwrap();
}

fn options(dir: &Path, fps: u32, frame_count: u32) -> VerifyOptions {
    VerifyOptions {
        golden_path: dir.join("golden.png"),
        delta_path: dir.join("delta.png"),
        fps,
        frame_count,
        max_percent_difference: 0.0,
    }
}

fn verifier(dir: &Path, fps: u32, frame_count: u32) -> ApngVerifier {
    ApngVerifier::new(
        options(dir, fps, frame_count),
        Box::new(PixelPerfect::default()),
    )
    .unwrap()
}

#[test]
fn matching_run_creates_no_writer() {
    let dir = temp_dir("match");
    let frames = [shade(0), shade(10), shade(20)];
    write_golden(&dir.join("golden.png"), 10, &frames);

    let mut v = verifier(&dir, 10, 3);
    for f in &frames {
        v.verify_frame(f).unwrap();
        assert!(!v.has_delta_writer());
    }
    v.assert_finished().unwrap();
    v.close().unwrap();
    assert!(!dir.join("delta.png").exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn lazy_writer_is_seeded_and_keeps_golden_position() {
    let dir = temp_dir("seed");
    let golden = [shade(0), shade(10), shade(20), shade(30)];
    write_golden(&dir.join("golden.png"), 10, &golden);

    let mut v = verifier(&dir, 10, 4);
    v.verify_frame(&golden[0]).unwrap();
    v.verify_frame(&golden[1]).unwrap();
    v.verify_frame(&shade(99)).unwrap();
    assert!(v.has_delta_writer());
    v.verify_frame(&golden[3]).unwrap();
    assert_eq!(v.mismatches().len(), 1);
    assert_eq!(v.golden_frames_read(), 4);

    let err = v.assert_finished().unwrap_err();
    let failure = err.as_verification().unwrap();
    assert_eq!(failure.mismatched_frames, vec![100.0]);
    assert_eq!(failure.fps_mismatch, None);
    assert_eq!(failure.frame_count_mismatch, None);

    let mut r = ApngReader::open(dir.join("delta.png")).unwrap();
    assert_eq!(r.frame_count(), 4);
    let deltas = r.remaining_frames().unwrap();
    assert_eq!(r.delay(), FrameDelay { num: 1, den: 10 });
    assert_eq!(deltas.len(), 4);
    // Seeded frames show the golden on both sides and an all-equivalent map.
    assert_eq!(deltas[0].pixel(0, 0), Some([0, 0, 0, 255]));
    assert_eq!(deltas[1].pixel(2, 0), Some(crate::diff::DELTA_EQUIVALENT));
    assert_eq!(deltas[2].pixel(4, 0), Some([99, 99, 99, 255]));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn differing_fps_creates_the_writer_eagerly() {
    let dir = temp_dir("eager");
    write_golden(&dir.join("golden.png"), 24, &[shade(0), shade(0)]);

    let v = verifier(&dir, 60, 5);
    assert!(v.has_delta_writer());
    assert_eq!(v.reconciler().common_rate(), 120);
    drop(v);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn delta_clip_runs_at_the_common_rate() {
    let dir = temp_dir("lcm_delta");
    let golden: Vec<FrameRGBA> = (0..2).map(|_| shade(0)).collect();
    write_golden(&dir.join("golden.png"), 2, &golden);

    let mut v = verifier(&dir, 3, 3);
    for _ in 0..3 {
        v.verify_frame(&shade(0)).unwrap();
    }
    let err = v.assert_finished().unwrap_err();
    let failure = err.as_verification().unwrap();
    assert_eq!(failure.fps_mismatch, Some((2, 3)));
    assert!(failure.mismatched_frames.is_empty());

    let mut r = ApngReader::open(dir.join("delta.png")).unwrap();
    let deltas = r.remaining_frames().unwrap();
    assert_eq!(deltas.len(), 6);
    assert_eq!(r.delay(), FrameDelay { num: 1, den: 6 });
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn calls_after_finish_are_rejected() {
    let dir = temp_dir("twice");
    write_golden(&dir.join("golden.png"), 10, &[shade(0)]);

    let mut v = verifier(&dir, 10, 1);
    v.verify_frame(&shade(0)).unwrap();
    v.assert_finished().unwrap();
    assert!(matches!(v.assert_finished(), Err(ClipError::Validation(_))));
    assert!(matches!(
        v.verify_frame(&shade(0)),
        Err(ClipError::Validation(_))
    ));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn dropping_mid_run_still_writes_the_artifact() {
    let dir = temp_dir("drop");
    write_golden(&dir.join("golden.png"), 10, &[shade(0), shade(0)]);
    {
        let mut v = verifier(&dir, 10, 2);
        v.verify_frame(&shade(50)).unwrap();
    }
    assert!(dir.join("delta.png").exists());
    assert!(!dir.join("delta.png.staging").exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_golden_is_fatal() {
    let dir = temp_dir("missing");
    let err = ApngVerifier::new(options(&dir, 10, 1), Box::new(PixelPerfect::default()))
        .unwrap_err();
    assert!(err.is_fatal());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_options_are_rejected() {
    let dir = temp_dir("invalid");
    write_golden(&dir.join("golden.png"), 10, &[shade(0)]);
    let mut opts = options(&dir, 0, 1);
    assert!(ApngVerifier::new(opts.clone(), Box::new(PixelPerfect::default())).is_err());
    opts.fps = 10;
    opts.max_percent_difference = f64::NAN;
    assert!(ApngVerifier::new(opts, Box::new(PixelPerfect::default())).is_err());
    let _ = std::fs::remove_dir_all(&dir);
}

fn rewrite_delays(path: &Path, num: u16, den: u16) {
    use crate::apng::chunk::{ChunkTag, PNG_SIGNATURE, read_chunk, write_chunk};

    let bytes = std::fs::read(path).unwrap();
    let mut cursor = std::io::Cursor::new(&bytes[PNG_SIGNATURE.len()..]);
    let mut out = PNG_SIGNATURE.to_vec();
    loop {
        let mut chunk = read_chunk(&mut cursor).unwrap();
        if chunk.tag == ChunkTag::Fctl {
            chunk.payload[20..22].copy_from_slice(&num.to_be_bytes());
            chunk.payload[22..24].copy_from_slice(&den.to_be_bytes());
        }
        write_chunk(&mut out, chunk.tag, &chunk.payload).unwrap();
        if chunk.tag == ChunkTag::Iend {
            break;
        }
    }
    std::fs::write(path, out).unwrap();
}

#[test]
fn golden_fps_comes_from_a_reduced_frame_delay() {
    let dir = temp_dir("reduced_delay");
    let frames = [shade(0), shade(0), shade(0)];
    let golden = dir.join("golden.png");
    write_golden(&golden, 50, &frames);
    rewrite_delays(&golden, 2, 50);

    let mut v = verifier(&dir, 50, 3);
    assert_eq!(v.reconciler().expected_fps(), 25);
    assert!(v.has_delta_writer());
    for f in &frames {
        v.verify_frame(f).unwrap();
    }
    let err = v.assert_finished().unwrap_err();
    let failure = err.as_verification().unwrap();
    assert_eq!(failure.fps_mismatch, Some((25, 50)));
    assert!(
        failure
            .summary
            .contains("Mismatched video fps expected: 25 actual: 50")
    );
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn fractional_golden_frame_rate_is_fatal() {
    let dir = temp_dir("fractional_delay");
    let golden = dir.join("golden.png");
    write_golden(&golden, 30, &[shade(0), shade(5)]);

    for (num, den) in [(2, 45), (1, 0)] {
        rewrite_delays(&golden, num, den);
        let err = ApngVerifier::new(options(&dir, 30, 2), Box::new(PixelPerfect::default()))
            .unwrap_err();
        assert!(matches!(err, ClipError::Format(_)), "{num}/{den}: {err}");
    }
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn still_golden_without_delay_uses_the_caller_fps() {
    let dir = temp_dir("still_golden");
    FrameRGBA::filled_rgb(2, 2, [9, 9, 9])
        .save_png(dir.join("golden.png"))
        .unwrap();

    let mut v = verifier(&dir, 15, 1);
    assert_eq!(v.reconciler().expected_fps(), 15);
    assert!(!v.has_delta_writer());
    v.verify_frame(&shade(9)).unwrap();
    v.assert_finished().unwrap();
    let _ = std::fs::remove_dir_all(&dir);
}
