use super::*;

fn cfg() -> SinkConfig {
    SinkConfig {
        width: 4,
        height: 2,
        fps: 30,
        frame_count: 3,
    }
}

#[test]
fn config_validation_catches_bad_values() {
    assert!(cfg().validate().is_ok());
    assert!(SinkConfig { fps: 0, ..cfg() }.validate().is_err());
    assert!(SinkConfig { width: 0, ..cfg() }.validate().is_err());
    assert!(SinkConfig { height: 0, ..cfg() }.validate().is_err());
}

#[test]
fn in_memory_sink_captures_frames_in_order() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg()).unwrap();
    let f = FrameRGBA::filled_rgb(4, 2, [1, 2, 3]);
    sink.push_frame(FrameIndex(0), &f).unwrap();
    sink.push_frame(FrameIndex(2), &f).unwrap();
    assert!(sink.push_frame(FrameIndex(2), &f).is_err());
    assert!(sink.push_frame(FrameIndex(1), &f).is_err());
    sink.end().unwrap();

    assert!(sink.is_ended());
    assert_eq!(sink.config(), Some(cfg()));
    let idx: Vec<u64> = sink.frames().iter().map(|(i, _)| i.0).collect();
    assert_eq!(idx, vec![0, 2]);
}

#[test]
fn begin_resets_previous_capture() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg()).unwrap();
    sink.push_frame(FrameIndex(0), &FrameRGBA::transparent(4, 2))
        .unwrap();
    sink.end().unwrap();

    sink.begin(cfg()).unwrap();
    assert!(sink.frames().is_empty());
    assert!(!sink.is_ended());
}

#[test]
fn ensure_parent_dir_creates_missing_directories() {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let root = std::env::temp_dir().join(format!(
        "clipcheck_sink_{}_{nanos}",
        std::process::id()
    ));
    let file = root.join("a").join("b").join("out.png");
    ensure_parent_dir(&file).unwrap();
    assert!(root.join("a").join("b").is_dir());
    ensure_parent_dir(std::path::Path::new("bare.png")).unwrap();
    let _ = std::fs::remove_dir_all(&root);
}
