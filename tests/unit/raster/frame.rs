use super::*;

fn temp_dir(name: &str) -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    std::env::temp_dir().join(format!(
        "clipcheck_frame_{name}_{}_{nanos}",
        std::process::id()
    ))
}

#[test]
fn constructors_track_alpha() {
    assert!(FrameRGBA::transparent(2, 2).has_alpha);
    assert!(!FrameRGBA::filled(2, 2, [1, 2, 3, 255]).has_alpha);
    assert!(FrameRGBA::filled(2, 2, [1, 2, 3, 10]).has_alpha);

    let rgb = FrameRGBA::filled_rgb(3, 1, [9, 8, 7]);
    assert!(!rgb.has_alpha);
    assert!(rgb.is_opaque());
    assert_eq!(rgb.pixel(2, 0), Some([9, 8, 7, 255]));
}

#[test]
fn buffer_length_is_validated() {
    assert!(FrameRGBA::from_rgba8(2, 2, vec![0; 15]).is_err());
    assert!(FrameRGBA::from_rgba8(2, 2, vec![0; 16]).is_ok());
    assert!(FrameRGBA::from_rgb8(2, 1, &[0; 5]).is_err());

    let f = FrameRGBA::from_rgb8(2, 1, &[1, 2, 3, 4, 5, 6]).unwrap();
    assert_eq!(f.data, vec![1, 2, 3, 255, 4, 5, 6, 255]);
}

#[test]
fn pixel_access_is_bounds_checked() {
    let mut f = FrameRGBA::filled_rgb(2, 2, [0, 0, 0]);
    assert_eq!(f.pixel(2, 0), None);
    f.set_pixel(5, 5, [1, 1, 1, 1]);
    assert!(!f.has_alpha);

    f.set_pixel(1, 1, [10, 20, 30, 40]);
    assert_eq!(f.pixel(1, 1), Some([10, 20, 30, 40]));
    assert!(f.has_alpha);
    assert!(!f.is_opaque());
}

#[test]
fn extend_canvas_pads_with_transparent_zero() {
    let f = FrameRGBA::filled_rgb(2, 1, [255, 0, 0]);
    let e = f.extend_canvas(3, 2);
    assert_eq!((e.width, e.height), (3, 2));
    assert_eq!(e.pixel(0, 0), Some([255, 0, 0, 255]));
    assert_eq!(e.pixel(1, 0), Some([255, 0, 0, 255]));
    assert_eq!(e.pixel(2, 0), Some([0, 0, 0, 0]));
    assert_eq!(e.pixel(0, 1), Some([0, 0, 0, 0]));
    assert!(e.has_alpha);

    assert_eq!(f.extend_canvas(2, 1), f);
}

#[test]
fn blit_crops_to_destination() {
    let mut dst = FrameRGBA::filled_rgb(3, 3, [0, 0, 0]);
    let src = FrameRGBA::filled_rgb(2, 2, [255, 255, 255]);
    dst.blit(&src, 2, 2);
    assert_eq!(dst.pixel(2, 2), Some([255, 255, 255, 255]));
    assert_eq!(dst.pixel(1, 1), Some([0, 0, 0, 255]));

    dst.blit(&src, 3, 0);
    assert_eq!(dst.pixel(2, 0), Some([0, 0, 0, 255]));
}

#[test]
fn png_roundtrip_keeps_color_model() {
    let dir = temp_dir("png");
    let path = dir.join("nested").join("rgb.png");

    let mut f = FrameRGBA::filled_rgb(4, 3, [10, 20, 30]);
    f.set_pixel(3, 2, [200, 100, 50, 255]);
    f.save_png(&path).unwrap();
    let back = FrameRGBA::load_png(&path).unwrap();
    assert_eq!(back, f);

    let a = FrameRGBA::filled(2, 2, [1, 2, 3, 4]);
    let apath = dir.join("rgba.png");
    a.save_png(&apath).unwrap();
    assert_eq!(FrameRGBA::load_png(&apath).unwrap(), a);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn to_rgba_image_matches_dimensions() {
    let f = FrameRGBA::filled(3, 2, [1, 2, 3, 4]);
    let img = f.to_rgba_image().unwrap();
    assert_eq!(img.dimensions(), (3, 2));
    assert_eq!(
        FrameRGBA::from_dynamic(&image::DynamicImage::ImageRgba8(img)),
        f
    );
}
