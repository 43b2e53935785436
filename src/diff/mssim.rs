use crate::diff::{AlphaPolicy, DiffResult, Differ, PixelVerdict, diff_at};
use crate::foundation::error::{ClipError, ClipResult};
use crate::raster::frame::FrameRGBA;

/// Gaussian window radius; windows are 11x11.
const RADIUS: i64 = 5;
const SIGMA: f64 = 1.5;
/// Stabilizers `(0.01 * 255)^2` and `(0.03 * 255)^2`.
const C1: f64 = 6.5025;
const C2: f64 = 58.5225;

/// Structural-similarity differ.
///
/// Every pixel is scored with the SSIM of the luma window centred on it (windows are clipped
/// at the frame edges). Non-equivalent pixels scoring at least `threshold` are similar. The
/// mean over all pixels is available through [`Mssim::mean_ssim`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mssim {
    pub threshold: f64,
    pub policy: AlphaPolicy,
}

impl Mssim {
    pub fn new(threshold: f64, policy: AlphaPolicy) -> Self {
        Self { threshold, policy }
    }

    /// Mean SSIM of two equal-sized frames; `1.0` for identical (or empty) frames.
    pub fn mean_ssim(expected: &FrameRGBA, actual: &FrameRGBA) -> ClipResult<f64> {
        let map = ssim_map(expected, actual)?;
        if map.is_empty() {
            return Ok(1.0);
        }
        Ok(map.iter().sum::<f64>() / map.len() as f64)
    }
}

impl Default for Mssim {
    fn default() -> Self {
        Self::new(0.95, AlphaPolicy::default())
    }
}

impl Differ for Mssim {
    fn compare(&self, expected: &FrameRGBA, actual: &FrameRGBA) -> ClipResult<DiffResult> {
        let map = ssim_map(expected, actual)?;
        let Self { threshold, policy } = *self;
        let width = expected.width as usize;
        diff_at(expected, actual, |x, y, e, a| {
            if policy.equivalent(e, a) {
                PixelVerdict::Equivalent
            } else if map[y as usize * width + x as usize] >= threshold {
                PixelVerdict::Similar
            } else {
                PixelVerdict::Different
            }
        })
    }
}

/// Premultiplied Rec. 601 luma.
fn luma(frame: &FrameRGBA) -> Vec<f64> {
    frame
        .data
        .chunks_exact(4)
        .map(|p| {
            let y = 0.299 * f64::from(p[0]) + 0.587 * f64::from(p[1]) + 0.114 * f64::from(p[2]);
            y * f64::from(p[3]) / 255.0
        })
        .collect()
}

fn gaussian_weight(dx: i64, dy: i64) -> f64 {
    (-((dx * dx + dy * dy) as f64) / (2.0 * SIGMA * SIGMA)).exp()
}

/// Per-pixel SSIM, row-major.
fn ssim_map(expected: &FrameRGBA, actual: &FrameRGBA) -> ClipResult<Vec<f64>> {
    if expected.width != actual.width || expected.height != actual.height {
        return Err(ClipError::validation(format!(
            "cannot diff {}x{} against {}x{}; resize to common bounds first",
            expected.width, expected.height, actual.width, actual.height
        )));
    }
    let (w, h) = (i64::from(expected.width), i64::from(expected.height));
    let l1 = luma(expected);
    let l2 = luma(actual);

    let mut map = Vec::with_capacity(l1.len());
    let mut window = Vec::with_capacity(((2 * RADIUS + 1) * (2 * RADIUS + 1)) as usize);
    for y in 0..h {
        for x in 0..w {
            window.clear();
            for dy in -RADIUS..=RADIUS {
                for dx in -RADIUS..=RADIUS {
                    let (wx, wy) = (x + dx, y + dy);
                    if (0..w).contains(&wx) && (0..h).contains(&wy) {
                        window.push(((wy * w + wx) as usize, gaussian_weight(dx, dy)));
                    }
                }
            }
            map.push(window_ssim(&window, &l1, &l2));
        }
    }
    Ok(map)
}

fn window_ssim(window: &[(usize, f64)], l1: &[f64], l2: &[f64]) -> f64 {
    let total: f64 = window.iter().map(|(_, k)| k).sum();
    let mut mu1 = 0.0;
    let mut mu2 = 0.0;
    for &(i, k) in window {
        mu1 += k * l1[i];
        mu2 += k * l2[i];
    }
    mu1 /= total;
    mu2 /= total;

    let mut var1 = 0.0;
    let mut var2 = 0.0;
    let mut cov = 0.0;
    for &(i, k) in window {
        let (d1, d2) = (l1[i] - mu1, l2[i] - mu2);
        var1 += k * d1 * d1;
        var2 += k * d2 * d2;
        cov += k * d1 * d2;
    }
    var1 /= total;
    var2 /= total;
    cov /= total;

    ((2.0 * mu1 * mu2 + C1) * (2.0 * cov + C2))
        / ((mu1 * mu1 + mu2 * mu2 + C1) * (var1 + var2 + C2))
}

#[cfg(test)]
#[path = "../../tests/unit/diff/mssim.rs"]
mod tests;
