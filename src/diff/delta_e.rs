use std::f64::consts::PI;

use crate::diff::{AlphaPolicy, DiffResult, Differ, PixelVerdict, diff_with};
use crate::foundation::error::ClipResult;
use crate::raster::frame::FrameRGBA;

/// Perceptual differ: pixels whose CIEDE2000 color distance stays within `threshold` are
/// similar.
///
/// Pixels with different alpha are always different. The default threshold of 2.3 is the
/// usual "just noticeable difference".
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeltaE {
    pub threshold: f64,
    pub policy: AlphaPolicy,
}

impl DeltaE {
    pub const JUST_NOTICEABLE: f64 = 2.3;

    pub fn new(threshold: f64, policy: AlphaPolicy) -> Self {
        Self { threshold, policy }
    }
}

impl Default for DeltaE {
    fn default() -> Self {
        Self::new(Self::JUST_NOTICEABLE, AlphaPolicy::default())
    }
}

impl Differ for DeltaE {
    fn compare(&self, expected: &FrameRGBA, actual: &FrameRGBA) -> ClipResult<DiffResult> {
        let Self { threshold, policy } = *self;
        diff_with(expected, actual, |e, a| {
            if policy.equivalent(e, a) {
                PixelVerdict::Equivalent
            } else if e[3] == a[3] && delta_e_2000(to_lab(e), to_lab(a)) <= threshold {
                PixelVerdict::Similar
            } else {
                PixelVerdict::Different
            }
        })
    }
}

/// sRGB (D65) to CIE L*a*b*.
pub(crate) fn to_lab(rgba: [u8; 4]) -> [f64; 3] {
    let linear = |c: u8| {
        let c = f64::from(c) / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    let (r, g, b) = (linear(rgba[0]), linear(rgba[1]), linear(rgba[2]));

    let x = (0.4124 * r + 0.3576 * g + 0.1805 * b) / 0.95047;
    let y = 0.2126 * r + 0.7152 * g + 0.0722 * b;
    let z = (0.0193 * r + 0.1192 * g + 0.9505 * b) / 1.08883;

    let f = |t: f64| {
        if t > 0.008856 {
            t.cbrt()
        } else {
            7.787 * t + 16.0 / 116.0
        }
    };
    let (fx, fy, fz) = (f(x), f(y), f(z));
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// CIEDE2000 color difference.
pub(crate) fn delta_e_2000(lab1: [f64; 3], lab2: [f64; 3]) -> f64 {
    let [l1, a1, b1] = lab1;
    let [l2, a2, b2] = lab2;
    let pow25_7 = 25f64.powi(7);

    let c_bar = (a1.hypot(b1) + a2.hypot(b2)) / 2.0;
    let g = 0.5 * (1.0 - (c_bar.powi(7) / (c_bar.powi(7) + pow25_7)).sqrt());
    let a1p = a1 * (1.0 + g);
    let a2p = a2 * (1.0 + g);
    let c1p = a1p.hypot(b1);
    let c2p = a2p.hypot(b2);

    let hue = |b: f64, a: f64| {
        if a == 0.0 && b == 0.0 {
            0.0
        } else {
            b.atan2(a).rem_euclid(2.0 * PI)
        }
    };
    let h1p = hue(b1, a1p);
    let h2p = hue(b2, a2p);

    let chroma_product = c1p * c2p;
    let dh = if chroma_product == 0.0 {
        0.0
    } else if (h2p - h1p).abs() <= PI {
        h2p - h1p
    } else if h2p <= h1p {
        h2p - h1p + 2.0 * PI
    } else {
        h2p - h1p - 2.0 * PI
    };

    let dl = l2 - l1;
    let dc = c2p - c1p;
    let dh_big = 2.0 * chroma_product.sqrt() * (dh / 2.0).sin();

    let l_bar = (l1 + l2) / 2.0;
    let cp_bar = (c1p + c2p) / 2.0;
    let hp_bar = if chroma_product == 0.0 {
        h1p + h2p
    } else if (h1p - h2p).abs() <= PI {
        (h1p + h2p) / 2.0
    } else if h1p + h2p < 2.0 * PI {
        (h1p + h2p + 2.0 * PI) / 2.0
    } else {
        (h1p + h2p - 2.0 * PI) / 2.0
    };

    let t = 1.0 - 0.17 * (hp_bar - PI / 6.0).cos()
        + 0.24 * (2.0 * hp_bar).cos()
        + 0.32 * (3.0 * hp_bar + PI / 30.0).cos()
        - 0.20 * (4.0 * hp_bar - 63.0 * PI / 180.0).cos();
    let d_theta = (PI / 6.0) * (-((hp_bar.to_degrees() - 275.0) / 25.0).powi(2)).exp();
    let rc = 2.0 * (cp_bar.powi(7) / (cp_bar.powi(7) + pow25_7)).sqrt();
    let sl = 1.0 + (0.015 * (l_bar - 50.0).powi(2)) / (20.0 + (l_bar - 50.0).powi(2)).sqrt();
    let sc = 1.0 + 0.045 * cp_bar;
    let sh = 1.0 + 0.015 * cp_bar * t;
    let rt = -(2.0 * d_theta).sin() * rc;

    let (tl, tc, th) = (dl / sl, dc / sc, dh_big / sh);
    (tl * tl + tc * tc + th * th + rt * tc * th).sqrt()
}

#[cfg(test)]
#[path = "../../tests/unit/diff/delta_e.rs"]
mod tests;
