use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::Canvas;
use crate::foundation::error::{ClipError, ClipResult};

/// A raster frame as RGBA8 pixels.
///
/// Pixels are **straight alpha**. Frames decoded from, or destined for, an RGB container carry
/// `has_alpha == false` and every alpha byte is 255.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the alpha channel carries information.
    pub has_alpha: bool,
}

impl FrameRGBA {
    /// Fully transparent frame (all bytes zero).
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; byte_len(width, height)],
            has_alpha: true,
        }
    }

    /// Frame filled with a single straight-alpha color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(byte_len(width, height));
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
            has_alpha: rgba[3] != 255,
        }
    }

    /// Opaque RGB frame filled with one color.
    pub fn filled_rgb(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut frame = Self::filled(width, height, [rgb[0], rgb[1], rgb[2], 255]);
        frame.has_alpha = false;
        frame
    }

    /// Wrap existing RGBA8 bytes.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> ClipResult<Self> {
        if data.len() != byte_len(width, height) {
            return Err(ClipError::validation(format!(
                "rgba8 buffer has {} bytes, expected {} for {width}x{height}",
                data.len(),
                byte_len(width, height)
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            has_alpha: true,
        })
    }

    /// Expand packed RGB8 bytes into an opaque frame.
    pub fn from_rgb8(width: u32, height: u32, rgb: &[u8]) -> ClipResult<Self> {
        let px = width as usize * height as usize;
        if rgb.len() != px * 3 {
            return Err(ClipError::validation(format!(
                "rgb8 buffer has {} bytes, expected {} for {width}x{height}",
                rgb.len(),
                px * 3
            )));
        }
        let mut data = Vec::with_capacity(px * 4);
        for c in rgb.chunks_exact(3) {
            data.extend_from_slice(&[c[0], c[1], c[2], 255]);
        }
        Ok(Self {
            width,
            height,
            data,
            has_alpha: false,
        })
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Pixel at `(x, y)`; `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if !self.contains(x, y) {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Overwrite one pixel. Writes outside the frame are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if !self.contains(x, y) {
            return;
        }
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&rgba);
        if rgba[3] != 255 {
            self.has_alpha = true;
        }
    }

    /// `true` when every alpha byte is 255.
    pub fn is_opaque(&self) -> bool {
        self.data.chunks_exact(4).all(|p| p[3] == 255)
    }

    /// Copy this frame into the top-left corner of a `width`x`height` canvas.
    ///
    /// New pixels are transparent zero; pixels beyond the target are cropped. Callers that must
    /// not crop pass a canvas at least as large as the frame.
    pub fn extend_canvas(&self, width: u32, height: u32) -> FrameRGBA {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let mut out = FrameRGBA::transparent(width, height);
        out.has_alpha = true;
        let copy_w = self.width.min(width) as usize * 4;
        for y in 0..self.height.min(height) {
            let src = self.offset(0, y);
            let dst = out.offset(0, y);
            out.data[dst..dst + copy_w].copy_from_slice(&self.data[src..src + copy_w]);
        }
        out
    }

    /// Paste `src` with its top-left corner at `(x, y)`, cropping to this frame.
    pub fn blit(&mut self, src: &FrameRGBA, x: u32, y: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let copy_w = src.width.min(self.width - x) as usize * 4;
        for sy in 0..src.height.min(self.height - y) {
            let s = src.offset(0, sy);
            let d = self.offset(x, y + sy);
            self.data[d..d + copy_w].copy_from_slice(&src.data[s..s + copy_w]);
        }
        self.has_alpha |= src.has_alpha;
    }

    /// Convert to an [`image::RgbaImage`].
    pub fn to_rgba_image(&self) -> ClipResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| ClipError::validation("frame data does not match its dimensions"))
    }

    /// Convert from any decoded [`image::DynamicImage`].
    pub fn from_dynamic(img: &image::DynamicImage) -> Self {
        let has_alpha = img.color().has_alpha();
        let rgba = img.to_rgba8();
        Self {
            width: rgba.width(),
            height: rgba.height(),
            data: rgba.into_raw(),
            has_alpha,
        }
    }

    /// Decode a still image (first frame only) with the `image` crate.
    pub fn load_png(path: impl AsRef<Path>) -> ClipResult<Self> {
        let path = path.as_ref();
        let img = image::open(path).with_context(|| format!("decode png '{}'", path.display()))?;
        Ok(Self::from_dynamic(&img))
    }

    /// Encode as a still PNG, creating parent directories as needed.
    pub fn save_png(&self, path: impl AsRef<Path>) -> ClipResult<()> {
        let path = path.as_ref();
        crate::encode::sink::ensure_parent_dir(path)?;
        let color = if self.has_alpha {
            image::ColorType::Rgba8
        } else {
            image::ColorType::Rgb8
        };
        let bytes = if self.has_alpha {
            self.data.clone()
        } else {
            self.data
                .chunks_exact(4)
                .flat_map(|p| [p[0], p[1], p[2]])
                .collect()
        };
        image::save_buffer_with_format(
            path,
            &bytes,
            self.width,
            self.height,
            color,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

#[cfg(test)]
#[path = "../../tests/unit/raster/frame.rs"]
mod tests;
