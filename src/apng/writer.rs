use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::apng::chunk::{
    BIT_DEPTH, COLOR_TYPE_RGB, COLOR_TYPE_RGBA, ChunkTag, FCTL_LEN, PNG_SIGNATURE, deflate,
    write_chunk,
};
use crate::encode::sink::{FrameSink, SinkConfig, ensure_parent_dir};
use crate::foundation::core::{Canvas, FrameDelay, FrameIndex, SubRect};
use crate::foundation::error::{ClipError, ClipResult};
use crate::raster::frame::FrameRGBA;
use crate::raster::ops::smallest_diff_rect;

enum WriterState {
    AwaitingFirstFrame,
    Streaming {
        first: FrameRGBA,
        previous: FrameRGBA,
        /// fcTL/fdAT chunks for frames 2..N, written before the final canvas size is known.
        staging: Option<BufWriter<File>>,
    },
    Finalized,
}

/// APNG encoder that stores every frame after the first as a sub-rectangle delta.
///
/// The PNG header fixes the canvas size, but later frames may be larger than the first one. The
/// first frame is therefore held in memory and the remaining frames are staged in
/// `<path>.staging`; [`ApngWriter::finish`] writes the real file once the maximum bounds are
/// known. Dropping an unfinished writer removes the staging file and writes nothing.
pub struct ApngWriter {
    path: PathBuf,
    staging_path: PathBuf,
    delay: FrameDelay,
    declared_frames: Option<u32>,
    state: WriterState,
    has_alpha: bool,
    canvas: Canvas,
    frames_written: u32,
    sequence: u32,
}

impl std::fmt::Debug for ApngWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApngWriter")
            .field("path", &self.path)
            .field("delay", &self.delay)
            .field("declared_frames", &self.declared_frames)
            .field("frames_written", &self.frames_written)
            .finish_non_exhaustive()
    }
}

impl ApngWriter {
    /// Writer whose frame count is whatever has been written when it is finished.
    pub fn create(path: impl Into<PathBuf>, fps: u32) -> ClipResult<Self> {
        Self::build(path.into(), fps, None)
    }

    /// Writer that must receive exactly `frame_count` frames before it is finished.
    pub fn with_frame_count(
        path: impl Into<PathBuf>,
        fps: u32,
        frame_count: u32,
    ) -> ClipResult<Self> {
        if frame_count == 0 {
            return Err(ClipError::validation("declared frame count must be > 0"));
        }
        Self::build(path.into(), fps, Some(frame_count))
    }

    fn build(path: PathBuf, fps: u32, declared_frames: Option<u32>) -> ClipResult<Self> {
        let delay = FrameDelay::from_fps(fps)?;
        let mut staging = path.clone().into_os_string();
        staging.push(".staging");
        Ok(Self {
            path,
            staging_path: PathBuf::from(staging),
            delay,
            declared_frames,
            state: WriterState::AwaitingFirstFrame,
            has_alpha: true,
            canvas: Canvas {
                width: 0,
                height: 0,
            },
            frames_written: 0,
            sequence: 1,
        })
    }

    /// Output file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames accepted so far.
    pub fn frames_written(&self) -> u32 {
        self.frames_written
    }

    pub fn delay(&self) -> FrameDelay {
        self.delay
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, WriterState::Finalized)
    }

    /// Append a frame.
    pub fn write_image(&mut self, image: &FrameRGBA) -> ClipResult<()> {
        if image.width == 0 || image.height == 0 {
            return Err(ClipError::validation("cannot write an empty frame"));
        }

        match &mut self.state {
            WriterState::Finalized => {
                return Err(ClipError::validation(format!(
                    "apng writer for '{}' is already finalized",
                    self.path.display()
                )));
            }
            WriterState::AwaitingFirstFrame => {
                self.has_alpha = image.has_alpha;
                self.state = WriterState::Streaming {
                    first: image.clone(),
                    previous: image.clone(),
                    staging: None,
                };
            }
            WriterState::Streaming {
                previous, staging, ..
            } => {
                if !self.has_alpha && image.has_alpha && !image.is_opaque() {
                    return Err(ClipError::validation(
                        "frame has transparent pixels but the clip was started as RGB",
                    ));
                }

                let rect = smallest_diff_rect(previous, image).unwrap_or(SubRect::MIN);
                let out = match staging {
                    Some(out) => out,
                    None => {
                        ensure_parent_dir(&self.staging_path)?;
                        let file = File::create(&self.staging_path).with_context(|| {
                            format!("create staging file '{}'", self.staging_path.display())
                        })?;
                        staging.insert(BufWriter::new(file))
                    }
                };

                write_chunk(
                    out,
                    ChunkTag::Fctl,
                    &fctl_payload(self.sequence, rect, self.delay),
                )?;
                let mut fdat = (self.sequence + 1).to_be_bytes().to_vec();
                fdat.extend_from_slice(&deflate(&encode_scanlines(image, rect, self.has_alpha))?);
                write_chunk(out, ChunkTag::Fdat, &fdat)?;
                self.sequence += 2;

                tracing::trace!(
                    frame = self.frames_written,
                    x = rect.x,
                    y = rect.y,
                    width = rect.width,
                    height = rect.height,
                    "staged apng delta frame"
                );
                *previous = image.clone();
            }
        }

        self.canvas = self.canvas.union(image.canvas());
        self.frames_written += 1;
        Ok(())
    }

    /// Write the final file. The writer is unusable afterwards.
    pub fn finish(&mut self) -> ClipResult<()> {
        let state = std::mem::replace(&mut self.state, WriterState::Finalized);
        let (first, staging) = match state {
            WriterState::Streaming { first, staging, .. } => (first, staging),
            WriterState::AwaitingFirstFrame => {
                return Err(ClipError::format(format!(
                    "no frames were written to '{}'",
                    self.path.display()
                )));
            }
            WriterState::Finalized => {
                return Err(ClipError::validation(format!(
                    "apng writer for '{}' is already finalized",
                    self.path.display()
                )));
            }
        };

        if let Some(declared) = self.declared_frames
            && declared != self.frames_written
        {
            drop(staging);
            self.remove_staging();
            return Err(ClipError::format(format!(
                "frame count mismatch for '{}': declared {declared}, wrote {}",
                self.path.display(),
                self.frames_written
            )));
        }

        let result = self.write_output(&first, staging);
        self.remove_staging();
        result?;

        tracing::info!(
            path = %self.path.display(),
            frames = self.frames_written,
            width = self.canvas.width,
            height = self.canvas.height,
            delay = %self.delay,
            "wrote apng"
        );
        Ok(())
    }

    /// Finish and consume the writer.
    pub fn close(mut self) -> ClipResult<()> {
        self.finish()
    }

    fn write_output(&self, first: &FrameRGBA, staging: Option<BufWriter<File>>) -> ClipResult<()> {
        ensure_parent_dir(&self.path)?;
        let file = File::create(&self.path)
            .with_context(|| format!("create apng '{}'", self.path.display()))?;
        let mut out = BufWriter::new(file);

        out.write_all(&PNG_SIGNATURE)?;
        write_chunk(&mut out, ChunkTag::Ihdr, &self.ihdr_payload())?;
        if self.frames_written > 1 {
            let mut actl = Vec::with_capacity(8);
            actl.extend_from_slice(&self.frames_written.to_be_bytes());
            actl.extend_from_slice(&0u32.to_be_bytes());
            write_chunk(&mut out, ChunkTag::Actl, &actl)?;
        }
        write_chunk(
            &mut out,
            ChunkTag::Fctl,
            &fctl_payload(0, SubRect::full(self.canvas), self.delay),
        )?;

        let first = first.extend_canvas(self.canvas.width, self.canvas.height);
        let idat = deflate(&encode_scanlines(
            &first,
            SubRect::full(self.canvas),
            self.has_alpha,
        ))?;
        write_chunk(&mut out, ChunkTag::Idat, &idat)?;

        if let Some(staging) = staging {
            let file = staging
                .into_inner()
                .map_err(|e| ClipError::Io(e.into_error()))?;
            file.sync_all()?;
            drop(file);
            let mut staged = File::open(&self.staging_path).with_context(|| {
                format!("reopen staging file '{}'", self.staging_path.display())
            })?;
            std::io::copy(&mut staged, &mut out)?;
        }

        write_chunk(&mut out, ChunkTag::Iend, &[])?;
        out.flush()?;
        Ok(())
    }

    fn ihdr_payload(&self) -> Vec<u8> {
        let mut p = Vec::with_capacity(13);
        p.extend_from_slice(&self.canvas.width.to_be_bytes());
        p.extend_from_slice(&self.canvas.height.to_be_bytes());
        p.push(BIT_DEPTH);
        p.push(if self.has_alpha {
            COLOR_TYPE_RGBA
        } else {
            COLOR_TYPE_RGB
        });
        p.extend_from_slice(&[0, 0, 0]); // compression, filter, interlace
        p
    }

    fn remove_staging(&self) {
        if let Err(e) = std::fs::remove_file(&self.staging_path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(
                path = %self.staging_path.display(),
                error = %e,
                "failed to remove apng staging file"
            );
        }
    }
}

impl Drop for ApngWriter {
    fn drop(&mut self) {
        if let WriterState::Streaming { staging, .. } = &mut self.state {
            // Close the handle before unlinking.
            drop(staging.take());
            self.remove_staging();
        }
    }
}

impl FrameSink for ApngWriter {
    fn begin(&mut self, cfg: SinkConfig) -> ClipResult<()> {
        cfg.validate()?;
        if cfg.fps != u32::from(self.delay.den) {
            return Err(ClipError::validation(format!(
                "sink fps {} does not match writer fps {}",
                cfg.fps, self.delay.den
            )));
        }
        if self.declared_frames.is_none() {
            self.declared_frames = Some(cfg.frame_count);
        }
        Ok(())
    }

    fn push_frame(&mut self, _idx: FrameIndex, frame: &FrameRGBA) -> ClipResult<()> {
        self.write_image(frame)
    }

    fn end(&mut self) -> ClipResult<()> {
        self.finish()
    }
}

fn fctl_payload(sequence: u32, rect: SubRect, delay: FrameDelay) -> Vec<u8> {
    let mut p = Vec::with_capacity(FCTL_LEN);
    p.extend_from_slice(&sequence.to_be_bytes());
    p.extend_from_slice(&rect.width.to_be_bytes());
    p.extend_from_slice(&rect.height.to_be_bytes());
    p.extend_from_slice(&rect.x.to_be_bytes());
    p.extend_from_slice(&rect.y.to_be_bytes());
    p.extend_from_slice(&delay.num.to_be_bytes());
    p.extend_from_slice(&delay.den.to_be_bytes());
    p.push(0); // dispose op: none
    p.push(0); // blend op: source
    p
}

/// Filter-none scanlines for `rect`; pixels outside `image` are written as zero.
fn encode_scanlines(image: &FrameRGBA, rect: SubRect, with_alpha: bool) -> Vec<u8> {
    let bpp = if with_alpha { 4 } else { 3 };
    let mut out = Vec::with_capacity(rect.height as usize * (1 + rect.width as usize * bpp));
    for y in rect.y..rect.y + rect.height {
        out.push(0);
        for x in rect.x..rect.x + rect.width {
            let px = image.pixel(x, y).unwrap_or([0, 0, 0, 0]);
            out.extend_from_slice(&px[..bpp]);
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/apng/writer.rs"]
mod tests;
