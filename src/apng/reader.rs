use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::Context as _;

use crate::apng::chunk::{
    BIT_DEPTH, COLOR_TYPE_RGB, COLOR_TYPE_RGBA, Chunk, ChunkTag, PNG_SIGNATURE, PayloadReader,
    inflate, read_chunk_body, read_chunk_header, read_exact,
};
use crate::foundation::core::{Canvas, FrameDelay, SubRect};
use crate::foundation::error::{ClipError, ClipResult};
use crate::raster::frame::FrameRGBA;

#[derive(Clone, Copy, Debug)]
struct FrameControl {
    region: SubRect,
    delay: FrameDelay,
}

/// Streaming APNG decoder for the subset of the format written by [`crate::ApngWriter`].
///
/// Frames are reconstructed into a canvas-sized scratch buffer, one delta region at a time.
/// Every frame returned by [`ApngReader::next_frame`] is an owned copy of that buffer, so it
/// stays valid after later calls.
///
/// Supported: 8-bit RGB/RGBA, filter type 0 on every scanline, dispose/blend op 0, one IDAT
/// or fdAT chunk per frame. Anything else is a fatal [`ClipError`].
#[derive(Debug)]
pub struct ApngReader<R> {
    source: R,
    canvas: Canvas,
    has_alpha: bool,
    frame_count: u32,
    frame_number: u32,
    last_sequence: Option<u32>,
    frame_control: Option<FrameControl>,
    scratch: Vec<u8>,
    next_tag: ChunkTag,
    /// Length of the chunk whose header was consumed by the last peek.
    pending_len: Option<u32>,
}

impl ApngReader<BufReader<File>> {
    /// Open an APNG (or plain PNG) file.
    pub fn open(path: impl AsRef<Path>) -> ClipResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("open png '{}'", path.display()))?;
        Self::new(BufReader::new(file))
    }
}

impl ApngReader<Cursor<Vec<u8>>> {
    /// Decode from an in-memory byte buffer.
    pub fn from_bytes(bytes: Vec<u8>) -> ClipResult<Self> {
        Self::new(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> ApngReader<R> {
    /// Validate the signature and read the header (and acTL, when present).
    pub fn new(mut source: R) -> ClipResult<Self> {
        let mut sig = [0u8; 8];
        read_exact(&mut source, &mut sig).map_err(|_| {
            ClipError::format(format!(
                "missing valid PNG signature, expected: [{}] (stream too short)",
                hex(&PNG_SIGNATURE)
            ))
        })?;
        if sig != PNG_SIGNATURE {
            return Err(ClipError::format(format!(
                "missing valid PNG signature, expected: [{}] actual: [{}]",
                hex(&PNG_SIGNATURE),
                hex(&sig)
            )));
        }

        let mut reader = Self {
            source,
            canvas: Canvas {
                width: 0,
                height: 0,
            },
            has_alpha: false,
            frame_count: 1,
            frame_number: 0,
            last_sequence: None,
            frame_control: None,
            scratch: Vec::new(),
            next_tag: ChunkTag::Ihdr,
            pending_len: None,
        };
        reader.read_metadata()?;
        Ok(reader)
    }

    /// Canvas width from IHDR.
    pub fn width(&self) -> u32 {
        self.canvas.width
    }

    /// Canvas height from IHDR.
    pub fn height(&self) -> u32 {
        self.canvas.height
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Whether the container stores an alpha channel (color type 6).
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Declared frame count (acTL), or 1 for a still image.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Frames decoded since construction or the last [`ApngReader::reset`].
    pub fn frame_number(&self) -> u32 {
        self.frame_number
    }

    /// Delay from the most recent fcTL, or [`FrameDelay::UNSPECIFIED`].
    pub fn delay(&self) -> FrameDelay {
        self.frame_control
            .map(|fc| fc.delay)
            .unwrap_or(FrameDelay::UNSPECIFIED)
    }

    /// `true` once the next chunk is IEND.
    pub fn finished(&self) -> bool {
        self.next_tag == ChunkTag::Iend
    }

    /// Decode the next frame, or `None` once the stream has no more frames.
    pub fn next_frame(&mut self) -> ClipResult<Option<FrameRGBA>> {
        let target = if self.frame_number == 0 {
            ChunkTag::Idat
        } else {
            ChunkTag::Fdat
        };

        loop {
            if self.finished() {
                return Ok(None);
            }
            let chunk = self.next_chunk()?;
            let reached = chunk.tag == target;
            self.process(chunk)?;
            self.peek_next_tag()?;
            if reached {
                break;
            }
        }

        tracing::debug!(
            frame = self.frame_number - 1,
            delay = %self.delay(),
            "decoded apng frame"
        );
        Ok(Some(FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: self.scratch.clone(),
            has_alpha: self.has_alpha,
        }))
    }

    /// Decode every remaining frame.
    pub fn remaining_frames(&mut self) -> ClipResult<Vec<FrameRGBA>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Rewind to just after the signature and re-read the header chunks.
    pub fn reset(&mut self) -> ClipResult<()> {
        self.source.seek(SeekFrom::Start(PNG_SIGNATURE.len() as u64))?;
        self.pending_len = None;
        self.frame_number = 0;
        self.last_sequence = None;
        self.frame_control = None;
        self.frame_count = 1;
        self.read_metadata()
    }

    fn read_metadata(&mut self) -> ClipResult<()> {
        let ihdr = self.next_chunk()?;
        if ihdr.tag != ChunkTag::Ihdr {
            return Err(ClipError::format(format!(
                "expected IHDR as first chunk, found {}",
                ihdr.tag
            )));
        }
        self.read_ihdr(&ihdr)?;
        self.peek_next_tag()?;

        if self.next_tag == ChunkTag::Actl {
            let actl = self.next_chunk()?;
            self.read_actl(&actl)?;
            self.peek_next_tag()?;
        }
        Ok(())
    }

    fn process(&mut self, chunk: Chunk) -> ClipResult<()> {
        match chunk.tag {
            ChunkTag::Fctl => self.read_fctl(&chunk),
            ChunkTag::Idat => {
                if self.frame_number != 0 {
                    return Err(ClipError::format("IDAT found after the first frame"));
                }
                self.decode_into_scratch(&chunk.payload)
            }
            ChunkTag::Fdat => {
                if self.frame_number == 0 {
                    return Err(ClipError::format("fdAT found before IDAT"));
                }
                let mut p = PayloadReader::new(&chunk);
                self.check_sequence(p.u32()?)?;
                self.decode_into_scratch(p.rest())
            }
            ChunkTag::Ihdr | ChunkTag::Actl => Err(ClipError::format(format!(
                "{} found after image data started",
                chunk.tag
            ))),
            ChunkTag::Iend => Err(ClipError::format("PNG ended while reading a frame")),
            ChunkTag::Unknown(_) if chunk.tag.is_ancillary() => {
                tracing::trace!(chunk = %chunk.tag, "skipping ancillary chunk");
                Ok(())
            }
            ChunkTag::Unknown(_) => Err(ClipError::format(format!(
                "unsupported critical chunk {}",
                chunk.tag
            ))),
        }
    }

    fn read_ihdr(&mut self, chunk: &Chunk) -> ClipResult<()> {
        let mut p = PayloadReader::new(chunk);
        let width = p.u32()?;
        let height = p.u32()?;
        let bit_depth = p.u8()?;
        let color_type = p.u8()?;
        let compression = p.u8()?;
        let filter = p.u8()?;
        let interlace = p.u8()?;

        if width == 0 || height == 0 {
            return Err(ClipError::format(format!(
                "invalid canvas size {width}x{height}"
            )));
        }
        self.has_alpha = match color_type {
            COLOR_TYPE_RGB => false,
            COLOR_TYPE_RGBA => true,
            other => {
                return Err(ClipError::format(format!(
                    "unsupported color model (color type {other})"
                )));
            }
        };
        if bit_depth != BIT_DEPTH {
            return Err(ClipError::format(format!(
                "unsupported bit depth {bit_depth}"
            )));
        }
        if compression != 0 || filter != 0 || interlace != 0 {
            return Err(ClipError::format(format!(
                "unsupported IHDR methods (compression {compression}, filter {filter}, interlace {interlace})"
            )));
        }

        self.canvas = Canvas { width, height };
        self.scratch = vec![0u8; self.canvas.area() as usize * 4];
        Ok(())
    }

    fn read_actl(&mut self, chunk: &Chunk) -> ClipResult<()> {
        let mut p = PayloadReader::new(chunk);
        self.frame_count = p.u32()?;
        let _loops = p.u32()?;
        Ok(())
    }

    fn read_fctl(&mut self, chunk: &Chunk) -> ClipResult<()> {
        let mut p = PayloadReader::new(chunk);
        let sequence = p.u32()?;
        let region = SubRect {
            width: p.u32()?,
            height: p.u32()?,
            x: p.u32()?,
            y: p.u32()?,
        };
        let delay = FrameDelay {
            num: p.u16()?,
            den: p.u16()?,
        };
        let dispose = p.u8()?;
        let blend = p.u8()?;

        self.check_sequence(sequence)?;
        if dispose != 0 || blend != 0 {
            return Err(ClipError::format(format!(
                "unsupported fcTL dispose/blend op ({dispose}/{blend})"
            )));
        }
        if region.width == 0 || region.height == 0 || !region.fits_within(self.canvas) {
            return Err(ClipError::format(format!(
                "fcTL region {}x{}+{}+{} exceeds canvas {}x{}",
                region.width,
                region.height,
                region.x,
                region.y,
                self.canvas.width,
                self.canvas.height
            )));
        }
        self.frame_control = Some(FrameControl { region, delay });
        Ok(())
    }

    fn check_sequence(&mut self, sequence: u32) -> ClipResult<()> {
        let expected = self.last_sequence.map_or(0, |s| s.wrapping_add(1));
        if sequence != expected {
            return Err(ClipError::Sequence {
                expected,
                actual: sequence,
            });
        }
        self.last_sequence = Some(sequence);
        Ok(())
    }

    fn decode_into_scratch(&mut self, compressed: &[u8]) -> ClipResult<()> {
        let region = self
            .frame_control
            .map(|fc| fc.region)
            .unwrap_or(SubRect::full(self.canvas));
        let raw = inflate(compressed)?;

        let bpp = if self.has_alpha { 4 } else { 3 };
        let row_len = 1 + region.width as usize * bpp;
        let needed = row_len * region.height as usize;
        if raw.len() < needed {
            return Err(ClipError::format(format!(
                "image data truncated: {} bytes, expected {needed}",
                raw.len()
            )));
        }

        let canvas_w = self.canvas.width as usize;
        for (y, row) in raw[..needed].chunks_exact(row_len).enumerate() {
            if row[0] != 0 {
                return Err(ClipError::format(format!(
                    "only filter none is supported, found filter {}",
                    row[0]
                )));
            }
            let line = (region.y as usize + y) * canvas_w + region.x as usize;
            for (x, px) in row[1..].chunks_exact(bpp).enumerate() {
                let dst = (line + x) * 4;
                self.scratch[dst..dst + 3].copy_from_slice(&px[..3]);
                self.scratch[dst + 3] = if self.has_alpha { px[3] } else { 255 };
            }
        }

        self.frame_number += 1;
        Ok(())
    }

    fn peek_next_tag(&mut self) -> ClipResult<()> {
        let (len, tag) = read_chunk_header(&mut self.source)?;
        self.pending_len = Some(len);
        self.next_tag = tag;
        Ok(())
    }

    /// Next chunk, reusing the header consumed by [`Self::peek_next_tag`] when there is one.
    fn next_chunk(&mut self) -> ClipResult<Chunk> {
        let (len, tag) = match self.pending_len.take() {
            Some(len) => (len, self.next_tag),
            None => read_chunk_header(&mut self.source)?,
        };
        read_chunk_body(&mut self.source, len, tag)
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
#[path = "../../tests/unit/apng/reader.rs"]
mod tests;
