use std::io::{Read, Write};

use crate::foundation::error::{ClipError, ClipResult};

/// Fixed 8-byte PNG signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

pub const COLOR_TYPE_RGB: u8 = 2;
pub const COLOR_TYPE_RGBA: u8 = 6;
pub const BIT_DEPTH: u8 = 8;

/// Largest payload accepted from a chunk length field (PNG caps lengths at 2^31 - 1).
const MAX_CHUNK_LEN: u32 = 0x7FFF_FFFF;

/// Length of the fcTL payload.
pub const FCTL_LEN: usize = 26;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkTag {
    Ihdr,
    Actl,
    Fctl,
    Idat,
    Fdat,
    Iend,
    /// A tag this codec does not interpret.
    Unknown([u8; 4]),
}

impl ChunkTag {
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        match &bytes {
            b"IHDR" => Self::Ihdr,
            b"acTL" => Self::Actl,
            b"fcTL" => Self::Fctl,
            b"IDAT" => Self::Idat,
            b"fdAT" => Self::Fdat,
            b"IEND" => Self::Iend,
            _ => Self::Unknown(bytes),
        }
    }

    pub fn bytes(self) -> [u8; 4] {
        match self {
            Self::Ihdr => *b"IHDR",
            Self::Actl => *b"acTL",
            Self::Fctl => *b"fcTL",
            Self::Idat => *b"IDAT",
            Self::Fdat => *b"fdAT",
            Self::Iend => *b"IEND",
            Self::Unknown(b) => b,
        }
    }

    /// Ancillary chunks have a lowercase first letter and may be skipped safely.
    pub fn is_ancillary(self) -> bool {
        self.bytes()[0].is_ascii_lowercase()
    }

    pub fn name(self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }
}

impl std::fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

/// One decoded chunk whose CRC has been verified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub tag: ChunkTag,
    pub payload: Vec<u8>,
}

fn chunk_crc(tag: [u8; 4], payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&tag);
    hasher.update(payload);
    hasher.finalize()
}

/// Read one chunk and validate its trailing CRC.
pub fn read_chunk<R: Read>(r: &mut R) -> ClipResult<Chunk> {
    let (len, tag) = read_chunk_header(r)?;
    read_chunk_body(r, len, tag)
}

/// Read the length and tag that open a chunk.
pub(crate) fn read_chunk_header<R: Read>(r: &mut R) -> ClipResult<(u32, ChunkTag)> {
    let len = read_u32(r)?;
    if len > MAX_CHUNK_LEN {
        return Err(ClipError::format(format!(
            "chunk length {len} exceeds 2^31-1"
        )));
    }
    let mut tag = [0u8; 4];
    read_exact(r, &mut tag)?;
    Ok((len, ChunkTag::from_bytes(tag)))
}

/// Read the payload and CRC of a chunk whose header was already consumed.
///
/// The payload buffer grows with the bytes actually present, so a forged length field cannot
/// force a large allocation up front.
pub(crate) fn read_chunk_body<R: Read>(
    r: &mut R,
    len: u32,
    tag: ChunkTag,
) -> ClipResult<Chunk> {
    let mut payload = Vec::new();
    r.by_ref().take(u64::from(len)).read_to_end(&mut payload)?;
    if payload.len() as u64 != u64::from(len) {
        return Err(ClipError::format("unexpected end of stream"));
    }
    let crc = read_u32(r)?;

    if chunk_crc(tag.bytes(), &payload) != crc {
        return Err(ClipError::crc(tag.name()));
    }
    tracing::trace!(chunk = %tag, len, "read chunk");
    Ok(Chunk { tag, payload })
}

/// Write one chunk: length, tag, payload and CRC over tag + payload.
pub fn write_chunk<W: Write>(w: &mut W, tag: ChunkTag, payload: &[u8]) -> ClipResult<()> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_CHUNK_LEN)
        .ok_or_else(|| ClipError::format(format!("{tag} payload too large to encode")))?;
    w.write_all(&len.to_be_bytes())?;
    w.write_all(&tag.bytes())?;
    w.write_all(payload)?;
    w.write_all(&chunk_crc(tag.bytes(), payload).to_be_bytes())?;
    tracing::trace!(chunk = %tag, len, "wrote chunk");
    Ok(())
}

fn read_u32<R: Read>(r: &mut R) -> ClipResult<u32> {
    let mut b = [0u8; 4];
    read_exact(r, &mut b)?;
    Ok(u32::from_be_bytes(b))
}

pub(crate) fn read_exact<R: Read>(r: &mut R, buf: &mut [u8]) -> ClipResult<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => ClipError::format("unexpected end of stream"),
        _ => ClipError::Io(e),
    })
}

/// Big-endian cursor over a chunk payload.
pub(crate) struct PayloadReader<'a> {
    tag: ChunkTag,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub(crate) fn new(chunk: &'a Chunk) -> Self {
        Self {
            tag: chunk.tag,
            bytes: &chunk.payload,
            pos: 0,
        }
    }

    fn take(&mut self, n: usize) -> ClipResult<&'a [u8]> {
        let end = self.pos + n;
        if end > self.bytes.len() {
            return Err(ClipError::format(format!(
                "{} payload truncated: needed {end} bytes, have {}",
                self.tag,
                self.bytes.len()
            )));
        }
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> ClipResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> ClipResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self) -> ClipResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let out = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        out
    }
}

/// Inflate a zlib stream.
pub(crate) fn inflate(data: &[u8]) -> ClipResult<Vec<u8>> {
    let mut out = Vec::new();
    flate2::read::ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| ClipError::format(format!("invalid deflate stream: {e}")))?;
    Ok(out)
}

/// Deflate with zlib framing at maximum compression.
pub(crate) fn deflate(data: &[u8]) -> ClipResult<Vec<u8>> {
    let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::best());
    enc.write_all(data)?;
    Ok(enc.finish()?)
}

#[cfg(test)]
#[path = "../../tests/unit/apng/chunk.rs"]
mod tests;
