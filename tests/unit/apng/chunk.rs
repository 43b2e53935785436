use super::*;

#[test]
fn tags_roundtrip_and_classify() {
    for tag in [
        ChunkTag::Ihdr,
        ChunkTag::Actl,
        ChunkTag::Fctl,
        ChunkTag::Idat,
        ChunkTag::Fdat,
        ChunkTag::Iend,
    ] {
        assert_eq!(ChunkTag::from_bytes(tag.bytes()), tag);
    }
    assert_eq!(ChunkTag::from_bytes(*b"tEXt"), ChunkTag::Unknown(*b"tEXt"));
    assert!(ChunkTag::from_bytes(*b"tEXt").is_ancillary());
    assert!(ChunkTag::Actl.is_ancillary());
    assert!(!ChunkTag::Idat.is_ancillary());
    assert_eq!(ChunkTag::Fdat.to_string(), "fdAT");
}

#[test]
fn iend_has_the_well_known_crc() {
    let mut out = Vec::new();
    write_chunk(&mut out, ChunkTag::Iend, &[]).unwrap();
    assert_eq!(
        out,
        vec![0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82]
    );
}

#[test]
fn write_then_read_chunk() {
    let mut out = Vec::new();
    write_chunk(&mut out, ChunkTag::Fctl, &[1, 2, 3]).unwrap();
    let chunk = read_chunk(&mut std::io::Cursor::new(out)).unwrap();
    assert_eq!(chunk.tag, ChunkTag::Fctl);
    assert_eq!(chunk.payload, vec![1, 2, 3]);
}

#[test]
fn corrupted_payload_fails_crc() {
    let mut out = Vec::new();
    write_chunk(&mut out, ChunkTag::Idat, &[9, 9, 9, 9]).unwrap();
    out[9] ^= 0xFF;
    let err = read_chunk(&mut std::io::Cursor::new(out)).unwrap_err();
    assert!(matches!(err, ClipError::Crc { ref chunk } if chunk == "IDAT"));
}

#[test]
fn truncated_chunk_is_a_format_error() {
    let mut out = Vec::new();
    write_chunk(&mut out, ChunkTag::Idat, &[1, 2, 3, 4]).unwrap();
    out.truncate(10);
    let err = read_chunk(&mut std::io::Cursor::new(out)).unwrap_err();
    assert!(err.to_string().contains("unexpected end of stream"));
}

#[test]
fn forged_length_fails_without_reading_past_the_stream() {
    let mut out = 0x7FFF_FFFFu32.to_be_bytes().to_vec();
    out.extend_from_slice(b"IDAT");
    out.extend_from_slice(&[1, 2, 3]);
    let err = read_chunk(&mut std::io::Cursor::new(out)).unwrap_err();
    assert!(matches!(err, ClipError::Format(_)));
    assert!(err.to_string().contains("unexpected end of stream"));
}

#[test]
fn length_above_png_limit_is_rejected() {
    let mut out = 0x8000_0000u32.to_be_bytes().to_vec();
    out.extend_from_slice(b"IDAT");
    let err = read_chunk(&mut std::io::Cursor::new(out)).unwrap_err();
    assert!(err.to_string().contains("exceeds 2^31-1"));
}

#[test]
fn payload_reader_reports_truncation() {
    let chunk = Chunk {
        tag: ChunkTag::Fctl,
        payload: vec![0, 0, 0, 7, 0, 1],
    };
    let mut p = PayloadReader::new(&chunk);
    assert_eq!(p.u32().unwrap(), 7);
    assert_eq!(p.u16().unwrap(), 1);
    let err = p.u8().unwrap_err();
    assert!(err.to_string().contains("fcTL payload truncated"));
}

#[test]
fn zlib_roundtrip() {
    let raw: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let packed = deflate(&raw).unwrap();
    assert!(packed.len() < raw.len());
    assert_eq!(inflate(&packed).unwrap(), raw);
    assert!(inflate(&[1, 2, 3]).is_err());
}
