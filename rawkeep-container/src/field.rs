//! Per-field compression envelope.
//!
//! Every TLV payload that carries raw bytes (a Before/After/In range, a
//! FileName, a mask base template) is wrapped the same way: try zlib, and
//! only keep the compressed form if it's actually smaller. The wrapper
//! itself is `vint(original_len) ++ bytes`, where `original_len == 0` means
//! "bytes are the raw field" and any other value means "bytes are zlib
//! deflate output that inflates to `original_len` bytes". Zero-length raw
//! fields are rare enough in practice (an empty Before/After range) that the
//! `0` marker never collides with a real field needing compression.

use std::io::{self, Read, Write};

use flate2::read::{ZlibDecoder, ZlibEncoder};
use flate2::Compression;

use crate::varint::{decode_vint, read_vint, write_vint, VarintError};

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error(transparent)]
    Varint(#[from] VarintError),
    #[error("io error on compressed field")]
    Io(#[from] io::Error),
}

/// Compress `raw` with zlib and return the wrapped envelope, falling back to
/// the uncompressed form when deflate doesn't shrink it.
pub fn encode_field(raw: &[u8]) -> Vec<u8> {
    let mut compressed = Vec::new();
    ZlibEncoder::new(raw, Compression::best())
        .read_to_end(&mut compressed)
        .expect("in-memory zlib encode cannot fail");

    let mut out = Vec::new();
    if compressed.len() < raw.len() {
        write_vint(&mut out, raw.len() as u64).expect("vec write cannot fail");
        out.extend_from_slice(&compressed);
    } else {
        write_vint(&mut out, 0).expect("vec write cannot fail");
        out.extend_from_slice(raw);
    }
    out
}

/// Write an already-encoded field (see [`encode_field`]) as a standalone
/// element: `vint(id) ++ vint(envelope_len) ++ envelope`.
pub fn write_field_element<W: Write>(out: &mut W, id: u64, raw: &[u8]) -> io::Result<()> {
    let envelope = encode_field(raw);
    crate::varint::write_element_header(out, id, envelope.len() as u64)?;
    out.write_all(&envelope)
}

/// Decode a field envelope (original_len marker + body) back to raw bytes.
pub fn decode_field(envelope: &[u8]) -> Result<Vec<u8>, FieldError> {
    let (original_len, consumed) = decode_vint(envelope)?;
    let body = &envelope[consumed..];
    if original_len == 0 {
        return Ok(body.to_vec());
    }
    let mut out = Vec::with_capacity(original_len as usize);
    ZlibDecoder::new(body).read_to_end(&mut out)?;
    Ok(out)
}

/// Stream-decode a field envelope whose total length is already known (the
/// caller read it off an enclosing element header).
pub fn read_field<R: Read>(input: &mut R, envelope_len: u64) -> Result<Vec<u8>, FieldError> {
    let mut limited = input.take(envelope_len);
    let original_len = read_vint(&mut limited)?;
    let mut body = Vec::new();
    limited.read_to_end(&mut body)?;
    if original_len == 0 {
        return Ok(body);
    }
    let mut out = Vec::with_capacity(original_len as usize);
    ZlibDecoder::new(&body[..]).read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incompressible_field_stays_raw() {
        let raw = b"\x01\x02\x03\xFF\xFE";
        let envelope = encode_field(raw);
        assert_eq!(envelope[0], 0, "short random bytes shouldn't compress smaller");
        assert_eq!(decode_field(&envelope).unwrap(), raw);
    }

    #[test]
    fn compressible_field_round_trips() {
        let raw = vec![0x42u8; 4096];
        let envelope = encode_field(&raw);
        assert!(envelope.len() < raw.len(), "run of identical bytes should compress");
        assert_eq!(decode_field(&envelope).unwrap(), raw);
    }

    #[test]
    fn empty_field_round_trips() {
        let envelope = encode_field(&[]);
        assert_eq!(decode_field(&envelope).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn write_field_element_matches_decode_field() {
        let raw = b"hello hello hello hello hello hello hello".to_vec();
        let mut buf = Vec::new();
        write_field_element(&mut buf, 0x10, &raw).unwrap();

        let (id, id_len) = decode_vint(&buf).unwrap();
        assert_eq!(id, 0x10);
        let (len, len_len) = decode_vint(&buf[id_len..]).unwrap();
        let body_start = id_len + len_len;
        let envelope = &buf[body_start..body_start + len as usize];
        assert_eq!(decode_field(envelope).unwrap(), raw);
    }
}
