//! EBML-style variable-length unsigned integers.
//!
//! The first byte's leading run of `1` bits (followed by a `0`) gives the
//! encoded length in bytes; the remaining bits of that run, plus all bits of
//! the following bytes, hold the value big-endian. Both element IDs and
//! element sizes use this same encoding (mirrors `Size_EB`/`Put_EB` in the
//! original RAWcooked container code).

use std::io::{self, Read, Write};

/// Maximum encoded length we will ever produce or accept. 8 bytes gives 56
/// data bits, comfortably above any element ID or size this format needs,
/// and keeps the nesting-depth bound in step with the format's own 16-level
/// stack limit.
const MAX_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum VarintError {
    #[error("variable-length integer truncated")]
    Truncated,
    #[error("variable-length integer marker byte is zero (unsupported length)")]
    InvalidMarker,
    #[error("io error reading variable-length integer")]
    Io(#[from] io::Error),
}

/// Number of bytes `encode_vint` will use for `value`.
pub fn vint_len(value: u64) -> usize {
    let mut len = 1usize;
    while value >> (len * 7) != 0 {
        len += 1;
    }
    len
}

/// Encode `value` as an EBML-style variable-length integer.
pub fn encode_vint(value: u64) -> Vec<u8> {
    let len = vint_len(value);
    let marked = value | (1u64 << (len * 7));
    let mut buf = vec![0u8; len];
    for (i, slot) in buf.iter_mut().enumerate() {
        *slot = (marked >> ((len - 1 - i) * 8)) as u8;
    }
    buf
}

/// Write `value` as a variable-length integer to `out`.
pub fn write_vint<W: Write>(out: &mut W, value: u64) -> io::Result<()> {
    out.write_all(&encode_vint(value))
}

/// Decode a variable-length integer from the start of `bytes`, returning the
/// value and the number of bytes consumed.
pub fn decode_vint(bytes: &[u8]) -> Result<(u64, usize), VarintError> {
    let first = *bytes.first().ok_or(VarintError::Truncated)?;
    let leading_ones = first.leading_zeros(); // bit7 set -> 0 leading zero -> len 1
    let len = leading_ones as usize + 1;
    if len > MAX_LEN {
        return Err(VarintError::InvalidMarker);
    }
    if bytes.len() < len {
        return Err(VarintError::Truncated);
    }
    let mask: u64 = if len == 1 {
        0x7F
    } else {
        (1u64 << (8 - len)) - 1
    };
    let mut value = (first as u64) & mask;
    for &b in &bytes[1..len] {
        value = (value << 8) | b as u64;
    }
    Ok((value, len))
}

/// Read a variable-length integer from a `Read`, one byte at a time (the
/// length isn't known until the first byte arrives).
pub fn read_vint<R: Read>(input: &mut R) -> Result<u64, VarintError> {
    let mut first = [0u8; 1];
    input.read_exact(&mut first)?;
    let leading_ones = first[0].leading_zeros();
    let len = leading_ones as usize + 1;
    if len > MAX_LEN {
        return Err(VarintError::InvalidMarker);
    }
    let mut rest = vec![0u8; len - 1];
    if len > 1 {
        input.read_exact(&mut rest)?;
    }
    let mask: u64 = if len == 1 {
        0x7F
    } else {
        (1u64 << (8 - len)) - 1
    };
    let mut value = (first[0] as u64) & mask;
    for b in rest {
        value = (value << 8) | b as u64;
    }
    Ok(value)
}

/// Write an element header: `vint(id) ++ vint(payload_len)`.
pub fn write_element_header<W: Write>(out: &mut W, id: u64, payload_len: u64) -> io::Result<()> {
    write_vint(out, id)?;
    write_vint(out, payload_len)
}

/// Size in bytes of `write_element_header(id, payload_len)`.
pub fn element_header_len(id: u64, payload_len: u64) -> u64 {
    (vint_len(id) + vint_len(payload_len)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_values_round_trip() {
        for &v in &[0u64, 1, 0x7E, 0x7F, 0x80, 0x3FFF, 0x4000, 0x7273, 0x0A45DFA3] {
            let encoded = encode_vint(v);
            let (decoded, len) = decode_vint(&encoded).unwrap();
            assert_eq!(decoded, v);
            assert_eq!(len, encoded.len());
        }
    }

    #[test]
    fn element_header_matches_manual_concat() {
        let mut buf = Vec::new();
        write_element_header(&mut buf, 0x7273, 42).unwrap();
        let mut expect = encode_vint(0x7273);
        expect.extend(encode_vint(42));
        assert_eq!(buf, expect);
        assert_eq!(element_header_len(0x7273, 42), buf.len() as u64);
    }

    proptest! {
        #[test]
        fn vint_round_trips(value in 0u64..(1u64 << 48)) {
            let encoded = encode_vint(value);
            let (decoded, len) = decode_vint(&encoded).expect("decode");
            prop_assert_eq!(decoded, value);
            prop_assert_eq!(len, encoded.len());

            let mut reader = &encoded[..];
            let streamed = read_vint(&mut reader).expect("stream decode");
            prop_assert_eq!(streamed, value);
        }
    }
}
