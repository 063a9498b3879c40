//! TLV/EBML-style primitives for the reversibility container format:
//! variable-length integers, element IDs, and the per-field compression
//! envelope. No knowledge of frames, tracks, or files lives here — that's
//! built on top of these primitives in `rawkeep`.

pub mod field;
pub mod ids;
pub mod varint;

pub use field::{decode_field, encode_field, read_field, write_field_element, FieldError};
pub use varint::{
    decode_vint, element_header_len, encode_vint, read_vint, vint_len, write_element_header,
    write_vint, VarintError,
};
