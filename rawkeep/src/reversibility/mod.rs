//! Reversibility data model and mask-delta arithmetic (§3, §4.3, §4.4)
//! shared between the encoder and decoder.

pub mod decoder;
pub mod encoder;

use crate::hash::FrameHash;

pub use decoder::ReversibilityDecoder;
pub use encoder::ReversibilityEncoder;

/// Resolves Open Question (a): always an explicit value, never a sentinel
/// `-1` overloaded onto a plain integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSize {
    Explicit(u64),
    /// Use `Before.len() + Payload.len() + Σ In.len() + After.len()`.
    Concatenated,
}

/// Per-frame reversibility record (§3 "Frame-reversibility record").
#[derive(Debug, Clone)]
pub struct FrameRecord {
    pub filename: String,
    pub before: Vec<u8>,
    pub after: Vec<u8>,
    /// Concatenation of every in-band non-payload range for this frame, in
    /// offset order. Splice offsets themselves are structural to the format
    /// (constant across a track) and live on the track, not per frame.
    pub in_data: Vec<u8>,
    pub file_size: FileSize,
    pub hash: Option<FrameHash>,
    pub is_attachment: bool,
}

/// Track-level mask base (§3 "Template (track-level) record").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTemplate {
    pub filename: Vec<u8>,
    pub before: Vec<u8>,
    pub after: Vec<u8>,
    pub in_data: Vec<u8>,
}

/// `addition[i] = frame[i] - template[i] (mod 256)`, with `template`
/// implicitly zero-padded when shorter than `frame`. The addition's length
/// always equals `frame`'s length, so the decoder recovers the exact
/// original length without a separate length field.
pub fn mask_addition(template: &[u8], frame: &[u8]) -> Vec<u8> {
    frame
        .iter()
        .enumerate()
        .map(|(i, &b)| b.wrapping_sub(template.get(i).copied().unwrap_or(0)))
        .collect()
}

/// Inverse of [`mask_addition`]: `template[i] + addition[i] (mod 256)`.
pub fn apply_mask_addition(template: &[u8], addition: &[u8]) -> Vec<u8> {
    addition
        .iter()
        .enumerate()
        .map(|(i, &b)| b.wrapping_add(template.get(i).copied().unwrap_or(0)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn delta_round_trips_when_frame_longer_than_template() {
        let template = b"abc".to_vec();
        let frame = b"abcdef".to_vec();
        let addition = mask_addition(&template, &frame);
        assert_eq!(apply_mask_addition(&template, &addition), frame);
    }

    #[test]
    fn delta_round_trips_when_frame_shorter_than_template() {
        let template = b"abcdef".to_vec();
        let frame = b"ab".to_vec();
        let addition = mask_addition(&template, &frame);
        assert_eq!(addition.len(), frame.len());
        assert_eq!(apply_mask_addition(&template, &addition), frame);
    }

    #[test]
    fn sequential_filenames_delta_to_mostly_zero() {
        let template = b"f000001.dpx".to_vec();
        let frame = b"f000002.dpx".to_vec();
        let addition = mask_addition(&template, &frame);
        let nonzero = addition.iter().filter(|&&b| b != 0).count();
        assert!(nonzero <= 1, "expected only the last digit to change, got {addition:?}");
    }

    proptest! {
        #[test]
        fn delta_round_trips_for_arbitrary_bytes(
            template in proptest::collection::vec(any::<u8>(), 0..64),
            frame in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let addition = mask_addition(&template, &frame);
            prop_assert_eq!(apply_mask_addition(&template, &addition), frame);
        }
    }
}
