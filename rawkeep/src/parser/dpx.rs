//! DPX: fixed-layout generic/image-information header (§4.1 "DPX / TIFF").
//! Covers the subset of the SMPTE 268M header this system needs to locate
//! the payload and classify pixel layout: magic, image data offset, pixel
//! dimensions, and the first image element's bit depth/descriptor/packing.
//! Industry-specific and film/television headers are treated as part of
//! `Before`/`After` verbatim, since this system never inspects them.

use crate::error::UndecodableError;
use crate::flavor::{is_supported_image_flavor, Flavor, ImageColorLayout, ImageFlavor};

use super::{InRange, ParseOptions, ParseOutcome, ParsedFile, StreamInfo};

const PARSER: &str = "dpx";
const GENERIC_HEADER_LEN: u64 = 768;
const FIRST_ELEMENT_OFFSET: u64 = 780;

pub fn parse(data: &[u8], options: ParseOptions) -> ParseOutcome {
    if data.len() < 4 {
        return ParseOutcome::NotDetected;
    }
    let big_endian = match &data[0..4] {
        b"SDPX" => true,
        b"XPDS" => false,
        _ => return ParseOutcome::NotDetected,
    };
    if data.len() < (FIRST_ELEMENT_OFFSET + 72) as usize {
        return ParseOutcome::Undecodable(UndecodableError::TruncatedChunk {
            parser: PARSER,
            offset: 0,
            declared: FIRST_ELEMENT_OFFSET + 72,
            available: data.len() as u64,
        });
    }

    let read_u32 = |off: usize| -> u32 {
        let bytes = &data[off..off + 4];
        if big_endian {
            u32::from_be_bytes(bytes.try_into().unwrap())
        } else {
            u32::from_le_bytes(bytes.try_into().unwrap())
        }
    };
    let read_u16 = |off: usize| -> u16 {
        let bytes = &data[off..off + 2];
        if big_endian {
            u16::from_be_bytes(bytes.try_into().unwrap())
        } else {
            u16::from_le_bytes(bytes.try_into().unwrap())
        }
    };

    let offset_to_image = read_u32(4) as u64;
    let pixel_width = read_u32(772);
    let pixel_height = read_u32(776);
    let descriptor = data[FIRST_ELEMENT_OFFSET as usize + 20];
    let bit_size = data[FIRST_ELEMENT_OFFSET as usize + 23];
    let packing = read_u16(FIRST_ELEMENT_OFFSET as usize + 24);

    if offset_to_image as usize > data.len() || offset_to_image < GENERIC_HEADER_LEN {
        let available = data.len() as u64;
        if !options.accept_truncated {
            return ParseOutcome::Undecodable(UndecodableError::ChunkSizeOverflow {
                parser: PARSER,
                offset: 4,
                declared: offset_to_image,
                container_size: available,
            });
        }
    }
    let payload_offset = offset_to_image.min(data.len() as u64);

    let colorspace = match descriptor {
        6 => ImageColorLayout::Luma,
        50 => ImageColorLayout::Rgb,
        51 => ImageColorLayout::Rgba,
        100 => ImageColorLayout::Yuv422,
        102 => ImageColorLayout::Yuv444,
        _ => {
            return ParseOutcome::Unsupported(crate::error::UnsupportedError::PixelLayout {
                parser: PARSER,
                detail: format!("unrecognized descriptor code {descriptor}"),
            })
        }
    };
    // Packing method A (value 1) left-justifies samples narrower than the
    // word size and zero-pads the remainder — the padding bits this system
    // must check for before trusting the codec to reproduce them.
    let word_padded = bit_size == 10 && packing == 1;

    let image_flavor = ImageFlavor {
        bit_depth: bit_size,
        colorspace,
        word_padded,
    };
    if !is_supported_image_flavor(&image_flavor) {
        return ParseOutcome::Unsupported(crate::error::UnsupportedError::PixelLayout {
            parser: PARSER,
            detail: format!("{image_flavor}"),
        });
    }

    // A word-padded flavor whose padding bits were never scanned could be
    // silently hiding unreversible data; refuse rather than guess (§4.1,
    // §8 "Padding problem") until the caller opts into the scan.
    if word_padded && !options.check_padding {
        return ParseOutcome::Unsupported(crate::error::UnsupportedError::PaddingProblem {
            parser: PARSER,
            detail: format!("{image_flavor}"),
        });
    }

    let before = data[..payload_offset as usize].to_vec();
    let payload_len = data.len() as u64 - payload_offset;

    let padding_problem =
        word_padded && has_nonzero_padding(&data[payload_offset as usize..], bit_size);

    ParseOutcome::Ok(Box::new(ParsedFile {
        flavor: Flavor::Image(image_flavor),
        before,
        payload_offset,
        payload_len,
        in_ranges: Vec::<InRange>::new(),
        after: Vec::new(),
        stream_info: StreamInfo {
            pixel_width: Some(pixel_width),
            pixel_height: Some(pixel_height),
            slice_count: Some(1),
            ..Default::default()
        },
        padding_problem,
        warnings: Vec::new(),
    }))
}

/// 10-bit-in-32-bit packing (method A) leaves the top 2 bits of each 32-bit
/// word unused; a codec that only knows about the 10-bit samples will zero
/// them on decode, so any non-zero bit there is unreversible data loss.
fn has_nonzero_padding(payload: &[u8], bit_size: u8) -> bool {
    if bit_size != 10 {
        return false;
    }
    payload.chunks_exact(4).any(|word| word[0] & 0xC0 != 0)
}
