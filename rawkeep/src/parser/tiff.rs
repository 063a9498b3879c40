//! TIFF: byte-order header + one Image File Directory (§4.1 "DPX / TIFF").
//! Scope is single-strip, uncompressed baseline TIFF, the layout DPX-style
//! image sequences actually use in practice; multi-strip TIFFs fall through
//! to *Unsupported* rather than guessing at an `In` splice plan.

use crate::error::{UndecodableError, UnsupportedError};
use crate::flavor::{is_supported_image_flavor, Flavor, ImageColorLayout, ImageFlavor};

use super::{InRange, ParseOptions, ParseOutcome, ParsedFile, StreamInfo};

const PARSER: &str = "tiff";

const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TAG_BITS_PER_SAMPLE: u16 = 258;
const TAG_COMPRESSION: u16 = 259;
const TAG_PHOTOMETRIC: u16 = 262;
const TAG_STRIP_OFFSETS: u16 = 273;
const TAG_SAMPLES_PER_PIXEL: u16 = 277;
const TAG_STRIP_BYTE_COUNTS: u16 = 279;

pub fn parse(data: &[u8], options: ParseOptions) -> ParseOutcome {
    if data.len() < 8 {
        return ParseOutcome::NotDetected;
    }
    let big_endian = match &data[0..2] {
        b"II" => false,
        b"MM" => true,
        _ => return ParseOutcome::NotDetected,
    };
    let magic = read_u16(data, 2, big_endian);
    if magic != 42 {
        return ParseOutcome::NotDetected;
    }

    let ifd_offset = read_u32(data, 4, big_endian) as usize;
    if ifd_offset + 2 > data.len() {
        return ParseOutcome::Undecodable(UndecodableError::TruncatedChunk {
            parser: PARSER,
            offset: 4,
            declared: (ifd_offset + 2) as u64,
            available: data.len() as u64,
        });
    }
    let entry_count = read_u16(data, ifd_offset, big_endian) as usize;
    let entries_end = ifd_offset + 2 + entry_count * 12;
    if entries_end > data.len() {
        return ParseOutcome::Undecodable(UndecodableError::TruncatedChunk {
            parser: PARSER,
            offset: ifd_offset as u64,
            declared: entries_end as u64,
            available: data.len() as u64,
        });
    }

    let mut fields = Fields::default();
    for i in 0..entry_count {
        let entry_offset = ifd_offset + 2 + i * 12;
        let tag = read_u16(data, entry_offset, big_endian);
        let value = read_u32(data, entry_offset + 8, big_endian);
        let short_value = read_u16(data, entry_offset + 8, big_endian);
        match tag {
            TAG_IMAGE_WIDTH => fields.width = Some(value),
            TAG_IMAGE_LENGTH => fields.height = Some(value),
            TAG_BITS_PER_SAMPLE => fields.bits_per_sample = Some(short_value),
            TAG_COMPRESSION => fields.compression = Some(short_value),
            TAG_PHOTOMETRIC => fields.photometric = Some(short_value),
            TAG_SAMPLES_PER_PIXEL => fields.samples_per_pixel = Some(short_value),
            TAG_STRIP_OFFSETS => fields.strip_offset = Some(value),
            TAG_STRIP_BYTE_COUNTS => fields.strip_byte_count = Some(value),
            _ => {}
        }
    }

    if fields.compression.unwrap_or(1) != 1 {
        return ParseOutcome::Unsupported(UnsupportedError::PixelLayout {
            parser: PARSER,
            detail: format!("compression {:?} is not baseline-uncompressed", fields.compression),
        });
    }

    let (strip_offset, strip_len) = match (fields.strip_offset, fields.strip_byte_count) {
        (Some(o), Some(l)) => (o as u64, l as u64),
        _ => {
            return ParseOutcome::Undecodable(UndecodableError::BadMagic {
                parser: PARSER,
                offset: ifd_offset as u64,
            })
        }
    };
    if strip_offset as usize + strip_len as usize > data.len() {
        let available = data.len() as u64 - strip_offset.min(data.len() as u64);
        if !options.accept_truncated {
            return ParseOutcome::Undecodable(UndecodableError::TruncatedChunk {
                parser: PARSER,
                offset: strip_offset,
                declared: strip_len,
                available,
            });
        }
    }
    let payload_len = strip_len.min(data.len() as u64 - strip_offset);

    let samples_per_pixel = fields.samples_per_pixel.unwrap_or(1);
    let colorspace = match (fields.photometric.unwrap_or(1), samples_per_pixel) {
        (0, 1) | (1, 1) => ImageColorLayout::Luma,
        (2, 3) => ImageColorLayout::Rgb,
        (2, 4) => ImageColorLayout::Rgba,
        (photometric, spp) => {
            return ParseOutcome::Unsupported(UnsupportedError::PixelLayout {
                parser: PARSER,
                detail: format!("photometric {photometric} with {spp} samples/pixel"),
            })
        }
    };

    let image_flavor = ImageFlavor {
        bit_depth: fields.bits_per_sample.unwrap_or(8) as u8,
        colorspace,
        word_padded: false,
    };
    if !is_supported_image_flavor(&image_flavor) {
        return ParseOutcome::Unsupported(UnsupportedError::PixelLayout {
            parser: PARSER,
            detail: format!("{image_flavor}"),
        });
    }

    let before = data[..strip_offset as usize].to_vec();
    let after_start = (strip_offset + payload_len) as usize;
    let after = data[after_start.min(data.len())..].to_vec();

    ParseOutcome::Ok(Box::new(ParsedFile {
        flavor: Flavor::Image(image_flavor),
        before,
        payload_offset: strip_offset,
        payload_len,
        in_ranges: Vec::<InRange>::new(),
        after,
        stream_info: StreamInfo {
            pixel_width: fields.width,
            pixel_height: fields.height,
            slice_count: Some(1),
            ..Default::default()
        },
        padding_problem: false,
        warnings: Vec::new(),
    }))
}

#[derive(Default)]
struct Fields {
    width: Option<u32>,
    height: Option<u32>,
    bits_per_sample: Option<u16>,
    compression: Option<u16>,
    photometric: Option<u16>,
    samples_per_pixel: Option<u16>,
    strip_offset: Option<u32>,
    strip_byte_count: Option<u32>,
}

fn read_u16(data: &[u8], offset: usize, big_endian: bool) -> u16 {
    let bytes: [u8; 2] = data[offset..offset + 2].try_into().unwrap();
    if big_endian {
        u16::from_be_bytes(bytes)
    } else {
        u16::from_le_bytes(bytes)
    }
}

fn read_u32(data: &[u8], offset: usize, big_endian: bool) -> u32 {
    let bytes: [u8; 4] = data[offset..offset + 4].try_into().unwrap();
    if big_endian {
        u32::from_be_bytes(bytes)
    } else {
        u32::from_le_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tag: u16, field_type: u16, count: u32, value: u32, big_endian: bool) -> [u8; 12] {
        let mut e = [0u8; 12];
        write_u16(&mut e[0..2], tag, big_endian);
        write_u16(&mut e[2..4], field_type, big_endian);
        write_u32(&mut e[4..8], count, big_endian);
        write_u32(&mut e[8..12], value, big_endian);
        e
    }

    fn write_u16(slot: &mut [u8], v: u16, big_endian: bool) {
        slot.copy_from_slice(&if big_endian { v.to_be_bytes() } else { v.to_le_bytes() });
    }

    fn write_u32(slot: &mut [u8], v: u32, big_endian: bool) {
        slot.copy_from_slice(&if big_endian { v.to_be_bytes() } else { v.to_le_bytes() });
    }

    fn build_tiff(width: u32, height: u32, bits: u16, spp: u16, photometric: u16, payload: &[u8]) -> Vec<u8> {
        let big_endian = true;
        let mut out = Vec::new();
        out.extend_from_slice(b"MM");
        let mut magic = [0u8; 2];
        write_u16(&mut magic, 42, big_endian);
        out.extend_from_slice(&magic);
        let ifd_offset = 8u32;
        let mut off_bytes = [0u8; 4];
        write_u32(&mut off_bytes, ifd_offset, big_endian);
        out.extend_from_slice(&off_bytes);

        let entries = vec![
            entry(TAG_IMAGE_WIDTH, 4, 1, width, big_endian),
            entry(TAG_IMAGE_LENGTH, 4, 1, height, big_endian),
            entry(TAG_BITS_PER_SAMPLE, 3, 1, bits as u32, big_endian),
            entry(TAG_COMPRESSION, 3, 1, 1, big_endian),
            entry(TAG_PHOTOMETRIC, 3, 1, photometric as u32, big_endian),
            entry(TAG_SAMPLES_PER_PIXEL, 3, 1, spp as u32, big_endian),
            entry(TAG_STRIP_OFFSETS, 4, 1, 0, big_endian), // patched below
            entry(TAG_STRIP_BYTE_COUNTS, 4, 1, payload.len() as u32, big_endian),
        ];
        let mut count_bytes = [0u8; 2];
        write_u16(&mut count_bytes, entries.len() as u16, big_endian);
        out.extend_from_slice(&count_bytes);
        let strip_offsets_entry_index = 6;
        let strip_entry_pos = out.len() + strip_offsets_entry_index * 12 + 8;
        for e in &entries {
            out.extend_from_slice(e);
        }
        out.extend_from_slice(&[0u8; 4]); // next-IFD offset = 0

        let strip_offset = out.len() as u32;
        write_u32(&mut out[strip_entry_pos..strip_entry_pos + 4], strip_offset, big_endian);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn parses_rgb_baseline_tiff() {
        let file = build_tiff(32, 32, 8, 3, 2, &vec![0u8; 32 * 32 * 3]);
        match parse(&file, ParseOptions::default()) {
            ParseOutcome::Ok(parsed) => {
                assert_eq!(parsed.stream_info.pixel_width, Some(32));
                assert_eq!(parsed.payload_len, (32 * 32 * 3) as u64);
            }
            other => panic!("expected Ok, got {}", label(&other)),
        }
    }

    #[test]
    fn unsupported_photometric_combination() {
        let file = build_tiff(8, 8, 8, 2, 5, &vec![0u8; 128]);
        match parse(&file, ParseOptions::default()) {
            ParseOutcome::Unsupported(_) => {}
            other => panic!("expected Unsupported, got {}", label(&other)),
        }
    }

    fn label(outcome: &ParseOutcome) -> &'static str {
        match outcome {
            ParseOutcome::NotDetected => "NotDetected",
            ParseOutcome::Unsupported(_) => "Unsupported",
            ParseOutcome::Undecodable(_) => "Undecodable",
            ParseOutcome::Ok(_) => "Ok",
        }
    }
}
