//! WAV: walk RIFF chunks, locate `fmt `/`data` (§4.1 "WAV / AIFF").

use crate::byte_reader::ByteReader;
use crate::error::{UndecodableError, UnsupportedError};
use crate::flavor::{is_supported_wav_flavor, AudioFlavor, Endianness, Flavor};

use super::{InRange, ParseOutcome, ParsedFile, StreamInfo};

const PARSER: &str = "wav";

pub fn parse(data: &[u8], accept_truncated: bool) -> ParseOutcome {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return ParseOutcome::NotDetected;
    }

    let mut reader = ByteReader::new(data, PARSER);
    reader.seek(4);
    let riff_size = match reader.read_le_u32() {
        Ok(v) => v as u64,
        Err(e) => return ParseOutcome::Undecodable(e),
    };
    let container_end = (8 + riff_size).min(data.len() as u64);
    reader.seek(12);

    let mut fmt: Option<FmtChunk> = None;
    let mut payload_offset = None;
    let mut payload_len = None;
    let mut warnings = Vec::new();

    while reader.position() + 8 <= container_end {
        let chunk_id_offset = reader.position();
        let id = match reader.read_bytes(4) {
            Ok(b) => [b[0], b[1], b[2], b[3]],
            Err(e) => return ParseOutcome::Undecodable(e),
        };
        let declared_size = match reader.read_le_u32() {
            Ok(v) => v as u64,
            Err(e) => return ParseOutcome::Undecodable(e),
        };
        let body_start = reader.position();
        let available = data.len() as u64 - body_start;
        let body_len = if declared_size > available {
            if !accept_truncated {
                return ParseOutcome::Undecodable(UndecodableError::TruncatedChunk {
                    parser: PARSER,
                    offset: chunk_id_offset,
                    declared: declared_size,
                    available,
                });
            }
            warnings.push(format!(
                "chunk {:?} at offset {} truncated: declared {} available {}",
                String::from_utf8_lossy(&id),
                chunk_id_offset,
                declared_size,
                available
            ));
            available
        } else {
            declared_size
        };

        match &id {
            b"fmt " => {
                let mut fmt_reader = ByteReader::new(&data[body_start as usize..], PARSER);
                fmt = match read_fmt(&mut fmt_reader) {
                    Ok(f) => Some(f),
                    Err(e) => return ParseOutcome::Undecodable(e),
                };
            }
            b"data" => {
                payload_offset = Some(body_start);
                payload_len = Some(body_len);
            }
            _ => {}
        }

        // Odd-length chunks are followed by one zero pad byte that belongs
        // to the container, not the chunk itself.
        let advance = body_len + (body_len & 1);
        reader.seek(body_start + advance);
    }

    let fmt = match fmt {
        Some(f) => f,
        None => {
            return ParseOutcome::Undecodable(UndecodableError::BadMagic {
                parser: PARSER,
                offset: 12,
            })
        }
    };
    let (payload_offset, payload_len) = match (payload_offset, payload_len) {
        (Some(o), Some(l)) => (o, l),
        _ => {
            return ParseOutcome::Undecodable(UndecodableError::BadMagic {
                parser: PARSER,
                offset: 12,
            })
        }
    };

    let audio_flavor = AudioFlavor {
        sample_rate: fmt.sample_rate,
        sample_size: fmt.bits_per_sample,
        channels: fmt.channels,
        endianness: Endianness::Little,
    };
    if !is_supported_wav_flavor(&audio_flavor) {
        return ParseOutcome::Unsupported(UnsupportedError::Flavor {
            parser: PARSER,
            detail: format!("{audio_flavor}"),
        });
    }

    let before = data[..payload_offset as usize].to_vec();
    let after_start = (payload_offset + payload_len) as usize;
    let after = data[after_start.min(data.len())..].to_vec();

    let bytes_per_sample = (fmt.bits_per_sample as u64 / 8).max(1) * fmt.channels as u64;
    let frame_count = if bytes_per_sample > 0 {
        Some(payload_len / bytes_per_sample)
    } else {
        None
    };

    ParseOutcome::Ok(Box::new(ParsedFile {
        flavor: Flavor::Audio(audio_flavor),
        before,
        payload_offset,
        payload_len,
        in_ranges: Vec::<InRange>::new(),
        after,
        stream_info: StreamInfo {
            sample_rate: Some(fmt.sample_rate),
            channels: Some(fmt.channels),
            frame_count,
            ..Default::default()
        },
        padding_problem: false,
        warnings,
    }))
}

struct FmtChunk {
    sample_rate: u32,
    bits_per_sample: u8,
    channels: u8,
}

fn read_fmt(reader: &mut ByteReader) -> Result<FmtChunk, UndecodableError> {
    let _audio_format = reader.read_le_u16()?;
    let channels = reader.read_le_u16()? as u8;
    let sample_rate = reader.read_le_u32()?;
    let _byte_rate = reader.read_le_u32()?;
    let _block_align = reader.read_le_u16()?;
    let bits_per_sample = reader.read_le_u16()? as u8;
    Ok(FmtChunk {
        sample_rate,
        bits_per_sample,
        channels,
    })
}
