//! AIFF: walk FORM chunks, locate `COMM`/`SSND` (§4.1 "WAV / AIFF").

use crate::byte_reader::ByteReader;
use crate::error::{UndecodableError, UnsupportedError};
use crate::flavor::{is_supported_aiff_flavor, AudioFlavor, Endianness, Flavor};

use super::{InRange, ParseOutcome, ParsedFile, StreamInfo};

const PARSER: &str = "aiff";

pub fn parse(data: &[u8], accept_truncated: bool) -> ParseOutcome {
    if data.len() < 12 || &data[0..4] != b"FORM" || &data[8..12] != b"AIFF" {
        return ParseOutcome::NotDetected;
    }

    let mut reader = ByteReader::new(data, PARSER);
    reader.seek(4);
    let form_size = match reader.read_be_u32() {
        Ok(v) => v as u64,
        Err(e) => return ParseOutcome::Undecodable(e),
    };
    let container_end = (8 + form_size).min(data.len() as u64);
    reader.seek(12);

    let mut comm: Option<CommChunk> = None;
    let mut ssnd_body_start = None;
    let mut ssnd_len = None;
    let mut warnings = Vec::new();

    while reader.position() + 8 <= container_end {
        let chunk_id_offset = reader.position();
        let id = match reader.read_bytes(4) {
            Ok(b) => [b[0], b[1], b[2], b[3]],
            Err(e) => return ParseOutcome::Undecodable(e),
        };
        let declared_size = match reader.read_be_u32() {
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
            b"COMM" => {
                let mut comm_reader = ByteReader::new(&data[body_start as usize..], PARSER);
                comm = match read_comm(&mut comm_reader, body_len) {
                    Ok(c) => Some(c),
                    Err(e) => return ParseOutcome::Undecodable(e),
                };
            }
            b"SSND" => {
                ssnd_body_start = Some(body_start);
                ssnd_len = Some(body_len);
            }
            _ => {}
        }

        let advance = body_len + (body_len & 1);
        reader.seek(body_start + advance);
    }

    let comm = match comm {
        Some(c) => c,
        None => {
            return ParseOutcome::Undecodable(UndecodableError::BadMagic {
                parser: PARSER,
                offset: 12,
            })
        }
    };
    if comm.compression_not_pcm {
        return ParseOutcome::Unsupported(UnsupportedError::CompressionType {
            parser: PARSER,
            compression_type: comm.compression_type_tag,
        });
    }

    let (ssnd_body_start, ssnd_len) = match (ssnd_body_start, ssnd_len) {
        (Some(o), Some(l)) => (o, l),
        _ => {
            return ParseOutcome::Undecodable(UndecodableError::BadMagic {
                parser: PARSER,
                offset: 12,
            })
        }
    };
    // SSND carries an 8-byte offset/blockSize header before the sample data.
    if ssnd_len < 8 {
        return ParseOutcome::Undecodable(UndecodableError::TruncatedChunk {
            parser: PARSER,
            offset: ssnd_body_start,
            declared: 8,
            available: ssnd_len,
        });
    }
    let ssnd_data_offset = u32::from_be_bytes(
        data[ssnd_body_start as usize..ssnd_body_start as usize + 4]
            .try_into()
            .unwrap(),
    ) as u64;
    // `ssnd_data_offset` is file-supplied; a malformed SSND chunk claiming an
    // offset past its own body would underflow the subtraction below.
    if ssnd_data_offset > ssnd_len - 8 {
        return ParseOutcome::Undecodable(UndecodableError::ChunkSizeOverflow {
            parser: PARSER,
            offset: ssnd_body_start,
            declared: ssnd_data_offset,
            container_size: ssnd_len - 8,
        });
    }
    let payload_offset = ssnd_body_start + 8 + ssnd_data_offset;
    let payload_len = ssnd_len - 8 - ssnd_data_offset;

    let audio_flavor = AudioFlavor {
        sample_rate: comm.sample_rate,
        sample_size: comm.sample_size,
        channels: comm.channels,
        endianness: comm.endianness,
    };
    if !is_supported_aiff_flavor(&audio_flavor) {
        return ParseOutcome::Unsupported(UnsupportedError::Flavor {
            parser: PARSER,
            detail: format!("{audio_flavor}"),
        });
    }

    let before = data[..payload_offset as usize].to_vec();
    let after_start = (payload_offset + payload_len) as usize;
    let after = data[after_start.min(data.len())..].to_vec();

    ParseOutcome::Ok(Box::new(ParsedFile {
        flavor: Flavor::Audio(audio_flavor),
        before,
        payload_offset,
        payload_len,
        in_ranges: Vec::<InRange>::new(),
        after,
        stream_info: StreamInfo {
            sample_rate: Some(comm.sample_rate),
            channels: Some(comm.channels),
            frame_count: Some(comm.num_sample_frames as u64),
            ..Default::default()
        },
        padding_problem: false,
        warnings,
    }))
}

struct CommChunk {
    channels: u8,
    num_sample_frames: u32,
    sample_size: u8,
    sample_rate: u32,
    endianness: Endianness,
    compression_not_pcm: bool,
    compression_type_tag: String,
}

fn read_comm(reader: &mut ByteReader, body_len: u64) -> Result<CommChunk, UndecodableError> {
    let channels = reader.read_be_u16()? as u8;
    let num_sample_frames = reader.read_be_u32()?;
    let sample_size = reader.read_be_u16()? as u8;
    let sample_rate = reader.read_be_f80()?.round() as u32;

    let mut endianness = Endianness::Big;
    let mut compression_not_pcm = false;
    let mut compression_type_tag = String::new();
    // AIFC files carry a 4-byte compressionType after the standard COMM
    // fields (18 bytes); plain AIFF COMM chunks stop there.
    if body_len > 18 {
        let tag = reader.read_bytes(4)?;
        compression_type_tag = String::from_utf8_lossy(tag).to_string();
        match tag {
            b"NONE" | b"twos" => {}
            b"raw " | b"sowt" => endianness = Endianness::Little,
            _ => compression_not_pcm = true,
        }
    }

    Ok(CommChunk {
        channels,
        num_sample_frames,
        sample_size,
        sample_rate,
        endianness,
        compression_not_pcm,
        compression_type_tag,
    })
}
