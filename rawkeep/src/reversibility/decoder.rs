//! TLV parsing (§4.4): walk Segment/Track/Block elements and reconstruct
//! each field by decoding its compression envelope, then — for a
//! mask-addition field — adding it pointwise to the track's template field.

use std::io::Read;
use std::ops::RangeInclusive;

use rawkeep_container::{decode_field, decode_vint, ids};

use super::{apply_mask_addition, FileSize, FrameRecord, TrackTemplate};
use crate::error::{CoherencyError, RawkeepError};

const SUPPORTED_LIBRARY_NAME: &str = "rawkeep";
const SUPPORTED_LIBRARY_VERSIONS: RangeInclusive<u64> = 1..=1;

pub struct SegmentInfo {
    pub library_name: String,
    pub library_version: u64,
    pub path_separator: char,
}

/// One Track or Block element read via [`ReversibilityDecoder::next_element`]
/// (§4.4), used by the driver to walk a run's tracks/blocks without knowing
/// their count in advance.
#[derive(Debug)]
pub enum Element {
    Track(Option<TrackTemplate>),
    Block(FrameRecord),
}

pub struct ReversibilityDecoder<R: Read> {
    input: R,
}

impl<R: Read> ReversibilityDecoder<R> {
    /// Reads and validates the one-shot EBML preamble.
    pub fn new(mut input: R) -> Result<Self, RawkeepError> {
        let (id, body) = read_element(&mut input)?;
        if id != ids::EBML {
            return Err(CoherencyError::UnsupportedDocType {
                doctype: format!("<expected EBML element 0x{:X}, got 0x{id:X}>", ids::EBML),
            }
            .into());
        }
        let entries = read_entries(&body)?;
        let doctype = find(&entries, ids::EBML_DOCTYPE)
            .map(|b| String::from_utf8_lossy(b).to_string())
            .unwrap_or_default();
        if doctype != ids::DOC_TYPE {
            return Err(CoherencyError::UnsupportedDocType { doctype }.into());
        }
        let read_version = find(&entries, ids::EBML_DOCTYPE_READ_VERSION)
            .and_then(|b| b.first().copied())
            .unwrap_or(0);
        if read_version > ids::DOC_TYPE_READ_VERSION {
            return Err(CoherencyError::UnsupportedDocTypeReadVersion { version: read_version }.into());
        }
        Ok(Self { input })
    }

    pub fn read_segment(&mut self) -> Result<SegmentInfo, RawkeepError> {
        let (id, body) = read_element(&mut self.input)?;
        if id != ids::SEGMENT {
            return Err(CoherencyError::UnsupportedDocType {
                doctype: format!("<expected Segment element, got 0x{id:X}>"),
            }
            .into());
        }
        let entries = read_entries(&body)?;
        let library_name = find(&entries, ids::SEGMENT_LIBRARY_NAME)
            .map(|b| String::from_utf8_lossy(b).to_string())
            .unwrap_or_default();
        let library_version = find(&entries, ids::SEGMENT_LIBRARY_VERSION)
            .map(|b| decode_vint(b).map(|(v, _)| v).unwrap_or(0))
            .unwrap_or(0);
        let path_separator = find(&entries, ids::SEGMENT_PATH_SEPARATOR)
            .map(|b| String::from_utf8_lossy(b).chars().next().unwrap_or('/'))
            .unwrap_or('/');

        if library_name != SUPPORTED_LIBRARY_NAME || !SUPPORTED_LIBRARY_VERSIONS.contains(&library_version) {
            return Err(CoherencyError::UnsupportedLibraryVersion {
                name: library_name,
                version: library_version,
            }
            .into());
        }

        Ok(SegmentInfo {
            library_name,
            library_version,
            path_separator,
        })
    }

    /// `None` means this track is `Unique`: no mask base was ever written.
    pub fn read_track(&mut self) -> Result<Option<TrackTemplate>, RawkeepError> {
        let (id, body) = read_element(&mut self.input)?;
        if id != ids::TRACK {
            return Err(CoherencyError::UnsupportedDocType {
                doctype: format!("<expected Track element, got 0x{id:X}>"),
            }
            .into());
        }
        parse_track_body(&body)
    }

    pub fn read_block(&mut self, template: &Option<TrackTemplate>) -> Result<FrameRecord, RawkeepError> {
        let (id, body) = read_element(&mut self.input)?;
        if id != ids::BLOCK {
            return Err(CoherencyError::UnsupportedDocType {
                doctype: format!("<expected Block element, got 0x{id:X}>"),
            }
            .into());
        }
        parse_block_body(&body, template)
    }

    /// Reads the next top-level Track or Block element, or `None` at a clean
    /// end of stream. The driver uses this to walk a run without knowing its
    /// track/block count in advance, since Segment/Track/Block all sit at
    /// the same top-level nesting (§4.4, Design Note "nested TLV dispatch").
    pub fn next_element(&mut self, current_template: &Option<TrackTemplate>) -> Result<Option<Element>, RawkeepError> {
        let id = match rawkeep_container::read_vint(&mut self.input) {
            Ok(id) => id,
            Err(rawkeep_container::VarintError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let len = rawkeep_container::read_vint(&mut self.input)?;
        let mut body = vec![0u8; len as usize];
        self.input.read_exact(&mut body)?;

        match id {
            ids::TRACK => Ok(Some(Element::Track(parse_track_body(&body)?))),
            ids::BLOCK => Ok(Some(Element::Block(parse_block_body(&body, current_template)?))),
            other => Err(CoherencyError::UnsupportedDocType {
                doctype: format!("<unexpected top-level element 0x{other:X}>"),
            }
            .into()),
        }
    }
}

fn parse_track_body(body: &[u8]) -> Result<Option<TrackTemplate>, RawkeepError> {
    if body.is_empty() {
        return Ok(None);
    }
    let entries = read_entries(body)?;
    Ok(Some(TrackTemplate {
        filename: decode_or_empty(&entries, ids::TRACK_MASK_BASE_FILE_NAME)?,
        before: decode_or_empty(&entries, ids::TRACK_MASK_BASE_BEFORE)?,
        after: decode_or_empty(&entries, ids::TRACK_MASK_BASE_AFTER)?,
        in_data: decode_or_empty(&entries, ids::TRACK_MASK_BASE_IN)?,
    }))
}

fn parse_block_body(body: &[u8], template: &Option<TrackTemplate>) -> Result<FrameRecord, RawkeepError> {
    let entries = read_entries(body)?;

    let empty = TrackTemplate::default();
    let t = template.as_ref().unwrap_or(&empty);

    let filename_bytes = resolve_field(
        &entries,
        ids::BLOCK_FILE_NAME,
        ids::BLOCK_MASK_ADDITION_FILE_NAME,
        &t.filename,
    )?;
    let before = resolve_field(&entries, ids::BLOCK_BEFORE, ids::BLOCK_MASK_ADDITION_BEFORE, &t.before)?;
    let after = resolve_field(&entries, ids::BLOCK_AFTER, ids::BLOCK_MASK_ADDITION_AFTER, &t.after)?;
    let in_data = resolve_field(&entries, ids::BLOCK_IN, ids::BLOCK_MASK_ADDITION_IN, &t.in_data)?;

    let file_size = find(&entries, ids::BLOCK_FILE_SIZE)
        .map(parse_file_size)
        .unwrap_or(FileSize::Concatenated);

    let hash = find(&entries, ids::BLOCK_FILE_MD5)
        .map(|md5_env| {
            let md5_bytes = decode_field(md5_env)?;
            let md5: [u8; 16] = md5_bytes.try_into().map_err(|bad: Vec<u8>| {
                crate::error::UndecodableError::TruncatedChunk {
                    parser: "reversibility",
                    offset: 0,
                    declared: 16,
                    available: bad.len() as u64,
                }
            })?;
            Ok::<_, RawkeepError>(crate::hash::FrameHash {
                md5,
                sha1: find(&entries, ids::BLOCK_FILE_SHA1)
                    .and_then(|b| decode_field(b).ok())
                    .and_then(|v| v.try_into().ok()),
                sha256: find(&entries, ids::BLOCK_FILE_SHA256)
                    .and_then(|b| decode_field(b).ok())
                    .and_then(|v| v.try_into().ok()),
            })
        })
        .transpose()?;

    Ok(FrameRecord {
        filename: String::from_utf8_lossy(&filename_bytes).to_string(),
        before,
        after,
        in_data,
        file_size,
        hash,
        is_attachment: false,
    })
}

fn parse_file_size(body: &[u8]) -> FileSize {
    match body.first() {
        Some(0) => decode_vint(&body[1..])
            .map(|(v, _)| FileSize::Explicit(v))
            .unwrap_or(FileSize::Concatenated),
        _ => FileSize::Concatenated,
    }
}

fn resolve_field(
    entries: &[(u64, Vec<u8>)],
    raw_id: u64,
    addition_id: u64,
    template_field: &[u8],
) -> Result<Vec<u8>, RawkeepError> {
    if let Some(env) = find(entries, addition_id) {
        let addition = decode_field(env)?;
        Ok(apply_mask_addition(template_field, &addition))
    } else if let Some(env) = find(entries, raw_id) {
        Ok(decode_field(env)?)
    } else {
        Ok(Vec::new())
    }
}

fn decode_or_empty(entries: &[(u64, Vec<u8>)], id: u64) -> Result<Vec<u8>, RawkeepError> {
    match find(entries, id) {
        Some(env) => Ok(decode_field(env)?),
        None => Ok(Vec::new()),
    }
}

fn find(entries: &[(u64, Vec<u8>)], id: u64) -> Option<&[u8]> {
    entries.iter().find(|(eid, _)| *eid == id).map(|(_, b)| b.as_slice())
}

fn read_element<R: Read>(input: &mut R) -> Result<(u64, Vec<u8>), RawkeepError> {
    let id = rawkeep_container::read_vint(input)?;
    let len = rawkeep_container::read_vint(input)?;
    let mut body = vec![0u8; len as usize];
    input.read_exact(&mut body)?;
    Ok((id, body))
}

fn read_entries(body: &[u8]) -> Result<Vec<(u64, Vec<u8>)>, RawkeepError> {
    let mut entries = Vec::new();
    let mut pos = 0usize;
    while pos < body.len() {
        let (id, consumed) = decode_vint(&body[pos..])?;
        pos += consumed;
        let (len, consumed) = decode_vint(&body[pos..])?;
        pos += consumed;
        let bytes = body[pos..pos + len as usize].to_vec();
        pos += len as usize;
        entries.push((id, bytes));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reversibility::encoder::ReversibilityEncoder;

    #[test]
    fn rejects_wrong_doctype() {
        let mut buf = Vec::new();
        rawkeep_container::write_element_header(&mut buf, ids::EBML, 0).unwrap();
        assert!(ReversibilityDecoder::new(&buf[..]).is_err());
    }

    #[test]
    fn sequence_with_template_round_trips_through_delta() {
        let mut buf = Vec::new();
        let mut encoder = ReversibilityEncoder::new(&mut buf);
        encoder.write_segment("rawkeep", 1, '/').unwrap();
        let template = TrackTemplate {
            filename: b"f000001.dpx".to_vec(),
            before: b"DPX-HEADER-0001".to_vec(),
            after: Vec::new(),
            in_data: Vec::new(),
        };
        encoder.write_track(Some(&template)).unwrap();

        let frames = [
            FrameRecord {
                filename: "f000001.dpx".to_string(),
                before: b"DPX-HEADER-0001".to_vec(),
                after: Vec::new(),
                in_data: Vec::new(),
                file_size: FileSize::Concatenated,
                hash: None,
                is_attachment: false,
            },
            FrameRecord {
                filename: "f000002.dpx".to_string(),
                before: b"DPX-HEADER-0002".to_vec(),
                after: Vec::new(),
                in_data: Vec::new(),
                file_size: FileSize::Explicit(42),
                hash: None,
                is_attachment: false,
            },
        ];
        for frame in &frames {
            encoder.write_block(frame, Some(&template)).unwrap();
        }

        let mut decoder = ReversibilityDecoder::new(&buf[..]).unwrap();
        decoder.read_segment().unwrap();
        let decoded_template = decoder.read_track().unwrap();
        assert_eq!(decoded_template, Some(template));

        let f1 = decoder.read_block(&decoded_template).unwrap();
        assert_eq!(f1.filename, "f000001.dpx");
        assert_eq!(f1.before, b"DPX-HEADER-0001");
        assert_eq!(f1.file_size, FileSize::Concatenated);

        let f2 = decoder.read_block(&decoded_template).unwrap();
        assert_eq!(f2.filename, "f000002.dpx");
        assert_eq!(f2.before, b"DPX-HEADER-0002");
        assert_eq!(f2.file_size, FileSize::Explicit(42));
    }
}
