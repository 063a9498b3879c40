//! TLV emission (§4.3), grounded on the container element IDs and the
//! raw-or-zlib field envelope in `rawkeep-container`. Segment/Track/Block
//! are all top-level elements (no nesting between them), so each is built
//! into an in-memory body buffer and written with one header, the same
//! buffer-then-write shape the teacher uses for a FLAC STREAM block.

use std::io::{self, Write};

use rawkeep_container::{ids, write_element_header, write_field_element};

use super::{mask_addition, FrameRecord, TrackTemplate};
use crate::error::RawkeepError;

pub struct ReversibilityEncoder<W: Write> {
    out: W,
    preamble_written: bool,
}

impl<W: Write> ReversibilityEncoder<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            preamble_written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn ensure_preamble(&mut self) -> io::Result<()> {
        if self.preamble_written {
            return Ok(());
        }
        let mut body = Vec::new();
        write_field_element(&mut body, ids::EBML_DOCTYPE, ids::DOC_TYPE.as_bytes())?;
        write_field_element(&mut body, ids::EBML_DOCTYPE_VERSION, &[ids::DOC_TYPE_VERSION])?;
        write_field_element(
            &mut body,
            ids::EBML_DOCTYPE_READ_VERSION,
            &[ids::DOC_TYPE_READ_VERSION],
        )?;
        write_element_header(&mut self.out, ids::EBML, body.len() as u64)?;
        self.out.write_all(&body)?;
        self.preamble_written = true;
        Ok(())
    }

    pub fn write_segment(
        &mut self,
        library_name: &str,
        library_version: u64,
        path_separator: char,
    ) -> Result<(), RawkeepError> {
        self.ensure_preamble()?;
        let mut body = Vec::new();
        write_field_element(&mut body, ids::SEGMENT_LIBRARY_NAME, library_name.as_bytes())?;
        write_vint_field(&mut body, ids::SEGMENT_LIBRARY_VERSION, library_version)?;
        let mut sep = [0u8; 4];
        let sep_str = path_separator.encode_utf8(&mut sep);
        write_field_element(&mut body, ids::SEGMENT_PATH_SEPARATOR, sep_str.as_bytes())?;
        write_element_header(&mut self.out, ids::SEGMENT, body.len() as u64)?;
        self.out.write_all(&body)?;
        Ok(())
    }

    /// `None` for a `Unique` stream: no template is ever written, and every
    /// block in that track encodes its fields raw.
    pub fn write_track(&mut self, template: Option<&TrackTemplate>) -> Result<(), RawkeepError> {
        self.ensure_preamble()?;
        let mut body = Vec::new();
        if let Some(t) = template {
            write_field_element(&mut body, ids::TRACK_MASK_BASE_FILE_NAME, &t.filename)?;
            write_field_element(&mut body, ids::TRACK_MASK_BASE_BEFORE, &t.before)?;
            write_field_element(&mut body, ids::TRACK_MASK_BASE_AFTER, &t.after)?;
            write_field_element(&mut body, ids::TRACK_MASK_BASE_IN, &t.in_data)?;
        }
        write_element_header(&mut self.out, ids::TRACK, body.len() as u64)?;
        self.out.write_all(&body)?;
        Ok(())
    }

    pub fn write_block(
        &mut self,
        frame: &FrameRecord,
        template: Option<&TrackTemplate>,
    ) -> Result<(), RawkeepError> {
        self.ensure_preamble()?;
        let mut body = Vec::new();

        match template {
            Some(t) => {
                write_field_element(
                    &mut body,
                    ids::BLOCK_MASK_ADDITION_FILE_NAME,
                    &mask_addition(&t.filename, frame.filename.as_bytes()),
                )?;
                write_field_element(
                    &mut body,
                    ids::BLOCK_MASK_ADDITION_BEFORE,
                    &mask_addition(&t.before, &frame.before),
                )?;
                write_field_element(
                    &mut body,
                    ids::BLOCK_MASK_ADDITION_AFTER,
                    &mask_addition(&t.after, &frame.after),
                )?;
                write_field_element(
                    &mut body,
                    ids::BLOCK_MASK_ADDITION_IN,
                    &mask_addition(&t.in_data, &frame.in_data),
                )?;
            }
            None => {
                write_field_element(&mut body, ids::BLOCK_FILE_NAME, frame.filename.as_bytes())?;
                write_field_element(&mut body, ids::BLOCK_BEFORE, &frame.before)?;
                write_field_element(&mut body, ids::BLOCK_AFTER, &frame.after)?;
                write_field_element(&mut body, ids::BLOCK_IN, &frame.in_data)?;
            }
        }

        write_file_size(&mut body, frame.file_size)?;

        if let Some(hash) = &frame.hash {
            write_field_element(&mut body, ids::BLOCK_FILE_MD5, &hash.md5)?;
            if let Some(sha1) = hash.sha1 {
                write_field_element(&mut body, ids::BLOCK_FILE_SHA1, &sha1)?;
            }
            if let Some(sha256) = hash.sha256 {
                write_field_element(&mut body, ids::BLOCK_FILE_SHA256, &sha256)?;
            }
        }

        write_element_header(&mut self.out, ids::BLOCK, body.len() as u64)?;
        self.out.write_all(&body)?;
        Ok(())
    }
}

fn write_vint_field<W: Write>(out: &mut W, id: u64, value: u64) -> io::Result<()> {
    let body = rawkeep_container::encode_vint(value);
    write_element_header(out, id, body.len() as u64)?;
    out.write_all(&body)
}

/// `FileSize` is not a compressible byte field: a leading tag byte picks
/// between an explicit vint value and the "use concatenation length"
/// sentinel, so the wire form stays unambiguous without overloading a
/// magic integer (Open Question (a)).
fn write_file_size<W: Write>(out: &mut W, file_size: super::FileSize) -> io::Result<()> {
    let mut body = Vec::new();
    match file_size {
        super::FileSize::Explicit(n) => {
            body.push(0);
            body.extend(rawkeep_container::encode_vint(n));
        }
        super::FileSize::Concatenated => body.push(1),
    }
    write_element_header(out, ids::BLOCK_FILE_SIZE, body.len() as u64)?;
    out.write_all(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reversibility::decoder::ReversibilityDecoder;

    #[test]
    fn unique_stream_round_trips_without_template() {
        let mut buf = Vec::new();
        let mut encoder = ReversibilityEncoder::new(&mut buf);
        encoder.write_segment("rawkeep", 1, '/').unwrap();
        encoder.write_track(None).unwrap();
        let frame = FrameRecord {
            filename: "audio.wav".to_string(),
            before: b"RIFF....WAVEfmt ".to_vec(),
            after: Vec::new(),
            in_data: Vec::new(),
            file_size: super::super::FileSize::Explicit(1234),
            hash: None,
            is_attachment: false,
        };
        encoder.write_block(&frame, None).unwrap();

        let mut decoder = ReversibilityDecoder::new(&buf[..]).unwrap();
        let track = decoder.read_track().unwrap();
        let decoded = decoder.read_block(&track).unwrap();
        assert_eq!(decoded.filename, frame.filename);
        assert_eq!(decoded.before, frame.before);
    }
}
