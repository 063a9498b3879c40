//! FrameWriter (§4.5): per-track worker that reassembles the original file
//! bytes from a decoded payload plus its reconstructed non-payload ranges,
//! then either writes it to disk or verifies it in place. Grounded on
//! `flac-tracksplit`'s `Track::write_audio`/`write_metadata` buffer-then-write
//! shape, generalized from "write metadata, then audio" to "concatenate
//! Before/payload/In/After, then write-or-verify".

use std::fs;
use std::path::{Path, PathBuf};

use bitflags::bitflags;

use crate::error::{ReversibilityError, RawkeepError};
use crate::hash::hash_buffer;
use crate::reversibility::FrameRecord;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WriteMode: u8 {
        /// Verify only; never touch disk.
        const NO_WRITE        = 1 << 0;
        /// Skip the disk re-read verification pass.
        const NO_OUTPUT_CHECK = 1 << 1;
        /// This frame is not the first in a streamed batch.
        const IS_NOT_BEGIN    = 1 << 2;
        /// This frame is not the last in a streamed batch.
        const IS_NOT_END      = 1 << 3;
    }
}

/// The user's answer to an overwrite-conflict prompt (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResponse {
    Yes,
    No,
    AlwaysYes,
    AlwaysNo,
}

/// Invoked on an overwrite conflict. Implementations must pause any progress
/// output for the duration of the call (§5 "Suspension points").
pub trait ConflictPrompt {
    fn ask(&mut self, path: &Path) -> ConflictResponse;
}

/// Always answers `No`, used by tests and non-interactive runs that already
/// decided their overwrite policy via `RunConfig::prompt_policy`.
pub struct NeverOverwrite;

impl ConflictPrompt for NeverOverwrite {
    fn ask(&mut self, _path: &Path) -> ConflictResponse {
        ConflictResponse::No
    }
}

/// `Before ++ splice(payload, In) ++ After` (§3, §4.5). None of the parsers
/// in this system ever produce a non-empty `in_ranges` list (WAV/AIFF/DPX/TIFF
/// payload is always one contiguous region), so the reconstructed record's
/// `in_data` is concatenated once, immediately after the payload, rather than
/// interleaved at per-range offsets.
pub fn assemble(record: &FrameRecord, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(
        record.before.len() + payload.len() + record.in_data.len() + record.after.len(),
    );
    out.extend_from_slice(&record.before);
    out.extend_from_slice(payload);
    out.extend_from_slice(&record.in_data);
    out.extend_from_slice(&record.after);
    out
}

pub struct FrameWriter<P: ConflictPrompt> {
    output_dir: PathBuf,
    mode: WriteMode,
    /// Set once a frame in this track lacks a hash: from then on every frame
    /// in the track falls back to the disk re-read path (§4.5 "partial hash
    /// coverage").
    trust_hashes: bool,
    always_yes: bool,
    always_no: bool,
    prompt: P,
}

impl<P: ConflictPrompt> FrameWriter<P> {
    pub fn new(output_dir: PathBuf, mode: WriteMode, prompt: P) -> Self {
        Self {
            output_dir,
            mode,
            trust_hashes: true,
            always_yes: false,
            always_no: false,
            prompt,
        }
    }

    /// Writes (or verifies) one reassembled frame. `frame_index` resolves the
    /// output filename from the stream's template when the record has no
    /// per-frame filename override.
    pub fn write_frame(&mut self, record: &FrameRecord, payload: &[u8]) -> Result<(), RawkeepError> {
        let assembled = assemble(record, payload);
        let path = self.output_dir.join(&record.filename);

        if self.mode.contains(WriteMode::NO_WRITE) {
            return self.verify(&path, record, &assembled);
        }

        if path.exists() && !self.overwrite_allowed(&path)? {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &assembled)?;

        if !self.mode.contains(WriteMode::NO_OUTPUT_CHECK) {
            self.verify(&path, record, &assembled)?;
        }
        Ok(())
    }

    fn overwrite_allowed(&mut self, path: &Path) -> Result<bool, RawkeepError> {
        if self.always_yes {
            return Ok(true);
        }
        if self.always_no {
            return Ok(false);
        }
        match self.prompt.ask(path) {
            ConflictResponse::Yes => Ok(true),
            ConflictResponse::No => Ok(false),
            ConflictResponse::AlwaysYes => {
                self.always_yes = true;
                Ok(true)
            }
            ConflictResponse::AlwaysNo => {
                self.always_no = true;
                Ok(false)
            }
        }
    }

    /// Records that some frame in this track carried no hash: the whole
    /// track must fall back to disk re-read from here on (§4.5).
    pub fn note_missing_hash(&mut self) {
        self.trust_hashes = false;
    }

    fn verify(&self, path: &Path, record: &FrameRecord, assembled: &[u8]) -> Result<(), RawkeepError> {
        if self.trust_hashes {
            if let Some(expected) = &record.hash {
                let actual = hash_buffer(assembled, expected.sha1.is_some(), expected.sha256.is_some());
                if actual.md5 != expected.md5 {
                    return Err(ReversibilityError::HashMismatch { path: path.to_path_buf() }.into());
                }
                return Ok(());
            }
        }
        if self.mode.contains(WriteMode::NO_OUTPUT_CHECK) {
            return Ok(());
        }
        let on_disk = fs::read(path)?;
        if on_disk != assembled {
            return Err(ReversibilityError::ByteMismatch { path: path.to_path_buf() }.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_buffer;
    use crate::reversibility::FileSize;
    use tempfile::tempdir;

    fn record(filename: &str, before: &[u8]) -> FrameRecord {
        FrameRecord {
            filename: filename.to_string(),
            before: before.to_vec(),
            after: Vec::new(),
            in_data: Vec::new(),
            file_size: FileSize::Concatenated,
            hash: None,
            is_attachment: false,
        }
    }

    #[test]
    fn assemble_concatenates_in_order() {
        let mut rec = record("f.wav", b"HDR");
        rec.after = b"TRL".to_vec();
        let out = assemble(&rec, b"PAYLOAD");
        assert_eq!(out, b"HDRPAYLOADTRL");
    }

    #[test]
    fn writes_and_byte_verifies_without_hash() {
        let dir = tempdir().unwrap();
        let mut writer = FrameWriter::new(dir.path().to_path_buf(), WriteMode::empty(), NeverOverwrite);
        let rec = record("out.wav", b"HDR");
        writer.write_frame(&rec, b"PAYLOAD").unwrap();
        let on_disk = fs::read(dir.path().join("out.wav")).unwrap();
        assert_eq!(on_disk, b"HDRPAYLOAD");
    }

    #[test]
    fn no_write_mode_verifies_via_hash_without_touching_disk() {
        let dir = tempdir().unwrap();
        let mut rec = record("out.wav", b"HDR");
        let assembled = assemble(&rec, b"PAYLOAD");
        rec.hash = Some(hash_buffer(&assembled, false, false));

        let mut writer = FrameWriter::new(dir.path().to_path_buf(), WriteMode::NO_WRITE, NeverOverwrite);
        writer.write_frame(&rec, b"PAYLOAD").unwrap();
        assert!(!dir.path().join("out.wav").exists());
    }

    #[test]
    fn existing_file_is_left_alone_when_overwrite_denied() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        fs::write(&path, b"ORIGINAL").unwrap();

        let mut writer = FrameWriter::new(
            dir.path().to_path_buf(),
            WriteMode::NO_OUTPUT_CHECK,
            NeverOverwrite,
        );
        let rec = record("out.wav", b"HDR");
        writer.write_frame(&rec, b"PAYLOAD").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"ORIGINAL");
    }
}
