//! Error taxonomy: one `thiserror` enum per failure category (§7), plus a
//! top-level enum that wraps all of them for code that needs a single
//! `Result` type. CLI-facing code converts the top-level error into
//! `anyhow::Error` with `.context(...)` at each boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Format-level corruption: the parser understood enough of the format to
/// know the bytes are wrong, not merely unsupported.
#[derive(Debug, Error)]
pub enum UndecodableError {
    #[error("{parser}: buffer overflow reading at offset {offset}")]
    BufferOverflow { parser: &'static str, offset: u64 },

    #[error("{parser}: chunk size {declared} at offset {offset} exceeds container size {container_size}")]
    ChunkSizeOverflow {
        parser: &'static str,
        offset: u64,
        declared: u64,
        container_size: u64,
    },

    #[error("{parser}: chunk at offset {offset} is truncated (declared {declared}, available {available})")]
    TruncatedChunk {
        parser: &'static str,
        offset: u64,
        declared: u64,
        available: u64,
    },

    #[error("{parser}: bad magic at offset {offset}")]
    BadMagic { parser: &'static str, offset: u64 },
}

/// Well-formed input that falls outside what this system can reverse.
#[derive(Debug, Error)]
pub enum UnsupportedError {
    #[error("{parser}: flavor not in the supported table ({detail})")]
    Flavor { parser: &'static str, detail: String },

    #[error("{parser}: compression type {compression_type:?} is not raw PCM")]
    CompressionType {
        parser: &'static str,
        compression_type: String,
    },

    #[error("{parser}: pixel layout not supported ({detail})")]
    PixelLayout { parser: &'static str, detail: String },

    #[error("{parser}: word-padded samples found with padding checking off; re-run with --check-padding ({detail})")]
    PaddingProblem { parser: &'static str, detail: String },
}

/// Cross-stream mismatches discovered after all files have been probed.
#[derive(Debug, Error)]
pub enum CoherencyError {
    #[error("stream durations disagree: {a_name} is {a_seconds:.6}s, {b_name} is {b_seconds:.6}s")]
    DurationMismatch {
        a_name: String,
        a_seconds: f64,
        b_name: String,
        b_seconds: f64,
    },

    #[error("hash list entry for {name} has no matching file")]
    HashWithoutFile { name: String },

    #[error("container declares library ({name}, {version}) outside the supported range")]
    UnsupportedLibraryVersion { name: String, version: u64 },

    #[error("container doctype {doctype:?} is not recognized")]
    UnsupportedDocType { doctype: String },

    #[error("container doctype read version {version} exceeds what this build understands")]
    UnsupportedDocTypeReadVersion { version: u8 },
}

/// Decode-time verification failures.
#[derive(Debug, Error)]
pub enum ReversibilityError {
    #[error("reassembled file {path:?} does not match its recorded hash")]
    HashMismatch { path: PathBuf },

    #[error("reassembled file {path:?} does not match the original bytes on disk")]
    ByteMismatch { path: PathBuf },

    #[error("frame {index} in track {track} arrived out of order (expected {expected})")]
    OutOfOrderFrame {
        track: String,
        index: u64,
        expected: u64,
    },
}

/// Top-level error a driver run returns.
#[derive(Debug, Error)]
pub enum RawkeepError {
    #[error(transparent)]
    Undecodable(#[from] UndecodableError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedError),

    #[error(transparent)]
    Coherency(#[from] CoherencyError),

    #[error(transparent)]
    Reversibility(#[from] ReversibilityError),

    #[error(transparent)]
    Container(#[from] rawkeep_container::VarintError),

    #[error(transparent)]
    Field(#[from] rawkeep_container::FieldError),

    #[error("io error")]
    Io(#[from] std::io::Error),
}
