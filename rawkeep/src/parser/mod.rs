//! Polymorphism over raw-file formats (§4.1, Design Note "polymorphism over
//! parsers"): a tagged variant replaces a virtual-dispatch class hierarchy,
//! and the probe loop is a single data-driven `match`.

pub mod aiff;
pub mod dpx;
pub mod hashlist;
pub mod tiff;
pub mod unknown;
pub mod wav;

use crate::error::{UndecodableError, UnsupportedError};
use crate::flavor::Flavor;

/// A contiguous non-payload byte range interleaved inside the payload at a
/// known offset (§3 `In`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InRange {
    pub offset_in_payload: u64,
    pub bytes: Vec<u8>,
}

/// Everything the driver needs about the media stream a file belongs to.
#[derive(Debug, Clone, Default)]
pub struct StreamInfo {
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    pub frame_rate: Option<f64>,
    pub frame_count: Option<u64>,
    pub pixel_width: Option<u32>,
    pub pixel_height: Option<u32>,
    pub slice_count: Option<u32>,
}

/// The result of successfully parsing one file: the byte ranges the
/// reversibility encoder needs, plus enough stream metadata for the driver's
/// coherency check.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub flavor: Flavor,
    pub before: Vec<u8>,
    /// Offset and length of the payload within the original file.
    pub payload_offset: u64,
    pub payload_len: u64,
    pub in_ranges: Vec<InRange>,
    pub after: Vec<u8>,
    pub stream_info: StreamInfo,
    /// Padding bits were observed where the codec would normalize them away
    /// (§4.1, §8 "Padding problem"); the driver must refuse to proceed
    /// silently when this is set and padding checking wasn't requested.
    pub padding_problem: bool,
    /// Non-fatal notes (e.g. a truncated chunk that was clamped rather than
    /// rejected because `accept_truncated` was set).
    pub warnings: Vec<String>,
}

impl ParsedFile {
    pub fn file_size(&self) -> u64 {
        self.before.len() as u64
            + self.payload_len
            + self.in_ranges.iter().map(|r| r.bytes.len() as u64).sum::<u64>()
            + self.after.len() as u64
    }
}

/// Knobs the driver threads through to every parser (from `RunConfig`'s
/// `Action` bitset, §6).
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// `AcceptTruncated`: clamp a too-short chunk instead of erroring.
    pub accept_truncated: bool,
    /// `CheckPadding`/`QuickCheckPadding`: scan word-padded image samples
    /// for non-zero padding bits the codec would normalize away.
    pub check_padding: bool,
}

/// Outcome of probing one file against one parser variant.
pub enum ParseOutcome {
    /// The magic prefix didn't match; another variant should try.
    NotDetected,
    /// Magic matched, but the flavor/feature set isn't one this system can
    /// reverse. Not suppressive: other unsupported notes may accumulate.
    Unsupported(UnsupportedError),
    /// Magic matched, but the container is corrupt.
    Undecodable(UndecodableError),
    Ok(Box<ParsedFile>),
}

/// A file that parses as no known media format: carried verbatim as an
/// attachment (§4.1 "Unknown").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    Wav,
    Aiff,
    Dpx,
    Tiff,
    HashList,
    Unknown,
}

impl ParserKind {
    /// Probe order (§4.6 phase 2): each variant gets one shot, first
    /// `detected` claims the file.
    pub const PROBE_ORDER: [ParserKind; 6] = [
        ParserKind::Wav,
        ParserKind::Aiff,
        ParserKind::Dpx,
        ParserKind::Tiff,
        ParserKind::HashList,
        ParserKind::Unknown,
    ];

    pub fn is_image(self) -> bool {
        matches!(self, ParserKind::Dpx | ParserKind::Tiff)
    }

    pub fn parser_name(self) -> &'static str {
        match self {
            ParserKind::Wav => "wav",
            ParserKind::Aiff => "aiff",
            ParserKind::Dpx => "dpx",
            ParserKind::Tiff => "tiff",
            ParserKind::HashList => "hashlist",
            ParserKind::Unknown => "unknown",
        }
    }

    /// Probe this variant against `data`. Only meaningful for the media
    /// variants: `HashList` and `Unknown` don't produce a `ParsedFile` (a
    /// hash manifest merges into the global hash table, and an unknown file
    /// is always an attachment), so the driver calls `hashlist::parse` and
    /// `unknown::parse` directly instead of through this entry point.
    pub fn parse(self, data: &[u8], options: ParseOptions) -> ParseOutcome {
        match self {
            ParserKind::Wav => wav::parse(data, options.accept_truncated),
            ParserKind::Aiff => aiff::parse(data, options.accept_truncated),
            ParserKind::Dpx => dpx::parse(data, options),
            ParserKind::Tiff => tiff::parse(data, options),
            ParserKind::HashList | ParserKind::Unknown => ParseOutcome::NotDetected,
        }
    }
}
