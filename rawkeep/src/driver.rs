//! Driver (§4.6, §5, §9): orchestrates one full encode or decode run.
//! Per-file probing/parsing is grounded on `flac-tracksplit/src/main.rs`'s
//! `args.paths.into_par_iter().try_for_each(...)`; the decoder's per-track
//! ordered writer is message-passing over a `crossbeam-channel` bounded
//! queue, one writer task per track, matching the teacher's separation of
//! "compute the updated bytes" (`OffsetFrame::process`) from "write them"
//! (`Track::write_audio`).

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use more_asserts as ma;
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::codec::{PayloadDecoder, PayloadEncoder};
use crate::config::{Action, RunConfig};
use crate::error::{CoherencyError, RawkeepError};
use crate::flavor::Flavor;
use crate::hash::hash_buffer;
use crate::parser::{ParseOutcome, ParsedFile, ParserKind};
use crate::reversibility::{decoder::ReversibilityDecoder, encoder::ReversibilityEncoder, FileSize, FrameRecord, TrackTemplate};
use crate::sequence::{detect_sequence, natural_sort};
use crate::writer::{ConflictPrompt, FrameWriter, WriteMode};

/// Depth of the per-track bounded channel between the decode worker and the
/// writer task (§5 "Suspension points" — bounded so a slow writer applies
/// backpressure to the decode pool instead of unbounded memory growth).
const TRACK_CHANNEL_DEPTH: usize = 8;

/// One logical media track, ready to feed to the external codec and the
/// reversibility encoder (§4.6 phase 3 "build output plan").
pub struct Stream {
    pub flavor: Flavor,
    pub unique: bool,
    pub template_filename: Option<String>,
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub frames: Vec<(PathBuf, ParsedFile)>,
    pub frame_rate: Option<f64>,
}

impl Stream {
    fn duration_seconds(&self) -> Option<f64> {
        let rate = self.frame_rate.or_else(|| {
            self.frames
                .first()
                .and_then(|(_, p)| p.stream_info.sample_rate)
                .map(|r| r as f64)
        })?;
        if rate <= 0.0 {
            return None;
        }
        Some(self.frames.len() as f64 / rate)
    }
}

/// A file that matched no known media format (§4.1 "Unknown").
pub struct BuiltAttachment {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

pub struct BuildPlan {
    pub streams: Vec<Stream>,
    pub attachments: Vec<BuiltAttachment>,
    pub hash_table: HashMap<String, String>,
    pub warnings: Vec<String>,
}

/// §4.6 phase 1: enumerate and naturally sort inputs.
pub fn enumerate_and_sort(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut names: Vec<String> = inputs
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    natural_sort(&mut names);
    names.into_iter().map(PathBuf::from).collect()
}

/// §4.6 phase 2: probe one file against every variant in `ParserKind::PROBE_ORDER`.
/// Returns the claiming variant and its outcome, or `None` if every media
/// variant declined (the caller then falls through to HashList/Unknown).
#[instrument(skip(data), fields(path = %path.display()))]
fn probe_media(path: &Path, data: &[u8], options: crate::parser::ParseOptions) -> Option<(ParserKind, ParseOutcome)> {
    for kind in ParserKind::PROBE_ORDER {
        if matches!(kind, ParserKind::HashList | ParserKind::Unknown) {
            continue;
        }
        match kind.parse(data, options) {
            ParseOutcome::NotDetected => continue,
            outcome => {
                debug!(parser = kind.parser_name(), "claimed file");
                return Some((kind, outcome));
            }
        }
    }
    None
}

/// §4.6 phases 2-3: probe every input, group image sequences via
/// `SequenceDetector`, and classify the rest as single-file streams,
/// hash-manifest entries, or attachments.
#[instrument(skip(inputs, options))]
pub fn build_plan(inputs: &[PathBuf], options: crate::parser::ParseOptions) -> Result<BuildPlan, RawkeepError> {
    let sorted = enumerate_and_sort(inputs);
    let mut sibling_names: Vec<String> = sorted
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    natural_sort(&mut sibling_names);

    let mut claimed: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut streams = Vec::new();
    let mut attachments = Vec::new();
    let mut hash_table = HashMap::new();
    let mut warnings = Vec::new();

    for path in &sorted {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if claimed.contains(&name) {
            continue;
        }
        let data = std::fs::read(path)?;

        if let Some((kind, outcome)) = probe_media(path, &data, options) {
            match outcome {
                ParseOutcome::Ok(parsed) => {
                    warnings.extend(parsed.warnings.iter().cloned());
                    if parsed.padding_problem {
                        warnings.push(format!(
                            "{}: non-zero padding bits found; re-run with --check to confirm before trusting this stream",
                            path.display()
                        ));
                    }
                    if kind.is_image() {
                        if let Some(seq) = detect_sequence(&name, &sibling_names) {
                            for file in &seq.files {
                                claimed.insert(file.clone());
                            }
                            let mut frames = Vec::new();
                            for file in &seq.files {
                                let fpath = path.with_file_name(file);
                                let fdata = std::fs::read(&fpath)?;
                                if let ParseOutcome::Ok(fp) = kind.parse(&fdata, options) {
                                    if fp.padding_problem {
                                        warnings.push(format!(
                                            "{}: non-zero padding bits found; re-run with --check to confirm before trusting this stream",
                                            fpath.display()
                                        ));
                                    }
                                    frames.push((fpath, *fp));
                                }
                            }
                            streams.push(Stream {
                                flavor: parsed.flavor.clone(),
                                unique: false,
                                template_filename: Some(seq.template),
                                start: Some(seq.start),
                                end: Some(seq.end),
                                frames,
                                frame_rate: None,
                            });
                            continue;
                        }
                    }
                    claimed.insert(name.clone());
                    streams.push(Stream {
                        flavor: parsed.flavor.clone(),
                        unique: true,
                        template_filename: None,
                        start: None,
                        end: None,
                        frames: vec![(path.clone(), *parsed)],
                        frame_rate: None,
                    });
                }
                ParseOutcome::Unsupported(e) => {
                    warnings.push(format!("{}: {e}", path.display()));
                }
                ParseOutcome::Undecodable(e) => {
                    warnings.push(format!("{}: {e}", path.display()));
                }
                ParseOutcome::NotDetected => unreachable!(),
            }
            continue;
        }

        if let Some(entries) = crate::parser::hashlist::parse(&data) {
            hash_table.extend(entries);
            claimed.insert(name.clone());
            continue;
        }

        let attachment = crate::parser::unknown::parse(&data);
        claimed.insert(name.clone());
        attachments.push(BuiltAttachment {
            path: path.clone(),
            bytes: attachment.bytes,
        });
    }

    Ok(BuildPlan {
        streams,
        attachments,
        hash_table,
        warnings,
    })
}

/// §4.6 phase 4: all reported durations must agree within a small epsilon.
const COHERENCY_EPSILON_SECONDS: f64 = 0.05;

pub fn check_coherency(streams: &[Stream]) -> Option<CoherencyError> {
    let mut durations = streams.iter().filter_map(|s| s.duration_seconds());
    let first = durations.next()?;
    for other in durations {
        if (other - first).abs() > COHERENCY_EPSILON_SECONDS {
            return Some(CoherencyError::DurationMismatch {
                a_name: "stream 0".to_string(),
                a_seconds: first,
                b_name: "stream n".to_string(),
                b_seconds: other,
            });
        }
    }
    None
}

/// §4.6 phase 5: hand each stream's payload to the codec and feed metadata to
/// the reversibility encoder.
#[instrument(skip(streams, codec, out))]
pub fn encode_streams<C: PayloadEncoder, W: Write>(
    streams: &[Stream],
    config: &RunConfig,
    codec: &mut C,
    out: &mut W,
) -> Result<(), RawkeepError> {
    let mut encoder = ReversibilityEncoder::new(out);
    encoder.write_segment("rawkeep", 1, std::path::MAIN_SEPARATOR)?;

    for stream in streams {
        codec.begin_stream(&stream.flavor)?;

        let template = if stream.unique {
            None
        } else {
            stream.frames.first().map(|(path, parsed)| TrackTemplate {
                filename: path.file_name().unwrap().to_string_lossy().into_owned().into_bytes(),
                before: parsed.before.clone(),
                after: parsed.after.clone(),
                in_data: Vec::new(),
            })
        };
        encoder.write_track(template.as_ref())?;

        for (path, parsed) in &stream.frames {
            let payload = std::fs::read(path)?[parsed.payload_offset as usize
                ..(parsed.payload_offset + parsed.payload_len) as usize]
                .to_vec();
            let _encoded = codec.encode_frame(&payload)?;

            let hash = config
                .action
                .contains(Action::FRAME_MD5)
                .then(|| hash_buffer(&payload, false, false));

            let record = FrameRecord {
                filename: path.file_name().unwrap().to_string_lossy().into_owned(),
                before: parsed.before.clone(),
                after: parsed.after.clone(),
                in_data: Vec::new(),
                file_size: FileSize::Explicit(parsed.file_size()),
                hash,
                is_attachment: false,
            };
            encoder.write_block(&record, template.as_ref())?;
        }
        codec.finish_stream()?;
    }
    Ok(())
}

/// One frame's codec-compressed payload, paired with its reversibility
/// record, ready for the decode worker pool.
pub struct FrameInput {
    pub record: FrameRecord,
    pub encoded_payload: Vec<u8>,
}

/// §5 "Implementation note": frame records and their codec-compressed
/// payload arrive already paired (one record from [`read_container`], one
/// payload from the external demuxer, out of scope here). Each is posted
/// onto a bounded per-track channel by a rayon worker as soon as it's ready;
/// exactly one writer task drains the channel, reordering out-of-arrival
/// frames into strict frame order before handing each to `codec` and
/// `writer`. `codec.decode_frame` itself runs on the writer task, since a
/// generic `PayloadDecoder` isn't assumed safe to drive from multiple
/// threads at once — the channel's job is keeping cross-track work
/// unblocked while this track's frames still arrive in order.
#[instrument(skip(frames, codec, writer))]
pub fn decode_track<D: PayloadDecoder, P: ConflictPrompt>(
    flavor: &Flavor,
    frames: Vec<FrameInput>,
    mut codec: D,
    mut writer: FrameWriter<P>,
) -> Result<(), RawkeepError> {
    codec.begin_stream(flavor)?;

    let (tx, rx) = crossbeam_channel::bounded::<(usize, FrameRecord, Vec<u8>)>(TRACK_CHANNEL_DEPTH);

    frames
        .into_iter()
        .enumerate()
        .collect::<Vec<_>>()
        .into_par_iter()
        .for_each_with(tx.clone(), |tx, (index, input)| {
            tx.send((index, input.record, input.encoded_payload)).ok();
        });
    drop(tx);

    let mut pending: HashMap<usize, (FrameRecord, Vec<u8>)> = HashMap::new();
    let mut next_index = 0usize;
    for (index, record, encoded) in rx.iter() {
        pending.insert(index, (record, encoded));
        while let Some((record, encoded)) = pending.remove(&next_index) {
            let payload = codec.decode_frame(&encoded)?;
            writer.write_frame(&record, &payload)?;
            next_index += 1;
        }
    }
    ma::assert_le!(pending.len(), 0, "frames never reached the writer in order");

    codec.finish_stream()
}

/// §4.4: parse the whole container into per-track reversibility records, in
/// file order. This walk is inherently sequential (each Block's mask
/// addition depends on its Track's template, and element boundaries must be
/// read one at a time), so it runs on one thread; the CPU-bound per-frame
/// decode work happens afterward in [`decode_track`] once records are
/// paired with their codec-compressed payload.
pub fn read_container<R: Read>(input: R) -> Result<Vec<(Option<TrackTemplate>, Vec<FrameRecord>)>, RawkeepError> {
    use crate::reversibility::decoder::Element;

    let mut decoder = ReversibilityDecoder::new(input)?;
    decoder.read_segment()?;

    let mut tracks: Vec<(Option<TrackTemplate>, Vec<FrameRecord>)> = Vec::new();
    let mut current_template: Option<TrackTemplate> = None;
    let mut current_frames = Vec::new();
    let mut have_track = false;

    while let Some(element) = decoder.next_element(&current_template)? {
        match element {
            Element::Track(template) => {
                if have_track {
                    tracks.push((current_template.take(), std::mem::take(&mut current_frames)));
                }
                current_template = template;
                have_track = true;
            }
            Element::Block(record) => current_frames.push(record),
        }
    }
    if have_track {
        tracks.push((current_template, current_frames));
    }
    Ok(tracks)
}

/// Translates `RunConfig`'s `Action` bitset into `FrameWriter`'s mode bitset
/// (§4.7: the Driver reads config, `FrameWriter` never does).
pub fn write_mode_for(config: &RunConfig) -> WriteMode {
    let mut mode = WriteMode::empty();
    if config.action.intersects(Action::CHECK | Action::QUICK_CHECK) {
        mode |= WriteMode::NO_WRITE;
    }
    if config.action.contains(Action::QUICK_CHECK) {
        mode |= WriteMode::NO_OUTPUT_CHECK;
    }
    mode
}

/// §4.6 end-to-end decode: reads every track out of `container` and drives
/// each through [`decode_track`]. The external demuxer that pairs each
/// record with its codec-compressed payload is out of scope (§1); this
/// entry point is for callers (tests, or a future demuxer integration) that
/// can supply payload bytes via `codec_for_track`'s `decode_frame`, or have
/// none to supply because the stream carries no real media (metadata-only
/// round trips).
pub fn run_decode<R, D, DF, P, PF>(
    container: R,
    flavor_for_track: impl Fn(usize) -> Flavor,
    mut codec_for_track: DF,
    config: &RunConfig,
    mut prompt_for_track: PF,
) -> Result<(), RawkeepError>
where
    R: Read,
    D: PayloadDecoder,
    DF: FnMut(usize) -> D,
    P: ConflictPrompt,
    PF: FnMut(usize) -> P,
{
    let tracks = read_container(container)?;
    let mode = write_mode_for(config);

    for (track_id, (_template, records)) in tracks.into_iter().enumerate() {
        let flavor = flavor_for_track(track_id);
        let codec = codec_for_track(track_id);
        let prompt = prompt_for_track(track_id);
        let writer = FrameWriter::new(config.output.clone(), mode, prompt);

        let frames = records
            .into_iter()
            .map(|record| FrameInput {
                record,
                encoded_payload: Vec::new(),
            })
            .collect();
        decode_track(&flavor, frames, codec, writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::identity::IdentityCodec;
    use crate::flavor::{AudioFlavor, Endianness, ImageColorLayout, ImageFlavor};
    use crate::parser::StreamInfo;
    use crate::writer::NeverOverwrite;
    use tempfile::tempdir;

    fn build_wav(sample_rate: u32, bits: u16, channels: u16, payload: &[u8]) -> Vec<u8> {
        let mut fmt_body = Vec::new();
        fmt_body.extend_from_slice(&1u16.to_le_bytes());
        fmt_body.extend_from_slice(&channels.to_le_bytes());
        fmt_body.extend_from_slice(&sample_rate.to_le_bytes());
        let byte_rate = sample_rate * channels as u32 * (bits as u32 / 8);
        fmt_body.extend_from_slice(&byte_rate.to_le_bytes());
        fmt_body.extend_from_slice(&(channels * (bits / 8)).to_le_bytes());
        fmt_body.extend_from_slice(&bits.to_le_bytes());

        let mut body = Vec::new();
        body.extend_from_slice(b"WAVE");
        body.extend_from_slice(b"fmt ");
        body.extend_from_slice(&(fmt_body.len() as u32).to_le_bytes());
        body.extend_from_slice(&fmt_body);
        body.extend_from_slice(b"data");
        body.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        body.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            body.push(0);
        }

        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    const DPX_FIRST_ELEMENT_OFFSET: u32 = 768;

    fn build_dpx(pixel_width: u32, pixel_height: u32, payload: &[u8]) -> Vec<u8> {
        let offset_to_image = DPX_FIRST_ELEMENT_OFFSET + 72;
        let mut out = vec![0u8; offset_to_image as usize];
        out[0..4].copy_from_slice(b"SDPX");
        out[4..8].copy_from_slice(&offset_to_image.to_be_bytes());
        out[772..776].copy_from_slice(&pixel_width.to_be_bytes());
        out[776..780].copy_from_slice(&pixel_height.to_be_bytes());
        let elem = DPX_FIRST_ELEMENT_OFFSET as usize;
        out[elem + 20] = 50; // RGB descriptor
        out[elem + 23] = 8; // bit size
        out[elem + 24..elem + 26].copy_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn enumerate_and_sort_orders_numerically_not_lexically() {
        let inputs = vec![
            PathBuf::from("a2.dpx"),
            PathBuf::from("a10.dpx"),
            PathBuf::from("a1.dpx"),
        ];
        let sorted = enumerate_and_sort(&inputs);
        assert_eq!(
            sorted,
            vec![
                PathBuf::from("a1.dpx"),
                PathBuf::from("a2.dpx"),
                PathBuf::from("a10.dpx"),
            ]
        );
    }

    #[test]
    fn build_plan_groups_a_dpx_sequence_and_keeps_a_note_as_an_attachment() {
        let dir = tempdir().unwrap();
        let mut inputs = Vec::new();
        for n in 1..=5u32 {
            let name = format!("scan{n:06}.dpx");
            let path = dir.path().join(&name);
            std::fs::write(&path, build_dpx(64, 64, &[0xAAu8; 64 * 64 * 3])).unwrap();
            inputs.push(path);
        }
        let notes_path = dir.path().join("notes.txt");
        std::fs::write(&notes_path, b"shoot log").unwrap();
        inputs.push(notes_path);

        let plan = build_plan(&inputs, crate::parser::ParseOptions::default()).unwrap();

        assert_eq!(plan.streams.len(), 1);
        let stream = &plan.streams[0];
        assert!(!stream.unique);
        assert_eq!(stream.template_filename.as_deref(), Some("scan%06d.dpx"));
        assert_eq!(stream.start, Some(1));
        assert_eq!(stream.end, Some(5));
        assert_eq!(stream.frames.len(), 5);

        assert_eq!(plan.attachments.len(), 1);
        assert_eq!(plan.attachments[0].path, dir.path().join("notes.txt"));
    }

    fn dummy_audio_frame(sample_rate: u32) -> (PathBuf, ParsedFile) {
        (
            PathBuf::from("dummy.wav"),
            ParsedFile {
                flavor: Flavor::Audio(AudioFlavor {
                    sample_rate,
                    sample_size: 16,
                    channels: 2,
                    endianness: Endianness::Little,
                }),
                before: Vec::new(),
                payload_offset: 0,
                payload_len: 0,
                in_ranges: Vec::new(),
                after: Vec::new(),
                stream_info: StreamInfo {
                    sample_rate: Some(sample_rate),
                    ..Default::default()
                },
                padding_problem: false,
                warnings: Vec::new(),
            },
        )
    }

    fn audio_stream(sample_rate: u32, frame_count: usize) -> Stream {
        Stream {
            flavor: Flavor::Audio(AudioFlavor {
                sample_rate,
                sample_size: 16,
                channels: 2,
                endianness: Endianness::Little,
            }),
            unique: true,
            template_filename: None,
            start: None,
            end: None,
            frames: (0..frame_count).map(|_| dummy_audio_frame(sample_rate)).collect(),
            frame_rate: None,
        }
    }

    #[test]
    fn check_coherency_accepts_matching_durations() {
        let streams = vec![audio_stream(100, 100), audio_stream(100, 100)];
        assert!(check_coherency(&streams).is_none());
    }

    #[test]
    fn check_coherency_flags_a_stream_that_runs_short() {
        let streams = vec![audio_stream(100, 100), audio_stream(100, 50)];
        match check_coherency(&streams) {
            Some(CoherencyError::DurationMismatch { a_seconds, b_seconds, .. }) => {
                assert!((a_seconds - 1.0).abs() < 1e-9);
                assert!((b_seconds - 0.5).abs() < 1e-9);
            }
            other => panic!("expected a DurationMismatch, got {other:?}"),
        }
    }

    #[test]
    fn image_flavor_duration_uses_the_stream_frame_rate() {
        // Image streams carry no `sample_rate`, so duration must come from
        // `frame_rate` rather than the per-frame stream info.
        let stream = Stream {
            flavor: Flavor::Image(ImageFlavor {
                bit_depth: 8,
                colorspace: ImageColorLayout::Rgb,
                word_padded: false,
            }),
            unique: false,
            template_filename: Some("f%06d.dpx".to_string()),
            start: Some(1),
            end: Some(48),
            frames: vec![dummy_audio_frame(0)],
            frame_rate: Some(24.0),
        };
        assert_eq!(stream.duration_seconds(), Some(1.0 / 24.0));

        let no_rate = Stream {
            frame_rate: None,
            frames: Vec::new(),
            ..stream
        };
        assert!(no_rate.duration_seconds().is_none());
    }

    #[test]
    fn encode_then_decode_round_trips_a_single_wav_byte_for_byte() {
        let input_dir = tempdir().unwrap();
        let output_dir = tempdir().unwrap();
        let payload = (0u8..=255).cycle().take(4000).collect::<Vec<u8>>();
        let original = build_wav(48000, 16, 2, &payload);
        let input_path = input_dir.path().join("in.wav");
        std::fs::write(&input_path, &original).unwrap();

        let parsed = match crate::parser::wav::parse(&original, false) {
            ParseOutcome::Ok(p) => *p,
            _ => panic!("expected a parsed WAV, got a different outcome"),
        };
        let flavor = parsed.flavor.clone();
        let stream = Stream {
            flavor: flavor.clone(),
            unique: true,
            template_filename: None,
            start: None,
            end: None,
            frames: vec![(input_path.clone(), parsed)],
            frame_rate: None,
        };

        let config = RunConfig::new(vec![input_path.clone()], output_dir.path().to_path_buf(), Action::ENCODE | Action::FRAME_MD5);
        let mut container = Vec::new();
        let mut encoder_codec = IdentityCodec;
        encode_streams(&[stream], &config, &mut encoder_codec, &mut container).unwrap();

        let mut tracks = read_container(&container[..]).unwrap();
        assert_eq!(tracks.len(), 1);
        let (_, mut records) = tracks.remove(0);
        assert_eq!(records.len(), 1);
        let record = records.remove(0);

        let frame_input = FrameInput {
            record,
            encoded_payload: payload.clone(),
        };
        let writer = FrameWriter::new(output_dir.path().to_path_buf(), WriteMode::empty(), NeverOverwrite);
        decode_track(&flavor, vec![frame_input], IdentityCodec, writer).unwrap();

        let roundtripped = std::fs::read(output_dir.path().join("in.wav")).unwrap();
        assert_eq!(roundtripped, original);
    }
}
