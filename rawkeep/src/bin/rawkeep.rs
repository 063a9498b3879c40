//! CLI front-end (§4.7): argument parsing, logging setup, and mapping the
//! library's `Result` to a process exit code. Holds no reversibility logic
//! itself — everything below `main` calls straight into `rawkeep::driver`,
//! the same split `flac-tracksplit`'s `main.rs`/`lib.rs` use.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use rawkeep::codec::PassthroughCodec;
use rawkeep::config::{Action, RunConfig};
use rawkeep::driver;
use rawkeep::flavor::{AudioFlavor, Endianness, Flavor};
use rawkeep::writer::NeverOverwrite;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Pack one or more raw files, or an image sequence, into a reversibility container.
    Encode {
        /// Input files. A run of numbered siblings (e.g. `scan000001.dpx ..`) is
        /// detected automatically and packed as one stream.
        inputs: Vec<PathBuf>,

        /// Path of the container file to write.
        #[arg(long)]
        output: PathBuf,

        /// Compute MD5 (and, via --frame-md5, keep it per frame) for output verification.
        #[arg(long)]
        hash: bool,

        #[arg(long)]
        frame_md5: bool,

        /// Clamp a truncated chunk to the bytes actually present instead of failing.
        #[arg(long)]
        accept_truncated: bool,

        /// Scan word-padded image samples for non-zero padding bits.
        #[arg(long)]
        check_padding: bool,
    },

    /// Reconstruct original files from a reversibility container.
    ///
    /// No external codec is wired into this binary (§6 "External codec
    /// seam"): frames decode through `PassthroughCodec`, so only the
    /// non-payload structure of each file (Before/After/hashes) round-trips
    /// here. Reconstructing the payload bytes themselves requires pairing
    /// this container with the real FFV1/FLAC decoder that produced it.
    Decode {
        /// Path of the container file to read.
        container: PathBuf,

        /// Directory to write reconstructed files into.
        #[arg(long)]
        output: PathBuf,

        /// Skip the disk re-read verification pass after writing each file.
        #[arg(long)]
        quick: bool,
    },

    /// Reopen a container and verify it without writing anything to disk.
    Check {
        /// Path of the container file to read.
        container: PathBuf,

        #[arg(long)]
        quick: bool,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    match args.command {
        Command::Encode {
            inputs,
            output,
            hash,
            frame_md5,
            accept_truncated,
            check_padding,
        } => encode(inputs, output, hash, frame_md5, accept_truncated, check_padding),
        Command::Decode { container, output, quick } => decode(container, output, quick),
        Command::Check { container, quick } => check(container, quick),
    }
}

fn encode(
    inputs: Vec<PathBuf>,
    output: PathBuf,
    hash: bool,
    frame_md5: bool,
    accept_truncated: bool,
    check_padding: bool,
) -> anyhow::Result<()> {
    let mut action = Action::ENCODE;
    if hash {
        action |= Action::HASH;
    }
    if frame_md5 {
        action |= Action::FRAME_MD5;
    }
    if accept_truncated {
        action |= Action::ACCEPT_TRUNCATED;
    }
    if check_padding {
        action |= Action::CHECK_PADDING;
    }
    let config = RunConfig::new(inputs.clone(), output.clone(), action);

    let plan = driver::build_plan(&inputs, config.parse_options()).with_context(|| "scanning input files")?;
    for warning in &plan.warnings {
        tracing::warn!("{warning}");
    }
    if let Some(mismatch) = driver::check_coherency(&plan.streams) {
        tracing::warn!("{mismatch}");
    }

    let file = std::fs::File::create(&output).with_context(|| format!("creating {}", output.display()))?;
    let mut out = std::io::BufWriter::new(file);
    let mut codec = PassthroughCodec;
    driver::encode_streams(&plan.streams, &config, &mut codec, &mut out)
        .with_context(|| "writing reversibility container")
}

fn decode(container: PathBuf, output: PathBuf, quick: bool) -> anyhow::Result<()> {
    let mut action = Action::DECODE;
    if quick {
        action |= Action::QUICK_CHECK;
    }
    let config = RunConfig::new(vec![container.clone()], output, action);

    let file = std::fs::File::open(&container).with_context(|| format!("opening {}", container.display()))?;
    let reader = std::io::BufReader::new(file);

    driver::run_decode(
        reader,
        |_track_id| placeholder_flavor(),
        |_track_id| PassthroughCodec,
        &config,
        |_track_id| NeverOverwrite,
    )
    .with_context(|| "decoding reversibility container")
}

fn check(container: PathBuf, quick: bool) -> anyhow::Result<()> {
    let mut action = Action::CHECK;
    if quick {
        action |= Action::QUICK_CHECK;
    }
    let config = RunConfig::new(vec![container.clone()], PathBuf::from("."), action);

    let file = std::fs::File::open(&container).with_context(|| format!("opening {}", container.display()))?;
    let reader = std::io::BufReader::new(file);

    driver::run_decode(
        reader,
        |_track_id| placeholder_flavor(),
        |_track_id| PassthroughCodec,
        &config,
        |_track_id| NeverOverwrite,
    )
    .with_context(|| "checking reversibility container")
}

/// `PassthroughCodec` ignores whatever flavor it's handed, so any value
/// works here until an external codec that actually cares is wired in.
fn placeholder_flavor() -> Flavor {
    Flavor::Audio(AudioFlavor {
        sample_rate: 48000,
        sample_size: 16,
        channels: 2,
        endianness: Endianness::Little,
    })
}
