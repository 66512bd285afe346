//! XMEML CLI Tool
//!
//! Command-line interface for inspecting and converting XMEML interchange
//! documents.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use xmeml_core::Timeline;
use xmeml_decoder::{Decoder, DecoderConfig};
use xmeml_encoder::{Encoder, EncoderConfig};

#[derive(Parser)]
#[command(name = "xmeml")]
#[command(about = "XMEML - Inspect and convert FCP7-style interchange XML")]
#[command(version)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct DecodeOptions {
    /// Do not insert gaps between items
    #[arg(long)]
    no_gaps: bool,
}

impl DecodeOptions {
    fn config(self) -> DecoderConfig {
        DecoderConfig {
            reconstruct_gaps: !self.no_gaps,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show a summary of a document
    Info {
        /// Input XMEML file path
        input: PathBuf,

        #[command(flatten)]
        decode: DecodeOptions,
    },

    /// Decode a document and encode it again
    Convert {
        /// Input XMEML file path
        input: PathBuf,

        /// Output XMEML file path
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        decode: DecodeOptions,

        /// Frame rate used when the timeline has no clips
        #[arg(long, default_value = "24", value_parser = parse_frame_rate)]
        default_rate: f64,
    },
}

/// Accepts a positive, finite frames-per-second value
fn parse_frame_rate(value: &str) -> std::result::Result<f64, String> {
    let rate: f64 = value
        .parse()
        .map_err(|_| format!("{:?} is not a number", value))?;
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(format!("frame rate must be positive and finite, got {}", value))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Info { input, decode } => {
            let timeline = read_timeline(&input, decode.config())?;
            eprintln!("{}", summary(&timeline)?);
        }

        Commands::Convert {
            input,
            output,
            decode,
            default_rate,
        } => {
            let config = EncoderConfig {
                default_rate,
                ..EncoderConfig::default()
            };
            let timeline = convert(&input, &output, decode.config(), config)?;
            eprintln!("{}", summary(&timeline)?);
            eprintln!("Written to {}", output.display());
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_timeline(input: &Path, config: DecoderConfig) -> Result<Timeline> {
    debug!("Reading {}", input.display());
    let file = File::open(input)
        .with_context(|| format!("Failed to open {}", input.display()))?;

    Decoder::new(config)
        .decode(BufReader::new(file))
        .with_context(|| format!("Failed to decode {}", input.display()))
}

fn convert(
    input: &Path,
    output: &Path,
    decoder: DecoderConfig,
    encoder: EncoderConfig,
) -> Result<Timeline> {
    let timeline = read_timeline(input, decoder)?;

    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    Encoder::new(encoder)
        .encode(&timeline, BufWriter::new(file))
        .context("Failed to encode timeline")?;

    info!("Converted {} to {}", input.display(), output.display());
    Ok(timeline)
}

/// Name, track counts and duration of a timeline
fn summary(timeline: &Timeline) -> Result<String> {
    let duration = timeline
        .duration()
        .context("Failed to compute timeline duration")?;

    Ok(format!(
        "Timeline: {}\n  Video tracks: {}\n  Audio tracks: {}\n  Duration: {:.3}s ({} frames @ {:.3} fps)",
        timeline.name,
        timeline.video_tracks().len(),
        timeline.audio_tracks().len(),
        duration.to_seconds(),
        duration.value.round(),
        duration.rate
    ))
}
