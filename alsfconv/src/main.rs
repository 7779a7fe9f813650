use alsfconv::{EncodeOptions, StreamMetadata};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use libalsf_audio::{AcfMode, EncoderConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "alsfconv")]
#[command(version)]
#[command(about = "Lossless float audio converter for the ALSF container", long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode an audio file to ALSF
    Encode {
        /// Input audio file (wav, flac, mp3, ogg, ...)
        input: PathBuf,
        /// Output ALSF file
        output: PathBuf,
        /// JSON encoder configuration; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,
        /// Samples per channel per frame
        #[arg(long)]
        frame_size: Option<usize>,
        /// Integer resolution in bits (16-24)
        #[arg(long)]
        resolution: Option<u8>,
        /// Disable the common multiplier search
        #[arg(long)]
        no_acf: bool,
        /// Accept multipliers that leave small residuals
        #[arg(long)]
        relaxed_acf: bool,
        /// Frames between random-access points (0 = first frame only)
        #[arg(long)]
        ra_interval: Option<u16>,
        /// Title metadata
        #[arg(long)]
        title: Option<String>,
    },
    /// Decode an ALSF file to 32-bit float WAV
    Decode {
        /// Input ALSF file
        input: PathBuf,
        /// Output WAV file
        output: PathBuf,
    },
    /// Show information about an ALSF file
    Info {
        /// Input ALSF file
        input: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate an ALSF file
    Validate {
        /// Input ALSF file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Encode {
            input,
            output,
            config,
            frame_size,
            resolution,
            no_acf,
            relaxed_acf,
            ra_interval,
            title,
        } => {
            let mut encoder_config = match config {
                Some(path) => alsfconv::load_config(&path)?,
                None => EncoderConfig::default(),
            };
            if let Some(size) = frame_size {
                encoder_config = encoder_config.with_frame_size(size);
            }
            if let Some(bits) = resolution {
                encoder_config = encoder_config.with_int_resolution(bits);
            }
            if no_acf {
                encoder_config = encoder_config.with_acf(false);
            }
            if relaxed_acf {
                encoder_config = encoder_config.with_acf_mode(AcfMode::ResidualAllowed);
            }
            if let Some(frames) = ra_interval {
                encoder_config = encoder_config.with_random_access_interval(frames);
            }
            encode(&input, &output, encoder_config, title)?;
        }
        Commands::Decode { input, output } => {
            decode(&input, &output)?;
        }
        Commands::Info { input, json } => {
            info(&input, json)?;
        }
        Commands::Validate { input } => {
            validate(&input)?;
        }
    }

    Ok(())
}

fn encode(input: &Path, output: &Path, config: EncoderConfig, title: Option<String>) -> Result<()> {
    println!("Reading {}...", input.display());

    let source = alsfconv::audio::read_audio_file(input)?;

    println!("  Sample rate: {} Hz", source.sample_rate);
    println!("  Channels: {}", source.channels);
    println!("  Duration: {:.2}s", source.duration_secs());

    let mut options = EncodeOptions::new(config);
    if let Some(title) = title {
        let meta = StreamMetadata {
            artist: source.tags.artist.clone(),
            comment: source.tags.comment.clone(),
            ..StreamMetadata::with_basic(Some(title), None)
        };
        options = options.with_metadata(meta);
    }

    println!("Encoding to ALSF...");
    let alsf_data = alsfconv::encode_source(&source, options).context("Failed to encode audio")?;

    fs::write(output, &alsf_data).context("Failed to write output file")?;

    let original_size = source.samples.len() * 4;
    let ratio = original_size as f64 / alsf_data.len() as f64;

    println!("Done!");
    println!("  Output: {}", output.display());
    println!("  Size: {} bytes ({:.2}x vs 32-bit float)", alsf_data.len(), ratio);

    Ok(())
}

fn decode(input: &Path, output: &Path) -> Result<()> {
    println!("Reading {}...", input.display());

    let alsf_data = fs::read(input).context("Failed to read ALSF file")?;
    let wav_bytes = alsfconv::decode_to_wav(&alsf_data)?;

    fs::write(output, wav_bytes).context("Failed to write WAV file")?;

    println!("Done!");
    println!("  Output: {}", output.display());

    Ok(())
}

fn info(input: &Path, json: bool) -> Result<()> {
    let alsf_data = fs::read(input).context("Failed to read ALSF file")?;
    let file_info = alsfconv::get_alsf_info(&alsf_data)?;

    if json {
        let text =
            serde_json::to_string_pretty(&file_info).context("Failed to serialize info")?;
        println!("{}", text);
        return Ok(());
    }

    println!("ALSF Audio File");
    println!("───────────────────────────────");
    println!("  Version:     {}", file_info.version);
    println!("  Sample rate: {} Hz", file_info.sample_rate);
    println!("  Channels:    {}", file_info.channels);
    println!("  Int res:     {} bit", file_info.int_resolution);
    println!("  Frame size:  {}", file_info.frame_size);
    println!("  Frames:      {}", file_info.frame_count);
    println!("  Samples:     {}", file_info.total_samples);
    println!("  Duration:    {:.2}s", file_info.duration_secs);
    println!("  File size:   {} bytes", file_info.file_size);
    println!("  Compression: {:.2}x", file_info.compression_ratio);
    println!(
        "  Digest:      {}",
        if file_info.digest_valid { "ok" } else { "MISMATCH" }
    );

    if let Some(meta) = &file_info.metadata {
        println!();
        println!("Metadata");
        println!("───────────────────────────────");
        let fields = [
            ("Title", &meta.title),
            ("Artist", &meta.artist),
            ("Comment", &meta.comment),
            ("Encoder", &meta.encoder),
            ("Settings", &meta.encoder_settings),
            ("Encoded", &meta.encoding_time),
            ("Source", &meta.source_format),
            ("Filename", &meta.original_filename),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                println!("  {:<12} {}", format!("{}:", label), value);
            }
        }
    }

    Ok(())
}

fn validate(input: &Path) -> Result<()> {
    let alsf_data = fs::read(input).context("Failed to read ALSF file")?;

    match alsfconv::validate_alsf(&alsf_data) {
        Ok(()) => {
            println!("✓ {} is a valid ALSF file", input.display());
            Ok(())
        }
        Err(e) => bail!("✗ {} is not a valid ALSF file: {:#}", input.display(), e),
    }
}
