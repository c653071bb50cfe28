use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use vcompress::codec::CodecRegistry;
use vcompress::config::{
    CompressionConfig, DecoderConfig, EncoderConfig, DEFAULT_ALGORITHM, DEFAULT_CONTAINER_PATH,
    DEFAULT_TEMP_AUDIO_PATH, DEFAULT_TEMP_VIDEO_PATH,
};
use vcompress::media::{FfmpegFrameSink, FfmpegFrameSource};
use vcompress::pipeline::{DecodePipeline, EncodePipeline};

/// Shrink a video into a compact container and rebuild it again:
/// - encode: frames -> downsample codec -> container file
/// - decode: container -> upsample -> H.264 video (+ original audio)
#[derive(Parser, Debug)]
#[command(name = "vcompress")]
#[command(about = "Resolution-reduction video compressor (round trip: encode, then decode)")]
#[command(long_about = "Encodes INPUT into a compact container by downsampling every frame, then \
decodes the container back to OUTPUT by bilinear upsampling. Audio is copied through unless \
--no-audio is given.")]
struct Args {
    /// Input video
    #[arg(required_unless_present = "list", help = "Video to compress")]
    input: Option<PathBuf>,

    /// Output video
    #[arg(required_unless_present = "list", help = "Where to write the reconstructed video")]
    output: Option<PathBuf>,

    /// Codec name
    #[arg(short, long, default_value = DEFAULT_ALGORITHM,
          help = "Codec to use (see --list)")]
    algorithm: String,

    /// Quality 1-100
    #[arg(short, long, default_value_t = 20, allow_negative_numbers = true,
          help = "1-49: quarter resolution, 50-99: third, 100: half (clamped to 1..=100)")]
    quality: i64,

    /// Key frame interval
    #[arg(short = 'k', long, default_value_t = 30,
          help = "Tag every Nth frame as a key frame")]
    key_interval: u32,

    /// Container path
    #[arg(long, default_value = DEFAULT_CONTAINER_PATH,
          help = "Intermediate compressed container file")]
    container: PathBuf,

    /// Drop audio
    #[arg(long, help = "Do not copy the audio track into the output")]
    no_audio: bool,

    /// Keep temp files
    #[arg(long, help = "Keep the container and extracted audio after decoding")]
    keep_temp: bool,

    /// List codecs
    #[arg(short, long, help = "List available codecs and exit")]
    list: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vcompress=info".parse()?)
                .add_directive("vc_resample=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let registry = CodecRegistry::with_builtin_codecs();

    if args.list {
        println!("Available codecs:");
        for name in registry.list() {
            println!("  {name}");
        }
        return Ok(());
    }

    if !registry.available(&args.algorithm) {
        bail!(
            "unknown algorithm '{}'. Available codecs: {}",
            args.algorithm,
            registry.list().join(", ")
        );
    }

    let (Some(input), Some(output)) = (args.input, args.output) else {
        bail!("both INPUT and OUTPUT are required");
    };
    let quality = args.quality.clamp(1, 100) as u32;
    let compression = CompressionConfig::new(quality, args.key_interval);
    let keep_audio = !args.no_audio;

    let encoder_config = EncoderConfig::new(&input, &args.container, &args.algorithm, compression)
        .with_audio(keep_audio, DEFAULT_TEMP_AUDIO_PATH);
    let decoder_config = DecoderConfig::new(&args.container, &output, &args.algorithm, compression)
        .with_audio(keep_audio, DEFAULT_TEMP_AUDIO_PATH)
        .with_temp_video(DEFAULT_TEMP_VIDEO_PATH)
        .keep_temp_files(args.keep_temp);

    println!("Compressing {} with {} (quality {quality})", input.display(), args.algorithm);
    let mut encoder = EncodePipeline::new();
    encoder
        .configure(&registry, encoder_config)
        .context("failed to configure encoder")?;
    encoder
        .run(&mut FfmpegFrameSource::new())
        .with_context(|| format!("failed to encode {}", input.display()))?;
    println!("{}\n", encoder.report());

    println!("Decompressing {} into {}", args.container.display(), output.display());
    let mut decoder = DecodePipeline::new();
    decoder
        .configure(&registry, decoder_config)
        .context("failed to configure decoder")?;
    decoder
        .run(&mut FfmpegFrameSink::new())
        .with_context(|| format!("failed to decode {}", args.container.display()))?;
    println!("{}", decoder.report());

    println!("\nSaved {}", output.display());
    Ok(())
}
