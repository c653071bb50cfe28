//! Codec throughput benchmark
//!
//! Compresses and decompresses synthetic frames with every registered codec and
//! reports per-frame timings, compression ratio and reconstruction error.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::Parser;
use vcompress::codec::CodecRegistry;
use vcompress::config::CompressionConfig;
use vcompress::frame::Frame;

#[derive(Parser, Debug)]
#[command(name = "benchmark")]
#[command(about = "Measure compress/decompress speed of every codec")]
struct Args {
    /// Frame width
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Frame height
    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Frames per codec
    #[arg(short = 'n', long, default_value_t = 60)]
    frames: usize,

    /// Quality 1-100
    #[arg(short, long, default_value_t = 20)]
    quality: u32,

    /// Only run this codec
    #[arg(short, long)]
    algorithm: Option<String>,
}

/// Diagonal gradient so the interpolation has something to do.
fn gradient_frame(width: u32, height: u32, phase: u32) -> Frame {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            let v = x.wrapping_add(y).wrapping_add(phase);
            pixels.extend_from_slice(&[(v & 0xff) as u8, ((v >> 1) & 0xff) as u8, ((x ^ y) & 0xff) as u8]);
        }
    }
    Frame::new(width, height, pixels)
}

/// Mean absolute difference per sample.
fn mean_abs_error(a: &[u8], b: &[u8]) -> f64 {
    let total: u64 = a.iter().zip(b).map(|(&x, &y)| u64::from(x.abs_diff(y))).sum();
    total as f64 / a.len().max(1) as f64
}

fn ms_per_frame(total: Duration, frames: usize) -> f64 {
    total.as_secs_f64() * 1000.0 / frames.max(1) as f64
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vc_resample=info".parse()?)
                .add_directive("warn".parse()?),
        )
        .init();

    let args = Args::parse();
    let registry = CodecRegistry::with_builtin_codecs();
    let config = CompressionConfig::new(args.quality, 30);
    config.validate()?;

    let names = match &args.algorithm {
        Some(name) if registry.available(name) => vec![name.clone()],
        Some(name) => return Err(anyhow!("unknown codec '{}'", name)),
        None => registry.list(),
    };

    println!("Codec Benchmark");
    println!("═══════════════════════════════════");
    println!(
        "Frames: {} x {}x{}, quality {} (factor {})",
        args.frames,
        args.width,
        args.height,
        args.quality,
        config.downsample_factor()
    );

    let frames: Vec<Frame> = (0..args.frames.min(8) as u32)
        .map(|phase| gradient_frame(args.width, args.height, phase * 7))
        .collect();
    if frames.is_empty() {
        return Err(anyhow!("nothing to benchmark with zero frames"));
    }

    for name in names {
        let mut codec = registry
            .create(&name)
            .ok_or_else(|| anyhow!("codec '{}' disappeared from the registry", name))?;
        codec.initialize(&config)?;

        let mut compress_time = Duration::ZERO;
        let mut decompress_time = Duration::ZERO;
        let mut payload_bytes = 0usize;
        let mut error_sum = 0.0;

        for i in 0..args.frames {
            let frame = &frames[i % frames.len()];

            let t0 = Instant::now();
            let payload = codec.compress(frame)?;
            compress_time += t0.elapsed();
            payload_bytes += payload.len();

            let t1 = Instant::now();
            let restored = codec.decompress(&payload)?;
            decompress_time += t1.elapsed();

            error_sum += mean_abs_error(&frame.pixels, &restored.pixels);
        }

        let raw_bytes = frames[0].byte_len() * args.frames;
        println!();
        println!("{}", name);
        println!("───────────");
        println!("Compress:   {:.2} ms/frame", ms_per_frame(compress_time, args.frames));
        println!("Decompress: {:.2} ms/frame", ms_per_frame(decompress_time, args.frames));
        println!(
            "Size ratio: {:.2}:1 ({} -> {} bytes)",
            raw_bytes as f64 / payload_bytes.max(1) as f64,
            raw_bytes,
            payload_bytes
        );
        println!("Mean abs error: {:.2}", error_sum / args.frames.max(1) as f64);
        println!();
        println!("{}", codec.stats());
    }

    Ok(())
}
