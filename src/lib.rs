//! # vcompress
//!
//! A lossy, resolution-reduction video "compressor". Each frame is shrunk by an
//! integer factor and stored in a compact container file; decoding enlarges the
//! frames back with bilinear interpolation and re-encodes a playable video.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `frame`: the raw frame model (`bgr24`, row-major)
//! - `codec`: the [`Codec`] trait, the downsample codec family and the registry
//! - `container`: the binary container (14-byte header + framed records)
//! - `pipeline`: encode and decode orchestration with a shared state machine
//! - `media`: frame sources/sinks and audio handling over `ffmpeg`
//! - `config`, `stats`, `error`: settings, running statistics and errors
//!
//! Pixel kernels live in the `vc-resample` workspace crate.
//!
//! ## Example
//!
//! ```rust,no_run
//! use vcompress::codec::CodecRegistry;
//! use vcompress::config::{CompressionConfig, EncoderConfig};
//! use vcompress::media::FfmpegFrameSource;
//! use vcompress::pipeline::EncodePipeline;
//!
//! # fn example() -> vcompress::VcResult<()> {
//! let registry = CodecRegistry::with_builtin_codecs();
//! let config = EncoderConfig::new("input.mp4", "data.vcomp", "Bilinear", CompressionConfig::new(75, 30));
//!
//! let mut encoder = EncodePipeline::new();
//! encoder.configure(&registry, config)?;
//! let stats = encoder.run(&mut FfmpegFrameSource::new())?;
//! println!("{} frames", stats.frames_processed);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod container;
pub mod error;
pub mod frame;
pub mod media;
pub mod pipeline;
pub mod stats;

pub use codec::{Codec, CodecRegistry};
pub use container::{CompressedContainer, ContainerHeader, Record};
pub use error::{VcError, VcResult};
pub use frame::{Frame, FrameKind};
pub use pipeline::{DecodePipeline, EncodePipeline, PipelineState};
pub use stats::PipelineStats;
