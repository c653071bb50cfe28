//! # Configuration Module
//!
//! Configuration structures for the codecs and the two pipelines. Every struct
//! has a `Default` matching the CLI defaults, a `new` constructor and a
//! `validate()` that rejects out-of-range values with a configuration error.
//!
//! - [`compression`]: quality, bitrate and key-frame interval handed to a codec
//! - [`session`]: file paths and toggles for an encode or decode run

pub mod compression;
pub mod session;

pub use compression::CompressionConfig;
pub use session::{DecoderConfig, EncoderConfig};

/// Default name of the intermediate container file.
pub const DEFAULT_CONTAINER_PATH: &str = "data.vcomp";
/// Default scratch file for the extracted audio track.
pub const DEFAULT_TEMP_AUDIO_PATH: &str = "temp_audio.aac";
/// Default scratch file for the reconstructed, not yet muxed video.
pub const DEFAULT_TEMP_VIDEO_PATH: &str = "temp_processed_video.mp4";
/// Codec used when none is named.
pub const DEFAULT_ALGORITHM: &str = "Reference";
