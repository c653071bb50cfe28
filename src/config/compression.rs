//! # Compression Settings
//!
//! | Parameter | Type | Range | Description |
//! |-----------|------|-------|-------------|
//! | `quality` | `u32` | 1-100 | Higher keeps more resolution |
//! | `target_bitrate` | `u32` | any | Carried for compatibility, not acted upon (0 = unconstrained) |
//! | `key_frame_interval` | `u32` | >= 1 | Every Nth frame is tagged as a key frame |
//!
//! ## Quality to Downsample Factor
//!
//! `factor = clamp(4 - quality / 50, 2, 4)` with integer division:
//! - quality 1-49: factor 4
//! - quality 50-99: factor 3
//! - quality 100: factor 2

use crate::error::{VcError, VcResult};

pub const MIN_QUALITY: u32 = 1;
pub const MAX_QUALITY: u32 = 100;

/// Settings handed to [`crate::codec::Codec::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionConfig {
    /// Quality in `1..=100`. Selects the downsample factor.
    pub quality: u32,
    /// Target bitrate in bits per second. Never acted upon.
    pub target_bitrate: u32,
    /// Distance between key frames, in frames. Must be at least 1.
    pub key_frame_interval: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            quality: 20,
            target_bitrate: 0,
            key_frame_interval: 30,
        }
    }
}

impl CompressionConfig {
    pub fn new(quality: u32, key_frame_interval: u32) -> Self {
        Self {
            quality,
            key_frame_interval,
            ..Self::default()
        }
    }

    pub fn with_target_bitrate(mut self, target_bitrate: u32) -> Self {
        self.target_bitrate = target_bitrate;
        self
    }

    pub fn validate(&self) -> VcResult<()> {
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&self.quality) {
            return Err(VcError::config(
                "quality",
                format!(
                    "{} is outside {}..={}",
                    self.quality, MIN_QUALITY, MAX_QUALITY
                ),
            ));
        }
        if self.key_frame_interval == 0 {
            return Err(VcError::config(
                "key_frame_interval",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Downsample factor derived from the quality. Always 2, 3 or 4.
    pub fn downsample_factor(&self) -> u32 {
        downsample_factor(self.quality)
    }

    /// Whether the frame with this sequence number is tagged as a key frame.
    pub fn is_key_frame(&self, sequence_number: u64) -> bool {
        sequence_number % u64::from(self.key_frame_interval.max(1)) == 0
    }
}

/// `clamp(4 - quality / 50, 2, 4)`.
pub fn downsample_factor(quality: u32) -> u32 {
    4u32.saturating_sub(quality / 50).clamp(2, 4)
}
