//! # Pipeline Orchestration
//!
//! Drives a frame stream through a codec into or out of a container file.
//!
//! ## Architecture
//!
//! 1. **[`EncodePipeline`]**: frame source -> codec compress -> container writer
//! 2. **[`DecodePipeline`]**: container reader -> codec decompress -> frame sink,
//!    then audio mux (or rename) into the final output and temp-file cleanup
//!
//! Both share the [`PipelineState`] machine:
//!
//! ```text
//! Unconfigured --configure--> Configured --run--> Running --+--> Completed
//!       ^                          |                        |
//!       +---- failed configure ----+                        +--> Failed
//! ```
//!
//! A completed or failed pipeline can be configured again. Processing is
//! synchronous; exactly one frame is in flight at a time.

pub mod decode;
pub mod encode;

pub use decode::DecodePipeline;
pub use encode::EncodePipeline;

use std::fmt;

use crate::codec::{Codec, CodecRegistry};
use crate::config::CompressionConfig;
use crate::error::{VcError, VcResult};

/// Frames between progress log lines.
pub const PROGRESS_INTERVAL: u64 = 500;

/// Lifecycle of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Unconfigured,
    Configured,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineState::Unconfigured => "unconfigured",
            PipelineState::Configured => "configured",
            PipelineState::Running => "running",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
        })
    }
}

/// Look up `algorithm` and initialize it.
pub(crate) fn resolve_codec(
    registry: &CodecRegistry,
    algorithm: &str,
    compression: &CompressionConfig,
) -> VcResult<Box<dyn Codec>> {
    let mut codec = registry.create(algorithm).ok_or_else(|| {
        VcError::config(
            "algorithm",
            format!(
                "unknown codec '{algorithm}' (available: {})",
                registry.list().join(", ")
            ),
        )
    })?;
    codec.initialize(compression).map_err(|e| match e {
        VcError::Config { .. } => e,
        other => VcError::config("algorithm", format!("{algorithm} failed to initialize: {other}")),
    })?;
    Ok(codec)
}
