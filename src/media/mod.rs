//! # Media Collaborators
//!
//! The pipelines never decode or encode playable video themselves. They pull
//! raw frames from a [`FrameSource`], push reconstructed frames into a
//! [`FrameSink`], and delegate the audio track to an [`AudioToolkit`].
//!
//! ## Implementations
//!
//! - [`ffmpeg`]: `ffprobe` for metadata, `ffmpeg` subprocesses speaking
//!   `rawvideo`/`bgr24` over pipes
//! - [`memory`]: in-process frame vectors for tests and synthetic streams
//! - [`audio`]: audio extraction and muxing through the `ffmpeg` CLI

pub mod audio;
pub mod ffmpeg;
pub mod memory;

pub use audio::{AudioToolkit, FfmpegAudio};
pub use ffmpeg::{FfmpegFrameSink, FfmpegFrameSource};
pub use memory::{MemoryFrameSink, MemoryFrameSource};

use std::path::Path;

use crate::error::{VcError, VcResult};
use crate::frame::Frame;

/// Frame rate assumed when a source does not report one.
pub const DEFAULT_FPS: f64 = 30.0;

/// Properties of an opened source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// 0 when unknown.
    pub frame_count: u64,
}

impl VideoMetadata {
    pub fn new(width: u32, height: u32, fps: f64, frame_count: u64) -> Self {
        Self {
            width,
            height,
            fps: if fps.is_finite() && fps > 0.0 { fps } else { DEFAULT_FPS },
            frame_count,
        }
    }
}

/// Producer of raw frames.
pub trait FrameSource {
    /// Open `path` and report its properties.
    fn open(&mut self, path: &Path) -> VcResult<VideoMetadata>;

    /// Next frame in display order.
    ///
    /// # Returns
    ///
    /// `Ok(None)` once the source is exhausted.
    fn read_next(&mut self) -> VcResult<Option<Frame>>;

    /// Properties reported by the last successful [`FrameSource::open`].
    fn metadata(&self) -> Option<VideoMetadata>;

    fn close(&mut self) -> VcResult<()>;
}

/// Consumer of raw frames.
pub trait FrameSink {
    fn open(&mut self, path: &Path, width: u32, height: u32, fps: f64) -> VcResult<()>;

    /// Append one frame. Its dimensions must match those given to `open`.
    fn write(&mut self, frame: &Frame) -> VcResult<()>;

    /// Finish the output. Errors here mean the output is unusable.
    fn close(&mut self) -> VcResult<()>;

    /// Whether frames end up in the file given to `open`. Sinks that keep
    /// frames elsewhere skip the decoder's mux/rename step.
    fn produces_file(&self) -> bool {
        true
    }
}

/// Format error for a frame whose size differs from the stream's.
pub(crate) fn check_frame_size(context: &str, frame: &Frame, width: u32, height: u32) -> VcResult<()> {
    if frame.width != width || frame.height != height {
        return Err(VcError::format(
            context,
            format!(
                "frame {} is {}x{}, stream is {width}x{height}",
                frame.sequence_number, frame.width, frame.height
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fps_falls_back() {
        assert_eq!(VideoMetadata::new(4, 4, 0.0, 0).fps, DEFAULT_FPS);
        assert_eq!(VideoMetadata::new(4, 4, f64::NAN, 0).fps, DEFAULT_FPS);
        assert_eq!(VideoMetadata::new(4, 4, 24.0, 10).fps, 24.0);
    }

    #[test]
    fn frame_size_check() {
        let frame = Frame::solid(4, 2, [0, 0, 0]);
        assert!(check_frame_size("sink", &frame, 4, 2).is_ok());
        assert_eq!(
            check_frame_size("sink", &frame, 2, 4).unwrap_err().category(),
            "format"
        );
    }
}
