//! In-process frame source and sink.
//!
//! Used by the tests and the benchmark to drive the pipelines without touching
//! `ffmpeg`. The path given to `open` is ignored.

use std::collections::VecDeque;
use std::path::Path;

use super::{check_frame_size, FrameSink, FrameSource, VideoMetadata};
use crate::error::{VcError, VcResult};
use crate::frame::Frame;

/// Yields a fixed list of frames.
#[derive(Debug, Clone)]
pub struct MemoryFrameSource {
    frames: Vec<Frame>,
    pending: VecDeque<Frame>,
    metadata: VideoMetadata,
    opened: bool,
}

impl MemoryFrameSource {
    /// All frames must share the first frame's dimensions.
    pub fn new(frames: Vec<Frame>, fps: f64) -> Self {
        let (width, height) = frames.first().map_or((0, 0), |f| (f.width, f.height));
        let metadata = VideoMetadata::new(width, height, fps, frames.len() as u64);
        Self {
            frames,
            pending: VecDeque::new(),
            metadata,
            opened: false,
        }
    }

    /// `count` identical frames of one color.
    pub fn solid(width: u32, height: u32, fps: f64, count: usize, color: [u8; 3]) -> Self {
        let frame = Frame::solid(width, height, color);
        Self::new(vec![frame; count], fps)
    }

    /// Report different metadata than the frames carry.
    pub fn with_metadata(mut self, metadata: VideoMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl FrameSource for MemoryFrameSource {
    fn open(&mut self, _path: &Path) -> VcResult<VideoMetadata> {
        if self.frames.is_empty() && self.metadata.width == 0 {
            return Err(VcError::format("memory source", "no frames to report dimensions from"));
        }
        self.pending = self.frames.iter().cloned().collect();
        self.opened = true;
        Ok(self.metadata)
    }

    fn read_next(&mut self) -> VcResult<Option<Frame>> {
        if !self.opened {
            return Err(VcError::state("read frame", "memory source is closed"));
        }
        Ok(self.pending.pop_front())
    }

    fn metadata(&self) -> Option<VideoMetadata> {
        self.opened.then_some(self.metadata)
    }

    fn close(&mut self) -> VcResult<()> {
        self.pending.clear();
        self.opened = false;
        Ok(())
    }
}

/// Collects every frame written to it.
#[derive(Debug, Clone, Default)]
pub struct MemoryFrameSink {
    pub frames: Vec<Frame>,
    dims: Option<(u32, u32)>,
    pub fps: Option<f64>,
    /// Opens and closes seen so far.
    pub opens: usize,
    pub closes: usize,
}

impl MemoryFrameSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dims
    }
}

impl FrameSink for MemoryFrameSink {
    fn open(&mut self, _path: &Path, width: u32, height: u32, fps: f64) -> VcResult<()> {
        self.dims = Some((width, height));
        self.fps = Some(fps);
        self.opens += 1;
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> VcResult<()> {
        let (width, height) = self
            .dims
            .ok_or_else(|| VcError::state("write frame", "memory sink is closed"))?;
        check_frame_size("memory sink", frame, width, height)?;
        self.frames.push(frame.clone());
        Ok(())
    }

    fn close(&mut self) -> VcResult<()> {
        if self.dims.take().is_some() {
            self.closes += 1;
        }
        Ok(())
    }

    fn produces_file(&self) -> bool {
        false
    }
}
