//! Common test utilities and helpers for the vcompress tests
//!
//! This module provides shared frame builders, assertions and test doubles
//! for the media collaborators.

#![allow(dead_code)]

/// Test frame utilities and constants
pub mod test_frames {
    use vcompress::frame::Frame;

    pub const TEAL: [u8; 3] = [180, 140, 20];

    /// Create a solid color test frame
    pub fn create_solid_frame(width: u32, height: u32, color: [u8; 3]) -> Frame {
        Frame::solid(width, height, color)
    }

    /// Create a gradient frame for testing interpolation
    pub fn create_gradient_frame(width: u32, height: u32) -> Frame {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                let b = ((x as f32 / width as f32) * 255.0) as u8;
                let g = ((y as f32 / height as f32) * 255.0) as u8;
                pixels.extend_from_slice(&[b, g, 128]);
            }
        }
        Frame::new(width, height, pixels)
    }

    /// Create a checkerboard pattern frame with `cell`-pixel squares
    pub fn create_checkerboard_frame(width: u32, height: u32, cell: u32) -> Frame {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                let v = if (x / cell + y / cell) % 2 == 0 { 0 } else { 255 };
                pixels.extend_from_slice(&[v, v, v]);
            }
        }
        Frame::new(width, height, pixels)
    }
}

/// Custom assertions for testing
pub mod assertions {
    use vcompress::frame::Frame;

    /// Assert that a frame has the expected size and buffer length
    pub fn assert_frame_size(frame: &Frame, width: u32, height: u32) {
        assert_eq!(
            (frame.width, frame.height),
            (width, height),
            "Frame size mismatch: expected {}x{}, got {}x{}",
            width,
            height,
            frame.width,
            frame.height
        );
        assert_eq!(frame.pixels.len(), width as usize * height as usize * 3);
    }

    /// Assert that every pixel equals `color`
    pub fn assert_solid(frame: &Frame, color: [u8; 3]) {
        if let Some((i, px)) = frame
            .pixels
            .chunks_exact(3)
            .enumerate()
            .find(|(_, px)| *px != color)
        {
            panic!("pixel {} is {:?}, expected {:?}", i, px, color);
        }
    }

    /// Assert that two buffers differ by at most `tolerance` per sample
    pub fn assert_close(left: &[u8], right: &[u8], tolerance: u8) {
        assert_eq!(left.len(), right.len(), "buffer lengths differ");
        if let Some((i, (a, b))) = left
            .iter()
            .zip(right)
            .enumerate()
            .find(|(_, (a, b))| a.abs_diff(**b) > tolerance)
        {
            panic!("sample {} differs: {} vs {} (tolerance {})", i, a, b, tolerance);
        }
    }
}

/// Audio toolkit doubles
pub mod mock_audio {
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    use vcompress::error::{VcError, VcResult};
    use vcompress::media::AudioToolkit;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum AudioCall {
        Extract { input: PathBuf, output: PathBuf },
        Mux { video: PathBuf, audio: PathBuf, output: PathBuf },
    }

    /// Records calls and writes placeholder files instead of running ffmpeg
    #[derive(Clone, Default)]
    pub struct RecordingAudio {
        pub calls: Rc<RefCell<Vec<AudioCall>>>,
        pub fail: bool,
    }

    impl RecordingAudio {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<AudioCall> {
            self.calls.borrow().clone()
        }
    }

    impl AudioToolkit for RecordingAudio {
        fn extract_audio(&self, input_video: &Path, output_audio: &Path) -> VcResult<()> {
            self.calls.borrow_mut().push(AudioCall::Extract {
                input: input_video.to_path_buf(),
                output: output_audio.to_path_buf(),
            });
            if self.fail {
                return Err(VcError::external("ffmpeg", "audio extraction exited with 1"));
            }
            std::fs::write(output_audio, b"aac").map_err(|e| VcError::io_at("write audio", output_audio, e))
        }

        fn mux(&self, video: &Path, audio: &Path, output: &Path) -> VcResult<()> {
            self.calls.borrow_mut().push(AudioCall::Mux {
                video: video.to_path_buf(),
                audio: audio.to_path_buf(),
                output: output.to_path_buf(),
            });
            if self.fail {
                return Err(VcError::external("ffmpeg", "audio mux exited with 1"));
            }
            std::fs::write(output, b"muxed").map_err(|e| VcError::io_at("write output", output, e))
        }
    }
}

/// Frame sink doubles that touch the filesystem
pub mod file_sink {
    use std::fs::File;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    use vcompress::error::{VcError, VcResult};
    use vcompress::frame::Frame;
    use vcompress::media::FrameSink;

    /// Dumps raw frame bytes into the path given to `open`, standing in for
    /// the ffmpeg encoder
    #[derive(Default)]
    pub struct RawFileSink {
        file: Option<File>,
        pub path: Option<PathBuf>,
        pub frames: usize,
    }

    impl RawFileSink {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl FrameSink for RawFileSink {
        fn open(&mut self, path: &Path, _width: u32, _height: u32, _fps: f64) -> VcResult<()> {
            let file = File::create(path).map_err(|e| VcError::io_at("create raw video", path, e))?;
            self.file = Some(file);
            self.path = Some(path.to_path_buf());
            Ok(())
        }

        fn write(&mut self, frame: &Frame) -> VcResult<()> {
            let file = self
                .file
                .as_mut()
                .ok_or_else(|| VcError::state("write frame", "raw sink is closed"))?;
            file.write_all(&frame.pixels)
                .map_err(|e| VcError::io("write raw video", e))?;
            self.frames += 1;
            Ok(())
        }

        fn close(&mut self) -> VcResult<()> {
            if let Some(mut file) = self.file.take() {
                file.flush().map_err(|e| VcError::io("flush raw video", e))?;
            }
            Ok(())
        }
    }
}
