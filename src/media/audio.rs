//! Audio track handling.
//!
//! The codecs only touch video. During encode the input's audio is copied out
//! untouched; during decode it is muxed back next to the reconstructed video.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::info;

use crate::error::{VcError, VcResult};

/// Extracts and re-attaches audio tracks.
pub trait AudioToolkit {
    /// Copy the audio stream of `input_video` into `output_audio`.
    fn extract_audio(&self, input_video: &Path, output_audio: &Path) -> VcResult<()>;

    /// Combine the video stream of `video` with the audio of `audio` into `output`.
    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> VcResult<()>;
}

/// [`AudioToolkit`] over the `ffmpeg` command line.
#[derive(Debug, Clone)]
pub struct FfmpegAudio {
    ffmpeg: OsString,
}

impl Default for FfmpegAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegAudio {
    pub fn new() -> Self {
        Self::with_program("ffmpeg")
    }

    pub fn with_program(ffmpeg: impl Into<OsString>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    fn run(&self, what: &str, command: &mut Command) -> VcResult<()> {
        let output = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                VcError::external(
                    self.ffmpeg.to_string_lossy(),
                    format!("failed to spawn for {what} ({e}); ensure it is installed and on PATH"),
                )
            })?;
        if !output.status.success() {
            return Err(VcError::external(
                self.ffmpeg.to_string_lossy(),
                format!(
                    "{what} exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(())
    }
}

impl AudioToolkit for FfmpegAudio {
    fn extract_audio(&self, input_video: &Path, output_audio: &Path) -> VcResult<()> {
        let mut command = Command::new(&self.ffmpeg);
        command
            .arg("-i")
            .arg(input_video)
            .args(["-vn", "-acodec", "copy"])
            .arg(output_audio)
            .args(["-y", "-loglevel", "error"]);
        self.run("audio extraction", &mut command)?;
        info!(from = %input_video.display(), to = %output_audio.display(), "audio extracted");
        Ok(())
    }

    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> VcResult<()> {
        let mut command = Command::new(&self.ffmpeg);
        command
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .args(["-c:v", "copy", "-c:a", "aac", "-map", "0:v:0", "-map", "1:a:0"])
            .arg(output)
            .args(["-y", "-loglevel", "error"]);
        self.run("audio mux", &mut command)?;
        info!(output = %output.display(), "audio muxed");
        Ok(())
    }
}
