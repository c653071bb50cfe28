//! # Pipeline Session Settings
//!
//! File paths and toggles for one encode or decode run. The encode side reads a
//! video and writes a container; the decode side reads that container back,
//! writes a temporary video and finally produces the output file, optionally
//! muxed with the audio track extracted during encoding.
//!
//! ## Temporary Files
//!
//! | File | Written by | Removed by |
//! |------|------------|------------|
//! | `temp_audio_path` | encode (when `keep_audio`) | decode, unless `keep_temp_files` |
//! | `container_path` | encode | decode, unless `keep_temp_files` |
//! | `temp_video_path` | decode | decode (muxed or renamed into `output_path`) |

use std::path::PathBuf;

use super::{
    CompressionConfig, DEFAULT_ALGORITHM, DEFAULT_CONTAINER_PATH, DEFAULT_TEMP_AUDIO_PATH,
    DEFAULT_TEMP_VIDEO_PATH,
};
use crate::error::{VcError, VcResult};

/// Settings for [`crate::pipeline::EncodePipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Video to read frames from.
    pub input_path: PathBuf,
    /// Container file to write.
    pub container_path: PathBuf,
    /// Where the audio track is extracted to when `keep_audio` is set.
    pub temp_audio_path: PathBuf,
    /// Registry name of the codec.
    pub algorithm: String,
    pub compression: CompressionConfig,
    /// Extract the input's audio so decode can mux it back.
    pub keep_audio: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::new(),
            container_path: PathBuf::from(DEFAULT_CONTAINER_PATH),
            temp_audio_path: PathBuf::from(DEFAULT_TEMP_AUDIO_PATH),
            algorithm: DEFAULT_ALGORITHM.to_string(),
            compression: CompressionConfig::default(),
            keep_audio: true,
        }
    }
}

impl EncoderConfig {
    pub fn new(
        input_path: impl Into<PathBuf>,
        container_path: impl Into<PathBuf>,
        algorithm: impl Into<String>,
        compression: CompressionConfig,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            container_path: container_path.into(),
            algorithm: algorithm.into(),
            compression,
            ..Self::default()
        }
    }

    pub fn with_audio(mut self, keep_audio: bool, temp_audio_path: impl Into<PathBuf>) -> Self {
        self.keep_audio = keep_audio;
        self.temp_audio_path = temp_audio_path.into();
        self
    }

    pub fn validate(&self) -> VcResult<()> {
        self.compression.validate()?;
        require_path("input_path", &self.input_path)?;
        require_path("container_path", &self.container_path)?;
        if self.keep_audio {
            require_path("temp_audio_path", &self.temp_audio_path)?;
        }
        require_name(&self.algorithm)
    }
}

/// Settings for [`crate::pipeline::DecodePipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Container file to read.
    pub container_path: PathBuf,
    /// Final playable video.
    pub output_path: PathBuf,
    /// Reconstructed video before audio muxing.
    pub temp_video_path: PathBuf,
    /// Audio track extracted during encoding.
    pub temp_audio_path: PathBuf,
    /// Registry name of the codec.
    pub algorithm: String,
    pub compression: CompressionConfig,
    /// Mux the extracted audio into the output.
    pub keep_audio: bool,
    /// Leave the container and temp audio on disk after decoding.
    pub keep_temp_files: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            container_path: PathBuf::from(DEFAULT_CONTAINER_PATH),
            output_path: PathBuf::new(),
            temp_video_path: PathBuf::from(DEFAULT_TEMP_VIDEO_PATH),
            temp_audio_path: PathBuf::from(DEFAULT_TEMP_AUDIO_PATH),
            algorithm: DEFAULT_ALGORITHM.to_string(),
            compression: CompressionConfig::default(),
            keep_audio: true,
            keep_temp_files: false,
        }
    }
}

impl DecoderConfig {
    pub fn new(
        container_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        algorithm: impl Into<String>,
        compression: CompressionConfig,
    ) -> Self {
        Self {
            container_path: container_path.into(),
            output_path: output_path.into(),
            algorithm: algorithm.into(),
            compression,
            ..Self::default()
        }
    }

    pub fn with_audio(mut self, keep_audio: bool, temp_audio_path: impl Into<PathBuf>) -> Self {
        self.keep_audio = keep_audio;
        self.temp_audio_path = temp_audio_path.into();
        self
    }

    pub fn with_temp_video(mut self, temp_video_path: impl Into<PathBuf>) -> Self {
        self.temp_video_path = temp_video_path.into();
        self
    }

    pub fn keep_temp_files(mut self, keep: bool) -> Self {
        self.keep_temp_files = keep;
        self
    }

    pub fn validate(&self) -> VcResult<()> {
        self.compression.validate()?;
        require_path("container_path", &self.container_path)?;
        require_path("output_path", &self.output_path)?;
        require_path("temp_video_path", &self.temp_video_path)?;
        if self.keep_audio {
            require_path("temp_audio_path", &self.temp_audio_path)?;
        }
        if self.temp_video_path == self.output_path {
            return Err(VcError::config(
                "temp_video_path",
                "must differ from output_path",
            ));
        }
        require_name(&self.algorithm)
    }
}

fn require_path(field: &str, path: &std::path::Path) -> VcResult<()> {
    if path.as_os_str().is_empty() {
        return Err(VcError::config(field, "path cannot be empty"));
    }
    Ok(())
}

fn require_name(algorithm: &str) -> VcResult<()> {
    if algorithm.trim().is_empty() {
        return Err(VcError::config("algorithm", "codec name cannot be empty"));
    }
    Ok(())
}
