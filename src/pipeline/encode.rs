//! Video to container.

use std::time::Instant;

use tracing::{error, info, instrument};

use super::{resolve_codec, PipelineState, PROGRESS_INTERVAL};
use crate::codec::{Codec, CodecRegistry};
use crate::config::EncoderConfig;
use crate::container::CompressedContainer;
use crate::error::{VcError, VcResult};
use crate::frame::FrameKind;
use crate::media::{check_frame_size, AudioToolkit, FfmpegAudio, FrameSource};
use crate::stats::PipelineStats;

/// Reads frames from a [`FrameSource`], compresses them and writes the
/// container.
pub struct EncodePipeline {
    state: PipelineState,
    config: Option<EncoderConfig>,
    codec: Option<Box<dyn Codec>>,
    container: CompressedContainer,
    audio: Box<dyn AudioToolkit>,
    stats: PipelineStats,
}

impl Default for EncodePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodePipeline {
    pub fn new() -> Self {
        Self::with_audio_toolkit(Box::new(FfmpegAudio::new()))
    }

    pub fn with_audio_toolkit(audio: Box<dyn AudioToolkit>) -> Self {
        Self {
            state: PipelineState::Unconfigured,
            config: None,
            codec: None,
            container: CompressedContainer::new(),
            audio,
            stats: PipelineStats::new(),
        }
    }

    /// Validate `config` and set up its codec.
    pub fn configure(&mut self, registry: &CodecRegistry, config: EncoderConfig) -> VcResult<()> {
        if self.state == PipelineState::Running {
            return Err(VcError::state("configure", "pipeline is running"));
        }
        self.state = PipelineState::Unconfigured;
        self.codec = None;
        self.config = None;

        config.validate()?;
        let codec = resolve_codec(registry, &config.algorithm, &config.compression)?;
        info!(
            codec = codec.name(),
            input = %config.input_path.display(),
            container = %config.container_path.display(),
            quality = config.compression.quality,
            "encoder configured"
        );
        self.codec = Some(codec);
        self.config = Some(config);
        self.state = PipelineState::Configured;
        Ok(())
    }

    /// Encode every frame of `source` into the configured container.
    #[instrument(name = "encode", skip_all)]
    pub fn run(&mut self, source: &mut dyn FrameSource) -> VcResult<PipelineStats> {
        if self.state != PipelineState::Configured {
            return Err(VcError::state("run encoder", self.state));
        }
        self.state = PipelineState::Running;
        self.stats = PipelineStats::new();

        match self.encode(source) {
            Ok(()) => {
                self.state = PipelineState::Completed;
                info!(
                    frames = self.stats.frames_processed,
                    ratio = self.stats.avg_compression_ratio(),
                    "encoding completed"
                );
                Ok(self.stats.clone())
            }
            Err(e) => {
                error!(error = %e, frames = self.stats.frames_processed, "encoding failed");
                let _ = source.close();
                let _ = self.container.close();
                self.state = PipelineState::Failed;
                Err(e)
            }
        }
    }

    fn encode(&mut self, source: &mut dyn FrameSource) -> VcResult<()> {
        let started = Instant::now();
        let (Some(config), Some(codec)) = (self.config.as_ref(), self.codec.as_mut()) else {
            return Err(VcError::state("run encoder", "pipeline has no codec"));
        };

        if config.keep_audio {
            self.audio
                .extract_audio(&config.input_path, &config.temp_audio_path)?;
        }

        let meta = source.open(&config.input_path)?;
        info!(
            width = meta.width,
            height = meta.height,
            fps = meta.fps,
            frames = meta.frame_count,
            codec = codec.name(),
            "encoding started"
        );
        self.container.open_write(
            &config.container_path,
            meta.width,
            meta.height,
            meta.fps,
            codec.algorithm_id(),
        )?;

        let mut sequence: i32 = 0;
        while let Some(mut frame) = source.read_next()? {
            let frame_start = Instant::now();
            let kind = if config.compression.is_key_frame(sequence as u64) {
                FrameKind::Key
            } else {
                FrameKind::Delta
            };
            frame.sequence_number = sequence;
            frame.kind = kind;
            check_frame_size("container", &frame, meta.width, meta.height)?;

            let payload = codec.compress(&frame)?;
            self.container.write_record(&payload, kind.is_key())?;
            self.stats
                .record_frame(frame.byte_len(), payload.len(), frame_start.elapsed());

            sequence = sequence
                .checked_add(1)
                .ok_or_else(|| VcError::format("container", "sequence number overflow"))?;
            let done = self.stats.frames_processed;
            if done % PROGRESS_INTERVAL == 0 {
                info!(frames = done, total = meta.frame_count, "encoding progress");
            }
        }

        source.close()?;
        self.container.close()?;
        self.stats.set_total_time(started.elapsed());
        Ok(())
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn codec(&self) -> Option<&dyn Codec> {
        self.codec.as_deref()
    }

    /// Pipeline and codec statistics as text.
    pub fn report(&self) -> String {
        let mut report = self.stats.report("Encoding Statistics");
        if let Some(codec) = &self.codec {
            report.push_str("\n\n");
            report.push_str(&codec.stats());
        }
        report
    }
}
