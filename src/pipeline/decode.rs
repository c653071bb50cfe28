//! Container to video.

use std::fs;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use super::{resolve_codec, PipelineState, PROGRESS_INTERVAL};
use crate::codec::{Codec, CodecRegistry};
use crate::config::DecoderConfig;
use crate::container::CompressedContainer;
use crate::error::{VcError, VcResult};
use crate::media::{check_frame_size, AudioToolkit, FfmpegAudio, FrameSink};
use crate::stats::PipelineStats;

/// Reads a container, rebuilds every frame and hands it to a [`FrameSink`].
pub struct DecodePipeline {
    state: PipelineState,
    config: Option<DecoderConfig>,
    codec: Option<Box<dyn Codec>>,
    container: CompressedContainer,
    audio: Box<dyn AudioToolkit>,
    stats: PipelineStats,
}

impl Default for DecodePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodePipeline {
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
    pub fn configure(&mut self, registry: &CodecRegistry, config: DecoderConfig) -> VcResult<()> {
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
            container = %config.container_path.display(),
            output = %config.output_path.display(),
            "decoder configured"
        );
        self.codec = Some(codec);
        self.config = Some(config);
        self.state = PipelineState::Configured;
        Ok(())
    }

    /// Decode the configured container into `sink`, then produce the output.
    #[instrument(name = "decode", skip_all)]
    pub fn run(&mut self, sink: &mut dyn FrameSink) -> VcResult<PipelineStats> {
        if self.state != PipelineState::Configured {
            return Err(VcError::state("run decoder", self.state));
        }
        self.state = PipelineState::Running;
        self.stats = PipelineStats::new();

        match self.decode(sink) {
            Ok(()) => {
                self.state = PipelineState::Completed;
                info!(frames = self.stats.frames_processed, "decoding completed");
                Ok(self.stats.clone())
            }
            Err(e) => {
                error!(error = %e, frames = self.stats.frames_processed, "decoding failed");
                let _ = self.container.close();
                let _ = sink.close();
                self.state = PipelineState::Failed;
                Err(e)
            }
        }
    }

    fn decode(&mut self, sink: &mut dyn FrameSink) -> VcResult<()> {
        let started = Instant::now();
        let (Some(config), Some(codec)) = (self.config.as_ref(), self.codec.as_mut()) else {
            return Err(VcError::state("run decoder", "pipeline has no codec"));
        };

        let header = self.container.open_read(&config.container_path)?;
        if header.algorithm_id != codec.algorithm_id() {
            warn!(
                container = header.algorithm_id,
                codec = codec.algorithm_id(),
                "container was written by a different codec; decoding anyway"
            );
        }
        if header.orig_width <= 0 || header.orig_height <= 0 {
            return Err(VcError::format(
                "container header",
                format!(
                    "non-positive dimensions {}x{}",
                    header.orig_width, header.orig_height
                ),
            ));
        }
        let (width, height) = (header.orig_width as u32, header.orig_height as u32);
        info!(width, height, fps = header.fps(), codec = codec.name(), "decoding started");

        sink.open(&config.temp_video_path, width, height, header.fps())?;

        let mut sequence: i32 = 0;
        while let Some(record) = self.container.read_record()? {
            let frame_start = Instant::now();
            let mut frame = codec.decompress(&record.payload)?;
            frame.sequence_number = sequence;
            frame.kind = record.kind;
            check_frame_size("container", &frame, width, height)?;

            sink.write(&frame)?;
            self.stats
                .record_frame(frame.byte_len(), record.payload.len(), frame_start.elapsed());

            sequence = sequence
                .checked_add(1)
                .ok_or_else(|| VcError::format("container", "sequence number overflow"))?;
            let done = self.stats.frames_processed;
            if done % PROGRESS_INTERVAL == 0 {
                info!(frames = done, "decoding progress");
            }
        }

        self.container.close()?;
        sink.close()?;

        if sink.produces_file() {
            finish_output(self.audio.as_ref(), config)?;
        } else {
            debug!("sink holds frames in memory; no output file to finish");
        }
        if !config.keep_temp_files {
            if config.keep_audio {
                remove_temp(&config.temp_audio_path);
            }
            remove_temp(&config.container_path);
        }

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
        let mut report = self.stats.report("Decoding Statistics");
        if let Some(codec) = &self.codec {
            report.push_str("\n\n");
            report.push_str(&codec.stats());
        }
        report
    }
}

/// Mux the audio back in, or move the temp video into place.
fn finish_output(audio: &dyn AudioToolkit, config: &DecoderConfig) -> VcResult<()> {
    if config.keep_audio {
        audio.mux(&config.temp_video_path, &config.temp_audio_path, &config.output_path)?;
        remove_temp(&config.temp_video_path);
    } else {
        fs::rename(&config.temp_video_path, &config.output_path)
            .map_err(|e| VcError::io_at("move decoded video into place", &config.output_path, e))?;
    }
    info!(output = %config.output_path.display(), "output written");
    Ok(())
}

fn remove_temp(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "temporary file removed"),
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove temporary file"),
    }
}
