//! # Running Statistics
//!
//! Accumulators owned by the pipelines and codecs. Averages are updated in
//! place with `new = (old * (n - 1) + x) / n`, so no per-frame history is kept.

use std::fmt::Write as _;
use std::time::Duration;

/// Incrementally updated arithmetic mean.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningAverage {
    count: u64,
    mean: f64,
}

impl RunningAverage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let n = self.count as f64;
        self.mean = (self.mean * (n - 1.0) + value) / n;
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Aggregate numbers for one encode or decode run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStats {
    pub frames_processed: u64,
    /// Bytes of uncompressed frame pixels.
    pub raw_bytes: u64,
    /// Bytes of codec payloads.
    pub compressed_bytes: u64,
    avg_frame_ms: RunningAverage,
    avg_ratio: RunningAverage,
    pub total_time: Duration,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame by its raw and compressed sizes, whichever direction
    /// the pipeline runs. The ratio is always `raw / compressed`.
    pub fn record_frame(&mut self, raw_bytes: usize, compressed_bytes: usize, elapsed: Duration) {
        self.frames_processed += 1;
        self.raw_bytes += raw_bytes as u64;
        self.compressed_bytes += compressed_bytes as u64;
        self.avg_frame_ms.push(elapsed.as_secs_f64() * 1000.0);
        if compressed_bytes > 0 {
            self.avg_ratio.push(raw_bytes as f64 / compressed_bytes as f64);
        }
    }

    pub fn set_total_time(&mut self, total_time: Duration) {
        self.total_time = total_time;
    }

    /// Mean processing time per frame in milliseconds.
    pub fn avg_frame_ms(&self) -> f64 {
        self.avg_frame_ms.mean()
    }

    /// Mean of the per-frame `input / output` ratios.
    pub fn avg_compression_ratio(&self) -> f64 {
        self.avg_ratio.mean()
    }

    /// Frames per second over the whole run.
    pub fn throughput_fps(&self) -> f64 {
        let secs = self.total_time.as_secs_f64();
        if secs > 0.0 {
            self.frames_processed as f64 / secs
        } else {
            0.0
        }
    }

    pub fn report(&self, title: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{title}");
        let _ = writeln!(out, "{}", "=".repeat(title.len().max(16)));
        let _ = writeln!(out, "Frames processed:      {}", self.frames_processed);
        let _ = writeln!(out, "Raw bytes:             {}", self.raw_bytes);
        let _ = writeln!(out, "Compressed bytes:      {}", self.compressed_bytes);
        let _ = writeln!(out, "Avg compression ratio: {:.2}", self.avg_compression_ratio());
        let _ = writeln!(out, "Avg time per frame:    {:.3} ms", self.avg_frame_ms());
        let _ = writeln!(out, "Total time:            {:.3} s", self.total_time.as_secs_f64());
        let _ = write!(out, "Throughput:            {:.1} fps", self.throughput_fps());
        out
    }
}

/// Per-codec counters, reset by [`crate::codec::Codec::reset`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodecStats {
    pub frames_compressed: u64,
    pub frames_decompressed: u64,
    avg_ratio: RunningAverage,
    pub total_compress_time: Duration,
    pub total_decompress_time: Duration,
}

impl CodecStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// `original_bytes` raw pixels shrunk to `compressed_bytes` pixels.
    pub fn record_compress(&mut self, original_bytes: usize, compressed_bytes: usize, elapsed: Duration) {
        self.frames_compressed += 1;
        self.total_compress_time += elapsed;
        if compressed_bytes > 0 {
            self.avg_ratio
                .push(original_bytes as f64 / compressed_bytes as f64);
        }
    }

    pub fn record_decompress(&mut self, elapsed: Duration) {
        self.frames_decompressed += 1;
        self.total_decompress_time += elapsed;
    }

    pub fn avg_compression_ratio(&self) -> f64 {
        self.avg_ratio.mean()
    }

    pub fn avg_compress_ms(&self) -> f64 {
        average_ms(self.total_compress_time, self.frames_compressed)
    }

    pub fn avg_decompress_ms(&self) -> f64 {
        average_ms(self.total_decompress_time, self.frames_decompressed)
    }
}

fn average_ms(total: Duration, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total.as_secs_f64() * 1000.0 / count as f64
    }
}
