//! # Downsample Codec
//!
//! Lossy codec that stores each frame at a fraction of its resolution.
//!
//! ## Payload Layout
//!
//! ```text
//! orig_width : i32 LE
//! orig_height: i32 LE
//! pixels     : tw * th * 3 bytes, tw = max(orig_width / f, 1), th = max(orig_height / f, 1)
//! ```
//!
//! `f` is the downsample factor chosen from the quality at
//! [`Codec::initialize`]. The encoder and decoder must agree on it; the payload
//! does not carry it.

use std::time::Instant;

use bytes::{Buf, BufMut};
use tracing::{debug, trace};
use vc_resample::bilinear::BilinearResampler;
use vc_resample::cpu::FirResampler;
use vc_resample::geometry::{downsampled, Size};
use vc_resample::gpu::GpuBilinearResampler;
use vc_resample::Resampler;

use super::{Codec, BILINEAR, GPU_BILINEAR, REFERENCE};
use crate::config::CompressionConfig;
use crate::error::{VcError, VcResult};
use crate::frame::Frame;
use crate::stats::CodecStats;

/// Bytes before the pixel data in every payload.
pub const PAYLOAD_HEADER_LEN: usize = 8;

/// Original frame dimensions at the front of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadHeader {
    pub width: i32,
    pub height: i32,
}

impl PayloadHeader {
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_i32_le(self.width);
        buf.put_i32_le(self.height);
    }

    /// Read the header, advancing `buf` past it.
    pub fn decode(buf: &mut &[u8]) -> VcResult<Self> {
        if buf.remaining() < PAYLOAD_HEADER_LEN {
            return Err(VcError::format(
                "payload",
                format!(
                    "{} bytes is too short for the {PAYLOAD_HEADER_LEN}-byte dimension header",
                    buf.remaining()
                ),
            ));
        }
        let width = buf.get_i32_le();
        let height = buf.get_i32_le();
        if width <= 0 || height <= 0 {
            return Err(VcError::format(
                "payload",
                format!("non-positive dimensions {width}x{height}"),
            ));
        }
        Ok(Self { width, height })
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

/// Downsample codec over any [`Resampler`] kernel.
pub struct DownsampleCodec<R: Resampler> {
    name: &'static str,
    algorithm_id: u16,
    kernel: R,
    factor: Option<u32>,
    stats: CodecStats,
}

impl<R: Resampler> DownsampleCodec<R> {
    pub fn new(name: &'static str, algorithm_id: u16, kernel: R) -> Self {
        Self {
            name,
            algorithm_id,
            kernel,
            factor: None,
            stats: CodecStats::new(),
        }
    }

    /// Factor set by the last [`Codec::initialize`], if any.
    pub fn factor(&self) -> Option<u32> {
        self.factor
    }

    pub fn kernel(&self) -> &R {
        &self.kernel
    }

    pub fn codec_stats(&self) -> &CodecStats {
        &self.stats
    }

    fn require_factor(&self, operation: &str) -> VcResult<u32> {
        self.factor
            .ok_or_else(|| VcError::state(operation, format!("codec {} is uninitialized", self.name)))
    }
}

impl DownsampleCodec<FirResampler> {
    pub fn reference() -> Self {
        Self::new(REFERENCE, 1, FirResampler::new())
    }
}

impl DownsampleCodec<BilinearResampler> {
    pub fn bilinear() -> Self {
        Self::new(BILINEAR, 2, BilinearResampler::new())
    }
}

impl DownsampleCodec<GpuBilinearResampler> {
    /// Sets up the GPU device, or falls back to the CPU kernel.
    pub fn gpu_bilinear() -> Self {
        Self::new(GPU_BILINEAR, 3, GpuBilinearResampler::new())
    }

    pub fn gpu_status(&self) -> &vc_resample::gpu::GpuStatus {
        self.kernel.status()
    }
}

impl<R: Resampler> Codec for DownsampleCodec<R> {
    fn initialize(&mut self, config: &CompressionConfig) -> VcResult<()> {
        config.validate()?;
        let factor = config.downsample_factor();
        debug!(
            codec = self.name,
            quality = config.quality,
            factor,
            backend = %self.kernel.backend(),
            "codec initialized"
        );
        self.factor = Some(factor);
        Ok(())
    }

    fn compress(&mut self, frame: &Frame) -> VcResult<Vec<u8>> {
        let factor = self.require_factor("compress")?;
        let size = frame.size();
        if size.is_empty() {
            return Err(VcError::format(
                "frame",
                format!("cannot compress a zero-area frame ({size})"),
            ));
        }
        let header = PayloadHeader {
            width: i32::try_from(size.w)
                .map_err(|_| VcError::format("frame", format!("width {} overflows i32", size.w)))?,
            height: i32::try_from(size.h)
                .map_err(|_| VcError::format("frame", format!("height {} overflows i32", size.h)))?,
        };

        let start = Instant::now();
        let target = downsampled(size, factor);
        let mut payload = Vec::with_capacity(PAYLOAD_HEADER_LEN + target.byte_len());
        header.encode(&mut payload);
        payload.resize(PAYLOAD_HEADER_LEN + target.byte_len(), 0);
        self.kernel.downsample(
            &frame.pixels,
            size,
            &mut payload[PAYLOAD_HEADER_LEN..],
            target,
        )?;

        self.stats
            .record_compress(frame.byte_len(), target.byte_len(), start.elapsed());
        trace!(codec = self.name, %size, %target, "frame compressed");
        Ok(payload)
    }

    fn decompress(&mut self, payload: &[u8]) -> VcResult<Frame> {
        let factor = self.require_factor("decompress")?;
        let start = Instant::now();

        let mut buf = payload;
        let header = PayloadHeader::decode(&mut buf)?;
        let size = header.size();
        let target = downsampled(size, factor);
        if buf.len() != target.byte_len() {
            return Err(VcError::format(
                "payload",
                format!(
                    "{size} at factor {factor} needs {} pixel bytes, got {}",
                    target.byte_len(),
                    buf.len()
                ),
            ));
        }

        let mut pixels = vec![0u8; size.byte_len()];
        self.kernel.upsample(buf, target, &mut pixels, size)?;

        self.stats.record_decompress(start.elapsed());
        Ok(Frame::new(size.w, size.h, pixels))
    }

    fn name(&self) -> &str {
        self.name
    }

    fn algorithm_id(&self) -> u16 {
        self.algorithm_id
    }

    fn stats(&self) -> String {
        let factor = self
            .factor
            .map_or_else(|| "uninitialized".to_string(), |f| f.to_string());
        format!(
            "Codec {} (id {})\n\
             Backend:               {}\n\
             Downsample factor:     {}\n\
             Frames compressed:     {}\n\
             Frames decompressed:   {}\n\
             Avg compression ratio: {:.2}\n\
             Avg compress time:     {:.3} ms\n\
             Avg decompress time:   {:.3} ms",
            self.name,
            self.algorithm_id,
            self.kernel.backend(),
            factor,
            self.stats.frames_compressed,
            self.stats.frames_decompressed,
            self.stats.avg_compression_ratio(),
            self.stats.avg_compress_ms(),
            self.stats.avg_decompress_ms(),
        )
    }

    fn reset(&mut self) {
        self.stats = CodecStats::new();
    }
}
