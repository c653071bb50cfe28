// SPDX-License-Identifier: MIT
//! # vc-resample: Frame Resampling Kernels
//!
//! This crate provides the pixel kernels behind the vcompress downsample codecs.
//! Every kernel works on tightly packed, interleaved 3-channel 8-bit buffers
//! (row-major, `width * height * 3` bytes) and exposes the same two operations:
//! shrink a frame to a smaller size, and enlarge it back.
//!
//! ## Key Components
//!
//! - [`geometry`]: sizes, downsample target computation and interpolation ratios
//! - [`bilinear`]: hand-rolled bilinear interpolation (the reference numerics)
//! - [`cpu`]: library-assisted resizing built on fast_image_resize (SIMD + rayon)
//! - [`gpu`]: the bilinear kernel as a wgpu compute shader, with CPU fallback
//!
//! ## Ratio Conventions
//!
//! Downsampling maps destination pixel `x` to source position `x * (sw - 1) / dw`.
//! Upsampling maps it to `x * (sw - 1) / (dw - 1)` so that the first and last
//! destination pixels land exactly on the source boundaries. See
//! [`geometry::ratios`].
//!
//! ## Usage Example
//!
//! ```rust
//! use vc_resample::{bilinear::BilinearResampler, geometry::Size, Resampler};
//!
//! let src_size = Size::new(64, 48);
//! let dst_size = Size::new(16, 12);
//! let src = vec![128u8; src_size.byte_len()];
//! let mut dst = vec![0u8; dst_size.byte_len()];
//!
//! let mut kernel = BilinearResampler::new();
//! kernel.downsample(&src, src_size, &mut dst, dst_size)?;
//! assert!(dst.iter().all(|&v| v == 128));
//! # Ok::<(), vc_resample::ResampleError>(())
//! ```

pub mod bilinear;
pub mod cpu;
pub mod geometry;
pub mod gpu;

use geometry::Size;

/// Errors produced by the resampling kernels.
#[derive(thiserror::Error, Debug)]
pub enum ResampleError {
    #[error("image has a zero-length side ({0}x{1})")]
    EmptyImage(u32, u32),
    #[error("{role} buffer should be {expected} bytes long but is {actual} bytes long")]
    BufferSize {
        role: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("fast image resize error: {0}")]
    Fir(#[from] fast_image_resize::ResizeError),
    #[error("image buffer error: {0}")]
    ImageBuf(#[from] fast_image_resize::ImageBufferError),
    #[error("GPU device error: {0}")]
    Device(String),
}

/// A kernel able to shrink and enlarge 3-channel frames.
///
/// Implementations write into a caller-provided destination buffer, which must
/// be exactly `dst_size.byte_len()` bytes.
pub trait Resampler: Send {
    /// Short kernel name used in logs and statistics.
    fn name(&self) -> &'static str;

    /// Where the work actually runs. Defaults to the kernel name.
    fn backend(&self) -> String {
        self.name().to_string()
    }

    /// Shrink `src` (`src_size`) into `dst` (`dst_size`).
    fn downsample(
        &mut self,
        src: &[u8],
        src_size: Size,
        dst: &mut [u8],
        dst_size: Size,
    ) -> Result<(), ResampleError>;

    /// Enlarge `src` (`src_size`) into `dst` (`dst_size`).
    fn upsample(
        &mut self,
        src: &[u8],
        src_size: Size,
        dst: &mut [u8],
        dst_size: Size,
    ) -> Result<(), ResampleError>;
}

/// Validate both buffers against their declared sizes.
pub(crate) fn check_buffers(
    src: &[u8],
    src_size: Size,
    dst: &[u8],
    dst_size: Size,
) -> Result<(), ResampleError> {
    for size in [src_size, dst_size] {
        if size.is_empty() {
            return Err(ResampleError::EmptyImage(size.w, size.h));
        }
    }
    if src.len() != src_size.byte_len() {
        return Err(ResampleError::BufferSize {
            role: "source",
            expected: src_size.byte_len(),
            actual: src.len(),
        });
    }
    if dst.len() != dst_size.byte_len() {
        return Err(ResampleError::BufferSize {
            role: "destination",
            expected: dst_size.byte_len(),
            actual: dst.len(),
        });
    }
    Ok(())
}
