// SPDX-License-Identifier: MIT
// Library-assisted scaler built on fast_image_resize (SIMD-accelerated).
// RGB8/BGR8 in -> same layout out, direct write into caller-provided dst buffer.
// Area-style box filter when shrinking, bilinear filter when enlarging.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x3;
use fir::{FilterType, ResizeAlg, ResizeOptions, Resizer};

use crate::geometry::Size;
use crate::{check_buffers, ResampleError, Resampler};

/// Resize `src` into `dst` with the given filter.
pub fn resize_rgb_cpu(
    resizer: &mut Resizer,
    src: &[u8],
    src_size: Size,
    dst: &mut [u8],
    dst_size: Size,
    filter: FilterType,
) -> Result<(), ResampleError> {
    check_buffers(src, src_size, dst, dst_size)?;

    let src_view = TypedImageRef::<U8x3>::from_buffer(src_size.w, src_size.h, src)?;
    let mut dst_image = TypedImage::<U8x3>::from_buffer(dst_size.w, dst_size.h, dst)?;

    let opts = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(filter));
    resizer.resize_typed::<U8x3>(&src_view, &mut dst_image, &opts)?;
    Ok(())
}

/// [`Resampler`] backed by a reusable fast_image_resize [`Resizer`].
pub struct FirResampler {
    resizer: Resizer,
}

impl FirResampler {
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
        }
    }
}

impl Default for FirResampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Resampler for FirResampler {
    fn name(&self) -> &'static str {
        "fast_image_resize"
    }

    fn downsample(
        &mut self,
        src: &[u8],
        src_size: Size,
        dst: &mut [u8],
        dst_size: Size,
    ) -> Result<(), ResampleError> {
        resize_rgb_cpu(&mut self.resizer, src, src_size, dst, dst_size, FilterType::Box)
    }

    fn upsample(
        &mut self,
        src: &[u8],
        src_size: Size,
        dst: &mut [u8],
        dst_size: Size,
    ) -> Result<(), ResampleError> {
        resize_rgb_cpu(
            &mut self.resizer,
            src,
            src_size,
            dst,
            dst_size,
            FilterType::Bilinear,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close_to(pixels: &[u8], expected: [u8; 3]) -> bool {
        pixels
            .chunks_exact(3)
            .all(|p| p.iter().zip(expected).all(|(&a, b)| a.abs_diff(b) <= 1))
    }

    // Fixed-point convolution may round a flat color by one step.
    #[test]
    fn solid_frame_stays_solid() {
        let big = Size::new(96, 64);
        let small = Size::new(32, 21);
        let src: Vec<u8> = [40u8, 90, 250].repeat(big.area());

        let mut kernel = FirResampler::new();
        let mut shrunk = vec![0u8; small.byte_len()];
        kernel.downsample(&src, big, &mut shrunk, small).unwrap();
        assert!(close_to(&shrunk, [40, 90, 250]));

        let mut grown = vec![0u8; big.byte_len()];
        kernel.upsample(&shrunk, small, &mut grown, big).unwrap();
        assert!(close_to(&grown, [40, 90, 250]));
    }

    #[test]
    fn destination_must_match_declared_size() {
        let mut kernel = FirResampler::new();
        let src = vec![0u8; Size::new(8, 8).byte_len()];
        let mut dst = vec![0u8; 5];
        let err = kernel
            .downsample(&src, Size::new(8, 8), &mut dst, Size::new(4, 4))
            .unwrap_err();
        assert!(matches!(err, ResampleError::BufferSize { role: "destination", .. }));
    }
}
