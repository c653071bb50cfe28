// SPDX-License-Identifier: MIT
//! # Bilinear Interpolation
//!
//! Plain, scalar bilinear resampling. This is the numerical reference for the
//! whole crate: the GPU shader mirrors this code operation for operation.
//!
//! For each destination pixel the source position is `x * ratio`. The four
//! neighbours `p00, p01, p10, p11` are blended horizontally on the top and
//! bottom rows, then vertically, and the result is rounded by adding 0.5 and
//! truncating. Weights sum to one, so 8-bit inputs never leave `0..=255`.

use crate::geometry::{ratios, Direction, Ratios, Size, CHANNELS};
use crate::{check_buffers, ResampleError, Resampler};

/// Floor, ceil and fractional part of a source position.
#[inline]
fn interpolation_params(pos: u32, ratio: f32, max_dim: u32) -> (usize, usize, f32) {
    let src_pos = pos as f32 * ratio;
    let last = max_dim - 1;
    let floor = (src_pos as u32).min(last);
    let ceil = (floor + 1).min(last);
    (floor as usize, ceil as usize, src_pos - floor as f32)
}

/// Resample `src` into `dst` with precomputed ratios.
///
/// Unchecked: callers run `check_buffers` first. [`downsample`],
/// [`upsample`] and the [`Resampler`] impls are the checked entry points.
///
/// # Panics
///
/// If either size has a zero side or a buffer is shorter than its size.
pub(crate) fn resample(src: &[u8], src_size: Size, dst: &mut [u8], dst_size: Size, ratios: Ratios) {
    let src_stride = src_size.w as usize * CHANNELS;
    let dst_stride = dst_size.w as usize * CHANNELS;

    let columns: Vec<(usize, usize, f32)> = (0..dst_size.w)
        .map(|x| interpolation_params(x, ratios.x, src_size.w))
        .collect();

    for (y, dst_row) in dst.chunks_exact_mut(dst_stride).enumerate() {
        let (y0, y1, fy) = interpolation_params(y as u32, ratios.y, src_size.h);
        let top_row = &src[y0 * src_stride..(y0 + 1) * src_stride];
        let bottom_row = &src[y1 * src_stride..(y1 + 1) * src_stride];

        for (px, &(x0, x1, fx)) in dst_row.chunks_exact_mut(CHANNELS).zip(&columns) {
            for (c, out) in px.iter_mut().enumerate() {
                let p00 = top_row[x0 * CHANNELS + c] as f32;
                let p01 = top_row[x1 * CHANNELS + c] as f32;
                let p10 = bottom_row[x0 * CHANNELS + c] as f32;
                let p11 = bottom_row[x1 * CHANNELS + c] as f32;

                let top = p00 * (1.0 - fx) + p01 * fx;
                let bottom = p10 * (1.0 - fx) + p11 * fx;
                let result = top * (1.0 - fy) + bottom * fy;
                *out = (result + 0.5) as u8;
            }
        }
    }
}

/// Shrink with the `(src - 1) / dst` ratio.
pub fn downsample(
    src: &[u8],
    src_size: Size,
    dst: &mut [u8],
    dst_size: Size,
) -> Result<(), ResampleError> {
    check_buffers(src, src_size, dst, dst_size)?;
    resample(src, src_size, dst, dst_size, ratios(src_size, dst_size, Direction::Down));
    Ok(())
}

/// Enlarge with the endpoint-to-endpoint `(src - 1) / (dst - 1)` ratio.
pub fn upsample(
    src: &[u8],
    src_size: Size,
    dst: &mut [u8],
    dst_size: Size,
) -> Result<(), ResampleError> {
    check_buffers(src, src_size, dst, dst_size)?;
    resample(src, src_size, dst, dst_size, ratios(src_size, dst_size, Direction::Up));
    Ok(())
}

/// [`Resampler`] over the scalar kernel. Stateless.
#[derive(Debug, Default, Clone, Copy)]
pub struct BilinearResampler;

impl BilinearResampler {
    pub fn new() -> Self {
        Self
    }
}

impl Resampler for BilinearResampler {
    fn name(&self) -> &'static str {
        "bilinear"
    }

    fn downsample(
        &mut self,
        src: &[u8],
        src_size: Size,
        dst: &mut [u8],
        dst_size: Size,
    ) -> Result<(), ResampleError> {
        downsample(src, src_size, dst, dst_size)
    }

    fn upsample(
        &mut self,
        src: &[u8],
        src_size: Size,
        dst: &mut [u8],
        dst_size: Size,
    ) -> Result<(), ResampleError> {
        upsample(src, src_size, dst, dst_size)
    }
}
