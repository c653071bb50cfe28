// SPDX-License-Identifier: MIT
//! # Resampling Geometry
//!
//! Size arithmetic shared by every kernel: how large the downsampled image is
//! for a given factor, and which source position each destination pixel maps to.
//!
//! - Integer division floors the target size
//! - Clamp to minimum 1px so tiny frames never produce an empty image
//! - Ratios are computed once per call in `f32`, on the host, so the CPU and
//!   GPU kernels start from identical values

/// Bytes per pixel of every buffer handled by this crate.
pub const CHANNELS: usize = 3;

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    /// Number of pixels.
    pub fn area(self) -> usize {
        self.w as usize * self.h as usize
    }

    /// Length of a tightly packed 3-channel buffer of this size.
    pub fn byte_len(self) -> usize {
        self.area() * CHANNELS
    }

    pub fn is_empty(self) -> bool {
        self.w == 0 || self.h == 0
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// Size of `input` after dividing both sides by `factor`.
///
/// Each side is floored, then clamped to at least one pixel.
pub fn downsampled(input: Size, factor: u32) -> Size {
    let factor = factor.max(1);
    Size {
        w: (input.w / factor).max(1),
        h: (input.h / factor).max(1),
    }
}

/// Which way a resampling call goes. Selects the ratio formula.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Large to small: `(src - 1) / dst`.
    Down,
    /// Small to large, endpoint to endpoint: `(src - 1) / (dst - 1)`.
    Up,
}

/// Source-space step per destination pixel, per axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ratios {
    pub x: f32,
    pub y: f32,
}

/// Compute the interpolation ratios for a resampling call.
///
/// For [`Direction::Up`] a destination side of one pixel has no span to divide;
/// its ratio is 0 so the single pixel maps to the first source sample.
pub fn ratios(src: Size, dst: Size, direction: Direction) -> Ratios {
    Ratios {
        x: axis_ratio(src.w, dst.w, direction),
        y: axis_ratio(src.h, dst.h, direction),
    }
}

fn axis_ratio(src: u32, dst: u32, direction: Direction) -> f32 {
    let span = src.saturating_sub(1) as f32;
    match direction {
        Direction::Down if dst > 0 => span / dst as f32,
        Direction::Up if dst > 1 => span / (dst - 1) as f32,
        _ => 0.0,
    }
}
