//! # Codecs
//!
//! A codec turns one raw [`Frame`] into an opaque payload and back. The only
//! family implemented here shrinks each frame spatially on compress and
//! enlarges it back on decompress; see [`downsample`].
//!
//! ## Built-in Variants
//!
//! | Registry name | Algorithm id | Kernel |
//! |---------------|--------------|--------|
//! | `Reference` | 1 | fast_image_resize (box filter down, bilinear filter up) |
//! | `Bilinear` | 2 | scalar bilinear interpolation |
//! | `GpuBilinear` | 3 | wgpu compute bilinear, CPU fallback |
//!
//! All variants share one payload layout, so any of them can decode a stream
//! written by another (with the interpolation differences that implies).

pub mod downsample;
pub mod registry;

pub use downsample::{DownsampleCodec, PayloadHeader, PAYLOAD_HEADER_LEN};
pub use registry::{CodecConstructor, CodecRegistry};

use crate::config::CompressionConfig;
use crate::error::VcResult;
use crate::frame::Frame;

/// Registry name of the fast_image_resize codec.
pub const REFERENCE: &str = "Reference";
/// Registry name of the scalar bilinear codec.
pub const BILINEAR: &str = "Bilinear";
/// Registry name of the GPU bilinear codec.
pub const GPU_BILINEAR: &str = "GpuBilinear";

/// A frame compressor.
///
/// Codecs are used from one thread at a time but may be moved between threads.
pub trait Codec: Send {
    /// Apply settings. Must be called before the first compress/decompress.
    fn initialize(&mut self, config: &CompressionConfig) -> VcResult<()>;

    /// Compress one frame into a payload.
    fn compress(&mut self, frame: &Frame) -> VcResult<Vec<u8>>;

    /// Rebuild a frame from a payload produced by [`Codec::compress`].
    ///
    /// # Returns
    ///
    /// A frame tagged `Key` with sequence number 0; callers re-stamp both.
    fn decompress(&mut self, payload: &[u8]) -> VcResult<Frame>;

    /// Registry name.
    fn name(&self) -> &str;

    /// Identifier written into container headers.
    fn algorithm_id(&self) -> u16;

    /// Human-readable statistics report.
    fn stats(&self) -> String;

    /// Clear statistics. Settings from [`Codec::initialize`] are kept.
    fn reset(&mut self);
}
