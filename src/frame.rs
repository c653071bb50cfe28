//! Raw frame model shared by the codecs, the container and the media adapters.

use std::fmt;

use vc_resample::geometry::{Size, CHANNELS};

/// Whether a frame is tagged as independently decodable.
///
/// The tag is carried through the container but does not change how a frame is
/// compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Key,
    Delta,
}

impl FrameKind {
    /// Byte written into container records.
    pub fn to_byte(self) -> u8 {
        match self {
            FrameKind::Key => 0,
            FrameKind::Delta => 1,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(FrameKind::Key),
            1 => Some(FrameKind::Delta),
            _ => None,
        }
    }

    pub fn is_key(self) -> bool {
        self == FrameKind::Key
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrameKind::Key => "key",
            FrameKind::Delta => "delta",
        })
    }
}

/// One raster frame: interleaved 3-channel 8-bit samples, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub sequence_number: i32,
    pub kind: FrameKind,
}

impl Frame {
    /// Wrap a pixel buffer.
    ///
    /// # Panics
    ///
    /// If `pixels.len() != width * height * 3`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        let expected = Size::new(width, height).byte_len();
        assert_eq!(
            pixels.len(),
            expected,
            "frame {width}x{height} needs {expected} bytes"
        );
        Self {
            width,
            height,
            pixels,
            sequence_number: 0,
            kind: FrameKind::Key,
        }
    }

    /// Frame filled with a single color.
    pub fn solid(width: u32, height: u32, color: [u8; CHANNELS]) -> Self {
        let pixels = color.repeat(Size::new(width, height).area());
        Self::new(width, height, pixels)
    }

    pub fn with_sequence(mut self, sequence_number: i32, kind: FrameKind) -> Self {
        self.sequence_number = sequence_number;
        self.kind = kind;
        self
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Byte length of the pixel buffer.
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}
