//! # Compressed Container
//!
//! Binary file holding a stream of codec payloads. All integers are
//! little-endian.
//!
//! ```text
//! Header (14 bytes):
//!   orig_width     : i32
//!   orig_height    : i32
//!   fps_millihertz : i32   // fps * 1000, truncated
//!   algorithm_id   : u16
//! Repeated record:
//!   kind           : u8    // 0 = key, 1 = delta
//!   payload_size   : u32
//!   payload        : payload_size bytes
//! ```
//!
//! There is no index, checksum or trailer. The stream ends where the file ends;
//! a record cut short anywhere after its first byte is a format error.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, BytesMut};
use tracing::{debug, warn};

use crate::error::{VcError, VcResult};
use crate::frame::FrameKind;

/// Size of the encoded [`ContainerHeader`].
pub const HEADER_LEN: usize = 14;
/// Size of the kind byte plus the payload length.
pub const RECORD_HEADER_LEN: usize = 5;

/// Stream-level metadata at the start of every container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub orig_width: i32,
    pub orig_height: i32,
    pub fps_millihertz: i32,
    pub algorithm_id: u16,
}

impl ContainerHeader {
    /// Build a header, truncating `fps * 1000` to an integer.
    pub fn new(width: u32, height: u32, fps: f64, algorithm_id: u16) -> VcResult<Self> {
        let dim = |name: &str, v: u32| {
            i32::try_from(v)
                .map_err(|_| VcError::format("container header", format!("{name} {v} overflows i32")))
        };
        if !fps.is_finite() || fps < 0.0 {
            return Err(VcError::format(
                "container header",
                format!("frame rate {fps} is not a non-negative number"),
            ));
        }
        Ok(Self {
            orig_width: dim("width", width)?,
            orig_height: dim("height", height)?,
            // `as` saturates and truncates toward zero.
            fps_millihertz: (fps * 1000.0) as i32,
            algorithm_id,
        })
    }

    pub fn fps(&self) -> f64 {
        f64::from(self.fps_millihertz) / 1000.0
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(HEADER_LEN);
        buf.put_i32_le(self.orig_width);
        buf.put_i32_le(self.orig_height);
        buf.put_i32_le(self.fps_millihertz);
        buf.put_u16_le(self.algorithm_id);
        buf
    }

    pub fn decode(mut buf: &[u8]) -> VcResult<Self> {
        if buf.len() < HEADER_LEN {
            return Err(VcError::format(
                "container header",
                format!("expected {HEADER_LEN} bytes, found {}", buf.len()),
            ));
        }
        Ok(Self {
            orig_width: buf.get_i32_le(),
            orig_height: buf.get_i32_le(),
            fps_millihertz: buf.get_i32_le(),
            algorithm_id: buf.get_u16_le(),
        })
    }
}

/// One framed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub kind: FrameKind,
    pub payload: Vec<u8>,
}

impl Record {
    pub fn is_key(&self) -> bool {
        self.kind.is_key()
    }
}

/// What an open container is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerMode {
    Closed,
    Writing,
    Reading,
}

impl fmt::Display for ContainerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContainerMode::Closed => "closed",
            ContainerMode::Writing => "writing",
            ContainerMode::Reading => "reading",
        })
    }
}

enum Stream {
    Closed,
    Writing(BufWriter<File>),
    Reading(BufReader<File>),
}

/// Reader/writer for container files. One direction per open.
pub struct CompressedContainer {
    stream: Stream,
    header: Option<ContainerHeader>,
    path: Option<PathBuf>,
    records: u64,
}

impl Default for CompressedContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressedContainer {
    pub fn new() -> Self {
        Self {
            stream: Stream::Closed,
            header: None,
            path: None,
            records: 0,
        }
    }

    /// Create or truncate `path` and write the header.
    pub fn open_write(
        &mut self,
        path: impl AsRef<Path>,
        width: u32,
        height: u32,
        fps: f64,
        algorithm_id: u16,
    ) -> VcResult<()> {
        self.close()?;
        let path = path.as_ref();
        let header = ContainerHeader::new(width, height, fps, algorithm_id)?;

        let file = File::create(path).map_err(|e| VcError::io_at("create container", path, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&header.encode())
            .and_then(|()| writer.flush())
            .map_err(|e| VcError::io_at("write container header", path, e))?;

        debug!(path = %path.display(), ?header, "container opened for writing");
        self.stream = Stream::Writing(writer);
        self.header = Some(header);
        self.path = Some(path.to_path_buf());
        self.records = 0;
        Ok(())
    }

    /// Open `path` and read its header.
    pub fn open_read(&mut self, path: impl AsRef<Path>) -> VcResult<ContainerHeader> {
        self.close()?;
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| VcError::io_at("open container", path, e))?;
        let mut reader = BufReader::new(file);

        let mut raw = [0u8; HEADER_LEN];
        let got = read_up_to(&mut reader, &mut raw)
            .map_err(|e| VcError::io_at("read container header", path, e))?;
        let header = ContainerHeader::decode(&raw[..got])?;

        debug!(path = %path.display(), ?header, "container opened for reading");
        self.stream = Stream::Reading(reader);
        self.header = Some(header);
        self.path = Some(path.to_path_buf());
        self.records = 0;
        Ok(header)
    }

    /// Append one record.
    pub fn write_record(&mut self, payload: &[u8], is_key: bool) -> VcResult<()> {
        let mode = self.mode();
        let Stream::Writing(writer) = &mut self.stream else {
            return Err(VcError::state("write record", format!("container is {mode}")));
        };
        let size = u32::try_from(payload.len()).map_err(|_| {
            VcError::format(
                "container record",
                format!("payload of {} bytes exceeds u32::MAX", payload.len()),
            )
        })?;
        let kind = if is_key { FrameKind::Key } else { FrameKind::Delta };

        let mut head = [0u8; RECORD_HEADER_LEN];
        let mut slot = &mut head[..];
        slot.put_u8(kind.to_byte());
        slot.put_u32_le(size);

        writer
            .write_all(&head)
            .and_then(|()| writer.write_all(payload))
            .map_err(|e| io_error("write record", self.path.as_deref(), e))?;
        self.records += 1;
        Ok(())
    }

    /// Read the next record. `Ok(None)` at a clean end of file.
    pub fn read_record(&mut self) -> VcResult<Option<Record>> {
        let mode = self.mode();
        let Stream::Reading(reader) = &mut self.stream else {
            return Err(VcError::state("read record", format!("container is {mode}")));
        };
        let index = self.records;

        let mut head = [0u8; RECORD_HEADER_LEN];
        let got = read_up_to(reader, &mut head)
            .map_err(|e| io_error("read record header", self.path.as_deref(), e))?;
        match got {
            0 => return Ok(None),
            RECORD_HEADER_LEN => {}
            partial => {
                return Err(VcError::format(
                    "container record",
                    format!("record {index} header truncated after {partial} of {RECORD_HEADER_LEN} bytes"),
                ))
            }
        }

        let mut buf = &head[..];
        let kind_byte = buf.get_u8();
        let size = buf.get_u32_le();
        let kind = FrameKind::from_byte(kind_byte).ok_or_else(|| {
            VcError::format(
                "container record",
                format!("record {index} has unknown kind byte {kind_byte}"),
            )
        })?;

        // Grow as data arrives so a corrupt size cannot force a huge allocation.
        let mut payload = Vec::new();
        reader
            .take(u64::from(size))
            .read_to_end(&mut payload)
            .map_err(|e| io_error("read record payload", self.path.as_deref(), e))?;
        if payload.len() != size as usize {
            return Err(VcError::format(
                "container record",
                format!(
                    "record {index} declares {size} payload bytes but only {} remain",
                    payload.len()
                ),
            ));
        }

        self.records += 1;
        Ok(Some(Record { kind, payload }))
    }

    /// Flush and release the file. Safe to call repeatedly.
    pub fn close(&mut self) -> VcResult<()> {
        let stream = std::mem::replace(&mut self.stream, Stream::Closed);
        if let Stream::Writing(mut writer) = stream {
            writer
                .flush()
                .map_err(|e| io_error("flush container", self.path.as_deref(), e))?;
            debug!(records = self.records, "container closed");
        }
        Ok(())
    }

    /// Header of the current (or last) stream.
    pub fn header(&self) -> Option<&ContainerHeader> {
        self.header.as_ref()
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.stream, Stream::Closed)
    }

    pub fn mode(&self) -> ContainerMode {
        match self.stream {
            Stream::Closed => ContainerMode::Closed,
            Stream::Writing(_) => ContainerMode::Writing,
            Stream::Reading(_) => ContainerMode::Reading,
        }
    }

    /// Records written or read since the last open.
    pub fn record_count(&self) -> u64 {
        self.records
    }
}

impl Drop for CompressedContainer {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "container flush on drop failed");
        }
    }
}

fn io_error(operation: &str, path: Option<&Path>, source: std::io::Error) -> VcError {
    match path {
        Some(path) => VcError::io_at(operation, path, source),
        None => VcError::io(operation, source),
    }
}

/// Fill `buf` from `reader`, stopping early only at end of file.
pub(crate) fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
