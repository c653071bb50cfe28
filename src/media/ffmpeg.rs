//! # ffmpeg Frame I/O
//!
//! Raw frame transport through `ffmpeg` subprocesses:
//!
//! - [`FfmpegFrameSource`]: `ffprobe -of json` for metadata, then
//!   `ffmpeg -i <input> -f rawvideo -pix_fmt bgr24 -` read from stdout
//! - [`FfmpegFrameSink`]: `ffmpeg -f rawvideo -pix_fmt bgr24 -s WxH -r fps -i -`
//!   fed through stdin, encoded as libx264/yuv420p; odd widths or heights are
//!   padded up to even because yuv420p subsamples chroma by two
//!
//! Frames cross the pipe as tightly packed `bgr24`, the same layout the codecs
//! use. Both tools must be on `PATH` (see the `check_deps` binary).

use std::ffi::OsString;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::Deserialize;
use tracing::{debug, info, warn};
use vc_resample::geometry::Size;

use super::{check_frame_size, FrameSink, FrameSource, VideoMetadata};
use crate::container::read_up_to;
use crate::error::{VcError, VcResult};
use crate::frame::{Frame, FrameKind};

const FFMPEG: &str = "ffmpeg";
const FFPROBE: &str = "ffprobe";

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

/// Parse an ffprobe rational such as `30000/1001`. `None` for `0/0` and junk.
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let (num, den) = match rate.split_once('/') {
        Some((num, den)) => (num.trim().parse::<f64>().ok()?, den.trim().parse::<f64>().ok()?),
        None => (rate.trim().parse::<f64>().ok()?, 1.0),
    };
    let fps = num / den;
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// Extract the first video stream's metadata from `ffprobe -of json` output.
pub fn parse_probe_output(json: &str) -> VcResult<VideoMetadata> {
    let probe: ProbeOutput = serde_json::from_str(json)?;
    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| VcError::external(FFPROBE, "no video stream found"))?;
    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        (w, h) => {
            return Err(VcError::external(
                FFPROBE,
                format!("video stream has no usable size ({w:?}x{h:?})"),
            ))
        }
    };
    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.avg_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(super::DEFAULT_FPS);
    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse().ok())
        .unwrap_or(0);
    Ok(VideoMetadata::new(width, height, fps, frame_count))
}

fn spawn_error(program: &OsString, e: std::io::Error) -> VcError {
    VcError::external(
        program.to_string_lossy(),
        format!("failed to spawn ({e}); ensure it is installed and on PATH"),
    )
}

/// Reads `bgr24` frames from an `ffmpeg` decoder subprocess.
pub struct FfmpegFrameSource {
    ffmpeg: OsString,
    ffprobe: OsString,
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
    metadata: Option<VideoMetadata>,
    next_sequence: i32,
}

impl Default for FfmpegFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegFrameSource {
    pub fn new() -> Self {
        Self::with_programs(FFMPEG, FFPROBE)
    }

    /// Use specific `ffmpeg`/`ffprobe` executables.
    pub fn with_programs(ffmpeg: impl Into<OsString>, ffprobe: impl Into<OsString>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            child: None,
            stdout: None,
            metadata: None,
            next_sequence: 0,
        }
    }

    fn probe(&self, path: &Path) -> VcResult<VideoMetadata> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,r_frame_rate,avg_frame_rate,nb_frames",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| spawn_error(&self.ffprobe, e))?;
        if !output.status.success() {
            return Err(VcError::external(
                self.ffprobe.to_string_lossy(),
                format!(
                    "exited with {} probing '{}': {}",
                    output.status,
                    path.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    /// Wait for the decoder after end of stream.
    fn finish(&mut self) -> VcResult<()> {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let status = child.wait().map_err(|e| VcError::io("wait for ffmpeg decoder", e))?;
            if !status.success() {
                return Err(VcError::external(
                    self.ffmpeg.to_string_lossy(),
                    format!("decoder exited with {status}"),
                ));
            }
        }
        Ok(())
    }
}

impl FrameSource for FfmpegFrameSource {
    fn open(&mut self, path: &Path) -> VcResult<VideoMetadata> {
        self.close()?;
        let metadata = self.probe(path)?;

        let mut child = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "bgr24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| spawn_error(&self.ffmpeg, e))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VcError::external(self.ffmpeg.to_string_lossy(), "stdout not available"))?;

        info!(
            path = %path.display(),
            width = metadata.width,
            height = metadata.height,
            fps = metadata.fps,
            frames = metadata.frame_count,
            "video source opened"
        );
        self.child = Some(child);
        self.stdout = Some(BufReader::new(stdout));
        self.metadata = Some(metadata);
        self.next_sequence = 0;
        Ok(metadata)
    }

    fn read_next(&mut self) -> VcResult<Option<Frame>> {
        let (Some(stdout), Some(meta)) = (self.stdout.as_mut(), self.metadata) else {
            return Ok(None);
        };
        let size = Size::new(meta.width, meta.height);
        let mut pixels = vec![0u8; size.byte_len()];
        let got = read_up_to(stdout, &mut pixels).map_err(|e| VcError::io("read decoded frame", e))?;

        if got == 0 {
            self.finish()?;
            return Ok(None);
        }
        if got < pixels.len() {
            return Err(VcError::format(
                "ffmpeg source",
                format!(
                    "frame {} truncated: {got} of {} bytes",
                    self.next_sequence,
                    pixels.len()
                ),
            ));
        }

        let frame = Frame::new(meta.width, meta.height, pixels).with_sequence(self.next_sequence, FrameKind::Key);
        self.next_sequence += 1;
        Ok(Some(frame))
    }

    fn metadata(&self) -> Option<VideoMetadata> {
        self.metadata
    }

    fn close(&mut self) -> VcResult<()> {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            // Stopped before end of stream; the decoder's exit status is moot.
            if let Err(e) = child.kill() {
                debug!(error = %e, "ffmpeg decoder already exited");
            }
            let _ = child.wait();
        }
        Ok(())
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// yuv420p needs even dimensions; odd sides get one black padding column/row.
const EVEN_PAD_FILTER: &str = "pad=ceil(iw/2)*2:ceil(ih/2)*2";

/// Command line for the H.264 encoder reading raw `bgr24` from stdin.
fn encoder_args(path: &Path, width: u32, height: u32, fps: f64) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-y",
        "-loglevel",
        "error",
        // Raw frames in from stdin
        "-f",
        "rawvideo",
        "-pix_fmt",
        "bgr24",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push("-s".into());
    args.push(format!("{width}x{height}").into());
    args.push("-r".into());
    args.push(fps.to_string().into());
    args.extend(
        [
            "-i",
            "-",
            "-an",
            "-vf",
            EVEN_PAD_FILTER,
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
        ]
        .into_iter()
        .map(OsString::from),
    );
    args.push(path.as_os_str().to_owned());
    args
}

struct Encoder {
    child: Child,
    stdin: ChildStdin,
    path: PathBuf,
    width: u32,
    height: u32,
    frames: u64,
}

/// Encodes `bgr24` frames to H.264 through an `ffmpeg` subprocess.
pub struct FfmpegFrameSink {
    ffmpeg: OsString,
    encoder: Option<Encoder>,
}

impl Default for FfmpegFrameSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegFrameSink {
    pub fn new() -> Self {
        Self::with_program(FFMPEG)
    }

    pub fn with_program(ffmpeg: impl Into<OsString>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            encoder: None,
        }
    }
}

impl FrameSink for FfmpegFrameSink {
    fn open(&mut self, path: &Path, width: u32, height: u32, fps: f64) -> VcResult<()> {
        self.close()?;
        let mut child = Command::new(&self.ffmpeg)
            .args(encoder_args(path, width, height, fps))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| spawn_error(&self.ffmpeg, e))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| VcError::external(self.ffmpeg.to_string_lossy(), "stdin not available"))?;

        info!(path = %path.display(), width, height, fps, "video sink opened");
        self.encoder = Some(Encoder {
            child,
            stdin,
            path: path.to_path_buf(),
            width,
            height,
            frames: 0,
        });
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> VcResult<()> {
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| VcError::state("write frame", "video sink is closed"))?;
        check_frame_size("ffmpeg sink", frame, encoder.width, encoder.height)?;
        encoder
            .stdin
            .write_all(&frame.pixels)
            .map_err(|e| VcError::io_at("pipe frame to ffmpeg", &encoder.path, e))?;
        encoder.frames += 1;
        Ok(())
    }

    fn close(&mut self) -> VcResult<()> {
        let Some(encoder) = self.encoder.take() else {
            return Ok(());
        };
        let Encoder {
            mut child,
            stdin,
            path,
            frames,
            ..
        } = encoder;
        // Closing stdin lets ffmpeg finalize the file.
        drop(stdin);
        let status = child
            .wait()
            .map_err(|e| VcError::io_at("wait for ffmpeg encoder", &path, e))?;
        if !status.success() {
            return Err(VcError::external(
                self.ffmpeg.to_string_lossy(),
                format!("encoder exited with {status} writing '{}'", path.display()),
            ));
        }
        debug!(path = %path.display(), frames, "video sink closed");
        Ok(())
    }
}

impl Drop for FfmpegFrameSink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "video sink close on drop failed");
        }
    }
}
