//! # Error Handling
//!
//! Error types for the compressor library: one enum, [`VcError`], grouping every
//! failure by the layer it comes from, plus a small classification surface.
//!
//! ## Categories
//!
//! - **Config**: invalid settings, unknown codec names, duplicate registrations
//! - **Io**: file open/read/write failures, with the operation and path
//! - **Format**: malformed container bytes, codec payloads or frame shapes
//! - **State**: an operation called in the wrong container/pipeline state
//! - **External**: an `ffmpeg`/`ffprobe` subprocess that failed or misbehaved
//! - **Device**: GPU failures; absorbed by the GPU codec's CPU fallback
//!
//! Nothing is retried automatically. Every category except `Device` ends the
//! stream that produced it; see [`classify::is_fatal`].
//!
//! ## Usage
//!
//! ```rust
//! use vcompress::error::{classify, ErrorSeverity, HasSeverity, VcError};
//!
//! let error = VcError::format("container", "truncated record header");
//! assert_eq!(error.category(), "format");
//! assert_eq!(error.severity(), ErrorSeverity::Fatal);
//! assert!(classify::is_fatal(&error));
//! ```

use std::path::PathBuf;

use vc_resample::ResampleError;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Degraded but still producing correct output
    Warning,
    /// The current operation failed; the caller may continue with other work
    Error,
    /// The stream cannot continue
    Fatal,
}

/// Base error type for the compressor library
#[derive(thiserror::Error, Debug)]
pub enum VcError {
    /// Configuration validation errors
    #[error("invalid configuration for '{field}': {reason}")]
    Config { field: String, reason: String },

    /// I/O errors
    #[error("I/O error during {operation}{}: {source}", display_path(.path))]
    Io {
        operation: String,
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// Malformed bytes or mismatched shapes
    #[error("format error in {context}: {reason}")]
    Format { context: String, reason: String },

    /// Operation not valid in the current state
    #[error("cannot {operation} while {state}")]
    State { operation: String, state: String },

    /// External tool failures
    #[error("{tool} failed: {reason}")]
    External { tool: String, reason: String },

    /// GPU device failures
    #[error("GPU device error: {reason}")]
    Device { reason: String },
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" on '{}'", p.display()),
        None => String::new(),
    }
}

/// Result type alias for compressor operations
pub type VcResult<T> = Result<T, VcError>;

impl VcError {
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
        }
    }

    /// I/O error tied to a specific file.
    pub fn io_at(
        operation: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            operation: operation.into(),
            path: Some(path.into()),
            source,
        }
    }

    pub fn format(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub fn state(operation: impl Into<String>, state: impl std::fmt::Display) -> Self {
        Self::State {
            operation: operation.into(),
            state: state.to_string(),
        }
    }

    pub fn external(tool: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::External {
            tool: tool.into(),
            reason: reason.to_string(),
        }
    }

    pub fn device(reason: impl Into<String>) -> Self {
        Self::Device {
            reason: reason.into(),
        }
    }

    /// Short machine-friendly category name.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Io { .. } => "io",
            Self::Format { .. } => "format",
            Self::State { .. } => "state",
            Self::External { .. } => "external",
            Self::Device { .. } => "device",
        }
    }
}

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for VcError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Device { .. } => ErrorSeverity::Warning,
            Self::Config { .. } | Self::State { .. } => ErrorSeverity::Error,
            Self::Io { .. } | Self::Format { .. } | Self::External { .. } => ErrorSeverity::Fatal,
        }
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// Check if an error ends the stream that produced it
    pub fn is_fatal(error: &VcError) -> bool {
        !matches!(error, VcError::Device { .. })
    }

    /// Check if an error was caused by the caller rather than the data
    pub fn is_usage_error(error: &VcError) -> bool {
        matches!(error, VcError::Config { .. } | VcError::State { .. })
    }
}

impl From<std::io::Error> for VcError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<serde_json::Error> for VcError {
    fn from(error: serde_json::Error) -> Self {
        Self::external("ffprobe", format!("unparseable JSON output: {error}"))
    }
}

impl From<ResampleError> for VcError {
    fn from(error: ResampleError) -> Self {
        match error {
            ResampleError::Device(reason) => Self::device(reason),
            other => Self::format("resample", other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_mentions_operation_and_path() {
        let err = VcError::io_at(
            "open container",
            "/tmp/missing.vcomp",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        let text = err.to_string();
        assert!(text.contains("open container"));
        assert!(text.contains("/tmp/missing.vcomp"));
        assert_eq!(err.category(), "io");
    }

    #[test]
    fn only_device_errors_are_non_fatal() {
        assert!(!classify::is_fatal(&VcError::device("adapter lost")));
        assert!(classify::is_fatal(&VcError::config("quality", "out of range")));
        assert!(classify::is_fatal(&VcError::state("write record", "reading")));
        assert!(classify::is_fatal(&VcError::external("ffmpeg", "exit status 1")));
    }

    #[test]
    fn severity_orders_by_impact() {
        assert!(VcError::device("x").severity() < VcError::config("a", "b").severity());
        assert_eq!(
            VcError::format("payload", "short").severity(),
            ErrorSeverity::Fatal
        );
    }

    #[test]
    fn resample_errors_map_by_kind() {
        let device: VcError = ResampleError::Device("no adapter".into()).into();
        assert_eq!(device.category(), "device");

        let shape: VcError = ResampleError::EmptyImage(0, 4).into();
        assert_eq!(shape.category(), "format");
    }

    #[test]
    fn usage_errors_are_config_or_state() {
        assert!(classify::is_usage_error(&VcError::config("algorithm", "unknown")));
        assert!(!classify::is_usage_error(&VcError::format("header", "short")));
    }
}
