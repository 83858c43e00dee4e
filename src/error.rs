//! Error types for spatial-mix.
//!
//! Errors are split into two categories:
//! - **Fatal errors** ([`MixerError`]): Prevent the mixer from starting
//! - **Recoverable conditions**: Runtime issues (overflow, starvation,
//!   cadence slips) surfaced via [`MixerEvent`](crate::MixerEvent)

use std::path::PathBuf;

/// Fatal errors that prevent a mixer from starting.
///
/// These errors are returned from [`SpatialMixBuilder::start()`] and indicate
/// that the mixer cannot be created. Runtime conditions (buffer overflow,
/// starved sources, slipped frames) are handled via the event callback
/// instead; nothing inside the running core is fatal.
///
/// [`SpatialMixBuilder::start()`]: crate::SpatialMixBuilder::start
#[derive(Debug, thiserror::Error)]
pub enum MixerError {
    /// No inbound packet channel was wired before starting.
    #[error("no packet source configured - call packet_source() with the inbound channel")]
    NoPacketSource,

    /// No sinks were configured before starting.
    #[error("no sinks configured - add at least one sink")]
    NoSinksConfigured,

    /// A configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong with the configuration.
        reason: String,
    },

    /// A sink failed during initialization.
    #[error("sink '{sink_name}' failed to start: {reason}")]
    SinkStartFailed {
        /// Name of the sink that failed.
        sink_name: String,
        /// Why the sink failed to start.
        reason: String,
    },
}

/// Errors that can occur within a [`Sink`](crate::Sink) implementation.
///
/// Sink errors are recoverable - the mixer emits a
/// [`MixerEvent::SinkError`](crate::MixerEvent::SinkError) and drops the
/// frame for that sink. Frames are perishable; they are never retried.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// A write operation failed.
    #[error("write failed: {reason}")]
    WriteFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// File I/O error.
    #[error("file error: {path}: {source}")]
    FileError {
        /// Path to the file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The receiving channel was closed.
    #[error("channel closed")]
    ChannelClosed,

    /// Custom error for user-implemented sinks.
    #[error("{0}")]
    Custom(String),
}

impl SinkError {
    /// Creates a custom sink error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Creates a write failed error with the given reason.
    pub fn write_failed(reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            reason: reason.into(),
        }
    }

    /// Creates a file error for the given path.
    pub fn file_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileError {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixer_error_display() {
        let err = MixerError::InvalidConfig {
            reason: "samples_per_frame must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration: samples_per_frame must be positive"
        );
    }

    #[test]
    fn test_sink_error_custom() {
        let err = SinkError::custom("something went wrong");
        assert_eq!(err.to_string(), "something went wrong");
    }

    #[test]
    fn test_sink_error_write_failed() {
        let err = SinkError::write_failed("frame dropped");
        assert_eq!(err.to_string(), "write failed: frame dropped");
    }

    #[test]
    fn test_sink_error_file_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = SinkError::file_error("/tmp/listener.wav", io_err);
        assert!(err.to_string().contains("/tmp/listener.wav"));
    }
}
