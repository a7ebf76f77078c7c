//! Error types for the transfer harness.
//!
//! Device capabilities themselves return `anyhow::Result` (any failure of
//! the motion routine is opaque to the harness — it only needs to know the
//! attempt failed). `TransferError` is the typed surface of the harness
//! itself: configuration problems, the fatal control-layer timeout, and the
//! robot's logical preconditions.

use thiserror::Error;

/// Convenience alias for results using the harness error type.
pub type Result<T> = std::result::Result<T, TransferError>;

/// Primary error type for the transfer harness.
#[derive(Error, Debug)]
pub enum TransferError {
    /// The file plugin never acknowledged an output-path write.
    ///
    /// Raised when the camera's `output_dir` readback does not converge on
    /// the requested path within the bounded poll (5 retries of 100 ms).
    /// This is fatal: it means the external control layer itself is
    /// unresponsive, not that an attempt failed.
    #[error(
        "file plugin output path is still '{actual}' after {polls} polls of \
         {poll_ms}ms; the control layer is unresponsive"
    )]
    ControlLayerTimeout {
        actual: String,
        polls: u32,
        poll_ms: u64,
    },

    /// Precondition: the claw must hold a sample before placing one.
    #[error("claw does not hold a sample")]
    NoSampleHeld,

    /// No feed position is mapped for the requested socket.
    #[error("no feed position mapped for socket {0}")]
    UnknownSocket(usize),

    /// Invalid harness parameter (e.g. a zero-length movie buffer).
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem maintenance of the record file or movie buffers failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The record file could not be read or written.
    #[error("record log error: {0}")]
    Csv(#[from] csv::Error),

    /// A device capability call failed.
    #[error(transparent)]
    Device(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_names_the_path() {
        let err = TransferError::ControlLayerTimeout {
            actual: "/data/movies00000/05".into(),
            polls: 5,
            poll_ms: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("/data/movies00000/05"));
        assert!(msg.contains("unresponsive"));
    }

    #[test]
    fn test_device_error_is_transparent() {
        let err: TransferError = anyhow::anyhow!("axis fault 0x31").into();
        assert_eq!(err.to_string(), "axis fault 0x31");
    }
}
