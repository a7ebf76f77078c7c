//! Device capability traits.
//!
//! The harness never talks to an instrument-control library directly.
//! Devices are consumed through small capability traits so that the same
//! code drives real hardware behind an EPICS-style control layer or the
//! simulated devices in [`crate::mock`].
//!
//! Each capability trait:
//! - Is async (uses `#[async_trait]`)
//! - Is thread-safe (requires `Send + Sync`)
//! - Uses `anyhow::Result` for errors
//! - Focuses on ONE thing

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Capability: controllable axis with a blocking move.
///
/// # Contract
/// - Positions are in device-native units (typically mm or degrees)
/// - `move_to` returns only once the underlying control layer reports the
///   move complete; there is no separate settle step
/// - `position` returns the current readback (exact once a move returned)
#[async_trait]
pub trait Positioner: Send + Sync {
    /// Move to an absolute position and wait for completion.
    async fn move_to(&self, value: f64) -> Result<()>;

    /// Current readback position.
    async fn position(&self) -> Result<f64>;
}

/// Capability: boolean signal (GPIO line, gripper feedback, limit switch).
///
/// # Contract
/// - `write` takes effect immediately on the control layer
/// - `read` returns the current line state
#[async_trait]
pub trait Switch: Send + Sync {
    /// Read the line state.
    async fn read(&self) -> Result<bool>;

    /// Drive the line.
    async fn write(&self, value: bool) -> Result<()>;
}

/// Capability: camera file plugin.
///
/// The file plugin writes acquired frames to disk as
/// `<output_dir>/<file_prefix>_<frame>.<ext>`; exposure details and the
/// name template are assumed to be configured ahead of time.
///
/// # Contract
/// - `set_capture(true)` starts writing frames, `set_capture(false)` stops
/// - `set_output_dir` is only eventually consistent: the control layer
///   acknowledges the write asynchronously, so callers that depend on the
///   new path must poll `output_dir` until it matches (see
///   [`crate::runner`]'s bounded convergence poll)
/// - `reset_frame_counter` restarts frame numbering at zero for the next
///   capture
#[async_trait]
pub trait FrameWriter: Send + Sync {
    /// Enable or disable frame writing.
    async fn set_capture(&self, enabled: bool) -> Result<()>;

    /// Whether frames are currently being written.
    async fn capture(&self) -> Result<bool>;

    /// Request a new output directory (eventually consistent).
    async fn set_output_dir(&self, dir: &Path) -> Result<()>;

    /// The output directory the plugin is currently writing into.
    async fn output_dir(&self) -> Result<PathBuf>;

    /// Set the file-name prefix for saved frames.
    async fn set_file_prefix(&self, prefix: &str) -> Result<()>;

    /// The configured file-name prefix.
    async fn file_prefix(&self) -> Result<String>;

    /// Restart frame numbering at zero.
    async fn reset_frame_counter(&self) -> Result<()>;
}
