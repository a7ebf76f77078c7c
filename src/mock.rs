//! Simulated devices behind the capability traits.
//!
//! These stand in for the beamline hardware so the whole reliability loop —
//! attempts, rolling movie buffers, record file — can run on a laptop and in
//! tests. All waits are async-safe (`tokio::time::sleep`, never
//! `std::thread::sleep`).
//!
//! - [`MockPositioner`]: instant or settle-timed axis with fail-after-N
//!   error injection
//! - [`MockSwitch`]: in-memory GPIO line
//! - [`MockFrameWriter`]: file plugin that writes placeholder frames and can
//!   lag its `output_dir` readback to exercise the convergence poll

use crate::capabilities::{FrameWriter, Positioner, Switch};
use anyhow::{bail, Result};
use async_trait::async_trait;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::time::{sleep, Duration};

// =============================================================================
// MockPositioner
// =============================================================================

/// Simulated axis.
///
/// Moves are instant by default; [`MockPositioner::with_settle`] adds a
/// settle delay with a little jitter so loop timing looks like the real
/// thing. [`MockPositioner::fail_after`] injects a hard fault on the N+1-th
/// move for rehearsing the failure path.
pub struct MockPositioner {
    name: &'static str,
    position: Mutex<f64>,
    settle: Duration,
    jitter_ms: u64,
    fail_after: Option<u32>,
    moves: AtomicU32,
}

impl MockPositioner {
    /// Instant axis at position 0.0.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            position: Mutex::new(0.0),
            settle: Duration::ZERO,
            jitter_ms: 0,
            fail_after: None,
            moves: AtomicU32::new(0),
        }
    }

    /// Axis that settles for roughly `settle` per move (±20% jitter).
    pub fn with_settle(name: &'static str, settle: Duration) -> Self {
        Self {
            jitter_ms: settle.as_millis() as u64 / 5,
            settle,
            ..Self::new(name)
        }
    }

    /// Inject a fault: the first `moves` moves succeed, the next one fails.
    pub fn fail_after(mut self, moves: u32) -> Self {
        self.fail_after = Some(moves);
        self
    }

    /// Total moves attempted so far (including the failing one).
    pub fn move_count(&self) -> u32 {
        self.moves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Positioner for MockPositioner {
    async fn move_to(&self, value: f64) -> Result<()> {
        let n = self.moves.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(limit) = self.fail_after {
            if n > limit {
                bail!("{}: injected fault after {} moves", self.name, limit);
            }
        }

        if !self.settle.is_zero() {
            let jitter = if self.jitter_ms > 0 {
                rand::thread_rng().gen_range(0..=self.jitter_ms)
            } else {
                0
            };
            sleep(self.settle + Duration::from_millis(jitter)).await;
        }

        *self.position.lock().unwrap() = value;
        tracing::debug!(axis = self.name, value, "move complete");
        Ok(())
    }

    async fn position(&self) -> Result<f64> {
        Ok(*self.position.lock().unwrap())
    }
}

// =============================================================================
// MockSwitch
// =============================================================================

/// In-memory boolean signal.
pub struct MockSwitch {
    state: AtomicBool,
}

impl MockSwitch {
    pub fn new(initial: bool) -> Self {
        Self {
            state: AtomicBool::new(initial),
        }
    }
}

#[async_trait]
impl Switch for MockSwitch {
    async fn read(&self) -> Result<bool> {
        Ok(self.state.load(Ordering::SeqCst))
    }

    async fn write(&self, value: bool) -> Result<()> {
        self.state.store(value, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// MockFrameWriter
// =============================================================================

struct WriterState {
    capture: bool,
    output_dir: PathBuf,
    /// Output-path write still in flight: (target, readbacks until it lands).
    pending_dir: Option<(PathBuf, u32)>,
    file_prefix: String,
    frame_counter: u64,
}

/// Simulated camera file plugin.
///
/// Every setting takes effect immediately except `output_dir`: like the real
/// control layer, the readback can lag the write. With
/// [`MockFrameWriter::with_path_lag`], the first `polls` calls to
/// `output_dir()` after a `set_output_dir()` still return the old path —
/// enough lag and the harness's bounded convergence poll gives up, exactly
/// as it would on a wedged IOC.
///
/// Frames are produced by calling [`MockFrameWriter::write_frame`] while
/// capture is enabled; each frame is a small placeholder file named
/// `<prefix>_<frame>.tiff`.
pub struct MockFrameWriter {
    state: Mutex<WriterState>,
    path_lag: u32,
    frames_written: AtomicU32,
}

impl MockFrameWriter {
    pub fn new() -> Self {
        Self::with_path_lag(0)
    }

    /// Plugin whose `output_dir` readback lags by `polls` reads.
    pub fn with_path_lag(polls: u32) -> Self {
        Self {
            state: Mutex::new(WriterState {
                capture: false,
                output_dir: PathBuf::new(),
                pending_dir: None,
                file_prefix: String::new(),
                frame_counter: 0,
            }),
            path_lag: polls,
            frames_written: AtomicU32::new(0),
        }
    }

    /// Total frames written across all captures.
    pub fn frames_written(&self) -> u32 {
        self.frames_written.load(Ordering::SeqCst)
    }

    /// Write one placeholder frame into the current output directory.
    ///
    /// Fails if capture is disabled, like a real plugin dropping frames
    /// while disarmed would show up as missing files.
    pub async fn write_frame(&self) -> Result<PathBuf> {
        let path = {
            let mut state = self.state.lock().unwrap();
            if !state.capture {
                bail!("frame writer: capture is disabled");
            }
            let name = format!("{}_{:04}.tiff", state.file_prefix, state.frame_counter);
            state.frame_counter += 1;
            state.output_dir.join(name)
        };
        let mut payload = [0u8; 64];
        rand::thread_rng().fill(&mut payload[..]);
        std::fs::write(&path, payload)?;
        self.frames_written.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(frame = %path.display(), "frame written");
        Ok(path)
    }
}

impl Default for MockFrameWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameWriter for MockFrameWriter {
    async fn set_capture(&self, enabled: bool) -> Result<()> {
        self.state.lock().unwrap().capture = enabled;
        Ok(())
    }

    async fn capture(&self) -> Result<bool> {
        Ok(self.state.lock().unwrap().capture)
    }

    async fn set_output_dir(&self, dir: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if self.path_lag == 0 {
            state.output_dir = dir.to_path_buf();
            state.pending_dir = None;
        } else {
            state.pending_dir = Some((dir.to_path_buf(), self.path_lag));
        }
        Ok(())
    }

    async fn output_dir(&self) -> Result<PathBuf> {
        let mut state = self.state.lock().unwrap();
        if let Some((target, remaining)) = state.pending_dir.take() {
            if remaining > 0 {
                state.pending_dir = Some((target, remaining - 1));
            } else {
                state.output_dir = target;
            }
        }
        Ok(state.output_dir.clone())
    }

    async fn set_file_prefix(&self, prefix: &str) -> Result<()> {
        self.state.lock().unwrap().file_prefix = prefix.to_string();
        Ok(())
    }

    async fn file_prefix(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().file_prefix.clone())
    }

    async fn reset_frame_counter(&self) -> Result<()> {
        self.state.lock().unwrap().frame_counter = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_positioner_moves_and_counts() {
        let axis = MockPositioner::new("rot");
        axis.move_to(5.0).await.unwrap();
        axis.move_to(0.0).await.unwrap();
        assert_eq!(axis.position().await.unwrap(), 0.0);
        assert_eq!(axis.move_count(), 2);
    }

    #[tokio::test]
    async fn test_positioner_fail_after() {
        let axis = MockPositioner::new("rot").fail_after(2);
        assert!(axis.move_to(1.0).await.is_ok());
        assert!(axis.move_to(2.0).await.is_ok());
        let err = axis.move_to(3.0).await.unwrap_err();
        assert!(err.to_string().contains("injected fault"));
    }

    #[tokio::test]
    async fn test_switch_read_write() {
        let line = MockSwitch::new(false);
        assert!(!line.read().await.unwrap());
        line.write(true).await.unwrap();
        assert!(line.read().await.unwrap());
    }

    #[tokio::test]
    async fn test_output_dir_lag_then_converge() {
        let writer = MockFrameWriter::with_path_lag(3);
        writer.set_output_dir(Path::new("/tmp/slot")).await.unwrap();

        // first three readbacks are stale, fourth commits
        for _ in 0..3 {
            assert_ne!(writer.output_dir().await.unwrap(), PathBuf::from("/tmp/slot"));
        }
        assert_eq!(writer.output_dir().await.unwrap(), PathBuf::from("/tmp/slot"));
    }

    #[tokio::test]
    async fn test_write_frame_requires_capture() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MockFrameWriter::new();
        writer.set_output_dir(dir.path()).await.unwrap();
        writer.set_file_prefix("claw").await.unwrap();

        assert!(writer.write_frame().await.is_err());

        writer.set_capture(true).await.unwrap();
        let frame = writer.write_frame().await.unwrap();
        assert_eq!(frame, dir.path().join("claw_0000.tiff"));
        assert!(frame.exists());

        writer.reset_frame_counter().await.unwrap();
        let again = writer.write_frame().await.unwrap();
        assert_eq!(again, dir.path().join("claw_0000.tiff"));
    }
}
