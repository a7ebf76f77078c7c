//! Rolling motion recorder.
//!
//! Movies of each attempt land in a fixed ring of numbered directories
//! (`00`..`buffer_len - 1`) under a per-run base directory, so disk usage
//! stays bounded no matter how many attempts a run makes. Attempt `j`
//! overwrites slot `j % buffer_len`.
//!
//! [`record_attempt`] is the scoped wrapper around one attempt: it prepares
//! the slot, enables capture, awaits the caller's motion routine, and always
//! turns capture back off before handing the routine's result back — a
//! failed attempt never leaves the plugin writing into a stale slot.

use crate::capabilities::FrameWriter;
use crate::error::{Result, TransferError};
use std::future::Future;
use std::path::{Path, PathBuf};

/// Directory used for attempt `attempt` in a ring of `buffer_len` slots.
///
/// Slot names are the attempt number modulo the ring size, zero-padded to
/// two digits, under `base_dir`.
pub fn slot_dir(base_dir: &Path, attempt: usize, buffer_len: usize) -> PathBuf {
    base_dir.join(format!("{:02}", attempt % buffer_len))
}

/// Delete leftover frames from a previous lap of the ring.
///
/// Only plain files whose names start with `prefix` are removed; anything
/// else in the slot (notes an operator dropped in, nested dirs) is kept.
fn clear_slot(slot: &Path, prefix: &str) -> Result<()> {
    for entry in std::fs::read_dir(slot)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with(prefix) {
            tracing::debug!(file = %entry.path().display(), "clearing stale frame");
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Record one attempt into its ring slot.
///
/// Prepares slot `attempt % buffer_len` under `base_dir` (creating it and
/// deleting frames left over from the previous lap), resets the plugin's
/// frame counter, enables capture, and awaits `routine`. Capture is disabled
/// again before this function returns, whether the routine succeeded or
/// failed; the routine's error takes precedence over any error from the
/// disable itself.
pub async fn record_attempt<F, Fut>(
    writer: &dyn FrameWriter,
    base_dir: &Path,
    attempt: usize,
    buffer_len: usize,
    routine: F,
) -> Result<()>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    writer.set_capture(false).await?;

    let slot = slot_dir(base_dir, attempt, buffer_len);
    std::fs::create_dir_all(&slot)?;
    writer.set_output_dir(&slot).await?;

    let prefix = writer.file_prefix().await?;
    clear_slot(&slot, &prefix)?;
    writer.reset_frame_counter().await?;

    writer.set_capture(true).await?;
    tracing::debug!(slot = %slot.display(), attempt, "capture armed");

    let outcome = routine().await;
    let disarm = writer.set_capture(false).await;

    outcome.map_err(TransferError::Device)?;
    disarm?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_wraps_at_buffer_len() {
        let base = Path::new("/data/movies00003");
        assert_eq!(slot_dir(base, 0, 10), base.join("00"));
        assert_eq!(slot_dir(base, 9, 10), base.join("09"));
        assert_eq!(slot_dir(base, 10, 10), base.join("00"));
        assert_eq!(slot_dir(base, 23, 10), base.join("03"));
        // always two digits
        assert_eq!(slot_dir(base, 3, 4), base.join("03"));
    }

    #[test]
    fn test_clear_slot_matches_prefix_only() {
        let dir = tempfile::tempdir().unwrap();
        let slot = dir.path();
        std::fs::write(slot.join("claw_0000.tiff"), b"x").unwrap();
        std::fs::write(slot.join("claw_0001.tiff"), b"x").unwrap();
        std::fs::write(slot.join("notes.txt"), b"keep me").unwrap();

        clear_slot(slot, "claw").unwrap();

        assert!(!slot.join("claw_0000.tiff").exists());
        assert!(!slot.join("claw_0001.tiff").exists());
        assert!(slot.join("notes.txt").exists());
    }
}
