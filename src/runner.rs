//! Test-run driver.
//!
//! One run = one invocation of [`run_test`] over a requested attempt count,
//! producing exactly one row in the record file. The driver owns the
//! bookkeeping around the caller's motion routine: run numbering from the
//! record file, the per-run movies directory, the bounded wait for the
//! camera's output path to take effect, the sequential attempt loop under
//! the rolling recorder, and the operator-facing report at the end.
//!
//! There are no retries of the routine itself — reliability measurement is
//! the entire point, so each attempt is one-shot.

use crate::capabilities::FrameWriter;
use crate::error::{Result, TransferError};
use crate::record::{RecordLog, RunRow};
use crate::recorder::{record_attempt, slot_dir};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

/// Bounded wait for the file plugin to acknowledge an output-path write.
const PATH_POLL_RETRIES: u32 = 5;
const PATH_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Parameters for one reliability run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Number of times to call the test routine.
    pub count: usize,
    /// File-name prefix for saved frames.
    pub file_prefix: String,
    /// Ring size: movies kept before a failure.
    pub buffer_len: usize,
    /// Remove the per-run movies tree if every attempt passes.
    pub cleanup: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            count: 1,
            file_prefix: "claw".to_string(),
            buffer_len: 10,
            cleanup: false,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every attempt passed.
    Passed,
    /// The routine failed on `attempt` (zero-based).
    Failed { attempt: usize, error: String },
    /// The operator interrupted the loop during `attempt`.
    Interrupted { attempt: usize },
}

impl RunOutcome {
    /// Whether the run counts as failed in the record file.
    pub fn is_fail(&self) -> bool {
        !matches!(self, RunOutcome::Passed)
    }
}

/// Result of one [`run_test`] invocation, mirrored by the row it appended.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Index of this run in the record file.
    pub run_number: u64,
    /// Attempts requested.
    pub requested: usize,
    /// Attempts that passed before the run stopped.
    pub successes: usize,
    pub outcome: RunOutcome,
    /// Per-run movies directory; `None` once cleaned up.
    pub movies_dir: Option<PathBuf>,
    /// Buffer slots around the failure, most recent first. Empty on a pass.
    pub recent_movies: Vec<PathBuf>,
}

/// Wait until the plugin's output path readback matches `expected`.
///
/// Polls up to [`PATH_POLL_RETRIES`] times at [`PATH_POLL_INTERVAL`]. Fatal
/// on non-convergence: if a plain setting cannot propagate in half a second
/// the control layer is down and no attempt is worth starting.
async fn converge_output_dir(writer: &dyn FrameWriter, expected: &Path) -> Result<()> {
    let mut polls = 0;
    loop {
        let actual = writer.output_dir().await?;
        if actual == expected {
            return Ok(());
        }
        if polls >= PATH_POLL_RETRIES {
            return Err(TransferError::ControlLayerTimeout {
                actual: actual.display().to_string(),
                polls: PATH_POLL_RETRIES,
                poll_ms: PATH_POLL_INTERVAL.as_millis() as u64,
            });
        }
        polls += 1;
        sleep(PATH_POLL_INTERVAL).await;
    }
}

/// Ring slots that may still hold footage of the failing attempt, newest
/// first.
fn recent_slots(movies_dir: &Path, failed_attempt: usize, buffer_len: usize) -> Vec<PathBuf> {
    let oldest = (failed_attempt + 1).saturating_sub(buffer_len);
    (oldest..=failed_attempt)
        .rev()
        .map(|attempt| slot_dir(movies_dir, attempt, buffer_len))
        .collect()
}

/// Run the transfer-reliability loop.
///
/// Calls `routine` up to `config.count` times, each attempt recorded into
/// the rolling movie buffer. A routine error ends the loop early: it is
/// caught here, reported, and logged as the run's failure — never
/// propagated. Flipping the `shutdown` channel (operator interrupt) ends
/// the loop the same way with a distinct message. Either way exactly one
/// row is appended to `log`.
///
/// Errors returned from this function are infrastructure failures (record
/// file I/O, the control layer refusing to converge), not attempt failures.
pub async fn run_test<F, Fut>(
    mut routine: F,
    config: &RunConfig,
    log: &RecordLog,
    writer: &dyn FrameWriter,
    mut shutdown: Option<watch::Receiver<bool>>,
) -> Result<RunReport>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    if config.buffer_len == 0 {
        return Err(TransferError::Config(
            "buffer_len must be at least 1".to_string(),
        ));
    }

    let run_number = log.next_run_number()?;
    let log_dir = log.path().parent().unwrap_or_else(|| Path::new("."));
    let movies_dir = log_dir.join(format!("movies{:05}", run_number));
    std::fs::create_dir_all(&movies_dir)?;

    // Point the plugin at the first slot and make sure the write took
    // before trusting it with a whole run.
    let first_slot = slot_dir(&movies_dir, 0, config.buffer_len);
    std::fs::create_dir_all(&first_slot)?;
    writer.set_output_dir(&first_slot).await?;
    converge_output_dir(writer, &first_slot).await?;
    writer.set_file_prefix(&config.file_prefix).await?;

    tracing::info!(
        run = run_number,
        count = config.count,
        movies = %movies_dir.display(),
        "starting reliability run"
    );

    let mut successes = 0usize;
    let mut outcome = RunOutcome::Passed;
    for attempt in 0..config.count {
        println!("starting round {} of {}", attempt, config.count);

        let interrupt = async {
            match shutdown.as_mut() {
                Some(rx) => loop {
                    if rx.changed().await.is_err() {
                        // sender gone: nobody is left to interrupt the run
                        futures::future::pending::<()>().await;
                    }
                    if *rx.borrow() {
                        break;
                    }
                },
                None => futures::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = interrupt => {
                // The attempt future was dropped mid-flight; make sure the
                // plugin is not left writing into the slot.
                writer.set_capture(false).await?;
                println!("\ncanceled by operator");
                outcome = RunOutcome::Interrupted { attempt };
                break;
            }
            result = record_attempt(
                writer,
                &movies_dir,
                attempt,
                config.buffer_len,
                &mut routine,
            ) => match result {
                Ok(()) => successes += 1,
                Err(err) => {
                    println!("attempt failed: {err}");
                    tracing::warn!(attempt, error = %err, "attempt failed");
                    outcome = RunOutcome::Failed {
                        attempt,
                        error: err.to_string(),
                    };
                    break;
                }
            }
        }
    }

    let fail = outcome.is_fail();
    log.append(RunRow {
        count: config.count as u64,
        success: successes as u64,
        fail: u8::from(fail),
    })?;

    let mut report = RunReport {
        run_number,
        requested: config.count,
        successes,
        outcome,
        movies_dir: Some(movies_dir.clone()),
        recent_movies: Vec::new(),
    };

    if fail {
        // The failing attempt's index equals the success count.
        report.recent_movies = recent_slots(&movies_dir, successes, config.buffer_len);
        println!(
            "told to run {} times, {} passed before the stop",
            config.count, successes
        );
        println!("last {} movies, newest first:", report.recent_movies.len());
        for slot in &report.recent_movies {
            println!("  {}", slot.display());
        }
    } else {
        println!("last {} attempts passed without failure", successes);
        if config.cleanup {
            std::fs::remove_dir_all(&movies_dir)?;
            tracing::info!(movies = %movies_dir.display(), "cleaned up movie buffers");
            report.movies_dir = None;
        }
    }

    Ok(report)
}
