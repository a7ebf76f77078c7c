//! CLI entry point for transfer-rig.
//!
//! Provides a command-line interface for:
//! - Rehearsing the reliability loop against simulated hardware
//! - Summarizing an existing record file
//!
//! On a beamline the harness is driven from an interactive session with
//! real device handles; this binary wires the same loop to the mock rig so
//! the bookkeeping (record file, rolling movie buffers, failure report) can
//! be exercised anywhere.
//!
//! # Usage
//!
//! Run 20 attempts, keeping 10 movie buffers, injecting a fault on the 6th:
//! ```bash
//! transfer-rig run --log record.csv --count 20 --fail-after 5
//! ```
//!
//! Successes between failures from an existing record file:
//! ```bash
//! transfer-rig stats --log record.csv
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use transfer_rig::mock::{MockFrameWriter, MockPositioner};
use transfer_rig::record::RecordLog;
use transfer_rig::robot::simple_rotation;
use transfer_rig::runner::{run_test, RunConfig, RunOutcome};

#[derive(Parser)]
#[command(name = "transfer-rig")]
#[command(about = "Sample-transfer reliability test harness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reliability loop against simulated hardware
    Run {
        /// CSV record file (created with its header if missing)
        #[arg(long, default_value = "transfer_record.csv")]
        log: PathBuf,

        /// Number of attempts
        #[arg(long, default_value_t = 10)]
        count: usize,

        /// Movies kept before a failure (ring size)
        #[arg(long, default_value_t = 10)]
        buffer_len: usize,

        /// File-name prefix for saved frames
        #[arg(long, default_value = "claw")]
        prefix: String,

        /// Remove the per-run movies tree if every attempt passes
        #[arg(long)]
        cleanup: bool,

        /// Inject a rotation-axis fault after this many attempts
        #[arg(long)]
        fail_after: Option<u32>,

        /// Settle time per simulated move, in milliseconds
        #[arg(long, default_value_t = 0)]
        settle_ms: u64,
    },

    /// Successes between failures from an existing record file
    Stats {
        /// CSV record file to analyze
        #[arg(long)]
        log: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            log,
            count,
            buffer_len,
            prefix,
            cleanup,
            fail_after,
            settle_ms,
        } => {
            let config = RunConfig {
                count,
                file_prefix: prefix,
                buffer_len,
                cleanup,
            };
            run_against_mock(log, config, fail_after, settle_ms).await
        }
        Commands::Stats { log } => print_stats(&log),
    }
}

async fn run_against_mock(
    log_path: PathBuf,
    config: RunConfig,
    fail_after: Option<u32>,
    settle_ms: u64,
) -> Result<()> {
    println!("transfer-rig: reliability loop against simulated hardware");

    let settle = std::time::Duration::from_millis(settle_ms);
    let rot = match fail_after {
        // simple_rotation makes three moves per attempt
        Some(attempts) => MockPositioner::with_settle("rot", settle).fail_after(attempts * 3),
        None => MockPositioner::with_settle("rot", settle),
    };
    let rot = Arc::new(rot);
    let writer = Arc::new(MockFrameWriter::new());
    let log = RecordLog::new(&log_path);

    // Ctrl-C ends the attempt loop in an orderly way: the row is still
    // logged and the buffer report still printed.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let routine_writer = writer.clone();
    let routine_rot = rot.clone();
    let routine = move || {
        let writer = routine_writer.clone();
        let rot = routine_rot.clone();
        async move {
            writer.write_frame().await?;
            simple_rotation(rot.as_ref()).await?;
            writer.write_frame().await?;
            Ok(())
        }
    };

    let report = run_test(routine, &config, &log, writer.as_ref(), Some(shutdown_rx)).await?;

    println!();
    println!(
        "run {:05}: {}/{} attempts passed, {} frames written",
        report.run_number,
        report.successes,
        report.requested,
        writer.frames_written()
    );
    println!("record appended to {}", log_path.display());
    if let RunOutcome::Failed { attempt, error } = &report.outcome {
        println!("failure on attempt {attempt}: {error}");
    }
    Ok(())
}

fn print_stats(log_path: &std::path::Path) -> Result<()> {
    let log = RecordLog::new(log_path);
    let lengths = log.successes_between_failures()?;
    if lengths.is_empty() {
        println!("{}: no runs logged yet", log_path.display());
        return Ok(());
    }
    println!("successful attempts between failures (first and last spans may be truncated):");
    for (span, successes) in lengths.iter().enumerate() {
        println!("  span {span:>3}: {successes}");
    }
    Ok(())
}
