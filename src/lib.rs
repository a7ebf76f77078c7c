//! Reliability test harness for a robotic sample-transfer mechanism.
//!
//! The harness repeatedly triggers a user-supplied motion routine against the
//! beamline's prototype transfer robot, records pass/fail counts to an
//! append-only CSV record file, and keeps a rolling buffer of movie
//! directories for each attempt so that failures can be reviewed afterwards.
//!
//! Hardware is consumed through the capability traits in [`capabilities`]
//! (positioners, GPIO lines, the camera's file-writing plugin); the
//! [`mock`] module provides simulated devices so the whole loop can run
//! without a beamline.
//!
//! # Typical session
//!
//! ```rust,ignore
//! use transfer_rig::record::RecordLog;
//! use transfer_rig::runner::{run_test, RunConfig};
//!
//! let log = RecordLog::new("transfer_record.csv");
//! let config = RunConfig { count: 50, ..Default::default() };
//! let report = run_test(routine, &config, &log, &camera_writer, None).await?;
//! println!("{} of {} attempts passed", report.successes, report.requested);
//! ```

pub mod capabilities;
pub mod error;
pub mod mock;
pub mod record;
pub mod recorder;
pub mod robot;
pub mod runner;

pub use error::{Result, TransferError};
