//! Client-side dispatch-and-poll orchestration for the scanned-form
//! extraction backend.
//!
//! Units of work (files to upload, or stored images to re-analyze) are
//! submitted concurrently to a [`JobGateway`]; the resulting jobs are then
//! polled in bounded concurrent rounds until each one succeeds, fails, or the
//! attempt budget runs out.
//!
//! ```no_run
//! use scanflow::{AnalyzeOptions, HttpGateway, Orchestrator, PollPolicy, UnitOfWork};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let gateway = HttpGateway::new("http://localhost:8000/api")?;
//! let orchestrator = Orchestrator::new(gateway).with_policy(PollPolicy::interactive());
//!
//! let result = orchestrator
//!     .analyze(
//!         vec![UnitOfWork::analyze("form-0042.png", Some("2024".into()))],
//!         AnalyzeOptions::new().on_progress(|done, total| println!("{done}/{total}")),
//!     )
//!     .await?;
//! println!("{}", result.summary());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod job;
pub mod orchestrator;
pub mod selection;

#[cfg(test)]
mod testing;

pub use config::ScanflowConfig;
pub use error::{OrchestrateError, SubmissionError};
pub use gateway::{GatewayError, HttpGateway, JobGateway, JobId, JobStatus};
pub use job::{JobRecord, JobState, OrchestrationResult, Outcome, Summary, UnitOfWork};
pub use orchestrator::{AnalyzeOptions, Orchestrator, PollPolicy};
pub use selection::Selection;
