//! The two backend operations the orchestrator consumes: submit a unit of
//! work, and poll a job's status.

pub mod client;
pub mod error;
pub mod types;

pub use client::HttpGateway;
pub use error::GatewayError;
pub use types::{ImageSummary, JobId, JobStatus};

use crate::job::UnitOfWork;

/// Anything that can accept work and report on it.
///
/// Implementations must tolerate concurrent calls: the dispatcher and the
/// poller issue all calls of a batch before awaiting any of them.
#[allow(async_fn_in_trait)]
pub trait JobGateway {
    /// Enqueue one unit of work and return the backend's job id.
    async fn submit(&self, unit: &UnitOfWork) -> Result<JobId, GatewayError>;

    /// Current status of a previously submitted job.
    async fn poll(&self, job_id: &JobId) -> Result<JobStatus, GatewayError>;
}

impl<G: JobGateway> JobGateway for &G {
    async fn submit(&self, unit: &UnitOfWork) -> Result<JobId, GatewayError> {
        (**self).submit(unit).await
    }

    async fn poll(&self, job_id: &JobId) -> Result<JobStatus, GatewayError> {
        (**self).poll(job_id).await
    }
}
