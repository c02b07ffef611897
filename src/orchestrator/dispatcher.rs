use futures::future::join_all;
use tracing::{debug, warn};

use crate::gateway::JobGateway;
use crate::job::{InputPolicy, JobRecord, UnitOfWork};

/// Fans out one submission per unit of work.
pub struct Dispatcher<'a, G> {
    gateway: &'a G,
    input_policy: &'a InputPolicy,
}

impl<'a, G: JobGateway> Dispatcher<'a, G> {
    pub fn new(gateway: &'a G, input_policy: &'a InputPolicy) -> Self {
        Self {
            gateway,
            input_policy,
        }
    }

    /// Submits every unit concurrently and returns one record per unit, in
    /// input order.
    ///
    /// Invalid units are rejected locally and never reach the gateway. A
    /// failed submission yields a terminal `Failed` record; nothing is
    /// retried.
    pub async fn dispatch(&self, units: Vec<UnitOfWork>) -> Vec<JobRecord> {
        join_all(units.iter().map(|unit| self.submit_one(unit))).await
    }

    async fn submit_one(&self, unit: &UnitOfWork) -> JobRecord {
        if let Err(err) = unit.validate(self.input_policy) {
            warn!(unit = unit.unit_ref(), error = %err, "rejected before submission");
            return JobRecord::rejected(unit.unit_ref(), err);
        }

        match self.gateway.submit(unit).await {
            Ok(job_id) => {
                debug!(unit = unit.unit_ref(), %job_id, "submitted");
                JobRecord::submitted(unit.unit_ref(), job_id)
            }
            Err(err) => {
                warn!(unit = unit.unit_ref(), error = %err, "submission failed");
                JobRecord::rejected(unit.unit_ref(), err.into())
            }
        }
    }
}
