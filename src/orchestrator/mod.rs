//! Dispatch-then-poll orchestration.
//!
//! [`Orchestrator::analyze`] is the single entry point used by every flow
//! (upload-then-extract, single-image re-analyze, bulk analyze): it submits
//! one job per unit through the [`Dispatcher`], then polls the accepted jobs
//! in concurrent rounds until each one is terminal or the attempt budget is
//! spent.

mod dispatcher;
mod poller;

pub use dispatcher::Dispatcher;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::OrchestrateError;
use crate::gateway::JobGateway;
use crate::job::{InputPolicy, JobRecord, OrchestrationResult, UnitOfWork};
use poller::{Hooks, Poller};

/// How long to keep polling, and how often.
///
/// The time budget is `max_attempts × poll_interval`; there is no separate
/// wall-clock deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub poll_interval_ms: u64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::batch()
    }
}

impl PollPolicy {
    /// Slow batch extraction after an upload: 60 rounds, 5 s apart.
    pub fn batch() -> Self {
        Self {
            max_attempts: 60,
            poll_interval_ms: 5_000,
        }
    }

    /// Quick feedback for a single re-analyze: 120 rounds, 1 s apart.
    pub fn interactive() -> Self {
        Self {
            max_attempts: 120,
            poll_interval_ms: 1_000,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Apply CLI-style overrides.
    pub fn with_overrides(
        mut self,
        max_attempts: Option<u32>,
        interval_ms: Option<u64>,
    ) -> Self {
        if let Some(max_attempts) = max_attempts {
            self.max_attempts = max_attempts;
        }
        if let Some(interval_ms) = interval_ms {
            self.poll_interval_ms = interval_ms;
        }
        self
    }
}

/// Per-call options for [`Orchestrator::analyze`]. Unset values fall back to
/// the orchestrator's [`PollPolicy`].
#[derive(Default)]
pub struct AnalyzeOptions<'a> {
    pub max_attempts: Option<u32>,
    pub poll_interval: Option<Duration>,
    pub cancel: Option<CancellationToken>,
    hooks: Hooks<'a>,
}

impl<'a> AnalyzeOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Called after every poll round with `(completed, total)`.
    pub fn on_progress(mut self, f: impl FnMut(usize, usize) + 'a) -> Self {
        self.hooks.on_progress = Some(Box::new(f));
        self
    }

    /// Called exactly once per unit, when its record becomes terminal.
    pub fn on_unit_complete(mut self, f: impl FnMut(&str, &JobRecord) + 'a) -> Self {
        self.hooks.on_unit_complete = Some(Box::new(f));
        self
    }
}

/// Entry point for dispatch-and-poll runs against one gateway.
pub struct Orchestrator<G> {
    gateway: G,
    policy: PollPolicy,
    input_policy: InputPolicy,
}

impl<G: JobGateway> Orchestrator<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            policy: PollPolicy::default(),
            input_policy: InputPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_input_policy(mut self, input_policy: InputPolicy) -> Self {
        self.input_policy = input_policy;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Submit every unit, poll every accepted job, and report per-unit
    /// outcomes.
    ///
    /// Fails only on empty input or caller cancellation. Everything else
    /// (invalid input, rejected submissions, failed or timed-out jobs) is
    /// reported in the returned records.
    pub async fn analyze(
        &self,
        units: Vec<UnitOfWork>,
        options: AnalyzeOptions<'_>,
    ) -> Result<OrchestrationResult, OrchestrateError> {
        if units.is_empty() {
            return Err(OrchestrateError::EmptyInput);
        }

        let AnalyzeOptions {
            max_attempts,
            poll_interval,
            cancel,
            mut hooks,
        } = options;
        let max_attempts = max_attempts.unwrap_or(self.policy.max_attempts);
        let interval = poll_interval.unwrap_or_else(|| self.policy.poll_interval());
        let cancel = cancel.unwrap_or_default();

        let run_id = Uuid::new_v4();
        let total = units.len();
        info!(
            %run_id,
            total,
            max_attempts,
            interval_ms = interval.as_millis() as u64,
            "starting orchestration"
        );

        let mut records = Dispatcher::new(&self.gateway, &self.input_policy)
            .dispatch(units)
            .await;

        let submission_failures = records.iter().filter(|r| r.job_id.is_none()).count();
        for record in records.iter().filter(|r| r.job_id.is_none()) {
            hooks.unit_complete(record);
        }
        if submission_failures == total {
            hooks.progress(total, total);
        } else if submission_failures > 0 {
            warn!(%run_id, submission_failures, "some units were not submitted");
        }

        let report = Poller::new(&self.gateway, max_attempts, interval, cancel)
            .run(&mut records, &mut hooks)
            .await;

        let result = OrchestrationResult {
            run_id,
            total,
            submission_failures,
            rounds: report.rounds,
            records,
        };

        if report.cancelled {
            warn!(%run_id, rounds = report.rounds, "orchestration cancelled");
            return Err(OrchestrateError::Cancelled(Box::new(result)));
        }

        info!(
            %run_id,
            rounds = result.rounds,
            summary = %result.summary(),
            "orchestration finished"
        );
        Ok(result)
    }
}
