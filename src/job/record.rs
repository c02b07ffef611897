use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::state::{JobState, Transition};
use crate::error::SubmissionError;
use crate::gateway::{GatewayError, JobId, JobStatus};

/// Bookkeeping for one unit of work, from dispatch to its final state.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub unit_ref: String,
    /// `None` when the submission itself failed.
    pub job_id: Option<JobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_error: Option<SubmissionError>,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Poll calls issued for this job.
    pub polls: u32,
    /// Poll calls that failed in transport.
    pub poll_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_poll_error: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// A unit the gateway accepted.
    pub fn submitted(unit_ref: impl Into<String>, job_id: JobId) -> Self {
        Self {
            unit_ref: unit_ref.into(),
            job_id: Some(job_id),
            submission_error: None,
            state: JobState::Pending,
            result: None,
            error: None,
            polls: 0,
            poll_failures: 0,
            last_poll_error: None,
            submitted_at: Utc::now(),
            completed_at: None,
        }
    }

    /// A unit that never got a job id. Terminal from the start.
    pub fn rejected(unit_ref: impl Into<String>, err: SubmissionError) -> Self {
        let now = Utc::now();
        Self {
            unit_ref: unit_ref.into(),
            job_id: None,
            error: Some(err.to_string()),
            submission_error: Some(err),
            state: JobState::Failed,
            result: None,
            polls: 0,
            poll_failures: 0,
            last_poll_error: None,
            submitted_at: now,
            completed_at: Some(now),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Whether the poller still has to ask about this job.
    pub fn is_pollable(&self) -> bool {
        self.job_id.is_some() && !self.is_terminal()
    }

    pub fn outcome(&self) -> Outcome {
        match self.state {
            JobState::Pending | JobState::Running => Outcome::InProgress,
            JobState::Succeeded => Outcome::Succeeded,
            JobState::Failed if self.submission_error.is_some() => Outcome::SubmissionFailed,
            JobState::Failed => Outcome::Failed,
            JobState::Unknown => Outcome::TimedOut,
            JobState::Cancelled => Outcome::Cancelled,
        }
    }

    /// Apply one gateway status. Terminal records are left untouched.
    pub(crate) fn apply(&mut self, status: JobStatus) -> Transition {
        self.polls += 1;
        let transition = self.state.next(&status);
        match transition {
            Transition::Unchanged => {}
            Transition::Progressed(state) => self.state = state,
            Transition::Completed(state) => {
                self.state = state;
                self.completed_at = Some(Utc::now());
                match status {
                    JobStatus::Succeeded(result) => self.result = Some(result),
                    JobStatus::Failed(error) => self.error = Some(error),
                    JobStatus::Pending | JobStatus::Running => {}
                }
            }
        }
        transition
    }

    pub(crate) fn record_poll_failure(&mut self, err: &GatewayError) {
        self.polls += 1;
        self.poll_failures += 1;
        self.last_poll_error = Some(err.to_string());
    }

    /// Force a still-running record into `state` (`Unknown` or `Cancelled`).
    /// Returns false if the record was already terminal.
    pub(crate) fn finalize(&mut self, state: JobState) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.state = state;
        self.completed_at = Some(Utc::now());
        true
    }
}

/// Caller-facing classification of a record's final state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    InProgress,
    Succeeded,
    Failed,
    SubmissionFailed,
    TimedOut,
    Cancelled,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::InProgress => write!(f, "in progress"),
            Outcome::Succeeded => write!(f, "succeeded"),
            Outcome::Failed => write!(f, "failed"),
            Outcome::SubmissionFailed => write!(f, "submission failed"),
            Outcome::TimedOut => write!(f, "timed out"),
            Outcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Everything one `analyze` call produced.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationResult {
    pub run_id: Uuid,
    pub total: usize,
    pub submission_failures: usize,
    /// Poll rounds actually issued.
    pub rounds: u32,
    /// One record per input unit, in input order.
    pub records: Vec<JobRecord>,
}

impl OrchestrationResult {
    pub fn get(&self, unit_ref: &str) -> Option<&JobRecord> {
        self.records.iter().find(|r| r.unit_ref == unit_ref)
    }

    pub fn by_unit(&self) -> HashMap<&str, &JobRecord> {
        self.records
            .iter()
            .map(|r| (r.unit_ref.as_str(), r))
            .collect()
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for record in &self.records {
            match record.outcome() {
                Outcome::Succeeded => summary.succeeded += 1,
                Outcome::Failed => summary.failed += 1,
                Outcome::SubmissionFailed => summary.submission_failed += 1,
                Outcome::TimedOut => summary.timed_out += 1,
                Outcome::Cancelled => summary.cancelled += 1,
                Outcome::InProgress => summary.in_progress += 1,
            }
        }
        summary
    }

    pub fn all_succeeded(&self) -> bool {
        self.summary().succeeded == self.total
    }
}

/// Counts per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
    pub submission_failed: usize,
    pub timed_out: usize,
    pub cancelled: usize,
    pub in_progress: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.succeeded
            + self.failed
            + self.submission_failed
            + self.timed_out
            + self.cancelled
            + self.in_progress
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} rejected, {} timed out",
            self.succeeded, self.failed, self.submission_failed, self.timed_out
        )?;
        if self.cancelled > 0 {
            write!(f, ", {} cancelled", self.cancelled)?;
        }
        Ok(())
    }
}
