use std::fmt;

use serde::{Deserialize, Serialize};

use crate::gateway::JobStatus;

/// Lifecycle state of one [`JobRecord`](super::JobRecord).
///
/// ```text
/// submit ok ──► PENDING ◄──► RUNNING ──► SUCCEEDED | FAILED
/// submit err ─► FAILED
/// attempts exhausted ──► UNKNOWN      caller cancelled ──► CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// Gave up waiting: the attempt budget ran out before a terminal state.
    Unknown,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobState::Pending | JobState::Running)
    }

    /// Compute the transition a gateway status causes from this state.
    ///
    /// Terminal states absorb everything. `Pending` and `Running` follow the
    /// gateway report.
    pub fn next(self, status: &JobStatus) -> Transition {
        if self.is_terminal() {
            return Transition::Unchanged;
        }
        let next = match status {
            JobStatus::Pending => JobState::Pending,
            JobStatus::Running => JobState::Running,
            JobStatus::Succeeded(_) => return Transition::Completed(JobState::Succeeded),
            JobStatus::Failed(_) => return Transition::Completed(JobState::Failed),
        };
        if next == self {
            Transition::Unchanged
        } else {
            Transition::Progressed(next)
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "PENDING"),
            JobState::Running => write!(f, "RUNNING"),
            JobState::Succeeded => write!(f, "SUCCEEDED"),
            JobState::Failed => write!(f, "FAILED"),
            JobState::Unknown => write!(f, "UNKNOWN"),
            JobState::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// The result of applying one gateway status to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No observable change.
    Unchanged,
    /// Moved between the non-terminal states.
    Progressed(JobState),
    /// Reached a terminal state in this step.
    Completed(JobState),
}
