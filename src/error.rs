use serde::Serialize;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::job::OrchestrationResult;

/// Why a unit of work never got a job id.
///
/// Stored on the unit's [`JobRecord`](crate::job::JobRecord); a submission
/// failure is terminal and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionError {
    /// Rejected locally before contacting the gateway.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// The gateway answered with an error status.
    #[error("submission rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The gateway could not be reached or answered garbage.
    #[error("submission transport error: {message}")]
    Transport { message: String },
}

impl SubmissionError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }
}

impl From<GatewayError> for SubmissionError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Api { status, message } => Self::Rejected { status, message },
            other => Self::Transport {
                message: other.to_string(),
            },
        }
    }
}

/// Errors that abort a whole orchestration call.
///
/// Per-unit failures never show up here; they live in the unit's record.
#[derive(Debug, Error)]
pub enum OrchestrateError {
    #[error("no units of work to orchestrate")]
    EmptyInput,

    /// The caller cancelled. Carries the records as they stood, with
    /// unfinished jobs marked `Cancelled`.
    #[error("orchestration cancelled after {} poll round(s)", .0.rounds)]
    Cancelled(Box<OrchestrationResult>),
}

impl OrchestrateError {
    /// The partial result of a cancelled run.
    pub fn partial_result(&self) -> Option<&OrchestrationResult> {
        match self {
            Self::Cancelled(result) => Some(result),
            Self::EmptyInput => None,
        }
    }
}
