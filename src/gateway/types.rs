//! Wire and domain types exchanged with the job gateway.
//!
//! The backend speaks JSON. Field and state names vary a little between
//! endpoints (`job_id` vs `task_id`, `SUCCESS` vs `SUCCEEDED`), so the
//! response structs accept the known aliases and normalize them into
//! [`JobId`] and [`JobStatus`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque identifier handed out by the gateway for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a job as reported by the gateway.
///
/// `Pending` and `Running` are both non-terminal; the distinction is
/// informational only.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded(Value),
    Failed(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded(_) | JobStatus::Failed(_))
    }
}

/// Body returned by the upload and extract endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    #[serde(alias = "task_id", alias = "jobId", alias = "taskId")]
    pub job_id: String,
}

/// Task state names accepted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    #[serde(alias = "STARTED", alias = "PROGRESS", alias = "RETRY")]
    Running,
    #[serde(alias = "SUCCESS")]
    Succeeded,
    #[serde(rename = "FAILURE", alias = "FAILED")]
    Failure,
    /// Any state this client does not know; treated as still running.
    #[serde(other)]
    Unrecognized,
}

/// Body returned by `GET /tasks/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatusResponse {
    pub state: TaskState,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl From<TaskStatusResponse> for JobStatus {
    fn from(resp: TaskStatusResponse) -> Self {
        match resp.state {
            TaskState::Pending => JobStatus::Pending,
            TaskState::Running | TaskState::Unrecognized => JobStatus::Running,
            TaskState::Succeeded => JobStatus::Succeeded(resp.result.unwrap_or(Value::Null)),
            TaskState::Failure => {
                JobStatus::Failed(resp.error.unwrap_or_else(|| "job failed".to_string()))
            }
        }
    }
}

/// One stored image in a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSummary {
    pub name: String,
    /// Whether an extraction result already exists for this image.
    #[serde(default)]
    pub extracted: bool,
}

/// Body sent to `POST /images/{name}/extract`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ExtractRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<&'a str>,
}
