//! Scripted in-memory gateway for orchestrator tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;

use crate::gateway::{GatewayError, JobGateway, JobId, JobStatus};
use crate::job::UnitOfWork;

/// One scripted poll response.
#[derive(Debug, Clone)]
pub enum Step {
    Pending,
    Running,
    Succeed(Value),
    Fail(String),
    /// The poll call itself fails (503).
    Transport,
}

/// Gateway whose answers are scripted per `unit_ref`.
///
/// Job ids are `job-{unit_ref}`. Each poll pops the next scripted step; the
/// last step repeats forever. Units without a script stay `Pending`.
#[derive(Default)]
pub struct ScriptedGateway {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    rejections: HashMap<String, (u16, String)>,
    submit_latency: Duration,
    poll_latency: Duration,
    submitted: Mutex<Vec<String>>,
    polls: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, unit_ref: &str, steps: impl IntoIterator<Item = Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(unit_ref.to_string(), steps.into_iter().collect());
        self
    }

    /// Make `submit` fail for this unit with an API error.
    pub fn reject(mut self, unit_ref: &str, status: u16, message: &str) -> Self {
        self.rejections
            .insert(unit_ref.to_string(), (status, message.to_string()));
        self
    }

    pub fn with_submit_latency(mut self, latency: Duration) -> Self {
        self.submit_latency = latency;
        self
    }

    pub fn with_poll_latency(mut self, latency: Duration) -> Self {
        self.poll_latency = latency;
        self
    }

    /// Unit refs that reached the gateway, in call order.
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn polls_for(&self, unit_ref: &str) -> usize {
        let job_id = format!("job-{unit_ref}");
        self.polls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| **id == job_id)
            .count()
    }

    pub fn total_polls(&self) -> usize {
        self.polls.lock().unwrap().len()
    }
}

impl JobGateway for ScriptedGateway {
    async fn submit(&self, unit: &UnitOfWork) -> Result<JobId, GatewayError> {
        if !self.submit_latency.is_zero() {
            tokio::time::sleep(self.submit_latency).await;
        }
        let unit_ref = unit.unit_ref().to_string();
        self.submitted.lock().unwrap().push(unit_ref.clone());

        if let Some((status, message)) = self.rejections.get(&unit_ref) {
            return Err(GatewayError::api(*status, message.clone()));
        }
        Ok(JobId::new(format!("job-{unit_ref}")))
    }

    async fn poll(&self, job_id: &JobId) -> Result<JobStatus, GatewayError> {
        if !self.poll_latency.is_zero() {
            tokio::time::sleep(self.poll_latency).await;
        }
        self.polls.lock().unwrap().push(job_id.to_string());

        let unit_ref = job_id.as_str().trim_start_matches("job-");
        let step = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(unit_ref) {
                Some(steps) if steps.len() > 1 => steps.pop_front(),
                Some(steps) => steps.front().cloned(),
                None => None,
            }
        };

        match step.unwrap_or(Step::Pending) {
            Step::Pending => Ok(JobStatus::Pending),
            Step::Running => Ok(JobStatus::Running),
            Step::Succeed(value) => Ok(JobStatus::Succeeded(value)),
            Step::Fail(error) => Ok(JobStatus::Failed(error)),
            Step::Transport => Err(GatewayError::api(503, "service unavailable")),
        }
    }
}
