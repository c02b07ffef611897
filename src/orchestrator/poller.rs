use std::time::Duration;

use futures::future::join_all;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::gateway::{JobGateway, JobId};
use crate::job::{JobRecord, JobState, Transition};

type ProgressFn<'a> = Box<dyn FnMut(usize, usize) + 'a>;
type UnitCompleteFn<'a> = Box<dyn FnMut(&str, &JobRecord) + 'a>;

/// Caller callbacks, fired from the orchestration task.
#[derive(Default)]
pub(crate) struct Hooks<'a> {
    pub(crate) on_progress: Option<ProgressFn<'a>>,
    pub(crate) on_unit_complete: Option<UnitCompleteFn<'a>>,
}

impl Hooks<'_> {
    pub(crate) fn progress(&mut self, completed: usize, total: usize) {
        debug_assert!(completed <= total);
        if let Some(f) = self.on_progress.as_mut() {
            f(completed, total);
        }
    }

    pub(crate) fn unit_complete(&mut self, record: &JobRecord) {
        if let Some(f) = self.on_unit_complete.as_mut() {
            f(&record.unit_ref, record);
        }
    }
}

/// How a polling run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PollReport {
    /// Rounds in which polls were issued.
    pub rounds: u32,
    pub cancelled: bool,
}

/// Drives submitted jobs to a terminal state with bounded, concurrent
/// polling rounds.
pub(crate) struct Poller<'a, G> {
    gateway: &'a G,
    max_attempts: u32,
    interval: Duration,
    cancel: CancellationToken,
}

impl<'a, G: JobGateway> Poller<'a, G> {
    pub fn new(
        gateway: &'a G,
        max_attempts: u32,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            gateway,
            max_attempts,
            interval,
            cancel,
        }
    }

    /// Polls until every record is terminal, the attempt budget is spent, or
    /// the token is cancelled.
    ///
    /// Each round queries all open jobs at once and applies the whole batch
    /// of answers before moving on. A poll that fails in transport leaves the
    /// job open for the next round. Records still open at the end become
    /// `Unknown`, or `Cancelled` if the caller cancelled.
    pub(crate) async fn run(
        &self,
        records: &mut [JobRecord],
        hooks: &mut Hooks<'_>,
    ) -> PollReport {
        let total = records.len();
        let mut rounds = 0;
        let mut cancelled = false;

        while rounds < self.max_attempts {
            let batch: Vec<(usize, JobId)> = records
                .iter()
                .enumerate()
                .filter(|(_, r)| r.is_pollable())
                .filter_map(|(i, r)| r.job_id.clone().map(|id| (i, id)))
                .collect();
            if batch.is_empty() {
                break;
            }

            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            rounds += 1;
            debug!(round = rounds, open = batch.len(), "polling");
            let responses = join_all(batch.iter().map(|(_, id)| self.gateway.poll(id))).await;

            if self.cancel.is_cancelled() {
                debug!(round = rounds, "cancelled while polling, discarding round");
                cancelled = true;
                break;
            }

            let mut finished = Vec::new();
            for ((index, job_id), response) in batch.iter().zip(responses) {
                let record = &mut records[*index];
                match response {
                    Ok(status) => {
                        if let Transition::Completed(state) = record.apply(status) {
                            info!(unit = %record.unit_ref, %job_id, %state, "job finished");
                            finished.push(*index);
                        }
                    }
                    Err(err) => {
                        warn!(
                            unit = %record.unit_ref,
                            %job_id,
                            error = %err,
                            server_error = err.is_server_error(),
                            "poll failed, will retry"
                        );
                        record.record_poll_failure(&err);
                    }
                }
            }

            for index in finished {
                hooks.unit_complete(&records[index]);
            }
            let completed = records.iter().filter(|r| r.is_terminal()).count();
            hooks.progress(completed, total);

            if completed == total {
                break;
            }

            if rounds < self.max_attempts {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    _ = sleep(self.interval) => {}
                }
            }
        }

        let final_state = if cancelled {
            JobState::Cancelled
        } else {
            JobState::Unknown
        };
        for record in records.iter_mut() {
            if record.finalize(final_state) {
                if !cancelled {
                    warn!(unit = %record.unit_ref, rounds, "gave up waiting for job");
                }
                hooks.unit_complete(record);
            }
        }

        PollReport { rounds, cancelled }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedGateway, Step};
    use serde_json::json;

    const INTERVAL: Duration = Duration::from_secs(1);

    fn open(name: &str) -> JobRecord {
        JobRecord::submitted(name, JobId::new(format!("job-{name}")))
    }

    #[tokio::test(start_paused = true)]
    async fn polls_open_jobs_concurrently() {
        let latency = Duration::from_millis(500);
        let gateway = ScriptedGateway::new()
            .with_poll_latency(latency)
            .script("a", [Step::Succeed(json!(1))])
            .script("b", [Step::Succeed(json!(2))])
            .script("c", [Step::Succeed(json!(3))]);
        let mut records = vec![open("a"), open("b"), open("c")];

        let started = tokio::time::Instant::now();
        let report = Poller::new(&gateway, 5, INTERVAL, CancellationToken::new())
            .run(&mut records, &mut Hooks::default())
            .await;

        assert_eq!(report.rounds, 1);
        assert!(started.elapsed() < latency * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_are_retried() {
        let gateway = ScriptedGateway::new().script(
            "a",
            [Step::Transport, Step::Transport, Step::Succeed(json!("ok"))],
        );
        let mut records = vec![open("a")];

        let report = Poller::new(&gateway, 5, INTERVAL, CancellationToken::new())
            .run(&mut records, &mut Hooks::default())
            .await;

        assert_eq!(report.rounds, 3);
        assert_eq!(records[0].state, JobState::Succeeded);
        assert_eq!(records[0].poll_failures, 2);
        assert_eq!(records[0].polls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_until_budget_end_in_unknown() {
        let gateway = ScriptedGateway::new().script("a", [Step::Transport]);
        let mut records = vec![open("a")];

        let report = Poller::new(&gateway, 4, INTERVAL, CancellationToken::new())
            .run(&mut records, &mut Hooks::default())
            .await;

        assert_eq!(report.rounds, 4);
        assert_eq!(records[0].state, JobState::Unknown);
        assert!(records[0].error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn already_terminal_records_are_never_polled() {
        let gateway = ScriptedGateway::new();
        let mut done = open("done");
        done.apply(crate::gateway::JobStatus::Failed("x".into()));
        let mut records = vec![done];

        let report = Poller::new(&gateway, 3, INTERVAL, CancellationToken::new())
            .run(&mut records, &mut Hooks::default())
            .await;

        assert_eq!(report.rounds, 0);
        assert_eq!(gateway.total_polls(), 0);
        assert_eq!(records[0].state, JobState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_is_ignored_when_nothing_is_open() {
        let gateway = ScriptedGateway::new();
        let mut done = open("done");
        done.apply(crate::gateway::JobStatus::Succeeded(json!(1)));
        let mut records = vec![done];
        let token = CancellationToken::new();
        token.cancel();

        let report = Poller::new(&gateway, 3, INTERVAL, token)
            .run(&mut records, &mut Hooks::default())
            .await;

        assert!(!report.cancelled);
        assert_eq!(report.rounds, 0);
        assert_eq!(records[0].state, JobState::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_stops_before_first_round() {
        let gateway = ScriptedGateway::new();
        let mut records = vec![open("a")];
        let token = CancellationToken::new();
        token.cancel();

        let report = Poller::new(&gateway, 3, INTERVAL, token)
            .run(&mut records, &mut Hooks::default())
            .await;

        assert!(report.cancelled);
        assert_eq!(gateway.total_polls(), 0);
        assert_eq!(records[0].state, JobState::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn no_sleep_after_last_round() {
        let gateway = ScriptedGateway::new();
        let mut records = vec![open("a")];

        let started = tokio::time::Instant::now();
        Poller::new(&gateway, 3, INTERVAL, CancellationToken::new())
            .run(&mut records, &mut Hooks::default())
            .await;

        let elapsed = started.elapsed();
        assert!(elapsed >= INTERVAL * 2, "elapsed {elapsed:?}");
        assert!(elapsed < INTERVAL * 3, "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_times_out_immediately() {
        let gateway = ScriptedGateway::new();
        let mut records = vec![open("a")];

        let report = Poller::new(&gateway, 0, INTERVAL, CancellationToken::new())
            .run(&mut records, &mut Hooks::default())
            .await;

        assert_eq!(report.rounds, 0);
        assert_eq!(gateway.total_polls(), 0);
        assert_eq!(records[0].state, JobState::Unknown);
    }
}
