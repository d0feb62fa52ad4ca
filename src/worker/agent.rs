//! # Worker
//!
//! Poll / compute / submit loop run by every unit of computing power.
//!
//! A worker never gives up on a task it has claimed because its credential
//! expired: it logs in again and resubmits the same result.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use super::client::DispatchClient;
use crate::config::WorkerConfig;
use crate::error::DispatchError;
use crate::logging::log_task_operation;
use crate::models::{SubmitResultRequest, TaskData, TaskId};

/// Counters a worker reports when it stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub worker_id: usize,
    pub tasks_completed: u64,
    /// Tasks whose result the coordinator no longer wanted, or that could not
    /// be delivered within the retry budget.
    pub tasks_dropped: u64,
    pub reauthentications: u64,
}

/// Result of a single [`Worker::poll_once`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    /// The slot was empty.
    Idle,
    /// The credential was rejected and a new one obtained.
    Reauthenticated,
    Completed { task_id: TaskId, result: f64 },
    /// The coordinator answered the submission with `NotFound` or `NotClaimed`.
    Dropped { task_id: TaskId },
}

pub struct Worker {
    id: usize,
    client: Arc<dyn DispatchClient>,
    config: WorkerConfig,
    credential: Option<String>,
    authenticated: bool,
    stats: WorkerStats,
}

impl Worker {
    pub fn new(id: usize, client: Arc<dyn DispatchClient>, config: WorkerConfig) -> Self {
        Self {
            id,
            client,
            config,
            credential: None,
            authenticated: false,
            stats: WorkerStats {
                worker_id: id,
                ..WorkerStats::default()
            },
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Run until `shutdown` fires (or its sender is dropped).
    #[instrument(skip_all, fields(worker_id = self.id))]
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> WorkerStats {
        let jitter = self.startup_delay();
        debug!(jitter_ms = jitter.as_millis() as u64, "Worker starting");

        tokio::select! {
            _ = sleep(jitter) => {}
            _ = shutdown.recv() => return self.stats,
        }

        loop {
            let delay = match self.poll_once().await {
                Ok(PollOutcome::Idle) => self.config.poll_interval,
                Ok(_) => Duration::ZERO,
                Err(error) => {
                    warn!(%error, "Worker poll failed");
                    self.config.poll_interval
                }
            };

            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = sleep(delay) => {}
            }
        }

        info!(
            tasks_completed = self.stats.tasks_completed,
            tasks_dropped = self.stats.tasks_dropped,
            reauthentications = self.stats.reauthentications,
            "Worker stopped"
        );
        self.stats
    }

    /// One poll: claim a task if one is waiting, compute it and submit.
    pub async fn poll_once(&mut self) -> Result<PollOutcome, DispatchError> {
        if !self.authenticated {
            self.authenticate().await?;
        }

        let payload = match self.client.poll_task(self.credential.as_deref()).await {
            Ok(payload) => payload,
            Err(DispatchError::NotAvailable) => return Ok(PollOutcome::Idle),
            Err(DispatchError::Unauthorized) => {
                self.reauthenticate().await?;
                return Ok(PollOutcome::Reauthenticated);
            }
            Err(error) => return Err(error),
        };

        let task = payload.task;
        let result = compute(&task).await;
        let request = SubmitResultRequest {
            id: task.id,
            result,
        };

        match self.submit(&request).await {
            Ok(()) => {
                self.stats.tasks_completed += 1;
                log_task_operation("submit", task.id, None, "done", None);
                Ok(PollOutcome::Completed {
                    task_id: task.id,
                    result,
                })
            }
            Err(error @ (DispatchError::NotFound { .. } | DispatchError::NotClaimed { .. })) => {
                self.stats.tasks_dropped += 1;
                debug!(task_id = task.id, %error, "Coordinator declined result");
                Ok(PollOutcome::Dropped { task_id: task.id })
            }
            Err(error) => {
                self.stats.tasks_dropped += 1;
                Err(error)
            }
        }
    }

    /// Submit with bounded retries. `Unauthorized` triggers a fresh login and
    /// the same result is sent again.
    async fn submit(&mut self, request: &SubmitResultRequest) -> Result<(), DispatchError> {
        let mut retries = 0;

        loop {
            let error = match self
                .client
                .submit_result(self.credential.as_deref(), request)
                .await
            {
                Ok(()) => return Ok(()),
                Err(error) if !error.is_transient() => return Err(error),
                Err(error) => error,
            };

            if retries >= self.config.submit_retry_limit {
                warn!(task_id = request.id, retries, %error, "Giving up on result submission");
                return Err(error);
            }
            retries += 1;

            if error == DispatchError::Unauthorized {
                if let Err(login_error) = self.reauthenticate().await {
                    warn!(%login_error, "Re-authentication failed");
                    sleep(self.config.submit_backoff).await;
                }
            } else {
                sleep(self.config.submit_backoff).await;
            }
        }
    }

    async fn authenticate(&mut self) -> Result<(), DispatchError> {
        self.credential = self.client.login().await?;
        self.authenticated = true;
        Ok(())
    }

    async fn reauthenticate(&mut self) -> Result<(), DispatchError> {
        self.stats.reauthentications += 1;
        self.authenticated = false;
        self.credential = None;
        info!("Credential rejected, logging in again");
        self.authenticate().await
    }

    fn startup_delay(&self) -> Duration {
        let max_ms = self.config.startup_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

/// Apply the operator, then pad to the task's configured duration.
async fn compute(task: &TaskData) -> f64 {
    let started = Instant::now();
    let result = task.operation.apply(task.arg1, task.arg2);

    let padding = Duration::from_millis(task.operation_time).saturating_sub(started.elapsed());
    if !padding.is_zero() {
        sleep(padding).await;
    }
    result
}
