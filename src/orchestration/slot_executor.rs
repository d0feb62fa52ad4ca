//! [`OperationExecutor`] that hands each operation to the worker pool through
//! the coordinator's task slot.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use super::coordinator::Shared;
use super::task_slot::SlotError;
use crate::decomposer::OperationExecutor;
use crate::error::ExpressionError;
use crate::logging::log_task_operation;
use crate::models::{BinaryOperation, ExpressionId, Task, TaskId};

/// How often a waiting decomposition reports on a task nobody has finished.
const PROGRESS_REPORT_INTERVAL: Duration = Duration::from_secs(5);

pub(crate) struct SlotExecutor {
    shared: Arc<Shared>,
    expression_id: ExpressionId,
}

impl SlotExecutor {
    pub(crate) fn new(shared: Arc<Shared>, expression_id: ExpressionId) -> Self {
        Self {
            shared,
            expression_id,
        }
    }

    /// Publish into the slot, retrying while another task occupies it.
    ///
    /// Every change of occupant means a worker claimed something, so the
    /// retry budget only counts attempts made against the same unclaimed
    /// occupant. The expression fails once one occupant outlasts the budget.
    async fn publish(&self, task: &Task) -> Result<(), ExpressionError> {
        let limit = self.shared.config.publish_retry_limit.max(1);
        let mut attempts = 0;
        let mut stalled = 0;
        let mut last_occupant: Option<TaskId> = None;

        loop {
            attempts += 1;
            match self.shared.slot.publish(task.clone()) {
                Ok(()) => {
                    log_task_operation(
                        "publish",
                        task.id,
                        Some(self.expression_id),
                        &task.status.to_string(),
                        None,
                    );
                    return Ok(());
                }
                Err(SlotError::Occupied { occupant }) => {
                    if last_occupant != Some(occupant) {
                        last_occupant = Some(occupant);
                        stalled = 0;
                    }
                    stalled += 1;

                    if stalled >= limit {
                        debug!(task_id = task.id, occupant, attempts, "Giving up on stalled task slot");
                        return Err(ExpressionError::QueueBusy { attempts: stalled });
                    }
                    trace!(task_id = task.id, occupant, attempts, "Task slot busy, backing off");
                    tokio::time::sleep(self.shared.config.publish_backoff).await;
                }
            }
        }
    }

    async fn await_result(
        &self,
        task: &Task,
        mut receiver: oneshot::Receiver<f64>,
    ) -> Result<f64, ExpressionError> {
        loop {
            tokio::select! {
                outcome = &mut receiver => {
                    return outcome.map_err(|_| ExpressionError::Interrupted);
                }
                _ = tokio::time::sleep(PROGRESS_REPORT_INTERVAL) => {
                    let unclaimed = self.shared.slot.peek_own(task.id).is_some();
                    debug!(
                        task_id = task.id,
                        expression_id = self.expression_id,
                        unclaimed,
                        "Still waiting for task result"
                    );
                }
            }
        }
    }
}

#[async_trait]
impl OperationExecutor for SlotExecutor {
    async fn execute(&self, operation: BinaryOperation) -> Result<f64, ExpressionError> {
        let operation_time = self.shared.timings.for_operator(operation.operator);
        let (task, receiver) =
            self.shared
                .ledger
                .lock()
                .tasks
                .create(self.expression_id, operation, operation_time);

        let outcome = match self.publish(&task).await {
            Ok(()) => self.await_result(&task, receiver).await,
            Err(error) => Err(error),
        };

        self.shared.ledger.lock().tasks.retire(task.id);
        outcome
    }
}
