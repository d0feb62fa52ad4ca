//! # Dispatcher
//!
//! Worker-facing poll protocol. Both operations check authorization before
//! touching any state.

use std::sync::Arc;
use tracing::warn;

use super::coordinator::Shared;
use crate::error::DispatchError;
use crate::logging::log_task_operation;
use crate::models::{Task, TaskId};

#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Claim the task waiting in the slot, moving it to `Computing`.
    pub fn get_task(&self, credential: Option<&str>) -> Result<Task, DispatchError> {
        self.authorize(credential, "get_task")?;

        let task = self.shared.slot.claim().ok_or(DispatchError::NotAvailable)?;
        let claimed = self.shared.ledger.lock().tasks.mark_claimed(task.id)?;

        log_task_operation(
            "claim",
            claimed.id,
            Some(claimed.expression_id),
            &claimed.status.to_string(),
            None,
        );
        Ok(claimed)
    }

    /// Record a worker's result and wake the decomposition waiting on it.
    ///
    /// Stale and duplicate submissions are answered with `NotFound` and
    /// change nothing.
    pub fn submit_result(
        &self,
        credential: Option<&str>,
        task_id: TaskId,
        result: f64,
    ) -> Result<(), DispatchError> {
        self.authorize(credential, "submit_result")?;

        let completed = self.shared.ledger.lock().tasks.complete(task_id, result);
        match completed {
            Ok(task) => {
                log_task_operation(
                    "complete",
                    task.id,
                    Some(task.expression_id),
                    &task.status.to_string(),
                    None,
                );
                Ok(())
            }
            Err(error) => {
                warn!(task_id, %error, "Rejected task result");
                Err(error)
            }
        }
    }

    fn authorize(&self, credential: Option<&str>, operation: &str) -> Result<(), DispatchError> {
        if self.shared.authorizer.authorize(credential) {
            Ok(())
        } else {
            warn!(operation, "Unauthorized dispatch request");
            Err(DispatchError::Unauthorized)
        }
    }
}
