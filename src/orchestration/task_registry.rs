//! # Task Registry
//!
//! Keyed map of in-flight tasks and their completion signals. The registry
//! itself is not synchronized; the coordinator mutates it under the same
//! lock that guards the expression arena.

use std::collections::HashMap;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::DispatchError;
use crate::models::{BinaryOperation, ExpressionId, Task, TaskId};
use crate::state_machine::{TaskEvent, TaskState, TaskStateMachine};

#[derive(Debug)]
struct TaskRecord {
    task: Task,
    /// Taken when the task reaches Done; a second completion finds `None`.
    completion: Option<oneshot::Sender<f64>>,
}

#[derive(Debug)]
pub struct TaskRegistry {
    records: HashMap<TaskId, TaskRecord>,
    next_id: TaskId,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            next_id: 1,
        }
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new `Waiting` task and hand back the receiver its creator
    /// waits on.
    pub fn create(
        &mut self,
        expression_id: ExpressionId,
        operation: BinaryOperation,
        operation_time: u64,
    ) -> (Task, oneshot::Receiver<f64>) {
        let id = self.next_id;
        self.next_id += 1;

        let task = Task::new(id, expression_id, operation, operation_time);
        let (sender, receiver) = oneshot::channel();
        self.records.insert(
            id,
            TaskRecord {
                task: task.clone(),
                completion: Some(sender),
            },
        );

        (task, receiver)
    }

    /// `Waiting -> Computing` for a task a worker just took from the slot.
    pub fn mark_claimed(&mut self, task_id: TaskId) -> Result<Task, DispatchError> {
        let record = self
            .records
            .get_mut(&task_id)
            .ok_or(DispatchError::NotFound { task_id })?;

        TaskStateMachine::new(&mut record.task)
            .transition(TaskEvent::Claim)
            .map_err(|_| DispatchError::NotFound { task_id })?;

        Ok(record.task.clone())
    }

    /// `Computing -> Done`: record the result and fire the completion signal.
    ///
    /// Unknown, retired and already-Done ids are `NotFound`; the call is then
    /// a no-op. A task still `Waiting` is `NotClaimed`.
    pub fn complete(&mut self, task_id: TaskId, result: f64) -> Result<Task, DispatchError> {
        let record = self
            .records
            .get_mut(&task_id)
            .ok_or(DispatchError::NotFound { task_id })?;

        match record.task.status {
            TaskState::Waiting => return Err(DispatchError::NotClaimed { task_id }),
            TaskState::Done => return Err(DispatchError::NotFound { task_id }),
            TaskState::Computing => {}
        }

        TaskStateMachine::new(&mut record.task)
            .transition(TaskEvent::Complete(result))
            .map_err(|_| DispatchError::NotFound { task_id })?;

        if let Some(sender) = record.completion.take() {
            if sender.send(result).is_err() {
                debug!(task_id, "Completion signal had no waiter");
            }
        }

        Ok(record.task.clone())
    }

    /// Drop a task once its creator has consumed the result (or given up).
    pub fn retire(&mut self, task_id: TaskId) -> Option<Task> {
        self.records.remove(&task_id).map(|record| record.task)
    }

    pub fn get(&self, task_id: TaskId) -> Option<&Task> {
        self.records.get(&task_id).map(|record| &record.task)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Operator;

    fn add(a: f64, b: f64) -> BinaryOperation {
        BinaryOperation::new(a, Operator::Add, b)
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut registry = TaskRegistry::new();
        let (first, _rx1) = registry.create(1, add(1.0, 1.0), 0);
        let (second, _rx2) = registry.create(2, add(1.0, 1.0), 0);
        assert_eq!(first.id + 1, second.id);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_full_lifecycle_signals_once() {
        let mut registry = TaskRegistry::new();
        let (task, receiver) = registry.create(1, add(2.0, 2.0), 0);

        let claimed = registry.mark_claimed(task.id).unwrap();
        assert_eq!(claimed.status, TaskState::Computing);

        let done = registry.complete(task.id, 4.0).unwrap();
        assert_eq!(done.status, TaskState::Done);
        assert_eq!(receiver.await.unwrap(), 4.0);

        assert_eq!(
            registry.complete(task.id, 5.0).unwrap_err(),
            DispatchError::NotFound { task_id: task.id }
        );
        assert_eq!(registry.get(task.id).unwrap().result, Some(4.0));
    }

    #[test]
    fn test_complete_requires_claim() {
        let mut registry = TaskRegistry::new();
        let (task, _receiver) = registry.create(1, add(2.0, 2.0), 0);

        assert_eq!(
            registry.complete(task.id, 4.0).unwrap_err(),
            DispatchError::NotClaimed { task_id: task.id }
        );
        assert_eq!(registry.get(task.id).unwrap().status, TaskState::Waiting);
    }

    #[test]
    fn test_signal_without_waiter_is_noop() {
        let mut registry = TaskRegistry::new();
        let (task, receiver) = registry.create(1, add(2.0, 2.0), 0);
        drop(receiver);

        registry.mark_claimed(task.id).unwrap();
        assert!(registry.complete(task.id, 4.0).is_ok());
    }

    #[test]
    fn test_unknown_and_retired_ids() {
        let mut registry = TaskRegistry::new();
        assert_eq!(
            registry.complete(42, 1.0).unwrap_err(),
            DispatchError::NotFound { task_id: 42 }
        );

        let (task, _receiver) = registry.create(1, add(1.0, 2.0), 0);
        assert!(registry.retire(task.id).is_some());
        assert!(registry.is_empty());
        assert_eq!(
            registry.mark_claimed(task.id).unwrap_err(),
            DispatchError::NotFound { task_id: task.id }
        );
    }
}
