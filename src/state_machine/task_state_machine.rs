use tracing::debug;

use super::{
    errors::{invalid_transition, StateMachineResult},
    events::TaskEvent,
    states::TaskState,
};
use crate::models::Task;

/// Forward-only lifecycle for a single task: `Waiting -> Computing -> Done`.
///
/// Operates on a borrowed task so the registry can drive transitions while it
/// holds its lock.
pub struct TaskStateMachine<'a> {
    task: &'a mut Task,
}

impl<'a> TaskStateMachine<'a> {
    pub fn new(task: &'a mut Task) -> Self {
        Self { task }
    }

    pub fn current_state(&self) -> TaskState {
        self.task.status
    }

    /// Attempt to transition the task state
    pub fn transition(&mut self, event: TaskEvent) -> StateMachineResult<TaskState> {
        let current_state = self.current_state();
        let target_state = Self::determine_target_state(current_state, &event)?;

        if let TaskEvent::Complete(result) = event {
            self.task.result = Some(result);
        }
        self.task.status = target_state;

        debug!(
            task_id = self.task.id,
            expression_id = self.task.expression_id,
            from = %current_state,
            to = %target_state,
            event = event.event_type(),
            "Task transition"
        );

        Ok(target_state)
    }

    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: TaskState,
        event: &TaskEvent,
    ) -> StateMachineResult<TaskState> {
        match (current_state, event) {
            (TaskState::Waiting, TaskEvent::Claim) => Ok(TaskState::Computing),
            (TaskState::Computing, TaskEvent::Complete(_)) => Ok(TaskState::Done),
            (from_state, event) => Err(invalid_transition(from_state, event.event_type())),
        }
    }

    pub fn task(&self) -> &Task {
        self.task
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BinaryOperation, Operator};

    fn waiting_task() -> Task {
        Task::new(1, 1, BinaryOperation::new(2.0, Operator::Add, 2.0), 0)
    }

    #[test]
    fn test_state_transitions() {
        let mut task = waiting_task();
        let mut sm = TaskStateMachine::new(&mut task);

        assert_eq!(sm.transition(TaskEvent::Claim).unwrap(), TaskState::Computing);
        assert_eq!(
            sm.transition(TaskEvent::Complete(4.0)).unwrap(),
            TaskState::Done
        );
        assert_eq!(sm.task().result, Some(4.0));
        assert_eq!(task.status, TaskState::Done);
    }

    #[test]
    fn test_invalid_transitions() {
        // Cannot complete a task nobody claimed
        assert!(TaskStateMachine::determine_target_state(
            TaskState::Waiting,
            &TaskEvent::Complete(1.0)
        )
        .is_err());

        // Cannot claim twice
        assert!(
            TaskStateMachine::determine_target_state(TaskState::Computing, &TaskEvent::Claim)
                .is_err()
        );

        // Done is terminal
        assert!(
            TaskStateMachine::determine_target_state(TaskState::Done, &TaskEvent::Claim).is_err()
        );
        assert!(TaskStateMachine::determine_target_state(
            TaskState::Done,
            &TaskEvent::Complete(1.0)
        )
        .is_err());
    }

    #[test]
    fn test_failed_transition_leaves_task_untouched() {
        let mut task = waiting_task();
        let mut sm = TaskStateMachine::new(&mut task);

        assert!(sm.transition(TaskEvent::Complete(9.0)).is_err());
        assert_eq!(task.status, TaskState::Waiting);
        assert_eq!(task.result, None);
    }
}
