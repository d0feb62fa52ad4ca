use chrono::Utc;
use tracing::debug;

use super::{
    errors::{invalid_transition, StateMachineResult},
    events::ExpressionEvent,
    states::ExpressionState,
};
use crate::models::Expression;

/// Expression lifecycle, independent of individual task states.
///
/// `Pending -> InProgress -> Complete`, or `Pending|InProgress -> Error`.
/// Both `Complete` and `Error` are terminal.
pub struct ExpressionStateMachine<'a> {
    expression: &'a mut Expression,
}

impl<'a> ExpressionStateMachine<'a> {
    pub fn new(expression: &'a mut Expression) -> Self {
        Self { expression }
    }

    pub fn current_state(&self) -> ExpressionState {
        self.expression.status
    }

    /// Attempt to transition the expression state
    pub fn transition(&mut self, event: ExpressionEvent) -> StateMachineResult<ExpressionState> {
        let current_state = self.current_state();
        let target_state = Self::determine_target_state(current_state, &event)?;

        match &event {
            ExpressionEvent::Complete(result) => self.expression.result = Some(*result),
            ExpressionEvent::Fail(reason) => self.expression.error = Some(reason.clone()),
            ExpressionEvent::Accept => {}
        }
        self.expression.status = target_state;
        self.expression.updated_at = Utc::now();

        debug!(
            expression_id = self.expression.id,
            from = %current_state,
            to = %target_state,
            event = event.event_type(),
            "Expression transition"
        );

        Ok(target_state)
    }

    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: ExpressionState,
        event: &ExpressionEvent,
    ) -> StateMachineResult<ExpressionState> {
        let target = match (current_state, event) {
            (ExpressionState::Pending, ExpressionEvent::Accept) => ExpressionState::InProgress,
            (ExpressionState::InProgress, ExpressionEvent::Complete(_)) => {
                ExpressionState::Complete
            }
            (ExpressionState::Pending | ExpressionState::InProgress, ExpressionEvent::Fail(_)) => {
                ExpressionState::Error
            }
            (from_state, event) => {
                return Err(invalid_transition(from_state, event.event_type()));
            }
        };

        Ok(target)
    }

    pub fn is_terminal(&self) -> bool {
        self.current_state().is_terminal()
    }
}
