// State machine module for expression and task lifecycles
//
// Both machines are forward-only. Transition tables live in
// `determine_target_state`; anything not listed there is rejected.

pub mod errors;
pub mod events;
pub mod expression_state_machine;
pub mod states;
pub mod task_state_machine;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::{ExpressionEvent, TaskEvent};
pub use expression_state_machine::ExpressionStateMachine;
pub use states::{ExpressionState, TaskState};
pub use task_state_machine::TaskStateMachine;
