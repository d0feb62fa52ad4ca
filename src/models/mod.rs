pub mod expression;
pub mod task;

/// Expression identifiers are assigned monotonically starting at 1.
pub type ExpressionId = u64;

/// Task identifiers live in their own namespace, independent of expressions.
pub type TaskId = u64;

// Re-export core models for easy access
pub use expression::{
    Expression, ExpressionListPayload, ExpressionPayload, SubmitExpressionRequest,
    SubmitExpressionResponse,
};
pub use task::{BinaryOperation, Operator, SubmitResultRequest, Task, TaskData, TaskPayload};
