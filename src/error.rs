//! Error types for the calculation engine.
//!
//! Each layer owns a focused error enum; [`CalcError`] aggregates them for
//! callers that cross layers (the binary, the coordinator's public surface).

use thiserror::Error;

use crate::models::{ExpressionId, TaskId};
use crate::state_machine::errors::StateMachineError;

/// Failures that end a decomposition and put its expression into `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("Expression is empty")]
    EmptyExpression,
    #[error("Invalid expression: {reason}")]
    InvalidExpression { reason: String },
    #[error("Mismatched parentheses")]
    MismatchedParentheses,
    #[error("Unknown operation: '{0}'")]
    UnknownOperation(char),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Task slot busy after {attempts} publish attempts")]
    QueueBusy { attempts: u32 },
    #[error("Task completion signal dropped before a result arrived")]
    Interrupted,
}

impl ExpressionError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidExpression {
            reason: reason.into(),
        }
    }

    /// Stable machine-readable kind, used in logs and snapshots.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyExpression => "empty_expression",
            Self::InvalidExpression { .. } => "invalid_expression",
            Self::MismatchedParentheses => "mismatched_parentheses",
            Self::UnknownOperation(_) => "unknown_operation",
            Self::DivisionByZero => "division_by_zero",
            Self::QueueBusy { .. } => "queue_busy",
            Self::Interrupted => "interrupted",
        }
    }
}

/// Outcomes of the worker-facing poll protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("No task available")]
    NotAvailable,
    #[error("Task {task_id} not found")]
    NotFound { task_id: TaskId },
    #[error("Task {task_id} has not been claimed")]
    NotClaimed { task_id: TaskId },
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Expression {expression_id} not found")]
    ExpressionNotFound { expression_id: ExpressionId },
}

impl DispatchError {
    /// Transient outcomes are retried by the caller and never surface as a
    /// fatal expression state.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotAvailable | Self::Unauthorized)
    }
}

#[derive(Debug, Error)]
pub enum CalcError {
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("State machine error: {0}")]
    StateMachine(#[from] StateMachineError),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Store error: {0}")]
    Store(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for CalcError {
    fn from(err: config::ConfigError) -> Self {
        CalcError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CalcError>;
