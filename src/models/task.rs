//! # Task Model
//!
//! One atomic binary operation (`arg1 <op> arg2`) handed to a worker.
//!
//! A task is created by a decomposition, published into the task slot, claimed
//! by exactly one worker and completed through `submit_result`. The completion
//! signal that wakes the decomposition is held next to the task in the
//! registry and is never part of the wire payload.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ExpressionError;
use crate::state_machine::states::TaskState;

use super::{ExpressionId, TaskId};

/// Binary arithmetic operator understood by workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

impl Operator {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Add),
            '-' => Some(Self::Subtract),
            '*' => Some(Self::Multiply),
            '/' => Some(Self::Divide),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
            Self::Multiply => '*',
            Self::Divide => '/',
        }
    }

    /// `*` and `/` bind tighter than `+` and `-`.
    pub fn is_high_precedence(&self) -> bool {
        matches!(self, Self::Multiply | Self::Divide)
    }

    pub fn apply(&self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Add => lhs + rhs,
            Self::Subtract => lhs - rhs,
            Self::Multiply => lhs * rhs,
            Self::Divide => lhs / rhs,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl std::str::FromStr for Operator {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c).ok_or(ExpressionError::UnknownOperation(c)),
            _ => Err(ExpressionError::invalid(format!("not an operator: {s:?}"))),
        }
    }
}

/// A single binary operation before it has been assigned a task id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryOperation {
    pub arg1: f64,
    pub arg2: f64,
    pub operator: Operator,
}

impl BinaryOperation {
    pub fn new(arg1: f64, operator: Operator, arg2: f64) -> Self {
        Self {
            arg1,
            arg2,
            operator,
        }
    }
}

/// In-flight task as tracked by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub expression_id: ExpressionId,
    pub arg1: f64,
    pub arg2: f64,
    pub operation: Operator,
    /// Simulated duration in milliseconds the worker pads the operation to.
    pub operation_time: u64,
    pub status: TaskState,
    pub result: Option<f64>,
}

impl Task {
    pub fn new(
        id: TaskId,
        expression_id: ExpressionId,
        operation: BinaryOperation,
        operation_time: u64,
    ) -> Self {
        Self {
            id,
            expression_id,
            arg1: operation.arg1,
            arg2: operation.arg2,
            operation: operation.operator,
            operation_time,
            status: TaskState::Waiting,
            result: None,
        }
    }

    /// Evaluate the operation locally. Used by workers.
    pub fn compute(&self) -> f64 {
        self.operation.apply(self.arg1, self.arg2)
    }

    pub fn to_payload(&self) -> TaskPayload {
        TaskPayload {
            task: TaskData {
                id: self.id,
                arg1: self.arg1,
                arg2: self.arg2,
                operation: self.operation,
                operation_time: self.operation_time,
            },
        }
    }
}

/// Wire shape of a task: `{"task": {id, arg1, arg2, operation, operation_time}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub task: TaskData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskData {
    pub id: TaskId,
    pub arg1: f64,
    pub arg2: f64,
    pub operation: Operator,
    pub operation_time: u64,
}

/// Body a worker posts back after computing a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResultRequest {
    pub id: TaskId,
    pub result: f64,
}
