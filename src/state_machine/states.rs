use serde::{Deserialize, Serialize};
use std::fmt;

/// Expression lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionState {
    /// Accepted for evaluation, decomposition not yet started
    #[default]
    Pending,
    /// Decomposition is running and tasks are being dispatched
    InProgress,
    /// Final literal fold finished; result is set
    Complete,
    /// Parse, validation or dispatch failure; error message is set
    Error,
}

impl ExpressionState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// Position in the forward-only lifecycle, used to detect regressions.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::InProgress => 1,
            Self::Complete | Self::Error => 2,
        }
    }
}

impl fmt::Display for ExpressionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Complete => write!(f, "complete"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for ExpressionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "complete" => Ok(Self::Complete),
            "error" => Ok(Self::Error),
            _ => Err(format!("Invalid expression state: {s}")),
        }
    }
}

/// Task lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Published into the slot, awaiting a worker
    #[default]
    Waiting,
    /// Claimed by exactly one worker
    Computing,
    /// Result recorded and completion signal fired
    Done,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Computing => write!(f, "computing"),
            Self::Done => write!(f, "done"),
        }
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "computing" => Ok(Self::Computing),
            "done" => Ok(Self::Done),
            _ => Err(format!("Invalid task state: {s}")),
        }
    }
}
