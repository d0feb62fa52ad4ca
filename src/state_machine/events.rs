use serde::{Deserialize, Serialize};

/// Events that can trigger expression state transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ExpressionEvent {
    /// Decomposition picked the expression up
    Accept,
    /// Final fold produced a value
    Complete(f64),
    /// Decomposition aborted with the given message
    Fail(String),
}

impl ExpressionEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Complete(_) => "complete",
            Self::Fail(_) => "fail",
        }
    }

    pub fn fail_with_error(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }
}

/// Events that can trigger task state transitions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TaskEvent {
    /// A worker claimed the task from the slot
    Claim,
    /// A worker submitted the result
    Complete(f64),
}

impl TaskEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Claim => "claim",
            Self::Complete(_) => "complete",
        }
    }
}
