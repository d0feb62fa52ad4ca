//! # Expression Model
//!
//! A user-submitted arithmetic string and its tracked evaluation outcome.
//! Expressions are never deleted; terminal snapshots stay queryable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state_machine::states::ExpressionState;

use super::ExpressionId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub id: ExpressionId,
    pub expression: String,
    pub status: ExpressionState,
    /// Valid only when `status` is `Complete`.
    pub result: Option<f64>,
    /// Set only when `status` is `Error`.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expression {
    pub fn new(id: ExpressionId, expression: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            expression: expression.into(),
            status: ExpressionState::Pending,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn to_payload(&self) -> ExpressionPayload {
        ExpressionPayload {
            expression: self.clone(),
        }
    }
}

/// Wire shape of a single expression: `{"expression": {id, status, result, ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionPayload {
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionListPayload {
    pub expressions: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitExpressionRequest {
    pub expression: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitExpressionResponse {
    pub id: ExpressionId,
}
