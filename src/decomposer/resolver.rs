//! # Decomposer
//!
//! Turns an infix expression into an ordered sequence of binary operations
//! and evaluates them one at a time through an [`OperationExecutor`].
//!
//! ## Algorithm
//!
//! 1. **Bracket resolution**: the group closed by the leftmost `)` is reduced
//!    to a single literal and spliced back; repeated until no parentheses
//!    remain. This visits groups depth-first, left to right.
//! 2. **Precedence resolution**: while both `+ -` and `* /` are present, the
//!    leftmost `* /` is evaluated against its two neighbouring literals and
//!    the result is spliced back.
//! 3. **Left-to-right fold**: the remaining `literal (op literal)*` sequence
//!    is folded into an accumulator, one task per operator.
//!
//! Each operation is awaited before the next one is produced, so operand
//! values are correct without any dependency tracking.

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, instrument};

use super::tokens::{self, Token};
use crate::error::ExpressionError;
use crate::models::{BinaryOperation, Operator};

/// Executes one binary operation and yields its value.
///
/// The coordinator's implementation publishes a task into the slot and waits
/// for a worker; [`LocalExecutor`] computes in-process.
#[async_trait]
pub trait OperationExecutor: Send + Sync {
    async fn execute(&self, operation: BinaryOperation) -> Result<f64, ExpressionError>;
}

/// Computes operations inline.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalExecutor;

#[async_trait]
impl OperationExecutor for LocalExecutor {
    async fn execute(&self, operation: BinaryOperation) -> Result<f64, ExpressionError> {
        Ok(operation.operator.apply(operation.arg1, operation.arg2))
    }
}

/// Computes inline and records every operation in execution order.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    operations: Mutex<Vec<BinaryOperation>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operations(&self) -> Vec<BinaryOperation> {
        self.operations.lock().clone()
    }
}

#[async_trait]
impl OperationExecutor for RecordingExecutor {
    async fn execute(&self, operation: BinaryOperation) -> Result<f64, ExpressionError> {
        self.operations.lock().push(operation);
        Ok(operation.operator.apply(operation.arg1, operation.arg2))
    }
}

pub struct Decomposer<E> {
    executor: E,
}

impl<E: OperationExecutor> Decomposer<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Validate and evaluate `expression`.
    ///
    /// Validation completes before the first operation is executed. On any
    /// error the results of operations already executed are discarded.
    #[instrument(skip(self), level = "debug")]
    pub async fn decompose(&self, expression: &str) -> Result<f64, ExpressionError> {
        let tokens = tokens::parse(expression)?;
        self.evaluate(tokens).await
    }

    /// Evaluate a token sequence that already passed [`tokens::parse`].
    pub async fn evaluate(&self, tokens: Vec<Token>) -> Result<f64, ExpressionError> {
        let result = self.resolve_brackets(tokens).await?;
        debug!(result, "Decomposition finished");
        Ok(result)
    }

    async fn resolve_brackets(&self, mut tokens: Vec<Token>) -> Result<f64, ExpressionError> {
        while let Some(close) = tokens.iter().position(|t| *t == Token::RParen) {
            let open = tokens[..close]
                .iter()
                .rposition(|t| *t == Token::LParen)
                .ok_or(ExpressionError::MismatchedParentheses)?;

            let value = self.resolve_flat(&tokens[open + 1..close]).await?;
            tokens.splice(open..=close, [Token::Number(value)]);
        }

        if tokens.contains(&Token::LParen) {
            return Err(ExpressionError::MismatchedParentheses);
        }

        self.resolve_flat(&tokens).await
    }

    /// Evaluate a parenthesis-free `literal (op literal)*` sequence.
    async fn resolve_flat(&self, tokens: &[Token]) -> Result<f64, ExpressionError> {
        let (mut first, mut rest) = split_terms(tokens)?;

        let has_high = rest.iter().any(|(op, _)| op.is_high_precedence());
        let has_low = rest.iter().any(|(op, _)| !op.is_high_precedence());

        if has_high && has_low {
            while let Some(index) = rest.iter().position(|(op, _)| op.is_high_precedence()) {
                let (op, rhs) = rest.remove(index);
                let lhs = if index == 0 { first } else { rest[index - 1].1 };
                let value = self.run(lhs, op, rhs).await?;
                if index == 0 {
                    first = value;
                } else {
                    rest[index - 1].1 = value;
                }
            }
        }

        let mut accumulator = first;
        for (op, rhs) in rest {
            accumulator = self.run(accumulator, op, rhs).await?;
        }
        Ok(accumulator)
    }

    async fn run(&self, lhs: f64, op: Operator, rhs: f64) -> Result<f64, ExpressionError> {
        if op == Operator::Divide && rhs == 0.0 {
            return Err(ExpressionError::DivisionByZero);
        }
        let operation = BinaryOperation::new(lhs, op, rhs);
        debug!(arg1 = lhs, arg2 = rhs, operation = %op, "Executing operation");
        self.executor.execute(operation).await
    }
}

/// Split a flat token run into its leading literal and `(operator, literal)` pairs.
fn split_terms(tokens: &[Token]) -> Result<(f64, Vec<(Operator, f64)>), ExpressionError> {
    let mut iter = tokens.iter();
    let first = match iter.next() {
        Some(Token::Number(value)) => *value,
        _ => return Err(ExpressionError::invalid("expected a number")),
    };

    let mut rest = Vec::with_capacity(tokens.len() / 2);
    while let Some(token) = iter.next() {
        match (token, iter.next()) {
            (Token::Operator(op), Some(Token::Number(value))) => rest.push((*op, *value)),
            _ => return Err(ExpressionError::invalid("expected an operator followed by a number")),
        }
    }
    Ok((first, rest))
}
