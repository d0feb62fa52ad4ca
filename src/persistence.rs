//! # Expression Persistence
//!
//! The coordinator writes every expression snapshot through an
//! [`ExpressionStore`] after each transition, and consults it for ids it does
//! not hold in memory (e.g. expressions from a previous process).

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::models::{Expression, ExpressionId};

#[async_trait]
pub trait ExpressionStore: Send + Sync {
    /// Durably record the snapshot for `id`, replacing any earlier one.
    async fn store(&self, id: ExpressionId, snapshot: &Expression) -> Result<()>;

    async fn fetch(&self, id: ExpressionId) -> Result<Option<Expression>>;

    /// All known expression ids, in no particular order.
    async fn list_ids(&self) -> Result<Vec<ExpressionId>>;
}

/// Process-local store backed by a `DashMap`.
///
/// Writes that would move an expression backwards in its lifecycle are
/// dropped, so a late write of an older snapshot cannot regress the status.
#[derive(Debug, Default, Clone)]
pub struct InMemoryExpressionStore {
    snapshots: Arc<DashMap<ExpressionId, Expression>>,
}

impl InMemoryExpressionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExpressionStore for InMemoryExpressionStore {
    async fn store(&self, id: ExpressionId, snapshot: &Expression) -> Result<()> {
        let mut entry = self
            .snapshots
            .entry(id)
            .or_insert_with(|| snapshot.clone());

        if snapshot.status.rank() >= entry.status.rank() {
            *entry = snapshot.clone();
        } else {
            debug!(
                expression_id = id,
                stored = %entry.status,
                incoming = %snapshot.status,
                "Ignoring stale expression snapshot"
            );
        }
        Ok(())
    }

    async fn fetch(&self, id: ExpressionId) -> Result<Option<Expression>> {
        Ok(self.snapshots.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_ids(&self) -> Result<Vec<ExpressionId>> {
        Ok(self.snapshots.iter().map(|entry| *entry.key()).collect())
    }
}
