//! # Coordinator
//!
//! Owns the expression arena, the task registry and the task slot for one
//! calculation service. Every submitted expression is decomposed by its own
//! spawned tokio task; workers drive the tasks through the [`Dispatcher`].
//!
//! ## Locking
//!
//! The expression arena and the task registry share one `parking_lot::Mutex`
//! (the ledger). The slot carries its own lock. No code path holds both, and
//! no lock is held across an `.await`.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info, instrument, warn};

use super::dispatcher::Dispatcher;
use super::slot_executor::SlotExecutor;
use super::task_registry::TaskRegistry;
use super::task_slot::TaskSlot;
use crate::auth::{AllowAll, Authorizer};
use crate::config::{CalcConfig, CoordinatorConfig, OperationTimings};
use crate::decomposer::{self, Decomposer};
use crate::error::{DispatchError, Result};
use crate::logging::{log_error, log_expression_operation};
use crate::models::{Expression, ExpressionId, Task, TaskId};
use crate::persistence::{ExpressionStore, InMemoryExpressionStore};
use crate::state_machine::{ExpressionEvent, ExpressionStateMachine};

/// Error recorded on stored expressions that were still running when the
/// previous coordinator stopped.
pub const ORPHANED_EXPRESSION_ERROR: &str = "Coordinator restarted before the expression finished";

/// Everything guarded by the coordinator's single state lock.
#[derive(Debug)]
pub(crate) struct Ledger {
    pub(crate) expressions: HashMap<ExpressionId, Expression>,
    pub(crate) tasks: TaskRegistry,
    next_expression_id: ExpressionId,
}

impl Ledger {
    fn starting_at(next_expression_id: ExpressionId) -> Self {
        Self {
            expressions: HashMap::new(),
            tasks: TaskRegistry::new(),
            next_expression_id,
        }
    }
}

/// State shared between the coordinator, its dispatcher and every running
/// decomposition.
pub(crate) struct Shared {
    pub(crate) slot: TaskSlot,
    pub(crate) ledger: Mutex<Ledger>,
    pub(crate) store: Arc<dyn ExpressionStore>,
    pub(crate) authorizer: Arc<dyn Authorizer>,
    pub(crate) timings: OperationTimings,
    pub(crate) config: CoordinatorConfig,
    /// Notified whenever an expression reaches a terminal state.
    finished: Notify,
}

impl Shared {
    /// Apply `event` to an expression under the ledger lock, then write the
    /// resulting snapshot through to the store.
    pub(crate) async fn apply(&self, id: ExpressionId, event: ExpressionEvent) -> Result<Expression> {
        let event_type = event.event_type();
        let snapshot = {
            let mut ledger = self.ledger.lock();
            let expression = ledger
                .expressions
                .get_mut(&id)
                .ok_or(DispatchError::ExpressionNotFound { expression_id: id })?;
            ExpressionStateMachine::new(expression).transition(event)?;
            expression.clone()
        };

        self.store.store(id, &snapshot).await?;

        log_expression_operation(
            event_type,
            id,
            &snapshot.status.to_string(),
            snapshot.error.as_deref(),
        );

        if snapshot.status.is_terminal() {
            self.finished.notify_waiters();
        }
        Ok(snapshot)
    }
}

/// Builder for a [`Coordinator`] with non-default collaborators.
pub struct CoordinatorBuilder {
    timings: OperationTimings,
    config: CoordinatorConfig,
    store: Option<Arc<dyn ExpressionStore>>,
    authorizer: Option<Arc<dyn Authorizer>>,
}

impl CoordinatorBuilder {
    pub fn timings(mut self, timings: OperationTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(mut self, store: Arc<dyn ExpressionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// Build the coordinator, continuing id numbering after the largest id
    /// already present in the store.
    ///
    /// Stored snapshots that never reached a terminal state belonged to a
    /// process that is gone, so they are failed and written back.
    pub async fn build(self) -> Result<Coordinator> {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryExpressionStore::new()) as Arc<dyn ExpressionStore>);
        let authorizer = self
            .authorizer
            .unwrap_or_else(|| Arc::new(AllowAll) as Arc<dyn Authorizer>);

        let stored_ids = store.list_ids().await?;
        for &id in &stored_ids {
            fail_orphan(store.as_ref(), id).await?;
        }
        let next_expression_id = stored_ids.into_iter().max().map_or(1, |max| max + 1);

        info!(
            next_expression_id,
            publish_retry_limit = self.config.publish_retry_limit,
            "🧮 COORDINATOR: Initialized"
        );

        let shared = Arc::new(Shared {
            slot: TaskSlot::new(),
            ledger: Mutex::new(Ledger::starting_at(next_expression_id)),
            store,
            authorizer,
            timings: self.timings,
            config: self.config,
            finished: Notify::new(),
        });

        Ok(Coordinator {
            dispatcher: Dispatcher::new(Arc::clone(&shared)),
            shared,
        })
    }
}

async fn fail_orphan(store: &dyn ExpressionStore, id: ExpressionId) -> Result<()> {
    let Some(mut snapshot) = store.fetch(id).await? else {
        return Ok(());
    };
    if snapshot.status.is_terminal() {
        return Ok(());
    }

    let abandoned = snapshot.status;
    ExpressionStateMachine::new(&mut snapshot)
        .transition(ExpressionEvent::fail_with_error(ORPHANED_EXPRESSION_ERROR))?;
    store.store(id, &snapshot).await?;

    warn!(expression_id = id, from = %abandoned, "Failed expression left unfinished by a previous run");
    Ok(())
}

/// Cheaply cloneable handle to one calculation service.
#[derive(Clone)]
pub struct Coordinator {
    shared: Arc<Shared>,
    dispatcher: Dispatcher,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("slot_occupant", &self.shared.slot.occupant())
            .field("timings", &self.shared.timings)
            .field("config", &self.shared.config)
            .finish()
    }
}

impl Coordinator {
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder {
            timings: OperationTimings::default(),
            config: CoordinatorConfig::default(),
            store: None,
            authorizer: None,
        }
    }

    /// Builder pre-populated from a loaded configuration.
    pub fn from_config(config: &CalcConfig) -> CoordinatorBuilder {
        Self::builder()
            .timings(config.timings)
            .config(config.coordinator.clone())
    }

    /// Accept an expression and start decomposing it in the background.
    ///
    /// Returns the new id immediately. Validation failures surface later as
    /// an `Error` snapshot, never as an error here.
    #[instrument(skip(self))]
    pub async fn submit(&self, expression: &str) -> Result<ExpressionId> {
        let snapshot = {
            let mut ledger = self.shared.ledger.lock();
            let id = ledger.next_expression_id;
            ledger.next_expression_id += 1;
            let snapshot = Expression::new(id, expression);
            ledger.expressions.insert(id, snapshot.clone());
            snapshot
        };
        let id = snapshot.id;

        if let Err(error) = self.shared.store.store(id, &snapshot).await {
            self.shared.ledger.lock().expressions.remove(&id);
            return Err(error);
        }

        log_expression_operation("submit", id, &snapshot.status.to_string(), Some(expression));

        let shared = Arc::clone(&self.shared);
        let text = expression.to_string();
        tokio::spawn(async move {
            run_decomposition(shared, id, text).await;
        });

        Ok(id)
    }

    /// Current snapshot of an expression, falling back to the store for ids
    /// this process never held.
    pub async fn get_expression(&self, id: ExpressionId) -> Result<Expression> {
        let cached = self.shared.ledger.lock().expressions.get(&id).cloned();
        if let Some(expression) = cached {
            return Ok(expression);
        }

        self.shared
            .store
            .fetch(id)
            .await?
            .ok_or_else(|| DispatchError::ExpressionNotFound { expression_id: id }.into())
    }

    /// All known expressions ordered by id.
    pub async fn list_expressions(&self) -> Result<Vec<Expression>> {
        let mut by_id: BTreeMap<ExpressionId, Expression> = self
            .shared
            .ledger
            .lock()
            .expressions
            .iter()
            .map(|(id, expression)| (*id, expression.clone()))
            .collect();

        for id in self.shared.store.list_ids().await? {
            if by_id.contains_key(&id) {
                continue;
            }
            if let Some(expression) = self.shared.store.fetch(id).await? {
                by_id.insert(id, expression);
            }
        }

        Ok(by_id.into_values().collect())
    }

    /// Wait until an expression is Complete or Error and return that snapshot.
    pub async fn wait_for(&self, id: ExpressionId) -> Result<Expression> {
        loop {
            let notified = self.shared.finished.notified();
            let snapshot = self.get_expression(id).await?;
            if snapshot.status.is_terminal() {
                return Ok(snapshot);
            }
            notified.await;
        }
    }

    pub fn get_task(&self, credential: Option<&str>) -> std::result::Result<Task, DispatchError> {
        self.dispatcher.get_task(credential)
    }

    pub fn submit_result(
        &self,
        credential: Option<&str>,
        task_id: TaskId,
        result: f64,
    ) -> std::result::Result<(), DispatchError> {
        self.dispatcher.submit_result(credential, task_id, result)
    }

    /// Number of tasks created but not yet consumed by their decomposition.
    pub fn in_flight_tasks(&self) -> usize {
        self.shared.ledger.lock().tasks.len()
    }

    /// Id of the task currently waiting in the slot, if any.
    pub fn published_task(&self) -> Option<TaskId> {
        self.shared.slot.occupant()
    }
}

/// Body of the per-expression tokio task.
async fn run_decomposition(shared: Arc<Shared>, id: ExpressionId, text: String) {
    let tokens = match decomposer::parse(&text) {
        Ok(tokens) => tokens,
        Err(error) => {
            warn!(expression_id = id, kind = error.kind(), %error, "Rejected expression");
            record_outcome(&shared, id, ExpressionEvent::fail_with_error(error.to_string())).await;
            return;
        }
    };

    if !record_outcome(&shared, id, ExpressionEvent::Accept).await {
        return;
    }

    let decomposer = Decomposer::new(SlotExecutor::new(Arc::clone(&shared), id));
    let event = match decomposer.evaluate(tokens).await {
        Ok(value) => {
            debug!(expression_id = id, value, "Expression evaluated");
            ExpressionEvent::Complete(value)
        }
        Err(error) => {
            warn!(expression_id = id, kind = error.kind(), %error, "Decomposition failed");
            ExpressionEvent::fail_with_error(error.to_string())
        }
    };

    record_outcome(&shared, id, event).await;
}

async fn record_outcome(shared: &Shared, id: ExpressionId, event: ExpressionEvent) -> bool {
    let event_type = event.event_type();
    match shared.apply(id, event).await {
        Ok(_) => true,
        Err(error) => {
            log_error(
                "coordinator",
                event_type,
                &error.to_string(),
                Some(&format!("expression_id={id}")),
            );
            false
        }
    }
}
