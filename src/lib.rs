#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Calc Core
//!
//! Distributed arithmetic expression engine.
//!
//! ## Overview
//!
//! A coordinator accepts infix expressions (`+ - * /`, parentheses, decimal
//! literals), decomposes each into a sequence of binary operations and hands
//! those out one at a time to a pool of polling workers. Workers pad every
//! operation to a configurable duration, which makes the engine a testbed
//! for slow distributed computation.
//!
//! ## Architecture
//!
//! - Every submitted expression is decomposed by its own tokio task. Each
//!   operation is published into a capacity-one **task slot** and the
//!   decomposition waits on a oneshot completion signal before producing the
//!   next one.
//! - Workers poll the slot through the dispatcher (`get_task`), compute, and
//!   report back (`submit_result`). Credentials are checked on both calls.
//! - Expression and task lifecycles are forward-only state machines.
//!
//! ## Module Organization
//!
//! - [`decomposer`] - Tokenizer, validation and the operation-ordering algorithm
//! - [`orchestration`] - Coordinator, task slot, task registry and dispatcher
//! - [`worker`] - Polling worker loop and worker pool
//! - [`state_machine`] - Expression and task lifecycles
//! - [`models`] - Expressions, tasks and their wire payloads
//! - [`persistence`] - Expression snapshot store
//! - [`auth`] - Worker authorization
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use calc_core::config::CalcConfig;
//! use calc_core::orchestration::Coordinator;
//! use calc_core::worker::{LocalDispatchClient, WorkerPool};
//!
//! # async fn example() -> calc_core::Result<()> {
//! let config = CalcConfig::load()?;
//! let coordinator = Coordinator::from_config(&config).build().await?;
//! let pool = WorkerPool::spawn(
//!     Arc::new(LocalDispatchClient::anonymous(coordinator.clone())),
//!     &config.worker,
//! );
//!
//! let id = coordinator.submit("(10+2)*2").await?;
//! let expression = coordinator.wait_for(id).await?;
//! assert_eq!(expression.result, Some(24.0));
//!
//! pool.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod decomposer;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod persistence;
pub mod state_machine;
pub mod worker;

pub use auth::{AllowAll, Authorizer, TokenAuthority};
pub use config::{CalcConfig, CoordinatorConfig, OperationTimings, WorkerConfig};
pub use decomposer::{Decomposer, LocalExecutor, OperationExecutor, RecordingExecutor};
pub use error::{CalcError, DispatchError, ExpressionError, Result};
pub use models::{Expression, ExpressionId, Operator, Task, TaskId};
pub use orchestration::{Coordinator, CoordinatorBuilder};
pub use persistence::{ExpressionStore, InMemoryExpressionStore};
pub use state_machine::{ExpressionState, TaskState};
pub use worker::{LocalDispatchClient, Worker, WorkerPool};
