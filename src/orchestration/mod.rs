//! # Orchestration
//!
//! Coordination core that turns submitted expressions into worker tasks.
//!
//! ## Core Components
//!
//! - **Coordinator**: owns expressions and in-flight tasks, spawns one
//!   decomposition per submitted expression
//! - **TaskSlot**: capacity-one hand-off that workers claim from
//! - **TaskRegistry**: in-flight tasks keyed by id, with their completion signals
//! - **Dispatcher**: the authorized `get_task` / `submit_result` protocol

pub mod coordinator;
pub mod dispatcher;
mod slot_executor;
pub mod task_registry;
pub mod task_slot;

pub use coordinator::{Coordinator, CoordinatorBuilder, ORPHANED_EXPRESSION_ERROR};
pub use dispatcher::Dispatcher;
pub use task_registry::TaskRegistry;
pub use task_slot::{SlotError, TaskSlot};
