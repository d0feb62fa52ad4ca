//! # Task Slot
//!
//! Single-element hand-off buffer between decompositions (producers) and
//! polling workers (consumers).
//!
//! - `publish` succeeds only while the slot is empty
//! - `claim` atomically takes the entry; it never blocks, workers poll
//! - exactly one `claim` succeeds per `publish`

use parking_lot::Mutex;
use thiserror::Error;

use crate::models::{Task, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("Task slot occupied by unclaimed task {occupant}")]
    Occupied { occupant: TaskId },
}

#[derive(Debug, Default)]
pub struct TaskSlot {
    entry: Mutex<Option<Task>>,
}

impl TaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `task` as the sole claimable entry.
    pub fn publish(&self, task: Task) -> Result<(), SlotError> {
        let mut entry = self.entry.lock();
        if let Some(occupant) = entry.as_ref() {
            return Err(SlotError::Occupied {
                occupant: occupant.id,
            });
        }
        *entry = Some(task);
        Ok(())
    }

    /// Remove and return the unclaimed entry, if any.
    pub fn claim(&self) -> Option<Task> {
        self.entry.lock().take()
    }

    /// Re-inspect a published task without claiming it. Returns `None` once
    /// a worker has claimed it, or if the slot holds someone else's task.
    pub fn peek_own(&self, task_id: TaskId) -> Option<Task> {
        self.entry
            .lock()
            .as_ref()
            .filter(|task| task.id == task_id)
            .cloned()
    }

    pub fn occupant(&self) -> Option<TaskId> {
        self.entry.lock().as_ref().map(|task| task.id)
    }

    pub fn is_empty(&self) -> bool {
        self.entry.lock().is_none()
    }
}
