//! # Workers
//!
//! Compute side of the engine: workers poll a coordinator for tasks, pad
//! each operation to its configured duration and submit the result.

pub mod agent;
pub mod client;
pub mod pool;

pub use agent::{PollOutcome, Worker, WorkerStats};
pub use client::{DispatchClient, LocalDispatchClient};
pub use pool::WorkerPool;
