//! # Worker Pool
//!
//! Spawns one [`Worker`] per unit of computing power and stops them all
//! through a shared broadcast signal.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use super::agent::{Worker, WorkerStats};
use super::client::DispatchClient;
use crate::config::WorkerConfig;
use crate::logging::log_error;

pub struct WorkerPool {
    handles: Vec<JoinHandle<WorkerStats>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl WorkerPool {
    /// Start `config.computing_power` workers against `client`.
    pub fn spawn(client: Arc<dyn DispatchClient>, config: &WorkerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        info!(
            "🏊 POOL: Starting {} workers (poll interval {:?})",
            config.computing_power, config.poll_interval
        );

        let handles = (0..config.computing_power)
            .map(|id| {
                let worker = Worker::new(id, Arc::clone(&client), config.clone());
                tokio::spawn(worker.run(shutdown_tx.subscribe()))
            })
            .collect();

        Self {
            handles,
            shutdown_tx,
        }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Signal every worker to stop and wait for them. A worker in the middle
    /// of a task finishes submitting it first.
    pub async fn shutdown(self) -> Vec<WorkerStats> {
        info!("🛑 POOL: Shutting down {} workers", self.handles.len());
        // No receivers left only if every worker already exited.
        let _ = self.shutdown_tx.send(());

        let mut stats = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            match handle.await {
                Ok(worker_stats) => stats.push(worker_stats),
                Err(error) => log_error("worker_pool", "shutdown", &error.to_string(), None),
            }
        }

        let completed: u64 = stats.iter().map(|s| s.tasks_completed).sum();
        info!(
            "✅ POOL: {} workers stopped after completing {} tasks",
            stats.len(),
            completed
        );
        stats
    }
}
