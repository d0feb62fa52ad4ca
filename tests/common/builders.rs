use std::time::Duration;

use calc_core::config::{CoordinatorConfig, OperationTimings, WorkerConfig};
use calc_core::error::DispatchError;
use calc_core::models::Task;
use calc_core::orchestration::Coordinator;

/// Coordinator with no operation padding and a generous publish budget.
pub async fn fast_coordinator() -> Coordinator {
    Coordinator::builder()
        .timings(OperationTimings::zero())
        .config(fast_coordinator_config())
        .build()
        .await
        .expect("coordinator builds over an empty store")
}

pub fn fast_coordinator_config() -> CoordinatorConfig {
    CoordinatorConfig {
        publish_retry_limit: 10_000,
        publish_backoff: Duration::from_millis(1),
    }
}

pub fn fast_worker_config(computing_power: usize) -> WorkerConfig {
    WorkerConfig {
        computing_power,
        poll_interval: Duration::from_millis(1),
        startup_jitter: Duration::from_millis(10),
        submit_retry_limit: 5,
        submit_backoff: Duration::from_millis(1),
        ..WorkerConfig::default()
    }
}

/// Play the worker by hand: wait until a task is published and claim it.
pub async fn claim_next(coordinator: &Coordinator, credential: Option<&str>) -> Task {
    let claim = async {
        loop {
            match coordinator.get_task(credential) {
                Ok(task) => return task,
                Err(DispatchError::NotAvailable) => {
                    tokio::time::sleep(Duration::from_millis(1)).await
                }
                Err(other) => panic!("unexpected dispatch error: {other}"),
            }
        }
    };

    tokio::time::timeout(Duration::from_secs(5), claim)
        .await
        .expect("no task published within 5s")
}
