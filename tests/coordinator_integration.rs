mod common;

use std::sync::Arc;
use std::time::Duration;

use calc_core::config::OperationTimings;
use calc_core::error::DispatchError;
use calc_core::models::{Expression, Operator};
use calc_core::orchestration::{Coordinator, ORPHANED_EXPRESSION_ERROR};
use calc_core::persistence::{ExpressionStore, InMemoryExpressionStore};
use calc_core::state_machine::{ExpressionState, TaskState};
use common::*;

#[tokio::test]
async fn test_single_task_round_trip() {
    let coordinator = fast_coordinator().await;
    let id = coordinator.submit("2+2").await.unwrap();

    let task = claim_next(&coordinator, None).await;
    assert_eq!(task.expression_id, id);
    assert_eq!(
        (task.arg1, task.operation, task.arg2),
        (2.0, Operator::Add, 2.0)
    );
    assert_eq!(task.status, TaskState::Computing);

    coordinator.submit_result(None, task.id, 4.0).unwrap();

    let snapshot = coordinator.wait_for(id).await.unwrap();
    assert_eq!(snapshot.status, ExpressionState::Complete);
    assert_eq!(snapshot.result, Some(4.0));
    assert!(coordinator.published_task().is_none());
    assert_eq!(coordinator.in_flight_tasks(), 0);
}

#[tokio::test]
async fn test_duplicate_result_is_rejected_without_regression() {
    let coordinator = fast_coordinator().await;
    let id = coordinator.submit("5-3").await.unwrap();

    let task = claim_next(&coordinator, None).await;
    coordinator.submit_result(None, task.id, 2.0).unwrap();
    let first = coordinator.wait_for(id).await.unwrap();

    assert_eq!(
        coordinator.submit_result(None, task.id, 99.0).unwrap_err(),
        DispatchError::NotFound { task_id: task.id }
    );

    let second = coordinator.get_expression(id).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(second.result, Some(2.0));
}

#[tokio::test]
async fn test_groups_resolve_before_outer_operation() {
    let coordinator = fast_coordinator().await;
    let id = coordinator.submit("(10+2)*2").await.unwrap();

    let first = claim_next(&coordinator, None).await;
    assert_eq!(
        (first.arg1, first.operation, first.arg2),
        (10.0, Operator::Add, 2.0)
    );
    coordinator.submit_result(None, first.id, first.compute()).unwrap();

    let second = claim_next(&coordinator, None).await;
    assert_eq!(
        (second.arg1, second.operation, second.arg2),
        (12.0, Operator::Multiply, 2.0)
    );
    assert!(second.id > first.id);
    coordinator.submit_result(None, second.id, second.compute()).unwrap();

    let snapshot = coordinator.wait_for(id).await.unwrap();
    assert_eq!(snapshot.result, Some(24.0));
}

#[tokio::test]
async fn test_literal_division_by_zero() {
    let coordinator = fast_coordinator().await;
    let id = coordinator.submit("1/0").await.unwrap();

    let snapshot = coordinator.wait_for(id).await.unwrap();
    assert_eq!(snapshot.status, ExpressionState::Error);
    assert_eq!(snapshot.error.as_deref(), Some("Division by zero"));
    assert!(snapshot.result.is_none());
    assert!(coordinator.published_task().is_none());
}

#[tokio::test]
async fn test_computed_division_by_zero() {
    let coordinator = fast_coordinator().await;
    let id = coordinator.submit("1/(2-2)").await.unwrap();

    let task = claim_next(&coordinator, None).await;
    assert_eq!(task.operation, Operator::Subtract);
    coordinator.submit_result(None, task.id, task.compute()).unwrap();

    let snapshot = coordinator.wait_for(id).await.unwrap();
    assert_eq!(snapshot.status, ExpressionState::Error);
    assert_eq!(snapshot.error.as_deref(), Some("Division by zero"));
}

#[tokio::test]
async fn test_parse_errors_are_distinct_and_publish_nothing() {
    let cases = [
        ("2++2", "Invalid expression"),
        ("(2+2", "Mismatched parentheses"),
        ("2+a", "Unknown operation: 'a'"),
        ("", "Expression is empty"),
        ("-5+3", "Invalid expression"),
        ("12", "Invalid expression"),
    ];

    let coordinator = fast_coordinator().await;
    for (input, message) in cases {
        let id = coordinator.submit(input).await.unwrap();
        let snapshot = coordinator.wait_for(id).await.unwrap();

        assert_eq!(snapshot.status, ExpressionState::Error, "input {input:?}");
        let error = snapshot.error.unwrap_or_default();
        assert!(error.starts_with(message), "input {input:?} gave {error:?}");
        assert!(coordinator.published_task().is_none());
        assert_eq!(coordinator.get_task(None).unwrap_err(), DispatchError::NotAvailable);
    }
}

#[tokio::test]
async fn test_expressions_share_the_slot() {
    let coordinator = fast_coordinator().await;
    let ids = [
        coordinator.submit("1+2*3").await.unwrap(),
        coordinator.submit("(4+4)/2").await.unwrap(),
        coordinator.submit("9-3-3").await.unwrap(),
    ];

    // 2 + 2 + 2 operations in total, served one at a time by a single fake worker.
    for _ in 0..6 {
        let task = claim_next(&coordinator, None).await;
        assert!(coordinator.published_task() != Some(task.id));
        coordinator.submit_result(None, task.id, task.compute()).unwrap();
    }

    let mut results = Vec::new();
    for id in ids {
        results.push(coordinator.wait_for(id).await.unwrap().result);
    }
    assert_eq!(results, vec![Some(7.0), Some(4.0), Some(3.0)]);
}

#[tokio::test]
async fn test_list_is_sorted_by_id() {
    let coordinator = fast_coordinator().await;
    for input in ["3+3", "bad", "1*1"] {
        coordinator.submit(input).await.unwrap();
    }

    let ids: Vec<_> = coordinator
        .list_expressions()
        .await
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_restart_continues_numbering_from_store() {
    let store = Arc::new(InMemoryExpressionStore::new());
    for id in [3, 7] {
        let mut expression = Expression::new(id, "1+1");
        expression.status = ExpressionState::Complete;
        expression.result = Some(2.0);
        store.store(id, &expression).await.unwrap();
    }

    let coordinator = Coordinator::builder()
        .timings(OperationTimings::zero())
        .store(store.clone())
        .build()
        .await
        .unwrap();

    let id = coordinator.submit("2*2").await.unwrap();
    assert_eq!(id, 8);

    let restored = coordinator.get_expression(3).await.unwrap();
    assert_eq!(restored.result, Some(2.0));

    let ids: Vec<_> = coordinator
        .list_expressions()
        .await
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec![3, 7, 8]);
}

#[tokio::test]
async fn test_restart_fails_unfinished_expressions() {
    let store = Arc::new(InMemoryExpressionStore::new());
    let mut running = Expression::new(1, "2+2");
    running.status = ExpressionState::InProgress;
    store.store(1, &running).await.unwrap();
    store.store(2, &Expression::new(2, "3*3")).await.unwrap();

    let coordinator = Coordinator::builder()
        .timings(OperationTimings::zero())
        .store(store.clone())
        .build()
        .await
        .unwrap();

    for id in [1, 2] {
        let snapshot = tokio::time::timeout(Duration::from_secs(2), coordinator.wait_for(id))
            .await
            .expect("restored expression is terminal")
            .unwrap();
        assert_eq!(snapshot.status, ExpressionState::Error);
        assert_eq!(snapshot.error.as_deref(), Some(ORPHANED_EXPRESSION_ERROR));

        let stored = store.fetch(id).await.unwrap().unwrap();
        assert_eq!(stored, snapshot);
    }
    assert!(coordinator.published_task().is_none());
}

#[tokio::test]
async fn test_snapshots_are_written_through() {
    let store = Arc::new(InMemoryExpressionStore::new());
    let coordinator = Coordinator::builder()
        .timings(OperationTimings::zero())
        .store(store.clone())
        .build()
        .await
        .unwrap();

    let id = coordinator.submit("6/3").await.unwrap();
    let task = claim_next(&coordinator, None).await;
    let in_progress = store.fetch(id).await.unwrap().unwrap();
    assert_eq!(in_progress.status, ExpressionState::InProgress);

    coordinator.submit_result(None, task.id, 2.0).unwrap();
    coordinator.wait_for(id).await.unwrap();

    let stored = store.fetch(id).await.unwrap().unwrap();
    assert_eq!(stored.status, ExpressionState::Complete);
    assert_eq!(stored.result, Some(2.0));
}
