//! Per-type run exclusivity enforced by the backend.

use std::sync::Arc;

use sweep::client::{CleanupClient, LocalTransport};
use sweep::deletion::BatchRequest;
use sweep::error::ApiError;
use sweep::orchestrator::{BatchOrchestrator, HeadlessPresenter, RunOutcome};
use sweep::types::RecordType;

use crate::integration::test_utils::Fixture;

#[tokio::test]
async fn overlapping_run_for_same_type_is_rejected() {
    let fx = Fixture::new(40);
    let client = fx.client();

    let lease = client.begin_run(RecordType::Product, "tab-1").await.unwrap();
    let err = client
        .begin_run(RecordType::Product, "tab-2")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::RunRejected(_)), "{:?}", err);
    assert!(err.to_string().contains("tab-1"));

    assert!(client.end_run(RecordType::Product, &lease.token).await.unwrap());
    client.begin_run(RecordType::Product, "tab-2").await.unwrap();
}

#[tokio::test]
async fn different_types_run_side_by_side() {
    let fx = Fixture::new(40);
    let client = fx.client();

    client.begin_run(RecordType::Product, "tab-1").await.unwrap();
    client.begin_run(RecordType::Order, "tab-2").await.unwrap();
}

#[tokio::test]
async fn expired_lease_can_be_taken_over() {
    let fx = Fixture::with_lease_ttl(40, 0);
    let client = fx.client();

    let stale = client.begin_run(RecordType::Order, "crashed").await.unwrap();
    let fresh = client.begin_run(RecordType::Order, "rescuer").await.unwrap();
    assert_ne!(stale.token, fresh.token);

    // The old holder's token no longer matches anything.
    assert!(!client.end_run(RecordType::Order, &stale.token).await.unwrap());
    let err = client
        .delete_batch(&BatchRequest::at_offset(RecordType::Order, 0), Some(&stale.token))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::LeaseInvalid(_)), "{:?}", err);
}

#[tokio::test]
async fn lease_less_batch_is_rejected_while_a_run_holds_the_lease() {
    let fx = Fixture::new(40);
    fx.seed(RecordType::Order, 3, &[]);
    let client = fx.client();

    client.begin_run(RecordType::Order, "tab-1").await.unwrap();
    let err = client
        .delete_batch(&BatchRequest::at_offset(RecordType::Order, 0), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::RunRejected(_)));
    assert_eq!(fx.count(RecordType::Order), 3);
}

#[tokio::test]
async fn orchestrated_run_fails_fast_when_another_run_is_active() {
    let fx = Fixture::new(40);
    fx.seed(RecordType::Product, 5, &[]);
    fx.client()
        .begin_run(RecordType::Product, "other session")
        .await
        .unwrap();

    let mut presenter = HeadlessPresenter::new(true);
    let transport = Arc::new(LocalTransport::new(fx.service.clone()));
    let client = CleanupClient::new(transport, "");
    let outcome = BatchOrchestrator::new(client, &mut presenter)
        .run(RecordType::Product)
        .await;

    match outcome {
        RunOutcome::Failed { summary, error } => {
            assert_eq!(error.code(), "run_in_progress");
            assert_eq!(summary.batches, 0);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(fx.count(RecordType::Product), 5);
    // The foreign lease is untouched.
    assert!(fx.service.leases().current(RecordType::Product).unwrap().is_some());
}
