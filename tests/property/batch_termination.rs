//! Property-based tests for batch run termination and accounting

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;
use sweep::auth::LocalAuthorizer;
use sweep::client::{CleanupClient, LocalTransport};
use sweep::deletion::BatchRequest;
use sweep::orchestrator::{BatchOrchestrator, HeadlessPresenter};
use sweep::service::{CleanupService, ServiceLimits};
use sweep::store::{RecordStore, SledRecordStore};
use sweep::types::RecordType;
use tempfile::TempDir;

fn collection() -> impl Strategy<Value = (u64, usize, BTreeSet<u64>)> {
    (0u64..120, 1usize..50).prop_flat_map(|(n, batch)| {
        let held = if n == 0 {
            Just(BTreeSet::new()).boxed()
        } else {
            proptest::collection::btree_set(0..n, 0..=(n as usize).min(8)).boxed()
        };
        (Just(n), Just(batch), held)
    })
}

/// Any collection drains to exactly its held records in a bounded number of calls
#[test]
fn test_run_terminates_with_only_held_records_left() {
    let mut runner = proptest::test_runner::TestRunner::new(ProptestConfig {
        cases: 32,
        ..ProptestConfig::default()
    });

    runner
        .run(&collection(), |(n, batch_size, held)| {
            let dir = TempDir::new().unwrap();
            let db = sled::open(dir.path().join("db")).unwrap();
            let store = SledRecordStore::from_db(db.clone()).unwrap();
            for i in 0..n {
                store
                    .insert(RecordType::Product, format!("product {}", i), held.contains(&i))
                    .unwrap();
            }
            let service = Arc::new(
                CleanupService::open(
                    db,
                    ServiceLimits {
                        batch_size,
                        lease_ttl_secs: 120,
                    },
                    Arc::new(LocalAuthorizer),
                )
                .unwrap(),
            );

            let rt = tokio::runtime::Runtime::new().unwrap();
            let mut presenter = HeadlessPresenter::new(true);
            let client = CleanupClient::new(Arc::new(LocalTransport::new(service)), "");
            let outcome = rt.block_on(async {
                BatchOrchestrator::new(client, &mut presenter)
                    .run(RecordType::Product)
                    .await
            });

            prop_assert!(outcome.is_success(), "{}", outcome.message());
            let summary = outcome.summary().unwrap();
            let held_count = held.len() as u64;
            prop_assert_eq!(summary.deleted, n - held_count);
            prop_assert_eq!(summary.skipped, held_count);
            prop_assert_eq!(store.count(RecordType::Product).unwrap(), held_count);

            let max_calls = n.div_ceil(batch_size as u64) + 1;
            prop_assert!(summary.batches <= max_calls);

            let percentages = presenter.percentages();
            prop_assert!(percentages.windows(2).all(|w| w[0] <= w[1]));
            prop_assert!(percentages.iter().all(|p| *p <= 100));

            Ok(())
        })
        .unwrap();
}

/// Repeating a batch after the collection is empty never reports work
#[test]
fn test_batch_on_empty_collection_is_idempotent() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(1usize..60, 0u64..200), |(batch_size, offset)| {
            let dir = TempDir::new().unwrap();
            let db = sled::open(dir.path().join("db")).unwrap();
            let service = Arc::new(
                CleanupService::open(
                    db,
                    ServiceLimits {
                        batch_size,
                        lease_ttl_secs: 120,
                    },
                    Arc::new(LocalAuthorizer),
                )
                .unwrap(),
            );
            let client = CleanupClient::new(Arc::new(LocalTransport::new(service)), "");

            let rt = tokio::runtime::Runtime::new().unwrap();
            let request = BatchRequest::at_offset(RecordType::Order, offset);
            let result = rt.block_on(client.delete_batch(&request, None)).unwrap();
            prop_assert_eq!(result.deleted_count, 0);
            prop_assert_eq!(result.skipped_count, 0);
            prop_assert!(result.exhausted);

            Ok(())
        })
        .unwrap();
}
