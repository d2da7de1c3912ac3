//! Backend batch semantics through the service envelope.

use sweep::audit::AuditStore;
use sweep::deletion::BatchRequest;
use sweep::protocol::{ActionRequest, BatchData, BatchParams};
use sweep::types::RecordType;

use crate::integration::test_utils::{Fixture, TEST_TOKEN};

#[tokio::test]
async fn batch_on_emptied_collection_is_a_no_op() {
    let fx = Fixture::new(40);
    fx.seed(RecordType::Order, 3, &[]);
    let client = fx.client();

    let first = client
        .delete_batch(&BatchRequest::at_offset(RecordType::Order, 0), None)
        .await
        .unwrap();
    assert_eq!(first.deleted_count, 3);
    assert!(first.exhausted);

    let again = client
        .delete_batch(&BatchRequest::at_offset(RecordType::Order, 0), None)
        .await
        .unwrap();
    assert_eq!(again.deleted_count, 0);
    assert_eq!(again.skipped_count, 0);
    assert!(again.exhausted);
}

#[tokio::test]
async fn offset_without_cursor_skips_live_records() {
    let fx = Fixture::new(5);
    let ids = fx.seed(RecordType::Product, 8, &[]);
    let client = fx.client();

    let result = client
        .delete_batch(&BatchRequest::at_offset(RecordType::Product, 6), None)
        .await
        .unwrap();
    assert_eq!(result.deleted_count, 2);
    assert!(result.exhausted);
    assert_eq!(result.next_cursor, Some(ids[7]));
    assert_eq!(fx.count(RecordType::Product), 6);
}

#[tokio::test]
async fn variable_product_with_stuck_variation_is_skipped() {
    let fx = Fixture::new(40);
    let parent = fx.store.insert(RecordType::Product, "Hoodie", false).unwrap();
    fx.store
        .insert_dependent(RecordType::Product, parent, "Hoodie / XL", true)
        .unwrap();
    fx.store.insert(RecordType::Product, "Mug", false).unwrap();

    let result = fx
        .client()
        .delete_batch(&BatchRequest::at_offset(RecordType::Product, 0), None)
        .await
        .unwrap();

    assert_eq!(result.deleted_count, 1);
    assert_eq!(result.skipped_count, 1);
    assert_eq!(result.skipped[0].id, parent);
    assert!(result.skipped[0].error.is_some());
    assert_eq!(fx.count(RecordType::Product), 1);
}

#[tokio::test]
async fn skips_land_in_the_durable_log() {
    let fx = Fixture::new(40);
    fx.seed(RecordType::Order, 4, &[1, 3]);

    fx.client()
        .delete_batch(&BatchRequest::at_offset(RecordType::Order, 0), None)
        .await
        .unwrap();

    let audit = AuditStore::new(fx.db.clone()).unwrap();
    let entries = audit.read_skips(Some(RecordType::Order), 10).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].skipped.len(), 2);
    assert!(audit.read_skips(Some(RecordType::Product), 10).unwrap().is_empty());
}

#[test]
fn wire_response_uses_documented_field_names() {
    let fx = Fixture::with_token_auth(40);
    fx.seed(RecordType::Order, 2, &[0]);

    let response = fx.service.handle(ActionRequest::DeleteOrdersBatch(BatchParams {
        auth_token: TEST_TOKEN.to_string(),
        offset: 0,
        ..Default::default()
    }));
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["data"]["deleted"], 1);
    assert_eq!(value["data"]["skipped"], 1);
    assert_eq!(value["data"]["done"], true);
    assert_eq!(value["data"]["skipped_ids"].as_array().unwrap().len(), 1);

    let data: BatchData = response.into_result().unwrap();
    assert!(data.errors.is_empty());
}

#[test]
fn wrong_token_is_refused_without_touching_records() {
    let fx = Fixture::with_token_auth(40);
    fx.seed(RecordType::Product, 2, &[]);

    let response = fx.service.handle(ActionRequest::DeleteProductsBatch(BatchParams {
        auth_token: "guess".to_string(),
        ..Default::default()
    }));
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["success"], false);
    assert_eq!(value["data"], "Insufficient permissions");
    assert_eq!(fx.count(RecordType::Product), 2);
}
