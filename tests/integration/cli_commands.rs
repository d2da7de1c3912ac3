//! CLI route table driven through RunContext.

use sweep::cli::{Commands, RunContext};
use sweep::config::SweepConfig;
use sweep::error::ApiError;
use sweep::types::RecordType;
use tempfile::TempDir;

fn context(dir: &TempDir) -> RunContext {
    RunContext::from_config(dir.path().to_path_buf(), SweepConfig::default()).unwrap()
}

fn seed(ctx: &RunContext, products: u64, orders: u64, held: u64) {
    ctx.execute(&Commands::Seed {
        products,
        variations: 2,
        orders,
        items: 3,
        held,
    })
    .unwrap();
}

fn counts_json(ctx: &RunContext) -> serde_json::Value {
    let out = ctx
        .execute(&Commands::Counts {
            format: "json".to_string(),
        })
        .unwrap();
    serde_json::from_str(&out).unwrap()
}

#[test]
fn seed_then_count() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    seed(&ctx, 12, 7, 0);

    let counts = counts_json(&ctx);
    assert_eq!(counts["product_count"], 12);
    assert_eq!(counts["order_count"], 7);
}

#[test]
fn delete_with_yes_clears_the_collection_and_records_the_run() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    seed(&ctx, 0, 90, 1);

    let out = ctx
        .execute(&Commands::Delete {
            record_type: RecordType::Order,
            yes: true,
        })
        .unwrap();
    assert!(out.contains("Deleted 89 orders"), "{}", out);
    assert!(out.contains("1 skipped order"));

    let counts = counts_json(&ctx);
    assert_eq!(counts["order_count"], 1);

    let audit: serde_json::Value = serde_json::from_str(
        &ctx.execute(&Commands::Audit {
            record_type: Some(RecordType::Order),
            limit: 10,
            format: "json".to_string(),
        })
        .unwrap(),
    )
    .unwrap();
    let runs = audit["runs"].as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["status"], "succeeded");
    assert_eq!(runs[0]["processed"], 89);
    assert_eq!(runs[0]["skipped"], 1);
    assert_eq!(audit["skips"].as_array().unwrap().len(), 1);
}

#[test]
fn delete_on_empty_store_reports_nothing_found() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);

    let out = ctx
        .execute(&Commands::Delete {
            record_type: RecordType::Product,
            yes: true,
        })
        .unwrap();
    assert!(out.contains("No products found to delete."), "{}", out);
}

#[test]
fn seed_refuses_remote_mode() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir).with_remote(Some("http://127.0.0.1:9".to_string()), None);

    let err = ctx
        .execute(&Commands::Seed {
            products: 1,
            variations: 0,
            orders: 0,
            items: 0,
            held: 0,
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)));
}

#[test]
fn serve_requires_configured_tokens() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);

    let err = ctx.execute(&Commands::Serve { bind: None }).unwrap_err();
    assert!(matches!(err, ApiError::ConfigError(_)));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let dir = TempDir::new().unwrap();
    let mut config = SweepConfig::default();
    config.cleanup.batch_size = 0;

    let err = RunContext::from_config(dir.path().to_path_buf(), config)
        .err()
        .unwrap();
    assert!(err.to_string().contains("batch_size"));
}

#[test]
fn audit_text_on_fresh_store() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);

    let out = ctx
        .execute(&Commands::Audit {
            record_type: None,
            limit: 5,
            format: "text".to_string(),
        })
        .unwrap();
    assert!(out.contains("No runs recorded."));
    assert!(out.contains("No skipped records logged."));
}
