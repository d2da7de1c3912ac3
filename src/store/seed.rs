//! Sample data generation for staging stores and tests.

use crate::error::StorageError;
use crate::store::SledRecordStore;
use crate::types::RecordType;
use serde::{Deserialize, Serialize};
use tracing::info;

/// How much sample data to write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedPlan {
    pub products: u64,
    /// Variations per variable product; every third product is variable.
    pub variations: u64,
    pub orders: u64,
    /// Line items per order.
    pub items: u64,
    /// Number of records of each type placed on hold (undeletable).
    pub held: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
    pub products: u64,
    pub variations: u64,
    pub orders: u64,
    pub line_items: u64,
    pub held: u64,
}

pub fn seed_store(store: &SledRecordStore, plan: &SeedPlan) -> Result<SeedReport, StorageError> {
    let mut report = SeedReport::default();

    for i in 0..plan.products {
        let hold = i < plan.held;
        let id = store.insert(RecordType::Product, format!("Sample Product {}", i + 1), hold)?;
        report.products += 1;
        report.held += u64::from(hold);
        if plan.variations > 0 && i % 3 == 0 {
            for v in 0..plan.variations {
                store.insert_dependent(
                    RecordType::Product,
                    id,
                    format!("Sample Product {} / Variant {}", i + 1, v + 1),
                    false,
                )?;
                report.variations += 1;
            }
        }
    }

    for i in 0..plan.orders {
        let hold = i < plan.held;
        let id = store.insert(RecordType::Order, format!("#{}", 1000 + i), hold)?;
        report.orders += 1;
        report.held += u64::from(hold);
        for item in 0..plan.items {
            store.insert_dependent(
                RecordType::Order,
                id,
                format!("#{} line {}", 1000 + i, item + 1),
                false,
            )?;
            report.line_items += 1;
        }
    }

    store.flush()?;
    info!(
        products = report.products,
        variations = report.variations,
        orders = report.orders,
        line_items = report.line_items,
        held = report.held,
        "Seeded record store"
    );
    Ok(report)
}
