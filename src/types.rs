//! Core value types shared by the store, the deletion backend and the orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store-assigned record identifier. Monotonic; key order equals id order.
pub type RecordId = u64;

/// Collection targeted by a deletion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Product,
    Order,
}

impl RecordType {
    pub const ALL: [RecordType; 2] = [RecordType::Product, RecordType::Order];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::Product => "product",
            RecordType::Order => "order",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            RecordType::Product => "products",
            RecordType::Order => "orders",
        }
    }

    /// Noun for `count` records of this type.
    pub fn noun(self, count: u64) -> &'static str {
        if count == 1 {
            self.as_str()
        } else {
            self.plural()
        }
    }

    /// Wire action name of the batch deletion operation for this type.
    pub fn batch_action(self) -> &'static str {
        match self {
            RecordType::Product => "delete_products_batch",
            RecordType::Order => "delete_orders_batch",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "product" | "products" => Ok(RecordType::Product),
            "order" | "orders" => Ok(RecordType::Order),
            other => Err(format!(
                "Unknown record type '{}' (expected 'products' or 'orders')",
                other
            )),
        }
    }
}

/// Live totals per record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordCounts {
    pub product_count: u64,
    pub order_count: u64,
}

impl RecordCounts {
    pub fn get(&self, record_type: RecordType) -> u64 {
        match record_type {
            RecordType::Product => self.product_count,
            RecordType::Order => self.order_count,
        }
    }
}

/// A record whose deletion failed during a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub id: RecordId,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one backend batch call. Consumed once by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub deleted_count: u64,
    pub skipped_count: u64,
    pub skipped: Vec<SkippedRecord>,
    /// Fewer than a full batch was fetched; no further calls are needed.
    pub exhausted: bool,
    /// Continuation key for the next call: id of the last record fetched.
    pub next_cursor: Option<RecordId>,
}

impl BatchResult {
    pub fn empty(cursor: Option<RecordId>) -> Self {
        Self {
            deleted_count: 0,
            skipped_count: 0,
            skipped: Vec::new(),
            exhausted: true,
            next_cursor: cursor,
        }
    }
}

/// Post-run recount compared against the skips accumulated during the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub remaining_count: u64,
    pub expected_skipped: u64,
}

impl VerificationOutcome {
    /// Remaining records are fully explained by skips.
    pub fn is_consistent(&self) -> bool {
        self.remaining_count <= self.expected_skipped
    }

    pub fn unexpected(&self) -> u64 {
        self.remaining_count.saturating_sub(self.expected_skipped)
    }
}
