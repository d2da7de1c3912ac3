//! Record Store
//!
//! Products and orders, each with dependent sub-records (product variations,
//! order line items). Records iterate in ascending id order, which is what the
//! deletion backend's stable cursor relies on.

pub mod persistence;
pub mod seed;

pub use persistence::SledRecordStore;
pub use seed::{seed_store, SeedPlan, SeedReport};

use crate::error::StorageError;
use crate::types::{RecordId, RecordType};
use serde::{Deserialize, Serialize};

/// A top-level record: a product or an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    pub record_type: RecordType,
    /// Product name or order number.
    pub label: String,
    /// Variation ids (variable products) or line item ids (orders).
    pub dependents: Vec<RecordId>,
    /// The store refuses to delete held records.
    pub hold: bool,
}

/// A product variation or an order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentRecord {
    pub id: RecordId,
    pub parent: RecordId,
    pub label: String,
    pub hold: bool,
}

/// Where a page of records starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStart {
    /// Skip this many live records from the beginning.
    Offset(u64),
    /// Records with an id strictly greater than this one.
    After(RecordId),
}

/// Record store interface used by the count oracle and the deletion backend.
pub trait RecordStore: Send + Sync {
    fn count(&self, record_type: RecordType) -> Result<u64, StorageError>;

    /// Fetch up to `limit` records in ascending id order.
    fn page(
        &self,
        record_type: RecordType,
        start: PageStart,
        limit: usize,
    ) -> Result<Vec<StoredRecord>, StorageError>;

    /// Delete one dependent. `Ok(false)` means the store refused. A dependent
    /// that no longer exists counts as deleted.
    fn delete_dependent(&self, record_type: RecordType, id: RecordId)
        -> Result<bool, StorageError>;

    /// Delete one record. `Ok(false)` means the store refused; a missing record
    /// is `StorageError::RecordNotFound`.
    fn delete(&self, record_type: RecordType, id: RecordId) -> Result<bool, StorageError>;
}
