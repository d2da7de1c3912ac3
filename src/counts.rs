//! Count oracle: live totals of each record type.

use std::sync::Arc;

use tracing::debug;

use crate::error::ApiError;
use crate::store::RecordStore;
use crate::types::{RecordCounts, RecordType};

/// Side-effect-free count queries against the backing store.
#[derive(Clone)]
pub struct CountOracle {
    store: Arc<dyn RecordStore>,
}

impl CountOracle {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Counts are read at call time; consecutive calls may differ while the
    /// store is being mutated.
    pub fn get_counts(&self) -> Result<RecordCounts, ApiError> {
        let counts = RecordCounts {
            product_count: self.store.count(RecordType::Product)?,
            order_count: self.store.count(RecordType::Order)?,
        };
        debug!(
            products = counts.product_count,
            orders = counts.order_count,
            "Counted records"
        );
        Ok(counts)
    }
}
