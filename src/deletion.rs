//! Deletion backend: deletes one bounded batch of records per call.
//!
//! Each record yields `Ok(())` or a [`SkippedRecord`]; skips are accumulated
//! into the [`BatchResult`] and never abort the batch. Only a failure to read
//! the page itself fails the call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::audit::{now_millis, AuditStore, SkipLogEntry};
use crate::error::{ApiError, StorageError};
use crate::store::{PageStart, RecordStore, StoredRecord};
use crate::types::{BatchResult, RecordId, RecordType, SkippedRecord};

pub const DEFAULT_BATCH_SIZE: usize = 40;

/// Position of the next batch.
///
/// With a cursor the page is every record after it (stable across deletions).
/// Without one the page starts `offset` live records in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub record_type: RecordType,
    pub offset: u64,
    #[serde(default)]
    pub cursor: Option<RecordId>,
}

impl BatchRequest {
    pub fn at_offset(record_type: RecordType, offset: u64) -> Self {
        Self {
            record_type,
            offset,
            cursor: None,
        }
    }

    fn page_start(&self) -> PageStart {
        match self.cursor {
            Some(cursor) => PageStart::After(cursor),
            None => PageStart::Offset(self.offset),
        }
    }
}

pub struct DeletionBackend {
    store: Arc<dyn RecordStore>,
    audit: Option<Arc<AuditStore>>,
    batch_size: usize,
}

impl DeletionBackend {
    pub fn new(store: Arc<dyn RecordStore>, batch_size: usize) -> Self {
        Self {
            store,
            audit: None,
            batch_size: batch_size.max(1),
        }
    }

    /// Durably record non-empty skip lists in the audit store.
    pub fn with_audit(mut self, audit: Arc<AuditStore>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn delete_batch(
        &self,
        request: &BatchRequest,
        lease_holder: Option<&str>,
    ) -> Result<BatchResult, ApiError> {
        let record_type = request.record_type;
        let records = self
            .store
            .page(record_type, request.page_start(), self.batch_size)?;
        let fetched = records.len();

        let mut result = BatchResult::empty(request.cursor);
        result.exhausted = fetched < self.batch_size;
        result.next_cursor = records.last().map(|r| r.id).or(request.cursor);

        for record in &records {
            match self.delete_record(record) {
                Ok(()) => result.deleted_count += 1,
                Err(skip) => {
                    result.skipped_count += 1;
                    result.skipped.push(skip);
                }
            }
        }

        debug!(
            record_type = %record_type,
            offset = request.offset,
            cursor = ?request.cursor,
            fetched,
            deleted = result.deleted_count,
            skipped = result.skipped_count,
            exhausted = result.exhausted,
            "Processed deletion batch"
        );

        if !result.skipped.is_empty() {
            self.log_skips(request, lease_holder, &result.skipped);
        }
        Ok(result)
    }

    /// Dependents first; any dependent failure skips the record without
    /// attempting the parent.
    fn delete_record(&self, record: &StoredRecord) -> Result<(), SkippedRecord> {
        let skip = |error: Option<String>| SkippedRecord {
            id: record.id,
            label: record.label.clone(),
            error,
        };

        for dependent in &record.dependents {
            match self.store.delete_dependent(record.record_type, *dependent) {
                Ok(true) => {}
                Ok(false) => {
                    return Err(skip(Some(format!(
                        "dependent {} could not be deleted",
                        dependent
                    ))))
                }
                Err(err) => {
                    return Err(skip(Some(format!(
                        "dependent {} failed: {}",
                        dependent, err
                    ))))
                }
            }
        }

        match self.store.delete(record.record_type, record.id) {
            Ok(true) => Ok(()),
            Ok(false) => Err(skip(None)),
            Err(StorageError::RecordNotFound { .. }) => {
                Err(skip(Some("record no longer exists".to_string())))
            }
            Err(err) => Err(skip(Some(err.to_string()))),
        }
    }

    fn log_skips(
        &self,
        request: &BatchRequest,
        lease_holder: Option<&str>,
        skipped: &[SkippedRecord],
    ) {
        warn!(
            record_type = %request.record_type,
            offset = request.offset,
            skipped = ?skipped,
            "Skipped {} during bulk deletion",
            request.record_type.noun(skipped.len() as u64)
        );

        let Some(audit) = &self.audit else {
            return;
        };
        let entry = SkipLogEntry {
            logged_at_ms: now_millis(),
            record_type: request.record_type,
            offset: request.offset,
            cursor: request.cursor,
            lease_holder: lease_holder.map(str::to_string),
            skipped: skipped.to_vec(),
        };
        if let Err(err) = audit.append_skips(&entry).and_then(|_| audit.flush()) {
            error!(
                record_type = %request.record_type,
                error = %err,
                "failed to write skip log"
            );
        }
    }
}
