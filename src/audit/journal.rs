//! Run lifecycle bookkeeping on top of the audit store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::audit::policy::{now_millis, PrunePolicy, RunStatus};
use crate::audit::store::{AuditStore, RunRecord};
use crate::error::{ApiError, StorageError};
use crate::types::RecordType;

static RUN_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Final numbers of a run, recorded when it finishes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunTally {
    pub total: u64,
    pub processed: u64,
    pub skipped: u64,
}

#[derive(Clone)]
pub struct RunJournal {
    store: Arc<AuditStore>,
}

impl RunJournal {
    pub fn new(store: Arc<AuditStore>) -> Self {
        Self { store }
    }

    pub fn start_run(&self, record_type: RecordType) -> Result<String, ApiError> {
        let run_id = new_run_id();
        let record = RunRecord {
            run_id: run_id.clone(),
            record_type,
            started_at_ms: now_millis(),
            ended_at_ms: None,
            status: RunStatus::Active,
            total: 0,
            processed: 0,
            skipped: 0,
            error: None,
        };
        self.store.put_run(&record)?;
        self.store.flush()?;
        Ok(run_id)
    }

    pub fn finish_run(
        &self,
        run_id: &str,
        status: RunStatus,
        tally: RunTally,
        error: Option<String>,
    ) -> Result<(), ApiError> {
        let mut record = self.store.get_run(run_id)?.ok_or_else(|| {
            ApiError::StorageError(StorageError::Corrupt(format!(
                "run record {} missing",
                run_id
            )))
        })?;
        record.status = status;
        record.ended_at_ms = Some(now_millis());
        record.total = tally.total;
        record.processed = tally.processed;
        record.skipped = tally.skipped;
        record.error = error;
        self.store.put_run(&record)?;
        self.store.flush()?;
        Ok(())
    }

    /// Like `finish_run`, but a journal failure only logs.
    pub fn finish_run_best_effort(
        &self,
        run_id: &str,
        status: RunStatus,
        tally: RunTally,
        error: Option<String>,
    ) {
        if let Err(err) = self.finish_run(run_id, status, tally, error) {
            warn!(run_id = %run_id, error = %err, "failed to record run outcome");
        }
    }

    pub fn mark_interrupted_runs(&self) -> Result<usize, ApiError> {
        let changed = self.store.mark_interrupted_runs()?;
        self.store.flush()?;
        Ok(changed)
    }

    /// Apply retention to finished runs and to the skip log.
    pub fn prune(&self, policy: PrunePolicy) -> Result<usize, ApiError> {
        let now = now_millis();
        let runs = self
            .store
            .prune_finished(policy.max_finished, policy.max_age_ms, now)?;
        let skips = self.store.prune_skips(policy.max_age_ms, now)?;
        self.store.flush()?;
        Ok(runs + skips)
    }

    pub fn store(&self) -> &AuditStore {
        &self.store
    }
}

pub fn new_run_id() -> String {
    let ts = now_millis();
    let pid = std::process::id();
    let seq = RUN_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("run-{ts}-{pid}-{seq}")
}
