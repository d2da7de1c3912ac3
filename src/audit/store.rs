//! Durable sled-backed audit store: deletion runs and skipped-record logs.

use std::io;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sled::{Db, Tree};

use crate::audit::policy::{now_millis, RunStatus};
use crate::error::StorageError;
use crate::types::{RecordId, RecordType, SkippedRecord};

const TREE_RUNS: &str = "audit_runs";
const TREE_SKIPS: &str = "audit_skips";
const SKIP_KEY_PAD: usize = 20;

/// One orchestrated deletion run as seen by the operator's client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub record_type: RecordType,
    pub started_at_ms: u64,
    pub ended_at_ms: Option<u64>,
    pub status: RunStatus,
    pub total: u64,
    pub processed: u64,
    pub skipped: u64,
    pub error: Option<String>,
}

/// Skip list of one backend batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipLogEntry {
    pub logged_at_ms: u64,
    pub record_type: RecordType,
    pub offset: u64,
    #[serde(default)]
    pub cursor: Option<RecordId>,
    #[serde(default)]
    pub lease_holder: Option<String>,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Clone)]
pub struct AuditStore {
    db: Db,
    runs: Tree,
    skips: Tree,
}

impl AuditStore {
    pub fn new(db: Db) -> Result<Self, StorageError> {
        let runs = db.open_tree(TREE_RUNS).map_err(to_storage_io)?;
        let skips = db.open_tree(TREE_SKIPS).map_err(to_storage_io)?;
        Ok(Self { db, runs, skips })
    }

    pub fn shared(db: Db) -> Result<Arc<Self>, StorageError> {
        Ok(Arc::new(Self::new(db)?))
    }

    pub fn put_run(&self, record: &RunRecord) -> Result<(), StorageError> {
        let value = serde_json::to_vec(record).map_err(to_storage_data)?;
        self.runs
            .insert(record.run_id.as_bytes(), value)
            .map_err(to_storage_io)?;
        Ok(())
    }

    pub fn get_run(&self, run_id: &str) -> Result<Option<RunRecord>, StorageError> {
        let Some(raw) = self.runs.get(run_id.as_bytes()).map_err(to_storage_io)? else {
            return Ok(None);
        };
        let parsed = serde_json::from_slice(&raw).map_err(to_storage_data)?;
        Ok(Some(parsed))
    }

    /// All runs, newest first.
    pub fn list_runs(&self) -> Result<Vec<RunRecord>, StorageError> {
        let mut out = Vec::new();
        for result in self.runs.iter() {
            let (_, value) = result.map_err(to_storage_io)?;
            let rec: RunRecord = serde_json::from_slice(&value).map_err(to_storage_data)?;
            out.push(rec);
        }
        out.sort_by_key(|r| std::cmp::Reverse(r.started_at_ms));
        Ok(out)
    }

    pub fn append_skips(&self, entry: &SkipLogEntry) -> Result<(), StorageError> {
        let seq = self.db.generate_id().map_err(to_storage_io)?;
        let key = encode_skip_key(entry.record_type, seq);
        let value = serde_json::to_vec(entry).map_err(to_storage_data)?;
        self.skips
            .insert(key.as_bytes(), value)
            .map_err(to_storage_io)?;
        Ok(())
    }

    /// Most recent skip log entries, newest first.
    pub fn read_skips(
        &self,
        record_type: Option<RecordType>,
        limit: usize,
    ) -> Result<Vec<SkipLogEntry>, StorageError> {
        let iter = match record_type {
            Some(rt) => self.skips.scan_prefix(format!("{}:", rt.as_str()).as_bytes()),
            None => self.skips.iter(),
        };
        let mut keyed = Vec::new();
        for result in iter {
            let (key, value) = result.map_err(to_storage_io)?;
            let parsed: SkipLogEntry = serde_json::from_slice(&value).map_err(to_storage_data)?;
            keyed.push((skip_key_seq(&key), parsed));
        }
        keyed.sort_by_key(|(seq, _)| std::cmp::Reverse(*seq));
        Ok(keyed.into_iter().take(limit).map(|(_, e)| e).collect())
    }

    /// Runs left `Active` by a client that went away are marked `Interrupted`.
    pub fn mark_interrupted_runs(&self) -> Result<usize, StorageError> {
        let mut changed = 0usize;
        for mut run in self.list_runs()? {
            if run.status == RunStatus::Active {
                run.status = RunStatus::Interrupted;
                run.ended_at_ms = Some(now_millis());
                self.put_run(&run)?;
                changed += 1;
            }
        }
        Ok(changed)
    }

    pub fn prune_finished(
        &self,
        max_finished: usize,
        max_age_ms: u64,
        now_ms: u64,
    ) -> Result<usize, StorageError> {
        let mut removed = 0usize;
        let finished: Vec<RunRecord> = self
            .list_runs()?
            .into_iter()
            .filter(|r| r.status.is_finished())
            .collect();

        for (index, run) in finished.iter().enumerate() {
            let ended = run.ended_at_ms.unwrap_or(run.started_at_ms);
            let too_old = now_ms.saturating_sub(ended) > max_age_ms;
            if too_old || index >= max_finished {
                self.runs
                    .remove(run.run_id.as_bytes())
                    .map_err(to_storage_io)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Drop skip log entries logged more than `max_age_ms` before `now_ms`.
    pub fn prune_skips(&self, max_age_ms: u64, now_ms: u64) -> Result<usize, StorageError> {
        let mut stale = Vec::new();
        for result in self.skips.iter() {
            let (key, value) = result.map_err(to_storage_io)?;
            let entry: SkipLogEntry = serde_json::from_slice(&value).map_err(to_storage_data)?;
            if now_ms.saturating_sub(entry.logged_at_ms) > max_age_ms {
                stale.push(key);
            }
        }
        for key in &stale {
            self.skips.remove(key).map_err(to_storage_io)?;
        }
        Ok(stale.len())
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(to_storage_io)?;
        Ok(())
    }
}

fn encode_skip_key(record_type: RecordType, seq: u64) -> String {
    format!("{}:{seq:0SKIP_KEY_PAD$}", record_type.as_str())
}

fn skip_key_seq(key: &[u8]) -> u64 {
    std::str::from_utf8(key)
        .ok()
        .and_then(|k| k.rsplit(':').next())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
}

fn to_storage_data(err: serde_json::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
}
