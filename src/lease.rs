//! Per-record-type exclusive run leases, owned by the backend.
//!
//! A run acquires the lease for its record type before counting and presents
//! the lease token with every batch. Each accepted batch renews the lease.
//! A lease that is not renewed within its TTL can be taken over by another
//! session. Leases live in the sled database and survive restarts.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ApiError, StorageError};
use crate::types::RecordType;

const TREE_LEASES: &str = "run_leases";
pub const DEFAULT_LEASE_TTL_SECS: u64 = 120;

static LEASE_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLease {
    pub record_type: RecordType,
    pub token: String,
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RunLease {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

pub struct LeaseManager {
    tree: sled::Tree,
    ttl: Duration,
    // Serializes read-modify-write cycles on the lease tree.
    guard: Mutex<()>,
}

impl LeaseManager {
    pub fn new(db: &sled::Db, ttl_secs: u64) -> Result<Self, StorageError> {
        Ok(Self {
            tree: db.open_tree(TREE_LEASES)?,
            ttl: Duration::seconds(ttl_secs as i64),
            guard: Mutex::new(()),
        })
    }

    pub fn acquire(&self, record_type: RecordType, holder: &str) -> Result<RunLease, ApiError> {
        self.acquire_at(record_type, holder, Utc::now())
    }

    fn acquire_at(
        &self,
        record_type: RecordType,
        holder: &str,
        now: DateTime<Utc>,
    ) -> Result<RunLease, ApiError> {
        let _guard = self.guard.lock();
        if let Some(existing) = self.load(record_type)? {
            if !existing.is_expired_at(now) {
                return Err(in_progress(&existing));
            }
            info!(
                record_type = %record_type,
                previous_holder = %existing.holder,
                "Taking over expired run lease"
            );
        }

        let lease = RunLease {
            record_type,
            token: new_lease_token(record_type, holder, now),
            holder: holder.to_string(),
            acquired_at: now,
            expires_at: now + self.ttl,
        };
        self.store(&lease)?;
        info!(record_type = %record_type, holder = %holder, "Acquired run lease");
        Ok(lease)
    }

    /// Validate the caller's right to run a batch for `record_type`.
    ///
    /// With a token: the token must be the current lease's; the lease is renewed.
    /// Without a token: accepted only while nobody holds an unexpired lease.
    pub fn check(
        &self,
        record_type: RecordType,
        token: Option<&str>,
    ) -> Result<Option<RunLease>, ApiError> {
        self.check_at(record_type, token, Utc::now())
    }

    fn check_at(
        &self,
        record_type: RecordType,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<RunLease>, ApiError> {
        let _guard = self.guard.lock();
        let current = self.load(record_type)?;
        match (token, current) {
            (None, Some(lease)) if !lease.is_expired_at(now) => Err(in_progress(&lease)),
            (None, _) => Ok(None),
            (Some(token), Some(lease)) if lease.token == token => {
                Ok(Some(self.extend(lease, now)?))
            }
            (Some(_), Some(lease)) if !lease.is_expired_at(now) => Err(in_progress(&lease)),
            (Some(_), _) => Err(no_matching_lease(record_type)),
        }
    }

    /// Push the expiry of the caller's lease one TTL past now.
    pub fn renew(&self, record_type: RecordType, token: &str) -> Result<RunLease, ApiError> {
        self.renew_at(record_type, token, Utc::now())
    }

    fn renew_at(
        &self,
        record_type: RecordType,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<RunLease, ApiError> {
        let _guard = self.guard.lock();
        match self.load(record_type)? {
            Some(lease) if lease.token == token => self.extend(lease, now),
            Some(lease) if !lease.is_expired_at(now) => Err(in_progress(&lease)),
            _ => Err(no_matching_lease(record_type)),
        }
    }

    // Caller holds the guard.
    fn extend(&self, mut lease: RunLease, now: DateTime<Utc>) -> Result<RunLease, ApiError> {
        lease.expires_at = now + self.ttl;
        self.store(&lease)?;
        debug!(
            record_type = %lease.record_type,
            expires_at = %lease.expires_at,
            "Renewed run lease"
        );
        Ok(lease)
    }

    /// Release the lease if `token` is current. Unknown tokens are a no-op.
    pub fn release(&self, record_type: RecordType, token: &str) -> Result<bool, ApiError> {
        let _guard = self.guard.lock();
        match self.load(record_type)? {
            Some(lease) if lease.token == token => {
                self.tree
                    .remove(record_type.as_str().as_bytes())
                    .map_err(StorageError::from)?;
                self.tree.flush().map_err(StorageError::from)?;
                info!(record_type = %record_type, holder = %lease.holder, "Released run lease");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Current lease for `record_type`, if one is held and unexpired.
    pub fn current(&self, record_type: RecordType) -> Result<Option<RunLease>, ApiError> {
        let now = Utc::now();
        Ok(self
            .load(record_type)?
            .filter(|lease| !lease.is_expired_at(now)))
    }

    fn load(&self, record_type: RecordType) -> Result<Option<RunLease>, ApiError> {
        let Some(raw) = self
            .tree
            .get(record_type.as_str().as_bytes())
            .map_err(StorageError::from)?
        else {
            return Ok(None);
        };
        let lease = serde_json::from_slice(&raw)
            .map_err(|e| StorageError::Corrupt(format!("Failed to parse run lease: {}", e)))?;
        Ok(Some(lease))
    }

    fn store(&self, lease: &RunLease) -> Result<(), ApiError> {
        let value = serde_json::to_vec(lease)
            .map_err(|e| StorageError::Corrupt(format!("Failed to encode run lease: {}", e)))?;
        self.tree
            .insert(lease.record_type.as_str().as_bytes(), value)
            .map_err(StorageError::from)?;
        self.tree.flush().map_err(StorageError::from)?;
        Ok(())
    }
}

fn in_progress(lease: &RunLease) -> ApiError {
    ApiError::RunInProgress {
        record_type: lease.record_type,
        holder: lease.holder.clone(),
        expires_at: lease.expires_at.to_rfc3339(),
    }
}

fn no_matching_lease(record_type: RecordType) -> ApiError {
    ApiError::LeaseInvalid(format!(
        "no active {} lease matches the presented token",
        record_type
    ))
}

fn new_lease_token(record_type: RecordType, holder: &str, now: DateTime<Utc>) -> String {
    let seq = LEASE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut hasher = blake3::Hasher::new();
    hasher.update(record_type.as_str().as_bytes());
    hasher.update(holder.as_bytes());
    hasher.update(&now.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    hasher.update(&std::process::id().to_le_bytes());
    hasher.update(&seq.to_le_bytes());
    hex::encode(&hasher.finalize().as_bytes()[..16])
}
