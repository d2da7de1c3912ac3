//! Cleanup service: authorizes and dispatches wire actions to the count
//! oracle, the deletion backend and the lease manager.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::audit::AuditStore;
use crate::auth::{Authorizer, Capability, Principal};
use crate::counts::CountOracle;
use crate::deletion::{BatchRequest, DeletionBackend};
use crate::error::ApiError;
use crate::lease::{LeaseManager, RunLease};
use crate::protocol::{ActionRequest, ActionResponse, BatchData, BatchParams, EndRunData};
use crate::store::{RecordStore, SledRecordStore};
use crate::types::RecordType;

/// Tunables owned by the backend, never by callers.
#[derive(Debug, Clone, Copy)]
pub struct ServiceLimits {
    pub batch_size: usize,
    pub lease_ttl_secs: u64,
}

pub struct CleanupService {
    authorizer: Arc<dyn Authorizer>,
    counts: CountOracle,
    deletion: DeletionBackend,
    leases: LeaseManager,
}

impl CleanupService {
    pub fn new(
        authorizer: Arc<dyn Authorizer>,
        store: Arc<dyn RecordStore>,
        audit: Option<Arc<AuditStore>>,
        leases: LeaseManager,
        batch_size: usize,
    ) -> Self {
        let mut deletion = DeletionBackend::new(store.clone(), batch_size);
        if let Some(audit) = audit {
            deletion = deletion.with_audit(audit);
        }
        Self {
            authorizer,
            counts: CountOracle::new(store),
            deletion,
            leases,
        }
    }

    /// Wire a service over one sled database holding records, leases and audit trees.
    pub fn open(
        db: sled::Db,
        limits: ServiceLimits,
        authorizer: Arc<dyn Authorizer>,
    ) -> Result<Self, ApiError> {
        let store: Arc<dyn RecordStore> = Arc::new(SledRecordStore::from_db(db.clone())?);
        let audit = AuditStore::shared(db.clone())?;
        let leases = LeaseManager::new(&db, limits.lease_ttl_secs)?;
        Ok(Self::new(
            authorizer,
            store,
            Some(audit),
            leases,
            limits.batch_size,
        ))
    }

    pub fn batch_size(&self) -> usize {
        self.deletion.batch_size()
    }

    pub fn leases(&self) -> &LeaseManager {
        &self.leases
    }

    /// Handle one request. Never fails: errors become `{success: false}`.
    pub fn handle(&self, request: ActionRequest) -> ActionResponse {
        let action = request.action();
        let principal = match self.authorize(&request) {
            Ok(principal) => principal,
            Err(err) => {
                warn!(action, error = %err, "Refused request");
                return ActionResponse::failure(&err);
            }
        };
        debug!(action, principal = %principal.name, "Handling request");

        let result = match request {
            ActionRequest::GetCounts { .. } => {
                self.counts.get_counts().map(|c| ActionResponse::success(&c))
            }
            ActionRequest::DeleteProductsBatch(params) => self
                .delete_batch(RecordType::Product, &params)
                .map(|d| ActionResponse::success(&d)),
            ActionRequest::DeleteOrdersBatch(params) => self
                .delete_batch(RecordType::Order, &params)
                .map(|d| ActionResponse::success(&d)),
            ActionRequest::BeginRun {
                record_type,
                holder,
                ..
            } => self
                .begin_run(&principal, record_type, &holder)
                .map(|l| ActionResponse::success(&l)),
            ActionRequest::EndRun {
                record_type, lease, ..
            } => self
                .leases
                .release(record_type, &lease)
                .map(|released| ActionResponse::success(&EndRunData { released })),
        };

        result.unwrap_or_else(|err| {
            warn!(action, principal = %principal.name, error = %err, "Request failed");
            ActionResponse::failure(&err)
        })
    }

    fn authorize(&self, request: &ActionRequest) -> Result<Principal, ApiError> {
        let principal = self.authorizer.authorize(request.auth_token())?;
        principal.require(Capability::ManageStore)?;
        Ok(principal)
    }

    fn begin_run(
        &self,
        principal: &Principal,
        record_type: RecordType,
        holder: &str,
    ) -> Result<RunLease, ApiError> {
        let holder = if holder.trim().is_empty() {
            principal.name.clone()
        } else {
            format!("{} ({})", holder.trim(), principal.name)
        };
        self.leases.acquire(record_type, &holder)
    }

    fn delete_batch(
        &self,
        record_type: RecordType,
        params: &BatchParams,
    ) -> Result<BatchData, ApiError> {
        let lease = self.leases.check(record_type, params.lease.as_deref())?;
        let request = BatchRequest {
            record_type,
            offset: params.offset,
            cursor: params.cursor,
        };
        let result = self
            .deletion
            .delete_batch(&request, lease.as_ref().map(|l| l.holder.as_str()))?;
        info!(
            record_type = %record_type,
            offset = params.offset,
            deleted = result.deleted_count,
            skipped = result.skipped_count,
            done = result.exhausted,
            "Deleted batch"
        );
        Ok(BatchData::from(result))
    }
}
