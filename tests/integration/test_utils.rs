//! Shared test utilities for integration tests
//!
//! Provides isolated stores, in-process services and instrumented transports,
//! plus centralized setup/teardown of XDG environment variables.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sweep::auth::{
    hash_token, AuthConfig, Authorizer, Capability, LocalAuthorizer, TokenAuthorizer, TokenGrant,
};
use sweep::client::{CleanupClient, LocalTransport, Transport};
use sweep::error::ApiError;
use sweep::protocol::{ActionRequest, ActionResponse};
use sweep::service::{CleanupService, ServiceLimits};
use sweep::store::SledRecordStore;
use sweep::types::{RecordCounts, RecordId, RecordType};
use tempfile::TempDir;

/// Token accepted by [`Fixture::with_token_auth`].
pub const TEST_TOKEN: &str = "integration-secret";

/// Global mutex to serialize XDG environment variable access across all tests
static XDG_ENV_MUTEX: Mutex<()> = Mutex::new(());

struct EnvState {
    home: Option<String>,
    xdg_config_home: Option<String>,
    sweep_env: Option<String>,
}

impl EnvState {
    fn capture() -> Self {
        Self {
            home: std::env::var("HOME").ok(),
            xdg_config_home: std::env::var("XDG_CONFIG_HOME").ok(),
            sweep_env: std::env::var("SWEEP_ENV").ok(),
        }
    }

    fn restore(self) {
        restore_var("HOME", self.home);
        restore_var("XDG_CONFIG_HOME", self.xdg_config_home);
        restore_var("SWEEP_ENV", self.sweep_env);
    }
}

fn restore_var(key: &str, value: Option<String>) {
    match value {
        Some(v) => std::env::set_var(key, v),
        None => std::env::remove_var(key),
    }
}

/// Run `f` with HOME and XDG_CONFIG_HOME pointing into `test_dir`.
pub fn with_xdg_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = XDG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let test_config_home = test_dir.path().join("xdg");
    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_config_home).unwrap();
    std::fs::create_dir_all(&test_home).unwrap();

    std::env::set_var("HOME", test_home.to_str().unwrap());
    std::env::set_var("XDG_CONFIG_HOME", test_config_home.to_str().unwrap());
    std::env::remove_var("SWEEP_ENV");

    let result = f();

    env_state.restore();
    result
}

/// One sled database with a record store and a service over it.
pub struct Fixture {
    pub dir: TempDir,
    pub db: sled::Db,
    pub store: Arc<SledRecordStore>,
    pub service: Arc<CleanupService>,
}

impl Fixture {
    pub fn new(batch_size: usize) -> Self {
        Self::build(batch_size, 120, Arc::new(LocalAuthorizer))
    }

    pub fn with_lease_ttl(batch_size: usize, lease_ttl_secs: u64) -> Self {
        Self::build(batch_size, lease_ttl_secs, Arc::new(LocalAuthorizer))
    }

    /// Service that only accepts [`TEST_TOKEN`].
    pub fn with_token_auth(batch_size: usize) -> Self {
        let auth = AuthConfig {
            tokens: vec![TokenGrant {
                name: "integration".to_string(),
                token_hash: hash_token(TEST_TOKEN),
                capabilities: vec![Capability::ManageStore],
            }],
        };
        Self::build(batch_size, 120, Arc::new(TokenAuthorizer::new(&auth)))
    }

    fn build(batch_size: usize, lease_ttl_secs: u64, authorizer: Arc<dyn Authorizer>) -> Self {
        let dir = TempDir::new().unwrap();
        let db = sled::open(dir.path().join("db")).unwrap();
        let store = Arc::new(SledRecordStore::from_db(db.clone()).unwrap());
        let service = Arc::new(
            CleanupService::open(
                db.clone(),
                ServiceLimits {
                    batch_size,
                    lease_ttl_secs,
                },
                authorizer,
            )
            .unwrap(),
        );
        Self {
            dir,
            db,
            store,
            service,
        }
    }

    pub fn local_transport(&self) -> Arc<dyn Transport> {
        Arc::new(LocalTransport::new(self.service.clone()))
    }

    pub fn client(&self) -> CleanupClient {
        CleanupClient::new(self.local_transport(), "")
    }

    /// Insert `count` records; positions listed in `held` cannot be deleted.
    pub fn seed(&self, record_type: RecordType, count: u64, held: &[u64]) -> Vec<RecordId> {
        (0..count)
            .map(|i| {
                self.store
                    .insert(record_type, format!("{} {}", record_type, i + 1), held.contains(&i))
                    .unwrap()
            })
            .collect()
    }

    pub fn count(&self, record_type: RecordType) -> u64 {
        use sweep::store::RecordStore;
        self.store.count(record_type).unwrap()
    }
}

/// Transport wrapper that records every request and can inject failures.
pub struct ProbeTransport {
    inner: Arc<dyn Transport>,
    requests: Mutex<Vec<ActionRequest>>,
    batch_calls: AtomicUsize,
    count_calls: AtomicUsize,
    /// 1-based batch call that fails at the transport level.
    fail_batch_call: Option<usize>,
    /// Counts reported from the second `get_counts` call on.
    verify_counts: Option<RecordCounts>,
    /// 1-based batch call answered with an application-level refusal.
    reject_batch_call: Option<usize>,
    /// Drop `next_cursor` from batch responses, like an offset-only server.
    strip_cursor: bool,
}

impl ProbeTransport {
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self {
            inner,
            requests: Mutex::new(Vec::new()),
            batch_calls: AtomicUsize::new(0),
            count_calls: AtomicUsize::new(0),
            fail_batch_call: None,
            verify_counts: None,
            reject_batch_call: None,
            strip_cursor: false,
        }
    }

    pub fn rejecting_batch(mut self, call: usize) -> Self {
        self.reject_batch_call = Some(call);
        self
    }

    pub fn without_cursor(mut self) -> Self {
        self.strip_cursor = true;
        self
    }

    pub fn failing_batch(mut self, call: usize) -> Self {
        self.fail_batch_call = Some(call);
        self
    }

    pub fn reporting_after_first_count(mut self, counts: RecordCounts) -> Self {
        self.verify_counts = Some(counts);
        self
    }

    pub fn requests(&self) -> Vec<ActionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<&'static str> {
        self.requests().iter().map(|r| r.action()).collect()
    }

    /// `(offset, cursor)` of every batch request, in order.
    pub fn batch_positions(&self) -> Vec<(u64, Option<RecordId>)> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                ActionRequest::DeleteProductsBatch(p) | ActionRequest::DeleteOrdersBatch(p) => {
                    Some((p.offset, p.cursor))
                }
                _ => None,
            })
            .collect()
    }

    pub fn batch_offsets(&self) -> Vec<u64> {
        self.batch_positions().into_iter().map(|(o, _)| o).collect()
    }
}

#[async_trait]
impl Transport for ProbeTransport {
    async fn send(&self, request: ActionRequest) -> Result<ActionResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        match &request {
            ActionRequest::DeleteProductsBatch(_) | ActionRequest::DeleteOrdersBatch(_) => {
                let call = self.batch_calls.fetch_add(1, Ordering::SeqCst) + 1;
                if self.fail_batch_call == Some(call) {
                    return Err(ApiError::Transport(
                        "Connection error: connection reset by peer".to_string(),
                    ));
                }
                if self.reject_batch_call == Some(call) {
                    return Ok(ActionResponse::failure(&ApiError::Unauthorized(
                        "Insufficient permissions".to_string(),
                    )));
                }
                let mut response = self.inner.send(request.clone()).await?;
                if self.strip_cursor {
                    if let Some(data) = response.data.as_object_mut() {
                        data.remove("next_cursor");
                    }
                }
                return Ok(response);
            }
            ActionRequest::GetCounts { .. } => {
                let call = self.count_calls.fetch_add(1, Ordering::SeqCst) + 1;
                if let (Some(counts), true) = (self.verify_counts, call > 1) {
                    return Ok(ActionResponse::success(&counts));
                }
            }
            _ => {}
        }
        self.inner.send(request).await
    }
}
