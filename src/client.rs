//! Client side of the cleanup protocol.
//!
//! A [`Transport`] moves one [`ActionRequest`] to a cleanup service and brings
//! back its envelope. [`CleanupClient`] adds the caller's token and decodes
//! typed payloads. In-process and HTTP transports share the same envelope, so
//! the orchestrator behaves identically over both.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::deletion::BatchRequest;
use crate::error::ApiError;
use crate::lease::RunLease;
use crate::protocol::{ActionRequest, ActionResponse, BatchData, BatchParams, EndRunData};
use crate::service::CleanupService;
use crate::types::{BatchResult, RecordCounts, RecordType};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ActionRequest) -> Result<ActionResponse, ApiError>;
}

/// Calls a service living in this process.
pub struct LocalTransport {
    service: Arc<CleanupService>,
}

impl LocalTransport {
    pub fn new(service: Arc<CleanupService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, request: ActionRequest) -> Result<ActionResponse, ApiError> {
        Ok(self.service.handle(request))
    }
}

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// POSTs JSON requests to a remote `sweep serve` endpoint.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8787`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .no_proxy()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: format!("{}/cleanup", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ActionRequest) -> Result<ActionResponse, ApiError> {
        debug!(endpoint = %self.endpoint, action = request.action(), "Sending request");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::Transport(format!(
                "Request failed with status {}: {}",
                status, body
            )));
        }

        response
            .json::<ActionResponse>()
            .await
            .map_err(|e| ApiError::Transport(format!("Failed to parse response: {}", e)))
    }
}

/// Typed, token-carrying client over any transport.
#[derive(Clone)]
pub struct CleanupClient {
    transport: Arc<dyn Transport>,
    auth_token: String,
}

impl CleanupClient {
    pub fn new(transport: Arc<dyn Transport>, auth_token: impl Into<String>) -> Self {
        Self {
            transport,
            auth_token: auth_token.into(),
        }
    }

    pub async fn get_counts(&self) -> Result<RecordCounts, ApiError> {
        self.transport
            .send(ActionRequest::GetCounts {
                auth_token: self.auth_token.clone(),
            })
            .await?
            .into_result()
    }

    pub async fn begin_run(
        &self,
        record_type: RecordType,
        holder: &str,
    ) -> Result<RunLease, ApiError> {
        self.transport
            .send(ActionRequest::BeginRun {
                auth_token: self.auth_token.clone(),
                record_type,
                holder: holder.to_string(),
            })
            .await?
            .into_result()
    }

    pub async fn delete_batch(
        &self,
        request: &BatchRequest,
        lease: Option<&str>,
    ) -> Result<BatchResult, ApiError> {
        let params = BatchParams {
            auth_token: self.auth_token.clone(),
            offset: request.offset,
            cursor: request.cursor,
            lease: lease.map(str::to_string),
        };
        let data: BatchData = self
            .transport
            .send(ActionRequest::delete_batch(request.record_type, params))
            .await?
            .into_result()?;
        Ok(data.into())
    }

    pub async fn end_run(&self, record_type: RecordType, lease: &str) -> Result<bool, ApiError> {
        let data: EndRunData = self
            .transport
            .send(ActionRequest::EndRun {
                auth_token: self.auth_token.clone(),
                record_type,
                lease: lease.to_string(),
            })
            .await?
            .into_result()?;
        Ok(data.released)
    }
}
