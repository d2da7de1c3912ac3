//! Wire protocol: action-discriminated requests and the `{success, data}` envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::types::{BatchResult, RecordId, RecordType, SkippedRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRequest {
    GetCounts {
        #[serde(default)]
        auth_token: String,
    },
    DeleteProductsBatch(BatchParams),
    DeleteOrdersBatch(BatchParams),
    BeginRun {
        #[serde(default)]
        auth_token: String,
        record_type: RecordType,
        holder: String,
    },
    EndRun {
        #[serde(default)]
        auth_token: String,
        record_type: RecordType,
        lease: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchParams {
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub offset: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease: Option<String>,
}

impl ActionRequest {
    pub fn delete_batch(record_type: RecordType, params: BatchParams) -> Self {
        match record_type {
            RecordType::Product => ActionRequest::DeleteProductsBatch(params),
            RecordType::Order => ActionRequest::DeleteOrdersBatch(params),
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            ActionRequest::GetCounts { .. } => "get_counts",
            ActionRequest::DeleteProductsBatch(_) => RecordType::Product.batch_action(),
            ActionRequest::DeleteOrdersBatch(_) => RecordType::Order.batch_action(),
            ActionRequest::BeginRun { .. } => "begin_run",
            ActionRequest::EndRun { .. } => "end_run",
        }
    }

    pub fn auth_token(&self) -> &str {
        match self {
            ActionRequest::GetCounts { auth_token }
            | ActionRequest::BeginRun { auth_token, .. }
            | ActionRequest::EndRun { auth_token, .. } => auth_token,
            ActionRequest::DeleteProductsBatch(params)
            | ActionRequest::DeleteOrdersBatch(params) => &params.auth_token,
        }
    }
}

/// `data` of a successful batch response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchData {
    pub deleted: u64,
    pub skipped: u64,
    pub skipped_ids: Vec<SkippedRecord>,
    #[serde(default)]
    pub errors: Vec<String>,
    pub done: bool,
    #[serde(default)]
    pub next_cursor: Option<RecordId>,
}

impl From<BatchResult> for BatchData {
    fn from(result: BatchResult) -> Self {
        let errors = result
            .skipped
            .iter()
            .filter_map(|s| s.error.as_ref().map(|e| format!("{} ({}): {}", s.label, s.id, e)))
            .collect();
        Self {
            deleted: result.deleted_count,
            skipped: result.skipped_count,
            skipped_ids: result.skipped,
            errors,
            done: result.exhausted,
            next_cursor: result.next_cursor,
        }
    }
}

impl From<BatchData> for BatchResult {
    fn from(data: BatchData) -> Self {
        Self {
            deleted_count: data.deleted,
            skipped_count: data.skipped,
            skipped: data.skipped_ids,
            exhausted: data.done,
            next_cursor: data.next_cursor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndRunData {
    pub released: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ActionResponse {
    pub fn success<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self {
                success: true,
                data,
                code: None,
            },
            Err(e) => Self::failure(&ApiError::Remote(format!(
                "Failed to encode response: {}",
                e
            ))),
        }
    }

    pub fn failure(err: &ApiError) -> Self {
        Self {
            success: false,
            data: Value::String(err.to_string()),
            code: Some(err.code().to_string()),
        }
    }

    /// Decode a successful payload, or map a failure back to an `ApiError`.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        if self.success {
            return serde_json::from_value(self.data)
                .map_err(|e| ApiError::Transport(format!("Malformed response data: {}", e)));
        }
        let message = match self.data {
            Value::String(message) => message,
            Value::Null => "Unknown error".to_string(),
            other => other.to_string(),
        };
        Err(match self.code.as_deref() {
            Some("unauthorized") => ApiError::Unauthorized(message),
            Some("run_in_progress") => ApiError::RunRejected(message),
            Some("lease_invalid") => ApiError::LeaseInvalid(message),
            Some("bad_request") => ApiError::InvalidRequest(message),
            _ => ApiError::Remote(message),
        })
    }
}
