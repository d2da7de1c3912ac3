//! Configuration System
//!
//! Layered configuration for the CLI and the cleanup server: built-in
//! defaults, a per-user global file, files under `<root>/config/`, then
//! `SWEEP__*` environment variables. Validation collects every problem
//! instead of stopping at the first.

use crate::auth::AuthConfig;
use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

mod facade;
mod merge;
mod paths;
mod sources;

pub use facade::ConfigLoader;
pub use paths::{global_config_dir, global_config_path};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub cleanup: CleanupConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// sled database directory; relative paths resolve against the root.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".sweep/db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl StorageConfig {
    pub fn resolve(&self, root: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            root.join(&self.path)
        }
    }
}

/// Server-side deletion tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_lease_ttl_secs")]
    pub lease_ttl_secs: u64,

    /// Finished run records kept in the audit store.
    #[serde(default = "default_audit_max_runs")]
    pub audit_max_runs: usize,

    #[serde(default = "default_audit_max_age_days")]
    pub audit_max_age_days: u64,
}

fn default_batch_size() -> usize {
    crate::deletion::DEFAULT_BATCH_SIZE
}

fn default_lease_ttl_secs() -> u64 {
    crate::lease::DEFAULT_LEASE_TTL_SECS
}

/// About a hundred years.
const MAX_AUDIT_AGE_DAYS: u64 = 36_500;

fn default_audit_max_runs() -> usize {
    500
}

fn default_audit_max_age_days() -> u64 {
    90
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            lease_ttl_secs: default_lease_ttl_secs(),
            audit_max_runs: default_audit_max_runs(),
            audit_max_age_days: default_audit_max_age_days(),
        }
    }
}

impl CleanupConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(format!(
                "batch_size must be between 1 and 1000, got {}",
                self.batch_size
            ));
        }
        if self.lease_ttl_secs == 0 {
            return Err("lease_ttl_secs must be greater than zero".to_string());
        }
        if self.audit_max_age_days > MAX_AUDIT_AGE_DAYS {
            return Err(format!(
                "audit_max_age_days must be at most {}, got {}",
                MAX_AUDIT_AGE_DAYS, self.audit_max_age_days
            ));
        }
        Ok(())
    }

    pub fn prune_policy(&self) -> crate::audit::PrunePolicy {
        crate::audit::PrunePolicy {
            max_finished: self.audit_max_runs,
            max_age_ms: self
                .audit_max_age_days
                .saturating_mul(24 * 60 * 60 * 1000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// How the CLI reaches a remote cleanup server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of a `sweep serve` instance. Unset means in-process.
    #[serde(default)]
    pub server: Option<String>,

    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: None,
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(server) = &self.server {
            if !server.starts_with("http://") && !server.starts_with("https://") {
                return Err(format!("server must be an http(s) URL, got '{}'", server));
            }
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Storage(String),
    Cleanup(String),
    Server(String),
    Client(String),
    Auth(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Storage(msg) => write!(f, "storage: {}", msg),
            ValidationError::Cleanup(msg) => write!(f, "cleanup: {}", msg),
            ValidationError::Server(msg) => write!(f, "server: {}", msg),
            ValidationError::Client(msg) => write!(f, "client: {}", msg),
            ValidationError::Auth(msg) => write!(f, "auth: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl SweepConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.storage.path.as_os_str().is_empty() {
            errors.push(ValidationError::Storage(
                "Store path cannot be empty".to_string(),
            ));
        }
        if let Err(e) = self.cleanup.validate() {
            errors.push(ValidationError::Cleanup(e));
        }
        if let Err(e) = self.server.bind.parse::<SocketAddr>() {
            errors.push(ValidationError::Server(format!(
                "invalid bind address '{}': {}",
                self.server.bind, e
            )));
        }
        if let Err(e) = self.client.validate() {
            errors.push(ValidationError::Client(e));
        }
        if let Err(e) = self.auth.validate() {
            errors.push(ValidationError::Auth(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, folding every problem into one `ApiError`.
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }
}
