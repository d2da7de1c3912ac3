//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::audit::{AuditStore, RunJournal};
use crate::auth::{AuthConfig, LocalAuthorizer, TokenAuthorizer};
use crate::client::{CleanupClient, HttpTransport, LocalTransport, Transport};
use crate::config::{ConfigLoader, SweepConfig};
use crate::error::{ApiError, StorageError};
use crate::orchestrator::{BatchOrchestrator, RunOutcome};
use crate::server;
use crate::service::{CleanupService, ServiceLimits};
use crate::store::{seed_store, SeedPlan, SledRecordStore};
use crate::types::RecordType;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::cli::command_name;
use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_audit_json, format_audit_text, format_counts_json, format_counts_text,
    format_run_summary, format_seed_report, TerminalPresenter,
};

/// Runtime context for CLI execution: root directory, effective config and
/// remote endpoint overrides. Built from the root path and optional config
/// path using ConfigLoader only.
pub struct RunContext {
    root: PathBuf,
    config: SweepConfig,
    store_path: PathBuf,
}

impl RunContext {
    /// Create run context from root and optional config path. Uses ConfigLoader only.
    pub fn new(root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&root)?
        };
        Self::from_config(root, config)
    }

    /// Create run context from an already loaded configuration.
    pub fn from_config(root: PathBuf, config: SweepConfig) -> Result<Self, ApiError> {
        config.ensure_valid()?;
        let store_path = config.storage.resolve(&root);
        Ok(Self {
            root,
            config,
            store_path,
        })
    }

    /// Apply `--server` / `--token`, which win over the config file.
    pub fn with_remote(mut self, server: Option<String>, token: Option<String>) -> Self {
        if server.is_some() {
            self.config.client.server = server;
        }
        if token.is_some() {
            self.config.client.token = token;
        }
        self
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let name = command_name(command);
        info!(command = %name, root = %self.root.display(), "Executing command");
        let result = match command {
            Commands::Counts { format } => self.handle_counts(format),
            Commands::Delete { record_type, yes } => self.handle_delete(*record_type, *yes),
            Commands::Seed {
                products,
                variations,
                orders,
                items,
                held,
            } => self.handle_seed(SeedPlan {
                products: *products,
                variations: *variations,
                orders: *orders,
                items: *items,
                held: *held,
            }),
            Commands::Serve { bind } => self.handle_serve(bind.as_deref()),
            Commands::Audit {
                record_type,
                limit,
                format,
            } => self.handle_audit(*record_type, *limit, format),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(command = %name, elapsed_ms, "Command finished"),
            Err(e) => warn!(command = %name, elapsed_ms, error = %e, "Command failed"),
        }
        result
    }

    fn handle_counts(&self, format: &str) -> Result<String, ApiError> {
        let (client, _db) = self.client()?;
        let counts = runtime()?.block_on(client.get_counts())?;
        if format == "json" {
            format_counts_json(&counts)
        } else {
            Ok(format_counts_text(&counts))
        }
    }

    fn handle_delete(&self, record_type: RecordType, yes: bool) -> Result<String, ApiError> {
        let (client, db) = self.client()?;
        let journal = match db {
            Some(db) => Some(self.open_journal(db)?),
            None => None,
        };

        let mut presenter = TerminalPresenter::new(yes);
        let mut orchestrator = BatchOrchestrator::new(client, &mut presenter);
        if let Some(journal) = journal {
            orchestrator = orchestrator.with_journal(journal);
        }
        let outcome = runtime()?.block_on(orchestrator.run(record_type));

        match outcome {
            RunOutcome::Declined(_) => Ok(outcome.message()),
            RunOutcome::Succeeded(ref summary) => Ok(format!(
                "{}\n{}",
                format_run_summary(summary),
                outcome.message()
            )),
            RunOutcome::Failed { error, .. } => Err(error),
        }
    }

    fn handle_seed(&self, plan: SeedPlan) -> Result<String, ApiError> {
        if self.config.client.server.is_some() {
            return Err(ApiError::InvalidRequest(
                "seed writes to the local store only; drop --server".to_string(),
            ));
        }
        let db = self.open_db()?;
        let store = SledRecordStore::from_db(db)?;
        let report = seed_store(&store, &plan)?;
        store.flush()?;
        Ok(format_seed_report(&report))
    }

    fn handle_serve(&self, bind: Option<&str>) -> Result<String, ApiError> {
        if self.config.auth.tokens.is_empty() {
            return Err(ApiError::ConfigError(
                "No auth tokens configured; add [[auth.tokens]] before serving".to_string(),
            ));
        }
        let addr = bind.unwrap_or(&self.config.server.bind).to_string();
        let db = self.open_db()?;
        // Applies skip-log retention on the server's store.
        self.open_journal(db.clone())?;
        let service = Arc::new(self.open_service(db, &self.config.auth)?);

        runtime()?.block_on(async move {
            let listener = server::bind(&addr).await?;
            server::serve(listener, service, server::ctrl_c()).await
        })?;
        Ok("Server stopped".to_string())
    }

    fn handle_audit(
        &self,
        record_type: Option<RecordType>,
        limit: usize,
        format: &str,
    ) -> Result<String, ApiError> {
        let db = self.open_db()?;
        let store = AuditStore::new(db)?;
        let runs: Vec<_> = store
            .list_runs()?
            .into_iter()
            .filter(|run| record_type.map_or(true, |rt| run.record_type == rt))
            .take(limit)
            .collect();
        let skips = store.read_skips(record_type, limit)?;
        if format == "json" {
            format_audit_json(&runs, &skips)
        } else {
            Ok(format_audit_text(&runs, &skips))
        }
    }

    /// Client for the configured endpoint. Local mode also hands back the
    /// database so callers can journal into it.
    fn client(&self) -> Result<(CleanupClient, Option<sled::Db>), ApiError> {
        let token = self.config.client.token.clone().unwrap_or_default();
        if let Some(server) = &self.config.client.server {
            let transport = HttpTransport::new(
                server,
                Duration::from_secs(self.config.client.timeout_secs),
            )?;
            info!(endpoint = %transport.endpoint(), "Using remote cleanup server");
            let transport: Arc<dyn Transport> = Arc::new(transport);
            return Ok((CleanupClient::new(transport, token), None));
        }

        let db = self.open_db()?;
        let service = self.open_local_service(db.clone())?;
        let transport: Arc<dyn Transport> = Arc::new(LocalTransport::new(Arc::new(service)));
        Ok((CleanupClient::new(transport, token), Some(db)))
    }

    fn open_local_service(&self, db: sled::Db) -> Result<CleanupService, ApiError> {
        CleanupService::open(db, self.limits(), Arc::new(LocalAuthorizer))
    }

    fn open_service(&self, db: sled::Db, auth: &AuthConfig) -> Result<CleanupService, ApiError> {
        CleanupService::open(db, self.limits(), Arc::new(TokenAuthorizer::new(auth)))
    }

    fn limits(&self) -> ServiceLimits {
        ServiceLimits {
            batch_size: self.config.cleanup.batch_size,
            lease_ttl_secs: self.config.cleanup.lease_ttl_secs,
        }
    }

    fn open_journal(&self, db: sled::Db) -> Result<RunJournal, ApiError> {
        let journal = RunJournal::new(AuditStore::shared(db)?);
        let interrupted = journal.mark_interrupted_runs()?;
        if interrupted > 0 {
            warn!(count = interrupted, "Marked abandoned runs as interrupted");
        }
        if let Err(e) = journal.prune(self.config.cleanup.prune_policy()) {
            warn!(error = %e, "Failed to prune audit records");
        }
        Ok(journal)
    }

    fn open_db(&self) -> Result<sled::Db, ApiError> {
        std::fs::create_dir_all(&self.store_path)
            .map_err(|e| ApiError::StorageError(StorageError::IoError(e)))?;
        sled::open(&self.store_path).map_err(|e| {
            ApiError::StorageError(StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to open sled database: {}", e),
            )))
        })
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, ApiError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ApiError::ConfigError(format!("Failed to create async runtime: {}", e)))
}
