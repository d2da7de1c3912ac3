//! Batch orchestrator: drives one deletion run from confirmation to verification.
//!
//! The run is a plain loop over awaited batch calls. Each batch reports how
//! many records it removed and which it had to skip. The next request carries
//! both the running offset and the continuation cursor, so records that failed
//! once are never fetched again in the same run. Once the backend reports the
//! collection exhausted, a fresh count must be fully explained by the skips.

pub mod presenter;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::audit::{RunJournal, RunStatus, RunTally};
use crate::client::CleanupClient;
use crate::deletion::BatchRequest;
use crate::error::ApiError;
use crate::types::{BatchResult, RecordId, RecordType, SkippedRecord, VerificationOutcome};

pub use presenter::{HeadlessPresenter, Presenter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Confirming,
    Counting,
    Running,
    Verifying,
    Succeeded,
    Failed,
}

impl RunPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Confirming => "confirming",
            RunPhase::Counting => "counting",
            RunPhase::Running => "running",
            RunPhase::Verifying => "verifying",
            RunPhase::Succeeded => "succeeded",
            RunPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Succeeded | RunPhase::Failed)
    }
}

/// Progress of an active run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunState {
    pub record_type: RecordType,
    pub total: u64,
    /// Records deleted so far; also the offset of the next request.
    pub processed_offset: u64,
    pub cumulative_skipped: u64,
    pub batches: u64,
    pub cursor: Option<RecordId>,
    pub skipped: Vec<SkippedRecord>,
    pub started_at: DateTime<Utc>,
    #[serde(skip)]
    skipped_ids: HashSet<RecordId>,
}

impl RunState {
    pub fn new(record_type: RecordType, total: u64) -> Self {
        Self {
            record_type,
            total,
            processed_offset: 0,
            cumulative_skipped: 0,
            batches: 0,
            cursor: None,
            skipped: Vec::new(),
            started_at: Utc::now(),
            skipped_ids: HashSet::new(),
        }
    }

    /// Request for the next batch.
    pub fn next_request(&self) -> BatchRequest {
        BatchRequest {
            record_type: self.record_type,
            offset: self.processed_offset,
            cursor: self.cursor,
        }
    }

    /// Fold one batch into the run. A record skipped again in a later batch
    /// is counted once.
    pub fn apply(&mut self, result: &BatchResult) {
        self.processed_offset += result.deleted_count;
        self.batches += 1;
        if result.next_cursor.is_some() {
            self.cursor = result.next_cursor;
        }
        if result.skipped.is_empty() {
            self.cumulative_skipped += result.skipped_count;
            return;
        }
        for record in &result.skipped {
            if self.skipped_ids.insert(record.id) {
                self.cumulative_skipped += 1;
                self.skipped.push(record.clone());
            }
        }
    }

    /// A non-final batch that deleted nothing and did not move the cursor.
    /// Servers that send no cursor would hand back the same page forever.
    fn is_stalled_by(&self, result: &BatchResult) -> bool {
        !result.exhausted
            && result.deleted_count == 0
            && (result.next_cursor.is_none() || result.next_cursor == self.cursor)
    }

    /// `round(processed / total * 100)`, capped at 100 for display.
    pub fn percentage(&self) -> u64 {
        if self.total == 0 {
            return 100;
        }
        let pct = (self.processed_offset as f64 / self.total as f64 * 100.0).round() as u64;
        pct.min(100)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub record_type: RecordType,
    pub total: u64,
    pub deleted: u64,
    pub skipped: u64,
    pub batches: u64,
    /// Count observed by verification, when the run got that far.
    pub remaining: Option<u64>,
    pub skipped_records: Vec<SkippedRecord>,
}

impl RunSummary {
    fn from_state(state: &RunState, remaining: Option<u64>) -> Self {
        Self {
            record_type: state.record_type,
            total: state.total,
            deleted: state.processed_offset,
            skipped: state.cumulative_skipped,
            batches: state.batches,
            remaining,
            skipped_records: state.skipped.clone(),
        }
    }

    fn empty(record_type: RecordType) -> Self {
        Self::from_state(&RunState::new(record_type, 0), None)
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    /// Operator declined; nothing was called.
    Declined(RecordType),
    Succeeded(RunSummary),
    Failed { summary: RunSummary, error: ApiError },
}

impl RunOutcome {
    pub fn phase(&self) -> RunPhase {
        match self {
            RunOutcome::Declined(_) => RunPhase::Idle,
            RunOutcome::Succeeded(_) => RunPhase::Succeeded,
            RunOutcome::Failed { .. } => RunPhase::Failed,
        }
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            RunOutcome::Declined(_) => None,
            RunOutcome::Succeeded(summary) | RunOutcome::Failed { summary, .. } => Some(summary),
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            RunOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded(_))
    }

    /// Operator-facing one-line result.
    pub fn message(&self) -> String {
        match self {
            RunOutcome::Declined(rt) => format!("Deletion of {} cancelled.", rt.plural()),
            RunOutcome::Succeeded(s) if s.total == 0 => {
                format!("No {} found to delete.", s.record_type.plural())
            }
            RunOutcome::Succeeded(s) if s.skipped == 0 => format!(
                "Deleted {} {}.",
                s.deleted,
                s.record_type.noun(s.deleted)
            ),
            RunOutcome::Succeeded(s) => format!(
                "Deleted {} {}; {} skipped {} could not be deleted and {}.",
                s.deleted,
                s.record_type.noun(s.deleted),
                s.skipped,
                s.record_type.noun(s.skipped),
                if s.skipped == 1 { "remains" } else { "remain" }
            ),
            RunOutcome::Failed { summary, error } => format!(
                "Deleting {} failed after {} deleted: {}",
                summary.record_type.plural(),
                summary.deleted,
                error
            ),
        }
    }
}

pub struct BatchOrchestrator<'a> {
    client: CleanupClient,
    presenter: &'a mut dyn Presenter,
    journal: Option<RunJournal>,
    holder: String,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(client: CleanupClient, presenter: &'a mut dyn Presenter) -> Self {
        Self {
            client,
            presenter,
            journal: None,
            holder: default_holder(),
        }
    }

    pub fn with_journal(mut self, journal: RunJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Name recorded on the run lease.
    pub fn with_holder(mut self, holder: impl Into<String>) -> Self {
        self.holder = holder.into();
        self
    }

    pub async fn run(&mut self, record_type: RecordType) -> RunOutcome {
        self.presenter.phase_changed(record_type, RunPhase::Confirming);
        match self.presenter.confirm(record_type) {
            Ok(true) => {}
            Ok(false) => {
                info!(record_type = %record_type, "Deletion declined");
                self.presenter.phase_changed(record_type, RunPhase::Idle);
                return RunOutcome::Declined(record_type);
            }
            Err(err) => {
                // A prompt that cannot be shown counts as "no".
                warn!(record_type = %record_type, error = %err, "Confirmation failed");
                self.presenter.phase_changed(record_type, RunPhase::Idle);
                return RunOutcome::Declined(record_type);
            }
        }

        let run_id = self.journal.as_ref().and_then(|journal| {
            journal
                .start_run(record_type)
                .map_err(|e| warn!(error = %e, "Failed to record run start"))
                .ok()
        });

        let lease = match self.client.begin_run(record_type, &self.holder).await {
            Ok(lease) => lease,
            Err(error) => {
                let outcome = RunOutcome::Failed {
                    summary: RunSummary::empty(record_type),
                    error,
                };
                return self.finish(record_type, run_id, None, outcome).await;
            }
        };
        debug!(record_type = %record_type, expires_at = %lease.expires_at, "Run lease acquired");

        let outcome = self.drive(record_type, &lease.token).await;
        self.finish(record_type, run_id, Some(lease.token), outcome)
            .await
    }

    async fn drive(&mut self, record_type: RecordType, lease: &str) -> RunOutcome {
        self.presenter.phase_changed(record_type, RunPhase::Counting);
        let total = match self.client.get_counts().await {
            Ok(counts) => counts.get(record_type),
            Err(error) => {
                return RunOutcome::Failed {
                    summary: RunSummary::empty(record_type),
                    error,
                }
            }
        };
        if total == 0 {
            info!(record_type = %record_type, "Nothing to delete");
            return RunOutcome::Succeeded(RunSummary::empty(record_type));
        }

        let mut state = RunState::new(record_type, total);
        info!(record_type = %record_type, total, "Starting deletion run");
        self.presenter.phase_changed(record_type, RunPhase::Running);
        self.presenter.progress(&state);

        loop {
            let request = state.next_request();
            let result = match self.client.delete_batch(&request, Some(lease)).await {
                Ok(result) => result,
                Err(error) => {
                    warn!(
                        record_type = %record_type,
                        offset = request.offset,
                        error = %error,
                        "Batch failed; aborting run"
                    );
                    return RunOutcome::Failed {
                        summary: RunSummary::from_state(&state, None),
                        error,
                    };
                }
            };

            for skipped in &result.skipped {
                warn!(
                    record_type = %record_type,
                    id = skipped.id,
                    label = %skipped.label,
                    error = skipped.error.as_deref().unwrap_or(""),
                    "Record skipped"
                );
            }

            let stalled = state.is_stalled_by(&result);
            state.apply(&result);
            debug!(
                record_type = %record_type,
                offset = request.offset,
                deleted = result.deleted_count,
                skipped = result.skipped_count,
                percentage = state.percentage(),
                "Batch complete"
            );
            self.presenter.progress(&state);

            if result.exhausted {
                break;
            }
            if stalled {
                return RunOutcome::Failed {
                    summary: RunSummary::from_state(&state, None),
                    error: ApiError::Remote(match state.cursor {
                        Some(cursor) => format!("Server made no progress past record {}", cursor),
                        None => format!(
                            "Server made no progress at offset {}",
                            state.processed_offset
                        ),
                    }),
                };
            }
        }

        self.presenter.phase_changed(record_type, RunPhase::Verifying);
        let remaining = match self.client.get_counts().await {
            Ok(counts) => counts.get(record_type),
            Err(error) => {
                return RunOutcome::Failed {
                    summary: RunSummary::from_state(&state, None),
                    error,
                }
            }
        };
        let verification = VerificationOutcome {
            remaining_count: remaining,
            expected_skipped: state.cumulative_skipped,
        };
        let summary = RunSummary::from_state(&state, Some(remaining));
        if verification.is_consistent() {
            RunOutcome::Succeeded(summary)
        } else {
            warn!(
                record_type = %record_type,
                remaining,
                expected = state.cumulative_skipped,
                "Verification found unexplained records"
            );
            RunOutcome::Failed {
                summary,
                error: ApiError::VerificationMismatch {
                    record_type,
                    remaining,
                    expected: state.cumulative_skipped,
                },
            }
        }
    }

    async fn finish(
        &mut self,
        record_type: RecordType,
        run_id: Option<String>,
        lease: Option<String>,
        outcome: RunOutcome,
    ) -> RunOutcome {
        if let Some(token) = lease {
            if let Err(err) = self.client.end_run(record_type, &token).await {
                warn!(record_type = %record_type, error = %err, "Failed to release run lease");
            }
        }

        if let (Some(journal), Some(run_id)) = (&self.journal, run_id) {
            let (status, error) = match &outcome {
                RunOutcome::Failed { error, .. } => (RunStatus::Failed, Some(error.to_string())),
                _ => (RunStatus::Succeeded, None),
            };
            let tally = outcome
                .summary()
                .map(|s| RunTally {
                    total: s.total,
                    processed: s.deleted,
                    skipped: s.skipped,
                })
                .unwrap_or_default();
            journal.finish_run_best_effort(&run_id, status, tally, error);
        }

        match &outcome {
            RunOutcome::Failed { error, .. } => {
                warn!(record_type = %record_type, error = %error, "Deletion run failed")
            }
            _ => info!(
                record_type = %record_type,
                message = %outcome.message(),
                "Deletion run finished"
            ),
        }
        self.presenter.phase_changed(record_type, outcome.phase());
        self.presenter.finished(&outcome);
        self.presenter.refresh();
        outcome
    }
}

fn default_holder() -> String {
    format!("sweep pid {}", std::process::id())
}
