//! Audit trail: durable skip logs written by the deletion backend and run
//! records written by the operator's client.

pub mod journal;
pub mod policy;
pub mod store;

pub use journal::{new_run_id, RunJournal, RunTally};
pub use policy::{now_millis, PrunePolicy, RunStatus};
pub use store::{AuditStore, RunRecord, SkipLogEntry};
