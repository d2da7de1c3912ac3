//! CLI presentation: text and json formatters per command family, plus the
//! interactive terminal presenter used by `delete`.

mod audit;
mod counts;
mod run;
mod shared;
mod terminal;

pub use audit::{format_audit_json, format_audit_text};
pub use counts::{format_counts_json, format_counts_text, format_seed_report};
pub use run::format_run_summary;
pub use terminal::TerminalPresenter;
