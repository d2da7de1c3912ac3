//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::{command_name, is_destructive};
pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{
    format_audit_json, format_audit_text, format_counts_json, format_counts_text,
    format_run_summary, format_seed_report, TerminalPresenter,
};
pub use route::RunContext;
