//! Audit formatters: run records and skip logs.

use super::shared::{format_section_heading, format_timestamp_ms, to_pretty_json};
use crate::audit::{RunRecord, SkipLogEntry};
use crate::error::ApiError;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde_json::json;

pub fn format_audit_text(runs: &[RunRecord], skips: &[SkipLogEntry]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Runs")));
    if runs.is_empty() {
        out.push_str("  No runs recorded.\n");
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec![
            "Run", "Type", "Started", "Status", "Found", "Deleted", "Skipped", "Error",
        ]);
        for run in runs {
            table.add_row(vec![
                run.run_id.clone(),
                run.record_type.plural().to_string(),
                format_timestamp_ms(Some(run.started_at_ms)),
                run.status.as_str().to_string(),
                run.total.to_string(),
                run.processed.to_string(),
                run.skipped.to_string(),
                run.error.clone().unwrap_or_else(|| "-".to_string()),
            ]);
        }
        out.push_str(&format!("{}\n", table));
    }

    out.push_str(&format!("\n{}\n\n", format_section_heading("Skipped records")));
    if skips.is_empty() {
        out.push_str("  No skipped records logged.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Logged", "Type", "Offset", "ID", "Label", "Reason"]);
    for entry in skips {
        for skipped in &entry.skipped {
            table.add_row(vec![
                format_timestamp_ms(Some(entry.logged_at_ms)),
                entry.record_type.as_str().to_string(),
                entry.offset.to_string(),
                skipped.id.to_string(),
                skipped.label.clone(),
                skipped.error.clone().unwrap_or_else(|| "-".to_string()),
            ]);
        }
    }
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_audit_json(runs: &[RunRecord], skips: &[SkipLogEntry]) -> Result<String, ApiError> {
    to_pretty_json(&json!({
        "runs": runs,
        "skips": skips,
    }))
}
