//! Deletion run summary.

use super::shared::format_section_heading;
use crate::orchestrator::RunSummary;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;

/// Skipped records listed in full; the rest are summarized.
const MAX_LISTED_SKIPS: usize = 10;

pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Run summary")));

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Type", "Found", "Deleted", "Skipped", "Remaining", "Batches"]);
    table.add_row(vec![
        summary.record_type.plural().to_string(),
        summary.total.to_string(),
        summary.deleted.to_string(),
        summary.skipped.to_string(),
        summary
            .remaining
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string()),
        summary.batches.to_string(),
    ]);
    out.push_str(&format!("{}\n", table));

    if !summary.skipped_records.is_empty() {
        out.push_str(&format!("\n{}\n\n", format_section_heading("Skipped")));
        let mut skips = Table::new();
        skips.load_preset(UTF8_BORDERS_ONLY);
        skips.set_header(vec!["ID", "Label", "Reason"]);
        for skipped in summary.skipped_records.iter().take(MAX_LISTED_SKIPS) {
            skips.add_row(vec![
                skipped.id.to_string(),
                skipped.label.clone(),
                skipped.error.clone().unwrap_or_else(|| "-".to_string()),
            ]);
        }
        out.push_str(&format!("{}\n", skips));
        let hidden = summary.skipped_records.len().saturating_sub(MAX_LISTED_SKIPS);
        if hidden > 0 {
            out.push_str(&format!("  ... and {} more (see `sweep audit`)\n", hidden));
        }
    }
    out
}
