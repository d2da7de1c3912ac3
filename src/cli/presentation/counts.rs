//! Counts and seed formatters.

use super::shared::{format_section_heading, to_pretty_json};
use crate::error::ApiError;
use crate::store::SeedReport;
use crate::types::{RecordCounts, RecordType};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;

pub fn format_counts_text(counts: &RecordCounts) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Type", "Count"]);
    for record_type in RecordType::ALL {
        table.add_row(vec![
            record_type.plural().to_string(),
            counts.get(record_type).to_string(),
        ]);
    }
    format!("{}\n\n{}", format_section_heading("Records"), table)
}

pub fn format_counts_json(counts: &RecordCounts) -> Result<String, ApiError> {
    to_pretty_json(counts)
}

pub fn format_seed_report(report: &SeedReport) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Kind", "Written"]);
    table.add_row(vec!["products".to_string(), report.products.to_string()]);
    table.add_row(vec!["variations".to_string(), report.variations.to_string()]);
    table.add_row(vec!["orders".to_string(), report.orders.to_string()]);
    table.add_row(vec!["line items".to_string(), report.line_items.to_string()]);
    table.add_row(vec!["held".to_string(), report.held.to_string()]);
    format!("{}\n\n{}", format_section_heading("Seeded"), table)
}
