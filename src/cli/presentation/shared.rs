//! Shared presentation helpers.

use crate::error::{ApiError, StorageError};
use chrono::{TimeZone, Utc};
use owo_colors::OwoColorize;
use serde::Serialize;

/// Section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::StorageError(StorageError::Corrupt(e.to_string())))
}

/// `2026-10-16 09:30:00` for a unix-millis timestamp, `-` when unknown.
pub fn format_timestamp_ms(ms: Option<u64>) -> String {
    ms.and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single())
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}
