//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::RunInProgress { .. } | ApiError::RunRejected(_) => format!(
            "{}\nWait for the other run to finish or for its lease to expire.",
            e
        ),
        ApiError::Unauthorized(_) => format!("{} (check --token or client.token)", e),
        _ => e.to_string(),
    }
}
