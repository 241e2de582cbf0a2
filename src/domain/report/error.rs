use std::time::Duration;

use thiserror::Error;

/// Failures that end a report run without a result.
///
/// Attached to `anyhow` errors (directly or as context) so the API layer can
/// downcast and pick a status code.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("statistics store unavailable: {0}")]
    Connection(String),

    #[error("report query failed during {stage}")]
    Query { stage: &'static str },

    #[error("invalid report window: {0}")]
    InvalidWindow(String),

    #[error("report run cancelled")]
    Cancelled,

    #[error("report run exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),
}
