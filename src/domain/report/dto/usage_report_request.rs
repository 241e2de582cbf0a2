use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Ids beyond this are rejected rather than turned into a huge `IN (...)` list.
pub const MAX_TERMINAL_IDS: usize = 5_000;
const MAX_TERMINAL_IDS_U64: u64 = MAX_TERMINAL_IDS as u64;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_window"))]
pub struct UsageReportRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    #[validate(length(max = MAX_TERMINAL_IDS_U64, message = "too many terminal ids"))]
    pub terminal_ids: Vec<u32>,
}

fn validate_window(req: &UsageReportRequest) -> Result<(), ValidationError> {
    if req.end < req.start {
        return Err(ValidationError::new("end_before_start"));
    }
    Ok(())
}
