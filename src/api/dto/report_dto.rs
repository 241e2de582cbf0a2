//! Report API DTOs
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_with::formats::CommaSeparator;
use serde_with::{serde_as, StringWithSeparator};

use crate::domain::report::dto::usage_report_request::UsageReportRequest;

/// `GET /reports/usage?start=..&end=..&terminal_ids=1,2,3`
#[serde_as]
#[derive(Debug, Deserialize)]
pub struct UsageReportQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde_as(as = "StringWithSeparator::<CommaSeparator, u32>")]
    #[serde(default)]
    pub terminal_ids: Vec<u32>,
}

impl From<UsageReportQuery> for UsageReportRequest {
    fn from(q: UsageReportQuery) -> Self {
        Self {
            start: q.start,
            end: q.end,
            terminal_ids: q.terminal_ids,
        }
    }
}
