use anyhow::Result;

use crate::api::dto::system_dto::PaginatedLogResponse;
use crate::core::persistence::logs::log_repository::LogRepository;

const DEFAULT_PAGE_SIZE: usize = 200;
const MAX_PAGE_SIZE: usize = 2_000;

pub struct LogService<R: LogRepository> {
    repo: R,
}

impl<R: LogRepository> LogService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn get_system_log_file_list(&self) -> Result<Vec<String>> {
        self.repo.get_logs()
    }

    /// One page of a day's log, starting at line `cursor`.
    pub async fn get_system_log_lines(
        &self,
        date: &str,
        cursor: Option<usize>,
        limit: Option<usize>,
    ) -> Result<PaginatedLogResponse> {
        let lines = self.repo.get_log(date)?;

        let start = cursor.unwrap_or(0).min(lines.len());
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let end = (start + limit).min(lines.len());

        Ok(PaginatedLogResponse {
            date: date.to_string(),
            lines: lines[start..end].to_vec(),
            next_cursor: (end < lines.len()).then_some(end),
        })
    }
}
