use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;

/// Prefix of the daily rolling log files (`report.log.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "report.log";

pub trait LogRepository: Send + Sync {
    /// Dates with a log file, newest first.
    fn get_logs(&self) -> Result<Vec<String>>;

    /// All lines of one day's log file.
    fn get_log(&self, date: &str) -> Result<Vec<String>>;
}

/// Reads the files written by the rolling appender.
pub struct LogRepositoryImpl {
    dir: PathBuf,
}

impl LogRepositoryImpl {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl LogRepository for LogRepositoryImpl {
    fn get_logs(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut dates: Vec<String> = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read log dir {}", self.dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                let date = name.strip_prefix(LOG_FILE_PREFIX)?.strip_prefix('.')?;
                NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
                Some(date.to_string())
            })
            .collect();

        dates.sort_unstable_by(|a, b| b.cmp(a));
        Ok(dates)
    }

    fn get_log(&self, date: &str) -> Result<Vec<String>> {
        // only well-formed dates reach the filesystem
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("Invalid log date: {date}"))?;
        let path = self
            .dir
            .join(format!("{LOG_FILE_PREFIX}.{}", date.format("%Y-%m-%d")));

        let file = File::open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        BufReader::new(file)
            .lines()
            .collect::<std::io::Result<Vec<_>>>()
            .context("Failed to read log file")
    }
}
