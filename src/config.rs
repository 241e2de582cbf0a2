use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use validator::{Validate, ValidationError};

use crate::domain::common::service::tier_selector::TierBoundaries;
use crate::domain::report::service::ReportSettings;

/// Process configuration, read from `REPORT_*` environment variables.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_config"))]
pub struct AppConfig {
    #[validate(length(min = 1, message = "REPORT_DATABASE_URL must not be empty"))]
    pub database_url: String,
    pub bind_addr: String,
    pub log_dir: String,
    #[validate(range(min = 1, max = 64))]
    pub db_max_connections: u32,
    #[validate(range(min = 1, max = 16))]
    pub percentile_workers: usize,
    pub timeout_secs: u64,
    #[validate(range(min = 1))]
    pub raw_retention_hours: u32,
    pub minute_retention_hours: u32,
}

/// Minute retention must outlast raw retention, and every percentile worker
/// needs its own pooled connection.
fn validate_config(config: &AppConfig) -> Result<(), ValidationError> {
    if config.minute_retention_hours <= config.raw_retention_hours {
        return Err(ValidationError::new("minute_retention_not_after_raw"));
    }
    if config.percentile_workers > config.db_max_connections as usize {
        return Err(ValidationError::new("percentile_workers_exceed_pool"));
    }
    Ok(())
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Self {
            database_url: lookup("REPORT_DATABASE_URL")
                .context("REPORT_DATABASE_URL is not set")?,
            bind_addr: lookup("REPORT_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            log_dir: lookup("REPORT_LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            db_max_connections: parse_or(&lookup, "REPORT_DB_MAX_CONNECTIONS", 8)?,
            percentile_workers: parse_or(&lookup, "REPORT_PERCENTILE_WORKERS", 1)?,
            timeout_secs: parse_or(&lookup, "REPORT_TIMEOUT_SECS", 0)?,
            raw_retention_hours: parse_or(&lookup, "REPORT_RAW_RETENTION_HOURS", 24)?,
            minute_retention_hours: parse_or(&lookup, "REPORT_MINUTE_RETENTION_HOURS", 744)?,
        };

        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    pub fn report_settings(&self) -> ReportSettings {
        ReportSettings {
            boundaries: TierBoundaries::from_hours(
                self.raw_retention_hours,
                self.minute_retention_hours,
            ),
            percentile_workers: self.percentile_workers,
            max_sessions: self.db_max_connections as usize,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        _ => Ok(default),
    }
}
