use std::time::Instant;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::warn;

use crate::core::persistence::report_store_trait::{NmsSession, ReportStore};
use crate::domain::report::error::ReportError;
use crate::domain::report::service::ReportSettings;

pub struct SystemService<S: ReportStore> {
    store: S,
    settings: ReportSettings,
    started_at: Instant,
}

impl<S: ReportStore> SystemService<S> {
    pub fn new(store: S, settings: ReportSettings) -> Self {
        Self {
            store,
            settings,
            started_at: Instant::now(),
        }
    }

    pub async fn status(&self) -> Result<Value> {
        Ok(json!({
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_secs": self.started_at.elapsed().as_secs(),
            "raw_retention_hours": self.settings.boundaries.raw_retention.num_hours(),
            "minute_retention_hours": self.settings.boundaries.minute_retention.num_hours(),
            "percentile_workers": self.settings.percentile_workers,
            "max_sessions": self.settings.max_sessions,
            "timeout_secs": self.settings.timeout.as_secs(),
        }))
    }

    /// Round-trip to the statistics database.
    pub async fn health(&self) -> Result<Value> {
        let mut session = self.store.connect().await.map_err(|err| {
            warn!(error = %err, "Health check could not reach the statistics store");
            ReportError::Connection(format!("{err:#}"))
        })?;
        session.ping().await.context("statistics store ping failed")?;

        Ok(json!({ "database": "ok" }))
    }
}
