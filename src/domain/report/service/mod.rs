//! Usage report run: tier plan, stage queries, merge, derived metrics.

pub mod report_accumulator;
pub mod report_multicast_service;
pub mod report_percentile_service;
pub mod report_quantity_service;
pub mod report_rate_service;
pub mod report_traffic_service;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::{try_join, try_join_all};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;
use validator::Validate;

use crate::core::persistence::report_store_trait::ReportStore;
use crate::core::persistence::stats::tier::{Tier, TierSlice};
use crate::domain::common::model::TimeWindow;
use crate::domain::common::service::tier_selector::{select_tiers, TierBoundaries};
use crate::domain::report::dto::usage_report_request::UsageReportRequest;
use crate::domain::report::error::ReportError;
use crate::domain::report::model::{PercentileResult, ReportEntry};
use crate::domain::report::run_control::RunControl;

use report_accumulator::ReportAccumulator;
use report_multicast_service::collect_multicast;
use report_percentile_service::{
    bucket_round_robin, estimate_percentiles, sample_size, should_estimate,
};
use report_quantity_service::collect_quantities;
use report_rate_service::{collect_cir, collect_terminal_rates};
use report_traffic_service::collect_traffic;

/// Tunables of a report run.
#[derive(Debug, Clone, Copy)]
pub struct ReportSettings {
    pub boundaries: TierBoundaries,
    /// Sessions used for percentile queries, the run's own session included.
    pub percentile_workers: usize,
    /// Store sessions all report runs may hold at once, worker sessions included.
    pub max_sessions: usize,
    /// Zero means no deadline.
    pub timeout: Duration,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            boundaries: TierBoundaries::default(),
            percentile_workers: 1,
            max_sessions: 8,
            timeout: Duration::ZERO,
        }
    }
}

pub struct ReportService<S: ReportStore> {
    store: S,
    settings: ReportSettings,
    shutdown: CancellationToken,
    sessions: Arc<Semaphore>,
}

impl<S: ReportStore> ReportService<S> {
    pub fn new(store: S, settings: ReportSettings, shutdown: CancellationToken) -> Self {
        Self {
            store,
            settings,
            shutdown,
            sessions: Arc::new(Semaphore::new(settings.max_sessions.max(1))),
        }
    }

    /// Control for one run: cancelled with the service, bounded by the configured timeout.
    pub fn run_control(&self) -> RunControl {
        RunControl::new(self.shutdown.child_token()).with_timeout(self.settings.timeout)
    }

    pub async fn get_usage_report(
        &self,
        req: UsageReportRequest,
        control: &RunControl,
    ) -> Result<Vec<ReportEntry>> {
        req.validate()
            .map_err(|err| ReportError::InvalidWindow(err.to_string()))?;
        self.get_report(req.start, req.end, &req.terminal_ids, control)
            .await
    }

    pub async fn get_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        terminal_ids: &[u32],
        control: &RunControl,
    ) -> Result<Vec<ReportEntry>> {
        self.get_report_at(Utc::now(), start, end, terminal_ids, control)
            .await
    }

    /// Same as [`get_report`](Self::get_report) with an explicit "now" for the tier plan.
    pub async fn get_report_at(
        &self,
        now: DateTime<Utc>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        terminal_ids: &[u32],
        control: &RunControl,
    ) -> Result<Vec<ReportEntry>> {
        if end < start {
            return Err(ReportError::InvalidWindow(format!(
                "end {end} is before start {start}"
            ))
            .into());
        }

        let mut terminals = terminal_ids.to_vec();
        terminals.sort_unstable();
        terminals.dedup();

        if terminals.is_empty() {
            debug!("No terminals requested, skipping report");
            return Ok(Vec::new());
        }

        let window = TimeWindow::new(start, end);
        let span = info_span!("usage_report", run_id = %Uuid::new_v4());

        self.run(now, window, &terminals, control)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        now: DateTime<Utc>,
        window: TimeWindow,
        terminals: &[u32],
        control: &RunControl,
    ) -> Result<Vec<ReportEntry>> {
        let started = Instant::now();
        info!(
            start = %window.start,
            end = %window.end,
            terminals = terminals.len(),
            "Usage report started"
        );

        let plan = select_tiers(&window, now, &self.settings.boundaries);
        debug!(
            slices = ?plan,
            start_shard = Tier::shard_for_timestamp(window.start),
            "Tier plan built"
        );

        // A run waits for its own session; worker sessions are only taken when free.
        let _session_permit = self
            .sessions
            .acquire()
            .await
            .map_err(|err| ReportError::Connection(err.to_string()))?;

        control.checkpoint("connect")?;
        let mut session = self.store.connect().await.map_err(|err| {
            error!(error = %err, "Report run could not reach the statistics store");
            ReportError::Connection(format!("{err:#}"))
        })?;

        let quantities = collect_quantities(&mut session, &plan, terminals, control).await?;
        let mut acc = ReportAccumulator::from_quantities(&quantities);
        if acc.is_empty() {
            info!(elapsed_ms = started.elapsed().as_millis() as u64, "Usage report found no traffic");
            return Ok(Vec::new());
        }
        let ids = acc.terminal_ids();
        debug!(with_rows = acc.len(), "Quantities merged");

        let traffic = collect_traffic(&mut session, &plan, &ids, control).await?;
        acc.apply_traffic(&traffic);

        let rates = collect_terminal_rates(&mut session, &ids, control).await?;
        acc.apply_rates(&rates);

        let multicast = collect_multicast(&mut session, &plan, control).await?;
        acc.apply_multicast(&multicast);

        let cir = collect_cir(&mut session, &ids, control).await?;
        acc.apply_cir(&cir);

        if should_estimate(&window) {
            let percentiles = self
                .percentiles(&mut session, &plan, &quantities, control)
                .await?;
            acc.apply_percentiles(&percentiles);
        } else {
            debug!("Window too long for percentile estimation, skipped");
        }

        let entries = acc.finalize(&window);
        info!(
            terminals = entries.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Usage report finished"
        );

        Ok(entries)
    }

    /// Percentiles for every terminal with rows; the first bucket reuses the run's
    /// session, every other bucket opens its own. Runs with fewer workers when
    /// other runs hold the free sessions.
    async fn percentiles(
        &self,
        session: &mut S::Session,
        plan: &[TierSlice],
        quantities: &BTreeMap<u32, i64>,
        control: &RunControl,
    ) -> Result<BTreeMap<u32, PercentileResult>> {
        let terminals: Vec<(u32, i64)> = quantities
            .iter()
            .filter(|(_, rows)| **rows > 0)
            .map(|(id, rows)| (*id, *rows))
            .collect();
        let k = sample_size(quantities.values().copied().max().unwrap_or(1));

        let wanted = self
            .settings
            .percentile_workers
            .clamp(1, terminals.len().max(1))
            - 1;
        let permits: Vec<OwnedSemaphorePermit> = (0..wanted)
            .map_while(|_| self.sessions.clone().try_acquire_owned().ok())
            .collect();
        if permits.len() < wanted {
            debug!(wanted, granted = permits.len(), "Store sessions busy, fewer percentile workers");
        }

        let mut buckets = bucket_round_robin(&terminals, permits.len() + 1).into_iter();
        let primary = buckets.next().unwrap_or_default();
        let workers: Vec<_> = buckets
            .zip(permits)
            .map(|(bucket, permit)| self.percentile_worker(plan, bucket, k, permit, control))
            .collect();

        debug!(k, workers = workers.len() + 1, "Estimating percentiles");

        let (mut merged, rest) = try_join(
            estimate_percentiles(session, plan, &primary, k, control),
            try_join_all(workers),
        )
        .await?;

        for part in rest {
            merged.extend(part);
        }

        Ok(merged)
    }

    async fn percentile_worker(
        &self,
        plan: &[TierSlice],
        bucket: Vec<(u32, i64)>,
        k: u32,
        _permit: OwnedSemaphorePermit,
        control: &RunControl,
    ) -> Result<BTreeMap<u32, PercentileResult>> {
        control.checkpoint("percentiles")?;
        let mut session = self.store.connect().await.map_err(|err| {
            error!(error = %err, "Percentile worker could not reach the statistics store");
            ReportError::Connection(format!("{err:#}"))
        })?;

        estimate_percentiles(&mut session, plan, &bucket, k, control).await
    }
}
