use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::persistence::report_store_trait::StatsSession;
use crate::core::persistence::stats::stats_rows::TrafficRow;
use crate::core::persistence::stats::tier::TierSlice;
use crate::core::util::rate_util::RateUtil;
use crate::domain::report::error::ReportError;
use crate::domain::report::model::TrafficTotals;
use crate::domain::report::run_control::RunControl;

const STAGE: &str = "traffic";

/// Unicast totals and peak speeds per terminal across every slice and shard.
pub async fn collect_traffic<S: StatsSession + ?Sized>(
    session: &mut S,
    plan: &[TierSlice],
    terminals: &[u32],
    control: &RunControl,
) -> Result<BTreeMap<u32, TrafficTotals>> {
    let mut traffic: BTreeMap<u32, TrafficTotals> = BTreeMap::new();

    for slice in plan {
        control.checkpoint(STAGE)?;

        let rows = session
            .fetch_traffic(slice, terminals)
            .await
            .with_context(|| ReportError::Query { stage: STAGE })?;

        debug!(tier = %slice.tier, rows = rows.len(), "Traffic fetched");

        for row in &rows {
            traffic
                .entry(row.unique_id)
                .or_default()
                .merge(&totals_from_row(row));
        }
    }

    Ok(traffic)
}

/// Peaks come back as kilobytes/s and are stored as kilobits/s.
fn totals_from_row(row: &TrafficRow) -> TrafficTotals {
    TrafficTotals {
        up_total: row.up_total,
        down_total: row.down_total,
        up_peak: RateUtil::kbytes_to_kbits(row.up_max_rate),
        down_peak: RateUtil::kbytes_to_kbits(row.down_max_rate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persistence::memory_store::{MemoryReportStore, StatsSample};
    use crate::core::persistence::report_store_trait::ReportStore;
    use crate::core::persistence::stats::tier::Tier;
    use crate::domain::common::model::TimeWindow;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 2, 0, 0, 0).unwrap()
    }

    fn store() -> MemoryReportStore {
        (0..120)
            .map(|minute| {
                StatsSample::new(Tier::Raw, (minute % 6) as u8, 4, t0() + Duration::minutes(minute))
                    .up(10.0 + minute as f64)
                    .down(60.0)
            })
            .fold(MemoryReportStore::default(), |store, sample| store.with_sample(sample))
    }

    async fn traffic_over(store: &MemoryReportStore, windows: &[TimeWindow]) -> TrafficTotals {
        let plan: Vec<TierSlice> = windows.iter().map(|w| TierSlice::new(Tier::Raw, *w)).collect();
        let mut session = store.connect().await.unwrap();
        let traffic = collect_traffic(&mut session, &plan, &[4], &RunControl::unbounded())
            .await
            .unwrap();
        traffic.get(&4).copied().unwrap_or_default()
    }

    #[tokio::test]
    async fn peaks_are_kilobits_per_second() {
        let totals = traffic_over(&store(), &[TimeWindow::new(t0(), t0() + Duration::hours(2))]).await;

        // busiest minute moved 129 kB
        assert_eq!(totals.up_peak, 129.0 / 60.0 * 8.0);
        assert_eq!(totals.down_peak, 8.0);
        assert_eq!(totals.down_total, 120.0 * 60.0);
    }

    #[tokio::test]
    async fn totals_add_over_adjacent_windows() {
        let store = store();
        let split = t0() + Duration::minutes(47);
        let whole = traffic_over(&store, &[TimeWindow::new(t0(), t0() + Duration::hours(2))]).await;
        let parts = traffic_over(
            &store,
            &[
                TimeWindow::new(t0(), split),
                TimeWindow::new(split, t0() + Duration::hours(2)),
            ],
        )
        .await;

        assert_eq!(whole, parts);
    }

    #[tokio::test]
    async fn rollup_peaks_come_from_max_columns() {
        let minute_start = t0() - Duration::days(3);
        let hour_start = t0() - Duration::days(40);
        let store = MemoryReportStore::default()
            .with_sample(
                StatsSample::new(Tier::Minute, 2, 4, minute_start)
                    .up(300.0)
                    .down(600.0)
                    .peaks(30.0, 120.0),
            )
            .with_sample(
                StatsSample::new(Tier::Hour, 5, 4, hour_start)
                    .up(9_000.0)
                    .down(18_000.0)
                    .peaks(45.0, 90.0),
            );
        let plan = [
            TierSlice::new(Tier::Hour, TimeWindow::new(hour_start, hour_start + Duration::hours(1))),
            TierSlice::new(Tier::Minute, TimeWindow::new(minute_start, minute_start + Duration::hours(1))),
        ];

        let mut session = store.connect().await.unwrap();
        let traffic = collect_traffic(&mut session, &plan, &[4], &RunControl::unbounded())
            .await
            .unwrap();
        let totals = traffic[&4];

        assert_eq!(totals.up_total, 9_300.0);
        assert_eq!(totals.down_total, 18_600.0);
        // busiest minute from the hour row upstream, the minute row downstream
        assert_eq!(totals.up_peak, 45.0 / 60.0 * 8.0);
        assert_eq!(totals.down_peak, 120.0 / 60.0 * 8.0);
    }

    #[tokio::test]
    async fn cancelled_run_stops_before_querying() {
        let store = store();
        let control = RunControl::unbounded();
        control.cancel();

        let mut session = store.connect().await.unwrap();
        let plan = [TierSlice::new(Tier::Raw, TimeWindow::new(t0(), t0() + Duration::hours(1)))];
        let err = collect_traffic(&mut session, &plan, &[4], &control)
            .await
            .unwrap_err();

        assert!(matches!(err.downcast_ref::<ReportError>(), Some(ReportError::Cancelled)));
    }
}
