use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::persistence::report_store_trait::StatsSession;
use crate::core::persistence::stats::tier::TierSlice;
use crate::domain::report::error::ReportError;
use crate::domain::report::run_control::RunControl;

const STAGE: &str = "multicast";

/// Downstream multicast kilobytes per network across every slice and shard.
///
/// Networks without rows are absent; callers treat them as zero.
pub async fn collect_multicast<S: StatsSession + ?Sized>(
    session: &mut S,
    plan: &[TierSlice],
    control: &RunControl,
) -> Result<BTreeMap<u32, f64>> {
    let mut networks: BTreeMap<u32, f64> = BTreeMap::new();

    for slice in plan {
        control.checkpoint(STAGE)?;

        let rows = session
            .fetch_multicast(slice)
            .await
            .with_context(|| ReportError::Query { stage: STAGE })?;

        debug!(tier = %slice.tier, rows = rows.len(), "Multicast fetched");

        for row in rows {
            *networks.entry(row.network_id).or_default() += row.down_multicast;
        }
    }

    Ok(networks)
}
