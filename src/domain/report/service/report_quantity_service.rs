use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::persistence::report_store_trait::StatsSession;
use crate::core::persistence::stats::tier::TierSlice;
use crate::domain::report::error::ReportError;
use crate::domain::report::run_control::RunControl;

const STAGE: &str = "quantities";

/// Archive rows per terminal across every slice and shard.
///
/// Decides which terminals are in the report and sizes the percentile sample.
pub async fn collect_quantities<S: StatsSession + ?Sized>(
    session: &mut S,
    plan: &[TierSlice],
    terminals: &[u32],
    control: &RunControl,
) -> Result<BTreeMap<u32, i64>> {
    let mut quantities: BTreeMap<u32, i64> = BTreeMap::new();

    for slice in plan {
        control.checkpoint(STAGE)?;

        let rows = session
            .fetch_quantities(slice, terminals)
            .await
            .with_context(|| ReportError::Query { stage: STAGE })?;

        debug!(tier = %slice.tier, rows = rows.len(), "Quantities fetched");

        for row in rows {
            *quantities.entry(row.unique_id).or_default() += row.rows;
        }
    }

    Ok(quantities)
}
