//! Near-95th-percentile speed estimate.
//!
//! Instead of scanning every row, each shard of each in-scope tier returns its
//! top `k` per-interval rates. The candidates are merged, sorted descending and
//! the element at `round(0.05 * rows)` is the estimate. `k` is shared by every
//! terminal and derived from the busiest one; the estimate is approximate for
//! terminals whose row count is far below that.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::Duration;
use tracing::{debug, warn};

use crate::core::persistence::report_store_trait::StatsSession;
use crate::core::persistence::stats::tier::{TierSlice, SHARD_COUNT};
use crate::core::util::rate_util::RateUtil;
use crate::domain::common::model::{Direction, TimeWindow};
use crate::domain::report::error::ReportError;
use crate::domain::report::model::{PercentileIssue, PercentileResult};
use crate::domain::report::run_control::RunControl;

const STAGE: &str = "percentiles";

/// Fraction of samples above the estimate.
const TOP_FRACTION: f64 = 0.05;
/// Extra candidates per shard on top of the expected share.
const SAMPLE_SLACK: f64 = 15.0;

/// Windows this long or longer are reported without percentiles.
pub fn max_window() -> Duration {
    Duration::days(31)
}

pub fn should_estimate(window: &TimeWindow) -> bool {
    window.duration() < max_window()
}

/// Candidates requested per shard and tier: `round(0.05 * max_count / 6 + 15)`.
pub fn sample_size(max_count: i64) -> u32 {
    let max_count = max_count.max(1) as f64;
    (TOP_FRACTION * max_count / f64::from(SHARD_COUNT) + SAMPLE_SLACK).round() as u32
}

/// 0-based position of the estimate in the descending candidate list.
pub fn percentile_index(rows: i64) -> usize {
    (TOP_FRACTION * rows.max(0) as f64).round() as usize
}

/// Pick the estimate from unsorted candidates (kilobytes/s), returned in kbit/s.
pub fn pick_percentile(
    mut candidates: Vec<f64>,
    rows: i64,
    direction: Direction,
) -> Result<f64, PercentileIssue> {
    candidates.sort_by(|a, b| b.total_cmp(a));

    let index = percentile_index(rows);
    candidates
        .get(index)
        .map(|rate| RateUtil::kbytes_to_kbits(*rate))
        .ok_or(PercentileIssue {
            direction,
            index,
            candidates: candidates.len(),
            rows,
        })
}

/// Estimate both directions for every `(terminal, rows)` pair on one session.
///
/// An out-of-range index is recorded on the terminal's result; only query
/// failures and cancellation abort.
pub async fn estimate_percentiles<S: StatsSession + ?Sized>(
    session: &mut S,
    plan: &[TierSlice],
    terminals: &[(u32, i64)],
    k: u32,
    control: &RunControl,
) -> Result<BTreeMap<u32, PercentileResult>> {
    let mut results = BTreeMap::new();

    for &(terminal, rows) in terminals {
        let mut result = PercentileResult::default();

        for direction in Direction::BOTH {
            control.checkpoint(STAGE)?;

            let candidates = session
                .fetch_top_rates(plan, terminal, direction, k)
                .await
                .with_context(|| ReportError::Query { stage: STAGE })?;

            match pick_percentile(candidates, rows, direction) {
                Ok(speed) => result.set(direction, speed),
                Err(issue) => {
                    warn!(
                        terminal,
                        direction = %issue.direction,
                        index = issue.index,
                        candidates = issue.candidates,
                        "Percentile estimate unavailable"
                    );
                    result.issues.push(issue);
                }
            }
        }

        results.insert(terminal, result);
    }

    debug!(terminals = results.len(), k, "Percentiles estimated");
    Ok(results)
}

/// Split terminals round-robin into at most `workers` non-empty buckets.
pub fn bucket_round_robin(terminals: &[(u32, i64)], workers: usize) -> Vec<Vec<(u32, i64)>> {
    let workers = workers.clamp(1, terminals.len().max(1));
    let mut buckets = vec![Vec::new(); workers];

    for (i, terminal) in terminals.iter().enumerate() {
        buckets[i % workers].push(*terminal);
    }

    buckets
}
