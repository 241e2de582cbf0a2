//! Typed builders for the shard fan-out queries.
//!
//! Table and column names only ever come from [`Tier`] and [`Direction`]; window
//! bounds, terminal ids and limits are bind parameters. Every builder unions all
//! [`SHARD_COUNT`](super::tier::SHARD_COUNT) shards with `UNION ALL`, there is no
//! shard pruning.

use sqlx::{MySql, QueryBuilder};

use crate::core::persistence::stats::tier::{Tier, TierSlice};
use crate::domain::common::model::{Direction, TimeWindow};

pub type ArchiveQuery = QueryBuilder<'static, MySql>;

/// Row count per terminal, used to size the percentile sample.
pub fn quantities_query(slice: &TierSlice, terminals: &[u32]) -> ArchiveQuery {
    let mut qb = QueryBuilder::new("");

    push_shard_union(&mut qb, |qb, shard| {
        qb.push("SELECT CAST(unique_id AS UNSIGNED) AS unique_id, COUNT(*) AS row_count FROM ");
        qb.push(slice.tier.stats_table(shard));
        qb.push(" WHERE ");
        push_window(qb, "timestamp", &slice.window);
        push_terminal_filter(qb, "unique_id", terminals);
        qb.push(" GROUP BY unique_id");
    });

    qb
}

/// Sum of transferred kilobytes and peak rate per terminal.
pub fn traffic_query(slice: &TierSlice, terminals: &[u32]) -> ArchiveQuery {
    let tier = slice.tier;
    let up_volume = Tier::volume_expr(Direction::Upstream);
    let down_volume = Tier::volume_expr(Direction::Downstream);
    let columns = format!(
        "SELECT CAST(unique_id AS UNSIGNED) AS unique_id, \
         CAST(SUM({up_volume}) AS DOUBLE) AS up_total, \
         CAST(SUM({down_volume}) AS DOUBLE) AS down_total, \
         CAST(MAX({up_peak}) / 60 AS DOUBLE) AS up_max_rate, \
         CAST(MAX({down_peak}) / 60 AS DOUBLE) AS down_max_rate FROM ",
        up_peak = tier.peak_expr(Direction::Upstream),
        down_peak = tier.peak_expr(Direction::Downstream),
    );

    let mut qb = QueryBuilder::new("");
    push_shard_union(&mut qb, |qb, shard| {
        qb.push(&columns);
        qb.push(tier.stats_table(shard));
        qb.push(" WHERE ");
        push_window(qb, "timestamp", &slice.window);
        push_terminal_filter(qb, "unique_id", terminals);
        qb.push(" GROUP BY unique_id");
    });

    qb
}

/// Multicast kilobytes per network from the tier's companion tables.
pub fn multicast_query(slice: &TierSlice) -> ArchiveQuery {
    let mut qb = QueryBuilder::new("");

    push_shard_union(&mut qb, |qb, shard| {
        qb.push(
            "SELECT CAST(network_id AS UNSIGNED) AS network_id, \
             CAST(SUM(tx_mcast_kbyte) AS DOUBLE) AS down_multicast FROM ",
        );
        qb.push(slice.tier.multicast_table(shard));
        qb.push(" WHERE ");
        push_window(qb, "timestamp", &slice.window);
        qb.push(" GROUP BY network_id");
    });

    qb
}

/// The `limit` highest per-interval rates of one terminal, per shard of every slice.
///
/// Each part is parenthesised so `ORDER BY ... LIMIT` applies per shard table and
/// not to the whole union. Downstream rates include the multicast traffic of the
/// terminal's network at the same timestamp.
pub fn top_rates_query(
    slices: &[TierSlice],
    terminal: u32,
    direction: Direction,
    limit: u32,
) -> ArchiveQuery {
    let mut qb = QueryBuilder::new("");
    let mut first = true;

    for slice in slices {
        let tier = slice.tier;
        for shard in Tier::shards() {
            if !first {
                qb.push(" UNION ALL ");
            }
            first = false;

            match direction {
                Direction::Upstream => {
                    qb.push(format!(
                        "(SELECT CAST(({volume}) / {interval} AS DOUBLE) AS rate FROM {table} WHERE unique_id = ",
                        volume = Tier::volume_expr(Direction::Upstream),
                        interval = tier.interval_seconds(),
                        table = tier.stats_table(shard),
                    ));
                    qb.push_bind(terminal);
                    qb.push(" AND ");
                    push_window(&mut qb, "timestamp", &slice.window);
                }
                Direction::Downstream => {
                    qb.push(format!(
                        "(SELECT CAST((a.tx_reliable_kbyte + a.tx_unreliable_kbyte + a.tx_oob_kbyte \
                         + COALESCE(b.tx_mcast_kbyte, 0)) / {interval} AS DOUBLE) AS rate \
                         FROM {table} a LEFT JOIN {cast} b \
                         ON a.timestamp = b.timestamp AND a.network_id = b.network_id \
                         WHERE a.unique_id = ",
                        interval = tier.interval_seconds(),
                        table = tier.stats_table(shard),
                        cast = tier.multicast_table(shard),
                    ));
                    qb.push_bind(terminal);
                    qb.push(" AND ");
                    push_window(&mut qb, "a.timestamp", &slice.window);
                }
            }

            qb.push(" ORDER BY rate DESC LIMIT ");
            qb.push_bind(limit);
            qb.push(")");
        }
    }

    qb
}

fn push_shard_union<F>(qb: &mut ArchiveQuery, mut part: F)
where
    F: FnMut(&mut ArchiveQuery, u8),
{
    for shard in Tier::shards() {
        if shard > 0 {
            qb.push(" UNION ALL ");
        }
        part(qb, shard);
    }
}

fn push_window(qb: &mut ArchiveQuery, column: &str, window: &TimeWindow) {
    qb.push(column);
    qb.push(" >= ");
    qb.push_bind(window.start.naive_utc());
    qb.push(" AND ");
    qb.push(column);
    qb.push(" < ");
    qb.push_bind(window.end.naive_utc());
}

fn push_terminal_filter(qb: &mut ArchiveQuery, column: &str, terminals: &[u32]) {
    qb.push(" AND ");
    qb.push(column);
    if terminals.is_empty() {
        // matches nothing, keeps the statement valid
        qb.push(" IN (NULL)");
        return;
    }

    qb.push(" IN (");
    {
        let mut ids = qb.separated(", ");
        for id in terminals {
            ids.push_bind(*id);
        }
    }
    qb.push(")");
}
