use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::common::model::{Direction, TimeWindow};

/// Number of shard tables every tier is split across.
pub const SHARD_COUNT: u8 = 6;

/// Schema holding the statistics archive.
pub const ARCHIVE_SCHEMA: &str = "nrd_archive";

/// Epoch (seconds) the archive's six-hour shard rotation is counted from.
const SHARD_ROTATION_EPOCH: i64 = 1_072_915_201;
const SHARD_ROTATION_SECONDS: i64 = 6 * 3600;

/// Storage granularity of the statistics archive.
///
/// Each tier is physically split into [`SHARD_COUNT`] tables, plus one multicast
/// companion table per shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Hour,
    Minute,
    Raw,
}

impl Tier {
    /// Oldest → newest.
    pub const ALL: [Tier; 3] = [Tier::Hour, Tier::Minute, Tier::Raw];

    pub fn shards() -> impl Iterator<Item = u8> {
        0..SHARD_COUNT
    }

    pub fn stats_table(self, shard: u8) -> String {
        match self {
            Tier::Hour => format!("{ARCHIVE_SCHEMA}.ota_hour_stats_{shard}"),
            Tier::Minute => format!("{ARCHIVE_SCHEMA}.ota_minute_stats_{shard}"),
            Tier::Raw => format!("{ARCHIVE_SCHEMA}.raw_ota_stats_{shard}"),
        }
    }

    pub fn multicast_table(self, shard: u8) -> String {
        match self {
            Tier::Hour => format!("{ARCHIVE_SCHEMA}.otacast_hour_stats_{shard}"),
            Tier::Minute => format!("{ARCHIVE_SCHEMA}.otacast_minute_stats_{shard}"),
            Tier::Raw => format!("{ARCHIVE_SCHEMA}.raw_otacast_stats_{shard}"),
        }
    }

    /// Length of one sample row.
    pub fn interval_seconds(self) -> u32 {
        match self {
            Tier::Raw | Tier::Minute => 60,
            Tier::Hour => 3600,
        }
    }

    /// Kilobytes transferred in one row, for the given direction.
    pub fn volume_expr(direction: Direction) -> &'static str {
        match direction {
            Direction::Upstream => "rx_reliable_kbyte + rx_unreliable_kbyte + rx_oob_kbyte",
            Direction::Downstream => "tx_reliable_kbyte + tx_unreliable_kbyte + tx_oob_kbyte",
        }
    }

    /// Peak kilobytes-per-minute expression of one row.
    ///
    /// Raw rows only carry the per-minute volume; rollups keep the busiest minute
    /// in the `*_max` columns.
    pub fn peak_expr(self, direction: Direction) -> &'static str {
        match (self, direction) {
            (Tier::Raw, d) => Self::volume_expr(d),
            (_, Direction::Upstream) => "rx_reliable_max + rx_unreliable_max + rx_oob_max",
            (_, Direction::Downstream) => "tx_reliable_max + tx_unreliable_max + tx_oob_max",
        }
    }

    /// Shard the archive rotated into at `ts` (six-hour buckets).
    ///
    /// Only informational: report queries always scan every shard, because rows of
    /// one window are not guaranteed to sit in the shard of their timestamp.
    ///
    /// Counts whole seconds from the rotation epoch. Tools that subtract the same
    /// epoch from a millisecond timestamp land on a different shard, so the two
    /// are not interchangeable.
    pub fn shard_for_timestamp(ts: DateTime<Utc>) -> u8 {
        let buckets = (ts.timestamp() - SHARD_ROTATION_EPOCH).div_euclid(SHARD_ROTATION_SECONDS);
        buckets.rem_euclid(SHARD_COUNT as i64) as u8
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Hour => f.write_str("hour"),
            Tier::Minute => f.write_str("minute"),
            Tier::Raw => f.write_str("raw"),
        }
    }
}

/// One tier together with the part of the report window it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierSlice {
    pub tier: Tier,
    pub window: TimeWindow,
}

impl TierSlice {
    pub fn new(tier: Tier, window: TimeWindow) -> Self {
        Self { tier, window }
    }
}
