//! Row shapes returned by the statistics archive.
//!
//! Every fan-out query returns one row per shard (and per tier) that had data, so
//! the same key can show up several times. Merging is left to the domain.

/// `COUNT(*)` of one terminal in one shard table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantityRow {
    pub unique_id: u32,
    pub rows: i64,
}

/// Traffic aggregate of one terminal in one shard table.
///
/// Totals are kilobytes, max rates kilobytes per second.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrafficRow {
    pub unique_id: u32,
    pub up_total: f64,
    pub down_total: f64,
    pub up_max_rate: f64,
    pub down_max_rate: f64,
}

/// Multicast kilobytes of one network in one companion shard table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MulticastRow {
    pub network_id: u32,
    pub down_multicast: f64,
}
