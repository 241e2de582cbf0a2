use serde::Serialize;

use crate::domain::common::model::Direction;

/// One row of the usage report.
///
/// Totals are kilobytes. Speeds (peak, percentile, average), CIR and MIR are
/// kilobits per second. Utilization is a percentage of MIR and stays `None`
/// when MIR is zero or the percentile could not be picked. `network_id` is
/// `None` until the terminal is found in `nms.NetModem`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ReportEntry {
    pub unique_id: u32,
    pub serial_number: u32,
    pub name: String,
    pub did: u32,
    pub active: bool,
    pub network_id: Option<u32>,
    pub inroute_group_id: u32,

    pub up_total: f64,
    pub down_total: f64,
    pub down_unicast_total: f64,
    pub down_multicast_total: f64,

    pub up_peak_speed: f64,
    pub down_peak_speed: f64,
    pub up_percentile_speed: f64,
    pub down_percentile_speed: f64,
    pub up_average_speed: f64,
    pub down_average_speed: f64,

    pub up_cir: f64,
    pub down_cir: f64,
    pub up_mir: f64,
    pub down_mir: f64,

    pub up_utilization: Option<f64>,
    pub down_utilization: Option<f64>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub percentile_issues: Vec<PercentileIssue>,
}

impl ReportEntry {
    pub fn new(unique_id: u32) -> Self {
        Self {
            unique_id,
            ..Default::default()
        }
    }

    pub fn has_percentile_issue(&self, direction: Direction) -> bool {
        self.percentile_issues
            .iter()
            .any(|issue| issue.direction == direction)
    }
}

/// The percentile of one terminal/direction could not be picked: the merged
/// candidate list was shorter than the computed index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileIssue {
    pub direction: Direction,
    pub index: usize,
    pub candidates: usize,
    pub rows: i64,
}

impl std::fmt::Display for PercentileIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} percentile index {} out of {} candidates ({} rows)",
            self.direction, self.index, self.candidates, self.rows
        )
    }
}

// ============================================================
// Partial results, one per report stage
// ============================================================

/// Traffic of one terminal merged across tiers and shards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrafficTotals {
    pub up_total: f64,
    pub down_total: f64,
    /// kbit/s
    pub up_peak: f64,
    /// kbit/s
    pub down_peak: f64,
}

impl TrafficTotals {
    /// Totals add, peaks keep the maximum.
    pub fn merge(&mut self, other: &TrafficTotals) {
        self.up_total += other.up_total;
        self.down_total += other.down_total;
        self.up_peak = self.up_peak.max(other.up_peak);
        self.down_peak = self.down_peak.max(other.down_peak);
    }
}

/// Identity and resolved MIR of one terminal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TerminalRates {
    pub serial_number: u32,
    pub name: String,
    pub did: u32,
    pub active: bool,
    pub network_id: u32,
    pub inroute_group_id: u32,
    pub up_mir: f64,
    pub down_mir: f64,
}

/// Committed rate of one terminal, kbit/s.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CirTotals {
    pub up: f64,
    pub down: f64,
}

/// Percentile speeds of one terminal, kbit/s, with the directions that failed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PercentileResult {
    pub up: f64,
    pub down: f64,
    pub issues: Vec<PercentileIssue>,
}

impl PercentileResult {
    pub fn set(&mut self, direction: Direction, value: f64) {
        match direction {
            Direction::Upstream => self.up = value,
            Direction::Downstream => self.down = value,
        }
    }
}
