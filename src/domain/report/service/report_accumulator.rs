use std::collections::BTreeMap;

use crate::core::util::rate_util::RateUtil;
use crate::domain::common::model::{Direction, TimeWindow};
use crate::domain::report::model::{
    CirTotals, PercentileResult, ReportEntry, TerminalRates, TrafficTotals,
};

/// Terminal id → entry, filled stage by stage.
///
/// Only terminals with at least one archive row get an entry; every `apply_*`
/// ignores ids it does not already know. Iteration order (and so the report
/// order) is ascending terminal id.
#[derive(Debug, Default)]
pub struct ReportAccumulator {
    entries: BTreeMap<u32, ReportEntry>,
}

impl ReportAccumulator {
    pub fn from_quantities(quantities: &BTreeMap<u32, i64>) -> Self {
        let entries = quantities
            .iter()
            .filter(|(_, rows)| **rows > 0)
            .map(|(id, _)| (*id, ReportEntry::new(*id)))
            .collect();

        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn terminal_ids(&self) -> Vec<u32> {
        self.entries.keys().copied().collect()
    }

    /// Totals add, peaks keep the maximum.
    pub fn apply_traffic(&mut self, traffic: &BTreeMap<u32, TrafficTotals>) {
        for (id, totals) in traffic {
            let Some(entry) = self.entries.get_mut(id) else {
                continue;
            };
            entry.up_total += totals.up_total;
            entry.down_unicast_total += totals.down_total;
            entry.down_total = entry.down_unicast_total + entry.down_multicast_total;
            entry.up_peak_speed = entry.up_peak_speed.max(totals.up_peak);
            entry.down_peak_speed = entry.down_peak_speed.max(totals.down_peak);
        }
    }

    pub fn apply_rates(&mut self, rates: &BTreeMap<u32, TerminalRates>) {
        for (id, rate) in rates {
            let Some(entry) = self.entries.get_mut(id) else {
                continue;
            };
            entry.serial_number = rate.serial_number;
            entry.name = rate.name.clone();
            entry.did = rate.did;
            entry.active = rate.active;
            entry.network_id = Some(rate.network_id);
            entry.inroute_group_id = rate.inroute_group_id;
            entry.up_mir = rate.up_mir;
            entry.down_mir = rate.down_mir;
        }
    }

    /// Sets each terminal's multicast part from its network's total.
    ///
    /// Overwrites rather than adds, so applying the same totals twice changes
    /// nothing. Must run after [`apply_rates`](Self::apply_rates) has set the
    /// network ids; terminals without one get no multicast.
    pub fn apply_multicast(&mut self, network_totals: &BTreeMap<u32, f64>) {
        for entry in self.entries.values_mut() {
            entry.down_multicast_total = entry
                .network_id
                .and_then(|network| network_totals.get(&network))
                .copied()
                .unwrap_or(0.0);
            entry.down_total = entry.down_unicast_total + entry.down_multicast_total;
        }
    }

    pub fn apply_cir(&mut self, cir: &BTreeMap<u32, CirTotals>) {
        for (id, totals) in cir {
            let Some(entry) = self.entries.get_mut(id) else {
                continue;
            };
            entry.up_cir = totals.up;
            entry.down_cir = totals.down;
        }
    }

    pub fn apply_percentiles(&mut self, percentiles: &BTreeMap<u32, PercentileResult>) {
        for (id, result) in percentiles {
            let Some(entry) = self.entries.get_mut(id) else {
                continue;
            };
            entry.up_percentile_speed = result.up;
            entry.down_percentile_speed = result.down;
            entry.percentile_issues = result.issues.clone();
        }
    }

    /// Derive average speed and utilization, then hand out the entries.
    pub fn finalize(self, window: &TimeWindow) -> Vec<ReportEntry> {
        let seconds = window.seconds();

        self.entries
            .into_values()
            .map(|mut entry| {
                entry.up_average_speed = RateUtil::average_kbps(entry.up_total, seconds);
                entry.down_average_speed = RateUtil::average_kbps(entry.down_total, seconds);
                entry.up_utilization = if entry.has_percentile_issue(Direction::Upstream) {
                    None
                } else {
                    RateUtil::utilization_percent(entry.up_percentile_speed, entry.up_mir)
                };
                entry.down_utilization = if entry.has_percentile_issue(Direction::Downstream) {
                    None
                } else {
                    RateUtil::utilization_percent(entry.down_percentile_speed, entry.down_mir)
                };
                entry
            })
            .collect()
    }
}
