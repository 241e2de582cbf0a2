//! Shared domain types (time window, traffic direction)

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Half-open time range `[start, end)`.
///
/// Every report window and every per-tier sub-window uses these semantics, so two
/// adjacent windows never see the same sample row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whole seconds covered by the window, zero for empty windows.
    pub fn seconds(&self) -> i64 {
        self.duration().num_seconds().max(0)
    }

    /// Clip the window to `[lower, upper)`; `None` bounds are unbounded.
    /// Returns `None` when nothing of the window is left.
    pub fn clip(
        &self,
        lower: Option<DateTime<Utc>>,
        upper: Option<DateTime<Utc>>,
    ) -> Option<TimeWindow> {
        let start = match lower {
            Some(lower) => self.start.max(lower),
            None => self.start,
        };
        let end = match upper {
            Some(upper) => self.end.min(upper),
            None => self.end,
        };

        let clipped = TimeWindow { start, end };
        if clipped.is_empty() {
            None
        } else {
            Some(clipped)
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

/// Traffic direction as seen from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Terminal → hub (inroute, `rx_*` columns on the hub side).
    Upstream,
    /// Hub → terminal (outroute, `tx_*` columns on the hub side).
    Downstream,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::Upstream, Direction::Downstream];

    /// Value of the `Direction` column in `nms.VirtualRemote`.
    pub fn from_nms_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Direction::Upstream),
            0 => Some(Direction::Downstream),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upstream => f.write_str("upstream"),
            Direction::Downstream => f.write_str("downstream"),
        }
    }
}
