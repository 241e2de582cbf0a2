use chrono::{DateTime, Duration, Utc};

use crate::core::persistence::stats::tier::{Tier, TierSlice};
use crate::domain::common::model::TimeWindow;

/// Retention offsets (relative to now) separating the three tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierBoundaries {
    /// Raw samples are kept for this long.
    pub raw_retention: Duration,
    /// Minute rollups cover everything newer than this (and older than raw).
    pub minute_retention: Duration,
}

impl Default for TierBoundaries {
    fn default() -> Self {
        Self {
            raw_retention: Duration::hours(24),
            minute_retention: Duration::hours(744),
        }
    }
}

impl TierBoundaries {
    pub fn from_hours(raw_hours: u32, minute_hours: u32) -> Self {
        Self {
            raw_retention: Duration::hours(i64::from(raw_hours)),
            minute_retention: Duration::hours(i64::from(minute_hours)),
        }
    }

    /// `[lower, upper)` of `tier` at `now`; `None` means unbounded.
    pub fn range(
        &self,
        tier: Tier,
        now: DateTime<Utc>,
    ) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let raw_floor = now - self.raw_retention;
        let minute_floor = now - self.minute_retention;

        match tier {
            Tier::Hour => (None, Some(minute_floor)),
            Tier::Minute => (Some(minute_floor), Some(raw_floor)),
            Tier::Raw => (Some(raw_floor), None),
        }
    }
}

/// Split `window` over the tiers that hold its data at `now`.
///
/// Slices come back ordered Hour, Minute, Raw; they are non-empty, pairwise
/// disjoint and together cover exactly the window. An empty window yields nothing.
pub fn select_tiers(
    window: &TimeWindow,
    now: DateTime<Utc>,
    boundaries: &TierBoundaries,
) -> Vec<TierSlice> {
    if window.is_empty() {
        return Vec::new();
    }

    Tier::ALL
        .iter()
        .filter_map(|&tier| {
            let (lower, upper) = boundaries.range(tier, now);
            window
                .clip(lower, upper)
                .map(|sub_window| TierSlice::new(tier, sub_window))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn window_inside_raw_is_one_slice() {
        let window = TimeWindow::new(now() - Duration::hours(3), now() - Duration::hours(1));
        let slices = select_tiers(&window, now(), &TierBoundaries::default());

        assert_eq!(slices, vec![TierSlice::new(Tier::Raw, window)]);
    }

    #[test]
    fn window_inside_minute_is_one_slice() {
        let window = TimeWindow::new(now() - Duration::days(10), now() - Duration::days(2));
        let slices = select_tiers(&window, now(), &TierBoundaries::default());

        assert_eq!(slices, vec![TierSlice::new(Tier::Minute, window)]);
    }

    #[test]
    fn window_spanning_all_tiers_keeps_minute() {
        let window = TimeWindow::new(now() - Duration::days(40), now());
        let slices = select_tiers(&window, now(), &TierBoundaries::default());

        let minute_floor = now() - Duration::hours(744);
        let raw_floor = now() - Duration::hours(24);
        assert_eq!(
            slices,
            vec![
                TierSlice::new(Tier::Hour, TimeWindow::new(window.start, minute_floor)),
                TierSlice::new(Tier::Minute, TimeWindow::new(minute_floor, raw_floor)),
                TierSlice::new(Tier::Raw, TimeWindow::new(raw_floor, now())),
            ]
        );
    }

    #[test]
    fn boundary_instant_belongs_to_newer_tier() {
        let raw_floor = now() - Duration::hours(24);
        let window = TimeWindow::new(raw_floor, raw_floor + Duration::minutes(1));
        let slices = select_tiers(&window, now(), &TierBoundaries::default());

        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].tier, Tier::Raw);
    }

    #[test]
    fn future_window_is_raw() {
        let window = TimeWindow::new(now() + Duration::hours(1), now() + Duration::hours(2));
        let slices = select_tiers(&window, now(), &TierBoundaries::default());

        assert_eq!(slices, vec![TierSlice::new(Tier::Raw, window)]);
    }

    #[test]
    fn empty_or_inverted_window_selects_nothing() {
        let boundaries = TierBoundaries::default();
        let empty = TimeWindow::new(now(), now());
        let inverted = TimeWindow::new(now(), now() - Duration::days(3));

        assert!(select_tiers(&empty, now(), &boundaries).is_empty());
        assert!(select_tiers(&inverted, now(), &boundaries).is_empty());
    }

    #[test]
    fn custom_retention_moves_boundaries() {
        let boundaries = TierBoundaries::from_hours(48, 96);
        let window = TimeWindow::new(now() - Duration::hours(72), now() - Duration::hours(36));
        let slices = select_tiers(&window, now(), &boundaries);

        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].tier, Tier::Minute);
        assert_eq!(slices[0].window.end, now() - Duration::hours(48));
        assert_eq!(slices[1].tier, Tier::Raw);
    }

    proptest! {
        #[test]
        fn slices_partition_the_window(
            start_offset in -2_000i64..100,
            length in 1i64..2_500,
        ) {
            let start = now() + Duration::hours(start_offset);
            let window = TimeWindow::new(start, start + Duration::hours(length));
            let slices = select_tiers(&window, now(), &TierBoundaries::default());

            prop_assert!(!slices.is_empty());
            prop_assert!(slices.len() <= 3);
            prop_assert_eq!(slices[0].window.start, window.start);
            prop_assert_eq!(slices[slices.len() - 1].window.end, window.end);

            for slice in &slices {
                prop_assert!(!slice.window.is_empty());
            }
            for pair in slices.windows(2) {
                // adjacent and ordered oldest first
                prop_assert!(pair[0].tier < pair[1].tier);
                prop_assert_eq!(pair[0].window.end, pair[1].window.start);
            }

            let covered: i64 = slices.iter().map(|s| s.window.seconds()).sum();
            prop_assert_eq!(covered, window.seconds());
        }

        #[test]
        fn window_inside_a_single_tier_is_untouched(
            start_offset in -720i64..-24,
            length in 1i64..24,
        ) {
            let start = now() + Duration::hours(start_offset);
            let end = (start + Duration::hours(length)).min(now() - Duration::hours(24));
            prop_assume!(end > start);
            let window = TimeWindow::new(start, end);

            let slices = select_tiers(&window, now(), &TierBoundaries::default());
            prop_assert_eq!(slices, vec![TierSlice::new(Tier::Minute, window)]);
        }
    }
}
