/// Bits per byte; archive volumes are kilobytes, reported speeds kilobits.
pub const BITS_PER_BYTE: f64 = 8.0;

/// NMS CIR values are bits per second, reports use kilobits per second.
pub const BPS_PER_KBPS: f64 = 1000.0;

pub struct RateUtil;

impl RateUtil {
    #[inline]
    pub fn kbytes_to_kbits(kbytes: f64) -> f64 {
        kbytes * BITS_PER_BYTE
    }

    #[inline]
    pub fn bps_to_kbps(bps: f64) -> f64 {
        bps / BPS_PER_KBPS
    }

    /// Mean speed (kbit/s) of `total_kbytes` spread over `seconds`; 0 for an empty window.
    #[inline]
    pub fn average_kbps(total_kbytes: f64, seconds: i64) -> f64 {
        if seconds <= 0 {
            return 0.0;
        }
        Self::kbytes_to_kbits(total_kbytes / seconds as f64)
    }

    /// Share of `limit_kbps` used by `speed_kbps`, in percent.
    ///
    /// `None` when the limit is zero: the terminal has no usable rate limit.
    #[inline]
    pub fn utilization_percent(speed_kbps: f64, limit_kbps: f64) -> Option<f64> {
        if limit_kbps == 0.0 {
            return None;
        }
        Some(speed_kbps / limit_kbps * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_over_an_hour() {
        // 10_800 kB in one hour = 3 kB/s = 24 kbit/s
        assert_eq!(RateUtil::average_kbps(10_800.0, 3600), 24.0);
        assert_eq!(RateUtil::average_kbps(10_800.0, 0), 0.0);
    }

    #[test]
    fn utilization_needs_a_limit() {
        assert_eq!(RateUtil::utilization_percent(512.0, 2048.0), Some(25.0));
        assert_eq!(RateUtil::utilization_percent(512.0, 0.0), None);
        assert_eq!(RateUtil::utilization_percent(0.0, 1024.0), Some(0.0));
    }

    #[test]
    fn unit_conversions() {
        assert_eq!(RateUtil::kbytes_to_kbits(1.5), 12.0);
        assert_eq!(RateUtil::bps_to_kbps(256_000.0), 256.0);
    }
}
