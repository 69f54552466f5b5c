/// Watches the active external source for silence.
///
/// The monitor is armed with a baseline when an external source becomes
/// active and re-armed on every accepted reading from it. Once it reports
/// expiry it disarms itself, so one silence period yields one fallback.
#[derive(Debug, Clone)]
pub struct StalenessMonitor {
    timeout_ms: u64,
    baseline_ms: Option<u64>,
}

impl StalenessMonitor {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            baseline_ms: None,
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn arm(&mut self, baseline_ms: u64) {
        if self.timeout_ms > 0 {
            self.baseline_ms = Some(baseline_ms);
        }
    }

    pub fn disarm(&mut self) {
        self.baseline_ms = None;
    }

    pub fn is_expired(&self, now_ms: u64, last_update_ms: u64) -> bool {
        self.timeout_ms > 0 && now_ms.saturating_sub(last_update_ms) >= self.timeout_ms
    }

    /// True if `last_update_ms` is recent enough to trust without waiting for
    /// a new reading.
    pub fn is_fresh(&self, now_ms: u64, last_update_ms: u64) -> bool {
        !self.is_expired(now_ms, last_update_ms)
    }

    /// Returns true exactly once per silence period.
    pub fn check(&mut self, now_ms: u64) -> bool {
        let Some(baseline) = self.baseline_ms else {
            return false;
        };
        if self.is_expired(now_ms, baseline) {
            self.baseline_ms = None;
            true
        } else {
            false
        }
    }

    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.baseline_ms
            .map(|baseline| self.timeout_ms.saturating_sub(now_ms.saturating_sub(baseline)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_at_timeout_boundary() {
        let mut monitor = StalenessMonitor::new(30_000);
        monitor.arm(0);

        assert!(!monitor.check(29_999));
        assert!(monitor.check(30_000));
        assert!(!monitor.check(31_000));
        assert!(!monitor.check(120_000));
    }

    #[test]
    fn rearming_moves_the_deadline() {
        let mut monitor = StalenessMonitor::new(30_000);
        monitor.arm(0);
        monitor.arm(20_000);

        assert!(!monitor.check(45_000));
        assert_eq!(monitor.remaining_ms(45_000), Some(5_000));
        assert!(monitor.check(50_000));
    }

    #[test]
    fn zero_timeout_never_arms() {
        let mut monitor = StalenessMonitor::new(0);
        monitor.arm(0);

        assert_eq!(monitor.remaining_ms(0), None);
        assert!(!monitor.check(u64::MAX));
        assert!(monitor.is_fresh(u64::MAX, 0));
    }
}
