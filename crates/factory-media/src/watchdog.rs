//! Output-growth watchdog: detects a stuck render purely
//! from how its output file size moves over time, with no process
//! handle — the orchestrator samples file size on an interval and feeds
//! it here.

use std::time::Duration;

/// Tracks a render's output file size against `grace_sec`/`idle_sec`/
/// `min_delta_bytes` to decide whether it is stuck.
///
/// `grace_sec` gives the renderer time to produce its first bytes before
/// the watchdog starts judging it; after that, any `idle_sec` window with
/// less than `min_delta_bytes` of growth means the render is stuck.
#[derive(Debug, Clone)]
pub struct GrowthWatchdog {
    grace: Duration,
    idle: Duration,
    min_delta_bytes: u64,
    started_at: Duration,
    last_bytes: u64,
    last_growth_at: Duration,
}

impl GrowthWatchdog {
    pub fn new(grace_sec: u64, idle_sec: u64, min_delta_bytes: u64) -> Self {
        Self {
            grace: Duration::from_secs(grace_sec),
            idle: Duration::from_secs(idle_sec),
            min_delta_bytes,
            started_at: Duration::ZERO,
            last_bytes: 0,
            last_growth_at: Duration::ZERO,
        }
    }

    /// Feeds a `(now, current_output_bytes)` sample. Returns `true` once
    /// the elapsed idle window without sufficient growth exceeds `idle_sec`
    /// and the grace period has passed.
    pub fn sample(&mut self, now: Duration, bytes: u64) -> bool {
        if self.started_at == Duration::ZERO {
            self.started_at = now;
            self.last_growth_at = now;
            self.last_bytes = bytes;
            return false;
        }

        if bytes.saturating_sub(self.last_bytes) >= self.min_delta_bytes {
            self.last_bytes = bytes;
            self.last_growth_at = now;
            return false;
        }

        if now.saturating_sub(self.started_at) < self.grace {
            return false;
        }

        now.saturating_sub(self.last_growth_at) >= self.idle
    }

    pub fn last_bytes(&self) -> u64 {
        self.last_bytes
    }

    pub fn last_growth_at(&self) -> Duration {
        self.last_growth_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_stuck_while_growing() {
        let mut w = GrowthWatchdog::new(0, 10, 1024);
        assert!(!w.sample(Duration::from_secs(0), 0));
        assert!(!w.sample(Duration::from_secs(5), 10_000));
        assert!(!w.sample(Duration::from_secs(10), 20_000));
    }

    #[test]
    fn stuck_after_idle_window_with_no_growth() {
        let mut w = GrowthWatchdog::new(0, 10, 1024);
        assert!(!w.sample(Duration::from_secs(0), 1000));
        assert!(!w.sample(Duration::from_secs(5), 1000));
        assert!(w.sample(Duration::from_secs(11), 1000));
    }

    #[test]
    fn grace_period_suppresses_early_triggers() {
        let mut w = GrowthWatchdog::new(30, 10, 1024);
        assert!(!w.sample(Duration::from_secs(0), 0));
        // still within grace at t=15, even though idle would otherwise fire
        assert!(!w.sample(Duration::from_secs(15), 0));
    }

    #[test]
    fn sub_threshold_growth_does_not_reset_idle_clock() {
        let mut w = GrowthWatchdog::new(0, 10, 1024);
        assert!(!w.sample(Duration::from_secs(0), 0));
        // grows, but less than min_delta_bytes: doesn't count as growth
        assert!(!w.sample(Duration::from_secs(5), 100));
        assert!(w.sample(Duration::from_secs(11), 100));
    }
}
