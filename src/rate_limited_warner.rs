//! Rate-limited warnings about discarded events and reports.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::warn;

/// Default interval between warnings from one warner.
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(5);

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Counts discarded items and logs at most one warning per interval.
///
/// The warning reads `cloudlog: <what>; discarded <n>` where `n` is the number
/// of items discarded since the previous warning. The first drop is reported
/// straight away.
pub struct RateLimitedWarner {
    what: &'static str,
    interval_secs: u64,
    last_warn: AtomicU64,
    dropped: AtomicU64,
}

impl RateLimitedWarner {
    pub fn new(what: &'static str, interval: Duration) -> Self {
        let interval_secs = interval.as_secs();
        Self {
            what,
            interval_secs,
            last_warn: AtomicU64::new(now_secs().saturating_sub(interval_secs)),
            dropped: AtomicU64::new(0),
        }
    }

    /// Warner using [`DEFAULT_WARN_INTERVAL`].
    pub fn with_default_interval(what: &'static str) -> Self {
        Self::new(what, DEFAULT_WARN_INTERVAL)
    }

    /// Count one discarded item. Returns the count reported if a warning was
    /// logged.
    pub fn record_drop(&self) -> Option<u64> {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        let now = now_secs();
        let prev = self.last_warn.load(Ordering::Relaxed);
        if now.saturating_sub(prev) < self.interval_secs {
            return None;
        }
        self.last_warn.store(now, Ordering::Relaxed);
        self.emit()
    }

    /// Report anything discarded since the last warning, regardless of the
    /// interval.
    pub fn flush(&self) -> Option<u64> {
        let reported = self.emit();
        if reported.is_some() {
            self.last_warn.store(now_secs(), Ordering::Relaxed);
        }
        reported
    }

    fn emit(&self) -> Option<u64> {
        let count = self.dropped.swap(0, Ordering::Relaxed);
        if count == 0 {
            return None;
        }
        warn!("cloudlog: {}; discarded {count}", self.what);
        Some(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn first_drop_is_reported_immediately() {
        let warner = RateLimitedWarner::with_default_interval("queue full");
        assert_eq!(warner.record_drop(), Some(1));
    }

    #[rstest]
    fn later_drops_wait_for_the_interval() {
        let warner = RateLimitedWarner::new("queue full", Duration::from_secs(60));
        assert_eq!(warner.record_drop(), Some(1));
        assert_eq!(warner.record_drop(), None);
        assert_eq!(warner.record_drop(), None);
        assert_eq!(warner.flush(), Some(2));
        assert_eq!(warner.flush(), None);
    }

    #[rstest]
    fn zero_interval_reports_every_drop() {
        let warner = RateLimitedWarner::new("reports full", Duration::ZERO);
        assert_eq!(warner.record_drop(), Some(1));
        assert_eq!(warner.record_drop(), Some(1));
    }
}
