use core::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

const NANOS_PER_MILLI: u64 = 1_000_000;

/// Running count and cumulative duration of completed work.
///
/// Both fields are updated together under a single lock so that a
/// [`StatsSnapshot`] always describes a state that actually existed.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    inner: Mutex<StatsSnapshot>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed unit of work that took `duration`.
    pub fn record(&self, duration: Duration) {
        let nanos = saturating_nanos(duration);
        let mut inner = self.inner.lock();
        inner.count += 1;
        inner.cumulative_nanos = inner.cumulative_nanos.saturating_add(nanos);
    }

    /// Returns a consistent copy of the count and cumulative duration.
    pub fn snapshot(&self) -> StatsSnapshot {
        *self.inner.lock()
    }
}

/// A point-in-time view of a [`StatsAggregator`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    count: u64,
    cumulative_nanos: u64,
}

impl StatsSnapshot {
    /// Number of completed units of work.
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Sum of all recorded durations.
    pub const fn cumulative(&self) -> Duration {
        Duration::from_nanos(self.cumulative_nanos)
    }

    /// Mean duration expressed as a whole number of `unit`s.
    ///
    /// Uses integer division throughout, so the result is truncated: an
    /// average of 1.5ms reports as `1` in milliseconds and `0` in seconds.
    /// Returns `0` when nothing has been recorded or `unit` is zero.
    pub fn average_in(&self, unit: Duration) -> u64 {
        let unit_nanos = saturating_nanos(unit);
        if self.count == 0 || unit_nanos == 0 {
            return 0;
        }
        self.cumulative_nanos / self.count / unit_nanos
    }

    /// Converts the snapshot into the report served to clients, with the
    /// average in milliseconds.
    pub fn report(&self) -> StatsReport {
        StatsReport {
            total: self.count,
            average: self.average_in(Duration::from_nanos(NANOS_PER_MILLI)),
        }
    }
}

/// Client-facing statistics: total completed work and the truncated average
/// compute time in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatsReport {
    pub total: u64,
    pub average: u64,
}

/// Whole nanoseconds in `duration`, clamped to `u64::MAX`.
pub(crate) fn saturating_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::scope;

    #[test]
    fn empty_stats_report_zero() {
        let stats = StatsAggregator::new();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.count(), 0);
        assert_eq!(snapshot.average_in(Duration::from_millis(1)), 0);
        assert_eq!(snapshot.report(), StatsReport::default());
    }

    #[test]
    fn oversized_durations_saturate() {
        assert_eq!(saturating_nanos(Duration::from_millis(3)), 3_000_000);
        assert_eq!(saturating_nanos(Duration::MAX), u64::MAX);

        let stats = StatsAggregator::new();
        stats.record(Duration::MAX);
        stats.record(Duration::from_secs(1));
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.count(), 2);
        assert_eq!(snapshot.cumulative(), Duration::from_nanos(u64::MAX));
    }

    #[test]
    fn average_is_truncated_not_rounded() {
        let stats = StatsAggregator::new();
        stats.record(Duration::from_millis(1));
        stats.record(Duration::from_millis(2));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.count(), 2);
        assert_eq!(snapshot.cumulative(), Duration::from_millis(3));
        assert_eq!(snapshot.average_in(Duration::from_secs(1)), 0);
        assert_eq!(snapshot.average_in(Duration::from_millis(1)), 1);
        assert_eq!(snapshot.average_in(Duration::from_micros(1)), 1_500);
    }

    #[test]
    fn sub_millisecond_work_reports_zero_average() {
        let stats = StatsAggregator::new();
        for _ in 0..10 {
            stats.record(Duration::from_micros(40));
        }
        assert_eq!(stats.snapshot().report(), StatsReport { total: 10, average: 0 });
    }

    #[test]
    fn report_serializes_with_pascal_case_fields() {
        let report = StatsReport { total: 3, average: 12 };
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"Total":3,"Average":12}"#);
    }

    #[test]
    fn snapshots_are_never_torn() {
        const THREADS: u64 = 4;
        const PER_THREAD: u64 = 1_000;

        // Every recorded duration is exactly 1ms, so any consistent snapshot
        // has a cumulative duration of exactly `count` milliseconds.
        let stats = StatsAggregator::new();
        scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    for _ in 0..PER_THREAD {
                        stats.record(Duration::from_millis(1));
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..PER_THREAD {
                    let snapshot = stats.snapshot();
                    assert_eq!(
                        snapshot.cumulative(),
                        Duration::from_millis(snapshot.count())
                    );
                }
            });
        });

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.count(), THREADS * PER_THREAD);
        assert_eq!(snapshot.report().average, 1);
    }
}
