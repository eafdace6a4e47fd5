//! Running performance statistics.
//!
//! All fields of a sample update happen inside a single critical section, so
//! a snapshot never observes a torn state (for example an incremented error
//! counter paired with a stale mean). Counters are incremented only by the
//! thread that completed the corresponding operation; retry loops in callers
//! therefore cannot double count.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::BusError;

/// Which direction a transaction moved data in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpKind {
    /// Byte or burst read.
    Read,
    /// Byte or burst write.
    Write,
}

/// Value copy of the simulator's aggregate statistics.
///
/// Obtained from [`crate::Simulator::metrics_snapshot`]. The [`fmt::Display`]
/// implementation renders the human-readable performance report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    /// Registers read, counted once per register (bursts count per byte).
    pub total_reads: u64,
    /// Registers written, counted once per register.
    pub total_writes: u64,
    /// Failed operations, including injected faults and lookups of absent
    /// devices.
    pub errors: u64,
    /// Subset of `errors` where the backend reported a stall.
    pub timeouts: u64,
    /// Incremental mean response time over completed operations, in
    /// microseconds.
    pub avg_response_us: f64,
    /// Fastest observed response in microseconds, `u32::MAX` until the first
    /// sample arrives.
    pub min_response_us: u32,
    /// Slowest observed response in microseconds.
    pub max_response_us: u32,
}

impl MetricsSnapshot {
    const fn empty() -> Self {
        Self {
            total_reads: 0,
            total_writes: 0,
            errors: 0,
            timeouts: 0,
            avg_response_us: 0.0,
            min_response_us: u32::MAX,
            max_response_us: 0,
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== bus simulator performance report ===")?;
        writeln!(f, "total reads:       {}", self.total_reads)?;
        writeln!(f, "total writes:      {}", self.total_writes)?;
        writeln!(f, "errors:            {}", self.errors)?;
        writeln!(f, "timeouts:          {}", self.timeouts)?;
        if self.min_response_us == u32::MAX {
            writeln!(f, "min response time: -")?;
        } else {
            writeln!(f, "min response time: {} us", self.min_response_us)?;
        }
        writeln!(f, "avg response time: {:.2} us", self.avg_response_us)?;
        writeln!(f, "max response time: {} us", self.max_response_us)?;
        let ops = self.total_reads + self.total_writes;
        if ops > 0 {
            #[allow(clippy::cast_precision_loss)]
            let error_rate = self.errors as f64 / ops as f64 * 100.0;
            writeln!(f, "error rate:        {error_rate:.2}%")?;
        }
        write!(f, "========================================")
    }
}

struct Inner {
    snapshot: MetricsSnapshot,
    /// Completed operations, the divisor of the incremental mean. Distinct
    /// from the per-register read/write totals.
    samples: u64,
}

/// Thread-safe metrics accumulator owned by the simulator.
pub(crate) struct Metrics {
    inner: Mutex<Inner>,
}

impl Metrics {
    pub(crate) fn new() -> Self {
        Self { inner: Mutex::new(Inner { snapshot: MetricsSnapshot::empty(), samples: 0 }) }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fold one completed operation into the running statistics.
    ///
    /// `registers` is the number of registers the operation touched (bursts
    /// count per byte); it is zero when the device lookup itself failed.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn record(
        &self,
        kind: OpKind,
        registers: u64,
        elapsed: Duration,
        error: Option<&BusError>,
    ) {
        let micros = u32::try_from(elapsed.as_micros()).unwrap_or(u32::MAX);

        let mut inner = self.lock();
        match kind {
            OpKind::Read => inner.snapshot.total_reads += registers,
            OpKind::Write => inner.snapshot.total_writes += registers,
        }

        let n = inner.samples as f64;
        inner.snapshot.avg_response_us = if inner.samples == 0 {
            f64::from(micros)
        } else {
            (inner.snapshot.avg_response_us * n + f64::from(micros)) / (n + 1.0)
        };
        inner.samples += 1;
        inner.snapshot.min_response_us = inner.snapshot.min_response_us.min(micros);
        inner.snapshot.max_response_us = inner.snapshot.max_response_us.max(micros);

        if let Some(err) = error {
            inner.snapshot.errors += 1;
            if matches!(err, BusError::Timeout) {
                inner.snapshot.timeouts += 1;
            }
        }
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        self.lock().snapshot
    }

    /// Zero all counters. The minimum is reinitialized to `u32::MAX` so the
    /// first post-reset sample establishes the new minimum.
    pub(crate) fn reset(&self) {
        let mut inner = self.lock();
        inner.snapshot = MetricsSnapshot::empty();
        inner.samples = 0;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn first_sample_establishes_all_fields() {
        let metrics = Metrics::new();
        metrics.record(OpKind::Read, 1, Duration::from_micros(120), None);

        let s = metrics.snapshot();
        assert_eq!(s.total_reads, 1);
        assert_eq!(s.total_writes, 0);
        assert_eq!(s.errors, 0);
        assert_eq!(s.min_response_us, 120);
        assert_eq!(s.max_response_us, 120);
        assert!((s.avg_response_us - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn error_counts_once_and_timeouts_are_a_subset() {
        let metrics = Metrics::new();
        metrics.record(OpKind::Read, 0, Duration::from_micros(50), Some(&BusError::IoFault));
        metrics.record(OpKind::Write, 1, Duration::from_micros(80), Some(&BusError::Timeout));
        metrics.record(OpKind::Write, 1, Duration::from_micros(10), None);

        let s = metrics.snapshot();
        assert_eq!(s.errors, 2);
        assert_eq!(s.timeouts, 1);
        assert_eq!(s.total_reads, 0, "failed lookup must not count registers");
        assert_eq!(s.total_writes, 2);
    }

    #[test]
    fn reset_reinitializes_min_for_the_next_sample() {
        let metrics = Metrics::new();
        metrics.record(OpKind::Read, 1, Duration::from_micros(5), None);
        metrics.reset();

        let s = metrics.snapshot();
        assert_eq!(s.min_response_us, u32::MAX);
        assert_eq!(s.total_reads, 0);

        metrics.record(OpKind::Read, 1, Duration::from_micros(300), None);
        let s = metrics.snapshot();
        assert_eq!(s.min_response_us, 300);
        assert_eq!(s.max_response_us, 300);
        assert!((s.avg_response_us - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn report_renders_all_lines() {
        let snapshot = MetricsSnapshot {
            total_reads: 120,
            total_writes: 30,
            errors: 3,
            timeouts: 1,
            avg_response_us: 142.5,
            min_response_us: 95,
            max_response_us: 410,
        };
        insta::assert_snapshot!(snapshot.to_string(), @r"
        === bus simulator performance report ===
        total reads:       120
        total writes:      30
        errors:            3
        timeouts:          1
        min response time: 95 us
        avg response time: 142.50 us
        max response time: 410 us
        error rate:        2.00%
        ========================================
        ");
    }

    #[test]
    fn report_before_any_sample_has_no_min_or_rate() {
        let rendered = MetricsSnapshot::empty().to_string();
        assert!(rendered.contains("min response time: -"));
        assert!(!rendered.contains("error rate"));
    }

    proptest! {
        #[test]
        fn min_avg_max_stay_ordered(samples in prop::collection::vec(0u64..10_000, 1..200)) {
            let metrics = Metrics::new();
            for us in &samples {
                metrics.record(OpKind::Read, 1, Duration::from_micros(*us), None);
            }

            let s = metrics.snapshot();
            prop_assert!(f64::from(s.min_response_us) <= s.avg_response_us + 1e-9);
            prop_assert!(s.avg_response_us <= f64::from(s.max_response_us) + 1e-9);
            prop_assert_eq!(s.total_reads, samples.len() as u64);
            prop_assert_eq!(s.errors, 0);
        }
    }
}
