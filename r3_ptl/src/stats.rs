//! The offline statistics reducer: one pass over a [`TraceSnapshot`].

use crate::kernel::{Kernel, Tick};
use crate::trace::{TraceEvent, TraceRing};

/// Aggregate counters and timing derived from one pass over the trace ring.
///
/// Re-reducing the same snapshot twice yields an identical
/// `TraceStatistics` -- the reducer has no side effects on the ring.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TraceStatistics {
    pub releases: u32,
    pub completions: u32,
    pub deadline_misses: u32,
    pub overruns: u32,
    pub total_time: Tick,
    pub idle_time: Tick,
}

impl TraceStatistics {
    /// `(total_time - idle_time) / total_time`, or `0` if `total_time == 0`.
    pub fn cpu_utilization(&self) -> f64 {
        if self.total_time == 0 {
            0.0
        } else {
            (self.total_time - self.idle_time) as f64 / self.total_time as f64
        }
    }

    /// `1 - cpu_utilization`. Only meaningful against a known user-work
    /// baseline; see the spec's statistics-dump formatting rules.
    pub fn system_overhead(&self) -> f64 {
        1.0 - self.cpu_utilization()
    }
}

/// Walk the ring's currently-readable range once and reduce it to
/// [`TraceStatistics`].
pub fn reduce<K: Kernel>(ring: &TraceRing<K>) -> TraceStatistics {
    let snapshot = ring.snapshot();
    let mut stats = TraceStatistics {
        idle_time: ring.idle_total(),
        ..Default::default()
    };
    for i in 0..snapshot.len() {
        let record = ring.record_at(snapshot, i);
        match record.event {
            TraceEvent::Release => stats.releases += 1,
            TraceEvent::Complete => stats.completions += 1,
            TraceEvent::DeadlineMiss => stats.deadline_misses += 1,
            event if event.is_overrun() => stats.overruns += 1,
            _ => {}
        }
        stats.total_time = record.timestamp;
    }
    stats
}
