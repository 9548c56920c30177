//! Fixed-capacity circular trace log.
//!
//! Producer-safe under the kernel's critical section (which stands in for
//! the "interrupt-safe" requirement of the spec this crate implements --
//! see [`Kernel::critical_section`]); consulted on demand by
//! [`crate::stats::reduce`] and the human-readable dump in
//! [`crate::print`].

use core::sync::atomic::{AtomicBool, Ordering};

use crate::cell::GuardedCell;
use crate::config::TRACE_CAPACITY;
use crate::kernel::{Kernel, Tick};

/// One entry in the closed set of events the trace ring can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    Release,
    Start,
    Complete,
    DeadlineMiss,
    OverrunSkip,
    OverrunKill,
    OverrunCatchUp,
    SwitchIn,
    SwitchOut,
    IdleStart,
    IdleEnd,
}

impl TraceEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            TraceEvent::Release => "RELEASE",
            TraceEvent::Start => "START",
            TraceEvent::Complete => "COMPLETE",
            TraceEvent::DeadlineMiss => "DEADLINE_MISS",
            TraceEvent::OverrunSkip => "OVERRUN_SKIP",
            TraceEvent::OverrunKill => "OVERRUN_KILL",
            TraceEvent::OverrunCatchUp => "OVERRUN_CATCHUP",
            TraceEvent::SwitchIn => "SWITCH_IN",
            TraceEvent::SwitchOut => "SWITCH_OUT",
            TraceEvent::IdleStart => "IDLE_START",
            TraceEvent::IdleEnd => "IDLE_END",
        }
    }

    pub(crate) fn is_overrun(self) -> bool {
        matches!(
            self,
            TraceEvent::OverrunSkip | TraceEvent::OverrunKill | TraceEvent::OverrunCatchUp
        )
    }
}

/// One recorded trace entry: `{task_name_ref, event_tag, timestamp}`.
#[derive(Debug, Clone, Copy)]
pub struct TraceRecord {
    pub task_name: &'static str,
    pub event: TraceEvent,
    pub timestamp: Tick,
}

impl TraceRecord {
    const PLACEHOLDER: Self = Self {
        task_name: "",
        event: TraceEvent::Release,
        timestamp: 0,
    };
}

/// A `[start, start+count)` view into the ring, captured atomically.
///
/// Re-reducing the same snapshot is idempotent: the snapshot owns no
/// reference into the ring's live write cursor, only the bounds it
/// observed.
#[derive(Debug, Clone, Copy)]
pub struct TraceSnapshot {
    start: usize,
    count: usize,
}

impl TraceSnapshot {
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

struct Inner {
    records: [TraceRecord; TRACE_CAPACITY],
    write_index: usize,
    wrapped: bool,
    last_idle_entry: Tick,
    idle_total: Tick,
}

impl Inner {
    const fn new() -> Self {
        Self {
            records: [TraceRecord::PLACEHOLDER; TRACE_CAPACITY],
            write_index: 0,
            wrapped: false,
            last_idle_entry: 0,
            idle_total: 0,
        }
    }
}

/// The trace ring itself. One instance lives inside [`crate::Engine`].
pub struct TraceRing<K> {
    inner: GuardedCell<Inner>,
    /// Whether events are actually recorded. Set once by `init` from
    /// [`crate::GlobalConfig::tracing_enabled`]; defaults to enabled so a
    /// ring built directly (as this crate's own unit tests do) behaves as
    /// before without an explicit opt-in call.
    enabled: AtomicBool,
    _kernel: core::marker::PhantomData<fn() -> K>,
}

impl<K: Kernel> TraceRing<K> {
    pub(crate) const fn new() -> Self {
        Self {
            inner: GuardedCell::new(Inner::new()),
            enabled: AtomicBool::new(true),
            _kernel: core::marker::PhantomData,
        }
    }

    /// Reset the ring to empty. Called by `init` when tracing is enabled.
    pub(crate) fn reset(&self) {
        K::critical_section(|| {
            // Safety: critical section held.
            *unsafe { self.inner.get_mut() } = Inner::new();
        });
    }

    /// Set whether events are recorded at all. Called once by `init` from
    /// [`crate::GlobalConfig::tracing_enabled`].
    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Record one event at the current tick. A no-op when tracing is
    /// disabled.
    pub fn log_event(&self, task_name: &'static str, event: TraceEvent, timestamp: Tick) {
        if !self.is_enabled() {
            return;
        }
        K::critical_section(|| {
            // Safety: critical section held.
            let inner = unsafe { self.inner.get_mut() };
            inner.records[inner.write_index] = TraceRecord {
                task_name,
                event,
                timestamp,
            };
            inner.write_index += 1;
            if inner.write_index == TRACE_CAPACITY {
                inner.write_index = 0;
                inner.wrapped = true;
            }
        });
        log::trace!("[{timestamp}] {task_name} {event:?}");
    }

    /// Record the idle task being scheduled in. A no-op when tracing is
    /// disabled.
    pub fn track_idle_entry(&self, timestamp: Tick) {
        if !self.is_enabled() {
            return;
        }
        K::critical_section(|| {
            // Safety: critical section held.
            unsafe { self.inner.get_mut() }.last_idle_entry = timestamp;
        });
        self.log_event("PTL-idle", TraceEvent::IdleStart, timestamp);
    }

    /// Record the idle task being scheduled out. A no-op when tracing is
    /// disabled.
    pub fn track_idle_exit(&self, timestamp: Tick) {
        if !self.is_enabled() {
            return;
        }
        K::critical_section(|| {
            // Safety: critical section held.
            let inner = unsafe { self.inner.get_mut() };
            if timestamp >= inner.last_idle_entry {
                inner.idle_total += timestamp - inner.last_idle_entry;
            }
        });
        self.log_event("PTL-idle", TraceEvent::IdleEnd, timestamp);
    }

    pub(crate) fn idle_total(&self) -> Tick {
        K::critical_section(|| unsafe { self.inner.get() }.idle_total)
    }

    /// Capture the currently-readable range of the ring.
    pub fn snapshot(&self) -> TraceSnapshot {
        K::critical_section(|| {
            // Safety: critical section held.
            let inner = unsafe { self.inner.get() };
            if inner.wrapped {
                TraceSnapshot {
                    start: inner.write_index,
                    count: TRACE_CAPACITY,
                }
            } else {
                TraceSnapshot {
                    start: 0,
                    count: inner.write_index,
                }
            }
        })
    }

    /// Read the `i`-th record (`0 <= i < snapshot.len()`) of a previously
    /// captured snapshot, in chronological order.
    pub fn record_at(&self, snapshot: TraceSnapshot, i: usize) -> TraceRecord {
        assert!(i < snapshot.count, "trace snapshot index out of range");
        let index = (snapshot.start + i) % TRACE_CAPACITY;
        K::critical_section(|| unsafe { self.inner.get() }.records[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestKernel;

    #[test]
    fn snapshot_before_wrap_starts_at_zero() {
        let ring = TraceRing::<TestKernel>::new();
        for i in 0..5 {
            ring.log_event("t", TraceEvent::Start, i as Tick);
        }
        let snap = ring.snapshot();
        assert_eq!(snap.len(), 5);
        assert_eq!(ring.record_at(snap, 0).timestamp, 0);
        assert_eq!(ring.record_at(snap, 4).timestamp, 4);
    }

    #[test]
    fn wrap_keeps_exactly_capacity_records_and_drops_the_rest() {
        let ring = TraceRing::<TestKernel>::new();
        for i in 0..(TRACE_CAPACITY + 3) {
            ring.log_event("t", TraceEvent::Release, i as Tick);
        }
        let snap = ring.snapshot();
        assert_eq!(snap.len(), TRACE_CAPACITY);
        // The first 3 writes (timestamps 0, 1, 2) were overwritten.
        assert_eq!(ring.record_at(snap, 0).timestamp, 3);
        assert_eq!(ring.record_at(snap, snap.len() - 1).timestamp, (TRACE_CAPACITY + 2) as Tick);
    }

    #[test]
    fn reset_clears_the_wrapped_flag() {
        let ring = TraceRing::<TestKernel>::new();
        for i in 0..(TRACE_CAPACITY + 1) {
            ring.log_event("t", TraceEvent::Release, i as Tick);
        }
        assert_eq!(ring.snapshot().len(), TRACE_CAPACITY);
        ring.reset();
        assert_eq!(ring.snapshot().len(), 0);
    }

    #[test]
    fn idle_accounting_accumulates_only_forward_intervals() {
        let ring = TraceRing::<TestKernel>::new();
        ring.track_idle_entry(10);
        ring.track_idle_exit(15);
        ring.track_idle_entry(20);
        ring.track_idle_exit(20);
        assert_eq!(ring.idle_total(), 5);
    }

    #[test]
    fn idle_exit_before_entry_timestamp_is_ignored() {
        let ring = TraceRing::<TestKernel>::new();
        ring.track_idle_entry(10);
        // A timestamp earlier than the entry (clock oddity) must not
        // underflow the accumulator.
        ring.track_idle_exit(5);
        assert_eq!(ring.idle_total(), 0);
    }

    #[test]
    fn disabling_tracing_suppresses_writes_and_idle_accounting() {
        let ring = TraceRing::<TestKernel>::new();
        ring.set_enabled(false);
        ring.log_event("t", TraceEvent::Release, 1);
        ring.track_idle_entry(2);
        ring.track_idle_exit(5);
        assert_eq!(ring.snapshot().len(), 0);
        assert_eq!(ring.idle_total(), 0);

        ring.set_enabled(true);
        ring.log_event("t", TraceEvent::Release, 10);
        assert_eq!(ring.snapshot().len(), 1);
    }
}
