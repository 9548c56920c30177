//! Human-readable trace and statistics dumps (spec §6).
//!
//! Routed through the `log` crate at `info` level rather than a raw byte
//! sink: this crate has no serial-port abstraction of its own, and every
//! port in this family already owns one via its logger backend (see
//! `r3_ptl_port_std`, which installs `env_logger`).

use crate::kernel::Kernel;
use crate::stats::TraceStatistics;
use crate::trace::{TraceEvent, TraceRing};

/// The supervisor's reserved task-name prefix. Records tagged with it are
/// filtered out of the human-readable dump when the event is a context
/// switch, per spec §6.
const RESERVED_PREFIX: &str = "PTL";

/// Print one line per trace record, chronologically, in the form
/// `[<5-digit tick> ms] <name, left-padded to 10> <EVENT>`.
pub(crate) fn print_trace<K: Kernel>(ring: &TraceRing<K>) {
    let snapshot = ring.snapshot();
    for i in 0..snapshot.len() {
        let record = ring.record_at(snapshot, i);
        if record.task_name.starts_with(RESERVED_PREFIX)
            && matches!(record.event, TraceEvent::SwitchIn | TraceEvent::SwitchOut)
        {
            continue;
        }
        log::info!(
            "[{:>5} ms] {:>10} {}",
            record.timestamp,
            record.task_name,
            record.event.as_str()
        );
    }
}

/// Print the fixed-order statistics summary, annotated per spec §6.
pub(crate) fn print_statistics(stats: &TraceStatistics) {
    let utilization = stats.cpu_utilization() * 100.0;
    let overhead = stats.system_overhead() * 100.0;

    log::info!("total releases:    {}", stats.releases);
    log::info!("total completions: {}", stats.completions);
    log::info!("deadline misses:   {}", stats.deadline_misses);
    log::info!("overruns:          {}", stats.overruns);
    log::info!("total time:        {} ms", stats.total_time);
    log::info!("idle time:         {} ms", stats.idle_time);
    log::info!("CPU utilization:   {utilization:.2}%");
    log::info!("system overhead:   {overhead:.2}% {}", overhead_annotation(utilization, overhead));
}

/// The annotation appended to the system-overhead line, per spec §6:
/// `N/A (low CPU load)` below 50% utilization, else `[OK]` at or under a
/// 10% overhead budget, else a failure marker.
fn overhead_annotation(utilization_pct: f64, overhead_pct: f64) -> &'static str {
    if utilization_pct < 50.0 {
        "N/A (low CPU load)"
    } else if overhead_pct <= 10.00 {
        "[OK]"
    } else {
        "[FAIL - Required <=10%]"
    }
}

#[cfg(test)]
mod tests {
    use super::overhead_annotation;

    #[test]
    fn low_utilization_is_not_applicable() {
        assert_eq!(overhead_annotation(49.99, 0.0), "N/A (low CPU load)");
    }

    #[test]
    fn overhead_at_the_ten_percent_boundary_passes() {
        assert_eq!(overhead_annotation(100.0, 10.00), "[OK]");
    }

    #[test]
    fn overhead_just_over_the_boundary_fails() {
        assert_eq!(overhead_annotation(100.0, 10.01), "[FAIL - Required <=10%]");
    }
}
