//! Best-effort OS thread-priority hint.
//!
//! `r3_port_std` achieves genuine forced preemption via a platform-specific
//! remote-thread-suspend facility (`threading_unix.rs`/`threading_windows.rs`,
//! built on POSIX signals and `SuspendThread`/`ResumeThread` respectively).
//! This port does not reproduce that: every `r3_ptl` task here is a real OS
//! thread running concurrently under the host scheduler, and the host
//! scheduler -- not this crate -- decides when a thread actually runs.
//!
//! What this module adds is a *hint*: on unix, nudge each task's OS `nice`
//! value in the direction its `r3_ptl` priority suggests (smaller `r3_ptl`
//! priority, i.e. more urgent, maps to a lower/more-favorable nice value).
//! Lowering niceness below the default typically requires a privilege this
//! process may not have (`CAP_SYS_NICE`); failure is silently ignored, as
//! this is advisory only and no testable property in the spec depends on
//! it holding exactly.

/// Nudge the calling thread's niceness in the direction `priority` suggests.
/// Must be called from the task's own thread. Best-effort; errors ignored.
#[cfg(unix)]
pub(crate) fn apply_priority_hint(priority: u8) {
    // r3_ptl priorities run roughly 1..=19 for ordinary tasks (0 is
    // reserved for the supervisor); map directly onto nice's -20..=19
    // range, most urgent (smallest) priority getting the most favorable
    // (smallest) nice value.
    let nice = i32::from(priority).clamp(-20, 19) - 20;
    // Safety: `setpriority` has no preconditions beyond valid arguments.
    // On Linux, `PRIO_PROCESS` with `who == 0` resolves to the calling
    // thread specifically (not the whole thread group), which is exactly
    // the per-task granularity this hint wants.
    unsafe {
        let _ = libc::setpriority(libc::PRIO_PROCESS, 0, nice);
    }
}

#[cfg(not(unix))]
pub(crate) fn apply_priority_hint(_priority: u8) {}
