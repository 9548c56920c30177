//! A hosted [`r3_ptl::Kernel`] implementation: one real OS thread per task,
//! condvar-based notification slots, and an [`std::time::Instant`]-derived
//! millisecond tick clock.
//!
//! This is the testing/demonstration port for `r3_ptl`, the same role
//! `r3_port_std` plays for this crate's kernel lineage: not a production
//! target, a hosted stand-in used to exercise the scheduling logic under
//! real concurrency. See `DESIGN.md` for what is and isn't carried over
//! from `r3_port_std`'s own hosted port (in particular, its user-mode
//! `ums` thread-group scheduler and remote-thread-suspend primitives are
//! not reproduced here -- see that entry for why).
//!
//! **Known limitation:** this port never calls
//! [`r3_ptl::Engine::track_idle_entry`]/[`r3_ptl::Engine::track_idle_exit`].
//! There is no single idle task here to hook a context-switch callback
//! onto -- every `r3_ptl` task is an independently-scheduled OS thread, so
//! `idle_time` stays `0` and `cpu_utilization`/`system_overhead` always
//! read as full load. See `DESIGN.md`, "Idle accounting is not wired on
//! this port".

mod clock;
mod niceness;
mod registry;

pub use registry::{StdKernel, TaskId};

/// Install `env_logger` as the global logger, matching `r3_port_std`'s own
/// convention of bundling `env_logger` for its hosted port and test binaries.
/// Safe to call more than once; only the first call takes effect.
pub fn install_logger() {
    let _ = env_logger::builder().is_test(false).try_init();
}
