//! Minimal [`Kernel`] impl for this crate's own unit tests.
//!
//! The registry validation, trace ring and statistics reducer are all pure
//! logic over data the caller already holds; they don't need a working
//! scheduler, only *some* type to be generic over. The scheduling loops
//! themselves (supervisor/wrapper) are exercised end to end against a real
//! scheduler instead, in `r3_ptl_port_std`'s integration tests.

use std::cell::Cell;

use crate::kernel::{Kernel, Tick};

thread_local! {
    static TICK: Cell<Tick> = const { Cell::new(0) };
}

pub(crate) struct TestKernel;

impl Kernel for TestKernel {
    type TaskId = usize;

    fn now() -> Tick {
        TICK.with(|t| t.get())
    }

    fn spawn_task(_priority: u8, _stack_size: usize, _entry: fn(usize), _arg: usize) -> usize {
        unimplemented!("this crate's unit tests drive the registry/trace/stats directly")
    }

    fn wait_for_notification() {
        unimplemented!("see spawn_task")
    }

    fn notify(_task: usize) {
        unimplemented!("see spawn_task")
    }

    fn sleep_until(_tick: Tick) {
        unimplemented!("see spawn_task")
    }

    fn critical_section<R>(f: impl FnOnce() -> R) -> R {
        f()
    }

    // Deliberately permissive: ordinary test fixtures use small priorities
    // (1, 2, ...) and expect them to validate as "below the supervisor".
    const SUPERVISOR_PRIORITY: u8 = u8::MAX;
}

#[allow(dead_code)]
pub(crate) fn set_tick(t: Tick) {
    TICK.with(|c| c.set(t));
}
