//! The [`StdKernel`] `Kernel` implementation: task registry, notification
//! slots, and the global critical section.

use std::cell::OnceCell;
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::thread;

use slab::Slab;
use spin::Mutex as SpinMutex;

use r3_ptl::{Kernel, Tick};

use crate::clock;
use crate::niceness;

/// Identifies one task spawned through [`StdKernel::spawn_task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskId(usize);

/// A task's single-slot notification primitive: one pending signal,
/// coalesced, woken via a condition variable.
struct NotifySlot {
    notified: Mutex<bool>,
    condvar: Condvar,
}

impl NotifySlot {
    fn new() -> Self {
        Self {
            notified: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    fn wait(&self) {
        let mut notified = self.notified.lock().unwrap();
        while !*notified {
            notified = self.condvar.wait(notified).unwrap();
        }
        *notified = false;
    }

    fn signal(&self) {
        let mut notified = self.notified.lock().unwrap();
        *notified = true;
        self.condvar.notify_one();
    }
}

fn slots() -> &'static Mutex<Slab<Arc<NotifySlot>>> {
    static SLOTS: OnceLock<Mutex<Slab<Arc<NotifySlot>>>> = OnceLock::new();
    SLOTS.get_or_init(|| Mutex::new(Slab::new()))
}

thread_local! {
    static MY_SLOT: OnceCell<Arc<NotifySlot>> = OnceCell::new();
}

/// The global critical section. Guards nothing of this crate's own -- every
/// piece of mutable state `r3_ptl` touches under it lives inside `r3_ptl`
/// itself (see `GuardedCell`) -- it exists purely to give
/// [`Kernel::critical_section`] a real cross-thread mutual-exclusion
/// primitive, the same role `r3_kernel`'s `CpuLockCell` plays for a bare-
/// metal port.
static CRITICAL_SECTION: SpinMutex<()> = SpinMutex::new(());

/// The hosted `r3_ptl::Kernel` implementation. Zero-sized; every task is a
/// genuine OS thread under the host scheduler.
pub struct StdKernel;

impl Kernel for StdKernel {
    type TaskId = TaskId;

    fn now() -> Tick {
        clock::now()
    }

    fn spawn_task(priority: u8, stack_size: usize, entry: fn(usize), arg: usize) -> TaskId {
        let slot = Arc::new(NotifySlot::new());
        let id = slots().lock().unwrap().insert(Arc::clone(&slot));

        thread::Builder::new()
            .name(format!("ptl-task-{id}"))
            .stack_size(stack_size)
            .spawn(move || {
                MY_SLOT.with(|cell| {
                    let _ = cell.set(slot);
                });
                niceness::apply_priority_hint(priority);
                entry(arg);
            })
            .expect("failed to spawn r3_ptl task thread");

        TaskId(id)
    }

    fn wait_for_notification() {
        MY_SLOT.with(|cell| {
            cell.get()
                .expect("wait_for_notification() called from a non-r3_ptl thread")
                .wait();
        });
    }

    fn notify(task: TaskId) {
        let slot = slots().lock().unwrap().get(task.0).cloned();
        if let Some(slot) = slot {
            slot.signal();
        }
    }

    fn sleep_until(tick: Tick) {
        clock::sleep_until(tick);
    }

    fn critical_section<R>(f: impl FnOnce() -> R) -> R {
        let _guard = CRITICAL_SECTION.lock();
        f()
    }

    const SUPERVISOR_PRIORITY: u8 = 0;
}
