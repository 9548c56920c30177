//! The task registry: a fixed-size pool of [`TaskSlot`]s, one per
//! registered task, born at [`init`](crate::Ptl::init) and living until
//! program termination.

use core::sync::atomic::{AtomicPtr, Ordering};

use crate::cell::GuardedCell;
use crate::config::{EffectivePolicy, OverrunPolicy, TaskConfig};
use crate::error::InitError;
use crate::kernel::{Kernel, Tick};
use crate::Engine;

/// The mutable, per-job bookkeeping the supervisor and wrapper cooperate
/// on. All access is mediated by [`Kernel::critical_section`] via
/// [`GuardedCell`].
pub(crate) struct TaskRuntime<K: Kernel> {
    pub(crate) handle: Option<K::TaskId>,
    pub(crate) next_release: Tick,
    pub(crate) current_release: Tick,
    pub(crate) is_active: bool,
    pub(crate) deadline_missed: bool,
    pub(crate) jobs_completed: u32,
    pub(crate) deadline_misses: u32,
    pub(crate) overrun_skips: u32,
    pub(crate) overrun_kills: u32,
    pub(crate) overrun_catchups: u32,
    /// Bumped every time KILL recreates this task's wrapper. A wrapper
    /// invocation captures the generation it was spawned with; if its user
    /// job eventually returns after being superseded by a newer
    /// incarnation, it compares generations under the critical section and
    /// quietly exits instead of touching state that no longer belongs to
    /// it. See `DESIGN.md`, "KILL realization without a kernel-level
    /// task-delete primitive".
    pub(crate) generation: u32,
}

impl<K: Kernel> TaskRuntime<K> {
    const fn new() -> Self {
        Self {
            handle: None,
            next_release: 0,
            current_release: 0,
            is_active: false,
            deadline_missed: false,
            jobs_completed: 0,
            deadline_misses: 0,
            overrun_skips: 0,
            overrun_kills: 0,
            overrun_catchups: 0,
            generation: 0,
        }
    }
}

/// A snapshot of one task's externally-visible runtime state, returned by
/// [`crate::Ptl::get_task_list`].
#[derive(Debug, Clone, Copy)]
pub struct TaskStateSnapshot {
    pub name: &'static str,
    pub next_release: Tick,
    pub current_release: Tick,
    pub is_active: bool,
    pub deadline_missed: bool,
}

/// A snapshot of one task's counters, returned by
/// [`crate::Ptl::get_task_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub jobs_completed: u32,
    pub deadline_misses: u32,
    pub overrun_skips: u32,
    pub overrun_kills: u32,
    pub overrun_catchups: u32,
}

/// One registry entry: immutable configuration plus the mutable runtime
/// state behind it.
///
/// `argument = pointer to the slot`, per the spec: once constructed, a
/// `TaskSlot` never moves (it lives inside [`Engine::slots`], a `Vec` built
/// once to its final length and never resized), so `&'static TaskSlot<K>`
/// is sound to hand to the port as a wrapper task's `usize` argument, cast
/// back with [`TaskSlot::from_arg`].
pub struct TaskSlot<K: Kernel> {
    pub index: usize,
    pub config: TaskConfig,
    runtime: GuardedCell<TaskRuntime<K>>,
    /// Set once, immediately after the owning [`Engine`] is placed at its
    /// final `'static` address, and never written again.
    engine: AtomicPtr<Engine<K>>,
}

impl<K: Kernel> TaskSlot<K> {
    fn new(index: usize, config: TaskConfig) -> Self {
        Self {
            index,
            config,
            runtime: GuardedCell::new(TaskRuntime::new()),
            engine: AtomicPtr::new(core::ptr::null_mut()),
        }
    }

    /// # Safety
    /// Must only be called once, after `engine` has reached its final,
    /// permanent address.
    pub(crate) unsafe fn bind_engine(&self, engine: &'static Engine<K>) {
        self.engine
            .store(engine as *const Engine<K> as *mut Engine<K>, Ordering::Release);
    }

    /// Recover the owning engine from a wrapper task's `usize` argument.
    ///
    /// # Safety
    /// `arg` must be a value previously produced by casting `&'static
    /// TaskSlot<K>` to `usize`, and [`TaskSlot::bind_engine`] must have
    /// already run for it.
    pub(crate) unsafe fn from_arg(arg: usize) -> (&'static TaskSlot<K>, &'static Engine<K>) {
        let slot = unsafe { &*(arg as *const TaskSlot<K>) };
        let engine = unsafe { &*slot.engine.load(Ordering::Acquire) };
        (slot, engine)
    }

    pub(crate) fn effective_policy(&self, engine: &Engine<K>) -> EffectivePolicy {
        match self.config.policy {
            OverrunPolicy::Skip => EffectivePolicy::Skip,
            OverrunPolicy::Kill => EffectivePolicy::Kill,
            OverrunPolicy::CatchUp => EffectivePolicy::CatchUp,
            OverrunPolicy::UseGlobal => engine.global.default_policy,
        }
    }

    /// Run `f` with mutable access to this task's runtime state, under the
    /// kernel's critical section.
    pub(crate) fn with_runtime<R>(&self, f: impl FnOnce(&mut TaskRuntime<K>) -> R) -> R {
        K::critical_section(|| {
            // Safety: critical section held.
            f(unsafe { self.runtime.get_mut() })
        })
    }

    pub fn state_snapshot(&self) -> TaskStateSnapshot {
        self.with_runtime(|rt| TaskStateSnapshot {
            name: self.config.name,
            next_release: rt.next_release,
            current_release: rt.current_release,
            is_active: rt.is_active,
            deadline_missed: rt.deadline_missed,
        })
    }

    pub fn stats_snapshot(&self) -> TaskStats {
        self.with_runtime(|rt| TaskStats {
            jobs_completed: rt.jobs_completed,
            deadline_misses: rt.deadline_misses,
            overrun_skips: rt.overrun_skips,
            overrun_kills: rt.overrun_kills,
            overrun_catchups: rt.overrun_catchups,
        })
    }
}

/// Validate a batch of task configurations against the spec's `init`
/// contract and build the registry slots.
///
/// Returns the populated (but not yet engine-bound) slots on success, or
/// the first violation encountered, in registration order -- `init` leaves
/// the system in its pre-call state on any violation, so this function
/// must not have any observable side effect on failure.
pub(crate) fn build_slots<K: Kernel>(
    configs: &[TaskConfig],
    max_tasks: usize,
) -> Result<Vec<TaskSlot<K>>, InitError> {
    let cap = max_tasks.min(crate::config::MAX_TASKS);
    if configs.is_empty() || configs.len() > cap {
        return Err(InitError::InvalidTaskCount(configs.len()));
    }

    for (index, config) in configs.iter().enumerate() {
        if config.entry.is_none() {
            return Err(InitError::NullEntry(index, config.name));
        }
        if config.period == 0 {
            return Err(InitError::InvalidPeriod(index, config.name));
        }
        if config.deadline != 0 && config.deadline > config.period {
            return Err(InitError::InvalidDeadline(index, config.name));
        }
        if config.priority <= K::SUPERVISOR_PRIORITY {
            return Err(InitError::PriorityNotBelowSupervisor(
                index,
                config.name,
                config.priority,
            ));
        }
    }

    Ok(configs
        .iter()
        .cloned()
        .enumerate()
        .map(|(index, config)| TaskSlot::new(index, config))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_TASKS;
    use crate::testutil::TestKernel;

    fn task(name: &'static str, period: Tick, priority: u8) -> TaskConfig {
        TaskConfig::new(name, period, priority, |_| {})
    }

    #[test]
    fn rejects_an_empty_task_list() {
        let err = build_slots::<TestKernel>(&[], MAX_TASKS).unwrap_err();
        assert!(matches!(err, InitError::InvalidTaskCount(0)));
    }

    #[test]
    fn rejects_more_tasks_than_the_cap() {
        let configs: Vec<_> = (0..MAX_TASKS + 1).map(|_| task("t", 10, 1)).collect();
        let err = build_slots::<TestKernel>(&configs, MAX_TASKS).unwrap_err();
        assert!(matches!(err, InitError::InvalidTaskCount(n) if n == MAX_TASKS + 1));
    }

    #[test]
    fn a_global_max_tasks_below_the_compile_time_cap_is_honored() {
        let configs: Vec<_> = (0..3).map(|_| task("t", 10, 1)).collect();
        let err = build_slots::<TestKernel>(&configs, 2).unwrap_err();
        assert!(matches!(err, InitError::InvalidTaskCount(3)));
    }

    #[test]
    fn rejects_a_null_entry() {
        let mut c = task("t", 10, 1);
        c.entry = None;
        let err = build_slots::<TestKernel>(&[c], MAX_TASKS).unwrap_err();
        assert!(matches!(err, InitError::NullEntry(0, "t")));
    }

    #[test]
    fn rejects_a_zero_period() {
        let c = task("t", 0, 1);
        let err = build_slots::<TestKernel>(&[c], MAX_TASKS).unwrap_err();
        assert!(matches!(err, InitError::InvalidPeriod(0, "t")));
    }

    #[test]
    fn rejects_a_deadline_exceeding_the_period() {
        let c = task("t", 10, 1).with_deadline(20);
        let err = build_slots::<TestKernel>(&[c], MAX_TASKS).unwrap_err();
        assert!(matches!(err, InitError::InvalidDeadline(0, "t")));
    }

    #[test]
    fn a_zero_deadline_is_accepted_as_use_period() {
        let c = task("t", 10, 1);
        assert!(build_slots::<TestKernel>(&[c], MAX_TASKS).is_ok());
    }

    #[test]
    fn rejects_a_priority_not_below_the_supervisor() {
        let c = task("t", 10, TestKernel::SUPERVISOR_PRIORITY);
        let err = build_slots::<TestKernel>(&[c], MAX_TASKS).unwrap_err();
        assert!(matches!(err, InitError::PriorityNotBelowSupervisor(0, "t", _)));
    }

    #[test]
    fn the_first_violation_in_registration_order_is_reported() {
        let configs = vec![task("ok", 10, 1), task("bad", 0, 1)];
        let err = build_slots::<TestKernel>(&configs, MAX_TASKS).unwrap_err();
        assert!(matches!(err, InitError::InvalidPeriod(1, "bad")));
    }
}
