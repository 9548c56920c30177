//! A periodic task layer for priority-preemptive real-time kernels.
//!
//! `r3_ptl` sits between application job bodies and a bare kernel's
//! task/notification primitives ([`Kernel`]), supplying the parts a
//! periodic-task scheduler needs but a general-purpose RTOS does not:
//! a supervisor that releases jobs on a tick-aligned schedule, per-task
//! overrun policies (skip / kill / catch-up), deadline-miss latching, and
//! a fixed-capacity trace ring with an offline statistics reducer.
//!
//! Applications supply a [`Kernel`] implementation (a port; see
//! `r3_ptl_port_std` for a hosted one), describe their tasks with
//! [`TaskConfig`], and drive the layer through a single static [`Ptl`]
//! instance: [`Ptl::init`] followed by [`Ptl::start`].

mod calibrate;
mod cell;
mod config;
mod error;
mod kernel;
mod registry;
mod print;
mod stats;
mod supervisor;
#[cfg(test)]
mod testutil;
mod trace;
mod wrapper;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

pub use calibrate::burn;
pub use config::{EffectivePolicy, GlobalConfig, OverrunPolicy, TaskConfig, MAX_TASKS, TRACE_CAPACITY};
pub use error::{InitError, StartError};
pub use kernel::{Kernel, Tick};
pub use registry::{TaskStateSnapshot, TaskStats};
pub use stats::TraceStatistics;
pub use trace::{TraceEvent, TraceRecord};

use registry::TaskSlot;
use trace::TraceRing;

/// The live system: the bound configuration, the task registry and the
/// trace ring. Built once by [`Ptl::init`] and never moved or resized
/// afterward -- every `&'static TaskSlot<K>` handed to a port as a task
/// argument stays valid for the lifetime of the program.
pub struct Engine<K: Kernel> {
    global: GlobalConfig,
    slots: Vec<TaskSlot<K>>,
    trace: TraceRing<K>,
}

impl<K: Kernel> Engine<K> {
    pub fn get_task_stats(&self, index: usize) -> Option<TaskStats> {
        self.slots.get(index).map(|slot| slot.stats_snapshot())
    }

    pub fn get_task_list(&self) -> Vec<TaskStateSnapshot> {
        self.slots.iter().map(|slot| slot.state_snapshot()).collect()
    }

    pub fn is_tracing_enabled(&self) -> bool {
        self.global.tracing_enabled
    }

    pub fn get_global_policy(&self) -> EffectivePolicy {
        self.global.default_policy
    }

    pub fn get_effective_policy(&self, index: usize) -> Option<EffectivePolicy> {
        self.slots.get(index).map(|slot| slot.effective_policy(self))
    }

    pub fn get_trace_statistics(&self) -> TraceStatistics {
        stats::reduce(&self.trace)
    }

    /// Copy out the trace ring's currently-readable range, in chronological
    /// order. Lower-level than [`Engine::get_trace_statistics`]; exposed for
    /// callers that need to inspect event ordering directly (e.g. to check
    /// that a given `OVERRUN_CATCHUP` is immediately followed by its
    /// `RELEASE`), rather than the reducer's aggregate counts.
    pub fn trace_records(&self) -> Vec<TraceRecord> {
        let snapshot = self.trace.snapshot();
        (0..snapshot.len()).map(|i| self.trace.record_at(snapshot, i)).collect()
    }

    pub fn print_trace(&self) {
        print::print_trace(&self.trace);
    }

    pub fn print_statistics(&self) {
        print::print_statistics(&self.get_trace_statistics());
    }

    /// Record the idle task being scheduled in. Called by the port's
    /// scheduler, not application code.
    pub fn track_idle_entry(&self, timestamp: Tick) {
        self.trace.track_idle_entry(timestamp);
    }

    /// Record the idle task being scheduled out. Called by the port's
    /// scheduler, not application code.
    pub fn track_idle_exit(&self, timestamp: Tick) {
        self.trace.track_idle_exit(timestamp);
    }

    /// Append a raw trace record. Exposed for ports that need to log
    /// events on the engine's behalf (e.g. context-switch tracing) outside
    /// the wrapper/supervisor's own call sites.
    pub fn log_event(&self, task_name: &'static str, event: TraceEvent, timestamp: Tick) {
        self.trace.log_event(task_name, event, timestamp);
    }
}

/// The application-facing handle: a `'static` place to put one [`Engine`].
///
/// Two-phase construction mirrors this crate's kernel lineage's
/// once-built, never-moved static object graph, adapted to a runtime
/// `init` call: [`Ptl::new`] is a `const fn` usable in a `static`
/// initializer; [`Ptl::init`] builds the [`Engine`] and places it, after
/// which its address never changes again, so every [`TaskSlot`] can be
/// soundly bound to it via [`TaskSlot::bind_engine`].
pub struct Ptl<K: Kernel> {
    engine: OnceLock<Engine<K>>,
    started: AtomicBool,
}

impl<K: Kernel> Ptl<K> {
    /// Construct an uninitialized handle. Usable in a `static` item.
    pub const fn new() -> Self {
        Self {
            engine: OnceLock::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Validate `configs` and build the registry and trace ring.
    ///
    /// Must be called exactly once, before [`Ptl::start`]. On any
    /// validation failure the handle is left exactly as it was before the
    /// call -- `init` has no partial-failure state.
    pub fn init(&'static self, global: GlobalConfig, configs: &[TaskConfig]) -> Result<(), InitError> {
        let slots = registry::build_slots::<K>(configs, global.max_tasks)?;
        let engine = Engine {
            global,
            slots,
            trace: TraceRing::new(),
        };
        self.engine.set(engine).map_err(|_| InitError::AlreadyInitialized)?;

        let engine = self.engine.get().expect("just set");
        engine.trace.set_enabled(engine.global.tracing_enabled);
        if engine.global.tracing_enabled {
            engine.trace.reset();
        }
        for slot in &engine.slots {
            // Safety: `engine` has just reached its final `'static`
            // address inside `self.engine` (a `OnceCell` never moves its
            // contents once set), and this runs exactly once per slot.
            unsafe { slot.bind_engine(engine) };
        }
        Ok(())
    }

    /// Spawn the supervisor and every task's wrapper, then return. The
    /// supervisor begins releasing jobs on its next scheduling quantum.
    ///
    /// Must be called exactly once, after a successful [`Ptl::init`].
    pub fn start(&'static self) -> Result<(), StartError> {
        let engine = self.engine.get().ok_or(StartError::NotInitialized)?;
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(StartError::AlreadyStarted);
        }

        for slot in &engine.slots {
            let handle = K::spawn_task(
                slot.config.priority,
                slot.config.stack_size,
                wrapper::wrapper_main::<K>,
                slot as *const _ as usize,
            );
            slot.with_runtime(|rt| rt.handle = Some(handle));
        }

        K::spawn_task(
            K::SUPERVISOR_PRIORITY,
            config::DEFAULT_STACK_SIZE,
            supervisor::supervisor_main::<K>,
            engine as *const Engine<K> as usize,
        );
        Ok(())
    }

    /// Borrow the live engine, if [`Ptl::init`] has run.
    pub fn engine(&'static self) -> Option<&'static Engine<K>> {
        self.engine.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestKernel;

    #[test]
    fn start_before_init_fails() {
        static PTL: Ptl<TestKernel> = Ptl::new();
        assert_eq!(PTL.start(), Err(StartError::NotInitialized));
    }

    #[test]
    fn a_second_init_fails_and_leaves_the_registry_untouched() {
        static PTL: Ptl<TestKernel> = Ptl::new();
        let configs = [TaskConfig::new("t", 50, 1, |_| {})];
        PTL.init(GlobalConfig::new(EffectivePolicy::Skip), &configs)
            .expect("first init must succeed");

        let before = PTL.engine().unwrap().get_task_list();
        let err = PTL
            .init(GlobalConfig::new(EffectivePolicy::Kill), &configs)
            .unwrap_err();
        assert_eq!(err, InitError::AlreadyInitialized);

        // Still the first init's engine -- a different default policy would
        // prove a second `Engine` had replaced it.
        assert_eq!(PTL.engine().unwrap().get_global_policy(), EffectivePolicy::Skip);
        assert_eq!(PTL.engine().unwrap().get_task_list().len(), before.len());
    }

    #[test]
    fn init_rejects_zero_tasks() {
        static PTL: Ptl<TestKernel> = Ptl::new();
        let err = PTL
            .init(GlobalConfig::new(EffectivePolicy::Skip), &[])
            .unwrap_err();
        assert_eq!(err, InitError::InvalidTaskCount(0));
    }

    #[test]
    fn init_with_tracing_disabled_suppresses_trace_writes() {
        static PTL: Ptl<TestKernel> = Ptl::new();
        let configs = [TaskConfig::new("t", 50, 1, |_| {})];
        PTL.init(
            GlobalConfig::new(EffectivePolicy::Skip).with_tracing_enabled(false),
            &configs,
        )
        .unwrap();

        let engine = PTL.engine().unwrap();
        assert!(!engine.is_tracing_enabled());
        engine.log_event("t", TraceEvent::Release, 1);
        engine.track_idle_entry(1);
        engine.track_idle_exit(2);
        assert!(engine.trace_records().is_empty());
        assert_eq!(engine.get_trace_statistics().idle_time, 0);
    }
}

impl<K: Kernel> Default for Ptl<K> {
    fn default() -> Self {
        Self::new()
    }
}
