//! The supervisor state machine (spec §4.3): the single highest-priority
//! task that wakes every tick, iterates the registry, emits releases,
//! detects overruns, and applies policies.

use crate::calibrate;
use crate::config::EffectivePolicy;
use crate::kernel::Kernel;
use crate::trace::TraceEvent;
use crate::wrapper::wrapper_main;
use crate::Engine;

/// Entry point the supervisor task runs at. `arg` is `&'static Engine<K>`
/// cast to `usize`, set up by [`crate::Ptl::start`]. Never returns.
pub(crate) fn supervisor_main<K: Kernel>(arg: usize) {
    // Safety: `arg` was produced by `Ptl::start` from a live `&'static
    // Engine<K>`, and the engine's address never changes after `init`.
    let engine: &'static Engine<K> = unsafe { &*(arg as *const Engine<K>) };

    calibrate::calibrate::<K>();

    // Deferred common epoch: every task becomes releasable at the same
    // instant, latched as t_0.
    let t0 = K::now();
    for slot in &engine.slots {
        slot.with_runtime(|rt| rt.next_release = t0);
    }

    let mut next_wake = t0;
    loop {
        let now = K::now();

        for slot in &engine.slots {
            // Phase A -- deadline surveillance.
            let (abs_deadline, is_active, deadline_missed) = slot.with_runtime(|rt| {
                (
                    rt.current_release + slot.config.effective_deadline(),
                    rt.is_active,
                    rt.deadline_missed,
                )
            });
            if now >= abs_deadline && is_active && !deadline_missed {
                slot.with_runtime(|rt| {
                    rt.deadline_misses += 1;
                    rt.deadline_missed = true;
                });
                engine
                    .trace
                    .log_event(slot.config.name, TraceEvent::DeadlineMiss, now);
            }

            // Phase B -- release decision.
            let next_release = slot.with_runtime(|rt| rt.next_release);
            if now < next_release {
                continue;
            }

            let running = slot.with_runtime(|rt| {
                let running = rt.is_active;
                // Pertains to the old job; the new release is the boundary.
                rt.deadline_missed = false;
                running
            });

            if !running {
                release_nominal(engine, slot, now);
                continue;
            }

            match slot.effective_policy(engine) {
                EffectivePolicy::Skip => {
                    slot.with_runtime(|rt| {
                        rt.overrun_skips += 1;
                        rt.next_release += slot.config.period;
                    });
                    engine
                        .trace
                        .log_event(slot.config.name, TraceEvent::OverrunSkip, now);
                }
                EffectivePolicy::CatchUp => {
                    slot.with_runtime(|rt| rt.overrun_catchups += 1);
                    engine
                        .trace
                        .log_event(slot.config.name, TraceEvent::OverrunCatchUp, now);
                    let handle = slot.with_runtime(|rt| {
                        rt.is_active = false;
                        rt.current_release = rt.next_release;
                        rt.next_release += slot.config.period;
                        rt.handle
                    });
                    engine
                        .trace
                        .log_event(slot.config.name, TraceEvent::Release, now);
                    if let Some(handle) = handle {
                        K::notify(handle);
                    }
                }
                EffectivePolicy::Kill => {
                    slot.with_runtime(|rt| rt.overrun_kills += 1);
                    engine
                        .trace
                        .log_event(slot.config.name, TraceEvent::OverrunKill, now);

                    // Bump the generation (and the rest of this job's reset
                    // bookkeeping) *before* spawning the replacement thread.
                    // `K::spawn_task` can start running `wrapper_main`
                    // immediately on a genuinely concurrent port (see
                    // `r3_ptl_port_std::StdKernel`) -- if that thread read
                    // `rt.generation` before this increment landed, it would
                    // capture the stale, pre-kill generation and later mark
                    // itself superseded the instant the supervisor notifies
                    // it, orphaning the task.
                    slot.with_runtime(|rt| {
                        rt.generation += 1;
                        rt.is_active = false;
                        rt.deadline_missed = false;
                        rt.current_release = rt.next_release;
                        rt.next_release += slot.config.period;
                    });
                    let new_handle = K::spawn_task(
                        slot.config.priority,
                        slot.config.stack_size,
                        wrapper_main::<K>,
                        slot as *const _ as usize,
                    );
                    slot.with_runtime(|rt| rt.handle = Some(new_handle));
                    engine
                        .trace
                        .log_event(slot.config.name, TraceEvent::Release, now);
                    K::notify(new_handle);
                }
            }
        }

        next_wake += 1;
        K::sleep_until(next_wake);
    }
}

fn release_nominal<K: Kernel>(engine: &'static Engine<K>, slot: &'static crate::registry::TaskSlot<K>, now: u64) {
    engine
        .trace
        .log_event(slot.config.name, TraceEvent::Release, now);
    let handle = slot.with_runtime(|rt| {
        rt.current_release = rt.next_release;
        rt.next_release += slot.config.period;
        rt.handle
    });
    if let Some(handle) = handle {
        K::notify(handle);
    }
}
