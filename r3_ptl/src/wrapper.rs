//! The per-task wrapper loop (spec §4.2).

use crate::kernel::Kernel;
use crate::registry::TaskSlot;
use crate::trace::TraceEvent;

/// Entry point every wrapper task runs at. `arg` is `&'static TaskSlot<K>`
/// cast to `usize`, set up by [`crate::Ptl::init`].
///
/// Never returns under normal operation: the wrapper blocks on its
/// notification slot, runs one job, and loops. The only way out is being
/// superseded by a KILL recreate, detected via the generation stamp
/// captured at entry.
pub(crate) fn wrapper_main<K: Kernel>(arg: usize) {
    // Safety: `arg` was produced by `Ptl::init` from a live, engine-bound
    // `&'static TaskSlot<K>`.
    let (slot, _engine) = unsafe { TaskSlot::<K>::from_arg(arg) };
    let my_generation = slot.with_runtime(|rt| rt.generation);

    loop {
        K::wait_for_notification();

        // If a KILL recreated this task's slot before this (stale)
        // incarnation got to run at all, stand down immediately, without
        // touching state that now belongs to the new incarnation.
        let observation = slot.with_runtime(|rt| {
            if rt.generation != my_generation {
                None
            } else {
                rt.is_active = true;
                Some((rt.current_release, slot.config.entry, slot.config.argument))
            }
        });
        let (current_release, entry, argument) = match observation {
            Some(v) => v,
            None => return,
        };
        let t_start = K::now();
        _engine.trace.log_event(slot.config.name, TraceEvent::Start, t_start);

        if let Some(entry) = entry {
            entry(argument);
        }

        let t_end = K::now();
        _engine
            .trace
            .log_event(slot.config.name, TraceEvent::Complete, t_end);

        let deadline_effective = slot.config.effective_deadline();
        let absolute_deadline = current_release + deadline_effective;

        slot.with_runtime(|rt| {
            // Stale incarnation: a KILL superseded us while the job body
            // was running. Don't touch shared state -- it belongs to the
            // new incarnation now.
            if rt.generation != my_generation {
                return;
            }

            if t_end > absolute_deadline && !rt.deadline_missed {
                rt.deadline_missed = true;
                rt.deadline_misses += 1;
                _engine
                    .trace
                    .log_event(slot.config.name, TraceEvent::DeadlineMiss, t_end);
            }

            rt.is_active = false;
            rt.jobs_completed += 1;
        });
    }
}
