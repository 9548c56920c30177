//! Static application-provided configuration: [`TaskConfig`] and
//! [`GlobalConfig`].

use crate::kernel::Tick;

/// Compile-time cap on the number of registered tasks.
///
/// Mirrors this crate's kernel lineage, which reserves a fixed-size object
/// pool at configuration time and never resizes it.
pub const MAX_TASKS: usize = 8;

/// Compile-time trace ring capacity. Must be a power of two.
pub const TRACE_CAPACITY: usize = 1024;

/// The default wrapper stack reservation used when a [`TaskConfig`] doesn't
/// override it.
pub const DEFAULT_STACK_SIZE: usize = 4096;

/// Per-task overrun-recovery policy, as configured by the application.
///
/// [`OverrunPolicy::UseGlobal`] defers to [`GlobalConfig::default_policy`];
/// see [`EffectivePolicy`] for the policy actually applied at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrunPolicy {
    /// Drop the late release; the overrunning job keeps running.
    Skip,
    /// Destroy the overrunning job's wrapper task and start a fresh one.
    Kill,
    /// Release immediately; treat the previous job as displaced.
    CatchUp,
    /// Use [`GlobalConfig::default_policy`] for this task.
    UseGlobal,
}

/// The policy actually in force for a task once `UseGlobal` has been
/// resolved against [`GlobalConfig::default_policy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectivePolicy {
    Skip,
    Kill,
    CatchUp,
}

impl From<EffectivePolicy> for OverrunPolicy {
    fn from(p: EffectivePolicy) -> Self {
        match p {
            EffectivePolicy::Skip => OverrunPolicy::Skip,
            EffectivePolicy::Kill => OverrunPolicy::Kill,
            EffectivePolicy::CatchUp => OverrunPolicy::CatchUp,
        }
    }
}

/// Immutable, application-provided description of one periodic task.
///
/// Construct with [`TaskConfig::new`] or the [`TaskConfig::builder`]
/// builder; both normalize `deadline == 0` to `period` only at
/// [`init`](crate::Ptl::init) time, per the spec, so a `TaskConfig` itself
/// may still carry the raw `0` a caller wrote.
#[derive(Debug, Clone)]
pub struct TaskConfig {
    /// Display identifier, also used as the trace ring's `task_name_ref`.
    pub name: &'static str,
    /// Period `T`, in ticks. Must be nonzero.
    pub period: Tick,
    /// Relative deadline `D`, in ticks. `0` means "use `period`".
    pub deadline: Tick,
    /// Wrapper task priority. Must be strictly less urgent (numerically
    /// greater, by this crate's convention) than the supervisor's.
    pub priority: u8,
    /// Wrapper stack reservation, in bytes.
    pub stack_size: usize,
    /// The user job body. `None` models a null entry and is rejected by
    /// `init`.
    pub entry: Option<fn(usize)>,
    /// Opaque argument passed to `entry` on every release.
    pub argument: usize,
    /// Per-task overrun policy, or [`OverrunPolicy::UseGlobal`].
    pub policy: OverrunPolicy,
}

impl TaskConfig {
    /// Build a `TaskConfig` with the common defaults: deadline equal to the
    /// period, the default stack size, and [`OverrunPolicy::UseGlobal`].
    pub fn new(name: &'static str, period: Tick, priority: u8, entry: fn(usize)) -> Self {
        Self {
            name,
            period,
            deadline: 0,
            priority,
            stack_size: DEFAULT_STACK_SIZE,
            entry: Some(entry),
            argument: 0,
            policy: OverrunPolicy::UseGlobal,
        }
    }

    /// Override the relative deadline. `0` continues to mean "use period".
    pub const fn with_deadline(mut self, deadline: Tick) -> Self {
        self.deadline = deadline;
        self
    }

    /// Override the wrapper stack reservation.
    pub const fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    /// Override the opaque argument passed to `entry`.
    pub const fn with_argument(mut self, argument: usize) -> Self {
        self.argument = argument;
        self
    }

    /// Override the per-task overrun policy.
    pub const fn with_policy(mut self, policy: OverrunPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The effective deadline: `deadline` if nonzero, else `period`.
    pub(crate) fn effective_deadline(&self) -> Tick {
        if self.deadline == 0 {
            self.period
        } else {
            self.deadline
        }
    }
}

/// System-wide configuration supplied to [`Ptl::init`](crate::Ptl::init).
#[derive(Debug, Clone, Copy)]
pub struct GlobalConfig {
    /// The policy applied to any task configured with
    /// [`OverrunPolicy::UseGlobal`].
    pub default_policy: EffectivePolicy,
    /// Whether the trace ring records events at all.
    pub tracing_enabled: bool,
    /// Upper bound on the number of tasks this run of `init` will accept,
    /// in addition to the compile-time [`MAX_TASKS`] cap.
    pub max_tasks: usize,
}

impl GlobalConfig {
    pub const fn new(default_policy: EffectivePolicy) -> Self {
        Self {
            default_policy,
            tracing_enabled: true,
            max_tasks: MAX_TASKS,
        }
    }

    pub const fn with_tracing_enabled(mut self, enabled: bool) -> Self {
        self.tracing_enabled = enabled;
        self
    }

    pub const fn with_max_tasks(mut self, max_tasks: usize) -> Self {
        self.max_tasks = max_tasks;
        self
    }
}
