//! Exercises every overrun-recovery policy and the human-readable trace and
//! statistics dumps against the hosted [`r3_ptl_port_std::StdKernel`] port.
//!
//! One scenario runs per invocation; pick it with a positional argument,
//! e.g. `cargo run -p r3_ptl_demo -- skip`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{Parser, ValueEnum};

use r3_ptl::{burn, EffectivePolicy, GlobalConfig, OverrunPolicy, Ptl, TaskConfig};
use r3_ptl_port_std::StdKernel;

static PTL: Ptl<StdKernel> = Ptl::new();

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Scenario {
    /// One task, comfortably inside its period. No overruns expected.
    Normal,
    /// A low- and a high-priority task, plus a referee that watches for
    /// the high-priority task starting while the low-priority one is
    /// still active.
    Preemption,
    /// A task whose job overruns its own period under `SKIP`.
    Skip,
    /// A task whose job overruns its own period under `CATCH_UP`.
    CatchUp,
    /// A task whose job overruns its own period under `KILL`.
    Kill,
    /// Three tasks under different policies, contending at once.
    Mixed,
    /// Two very fast tasks, to push the trace ring past its capacity.
    Wrap,
}

/// Drives one `r3_ptl` end-to-end scenario and prints its trace/statistics.
#[derive(Parser)]
struct Opt {
    scenario: Scenario,
}

fn main() {
    r3_ptl_port_std::install_logger();
    let opt = Opt::parse();

    let (configs, run_for_ms) = build_scenario(opt.scenario);

    let global = GlobalConfig::new(EffectivePolicy::Skip);
    PTL.init(global, &configs).expect("init failed");
    PTL.start().expect("start failed");

    std::thread::sleep(Duration::from_millis(run_for_ms));

    let engine = PTL.engine().expect("engine present after a successful init");
    engine.print_trace();
    engine.print_statistics();
}

fn build_scenario(scenario: Scenario) -> (Vec<TaskConfig>, u64) {
    match scenario {
        Scenario::Normal => (vec![TaskConfig::new("normal", 50, 1, job_work_10ms)], 300),
        Scenario::Preemption => (
            vec![
                TaskConfig::new("low", 100, 3, job_work_50ms),
                TaskConfig::new("high", 150, 2, job_work_20ms),
                TaskConfig::new("referee", 10, 1, job_referee),
            ],
            300,
        ),
        Scenario::Skip => (
            vec![TaskConfig::new("skip", 100, 1, job_work_250ms).with_policy(OverrunPolicy::Skip)],
            500,
        ),
        Scenario::CatchUp => (
            vec![
                TaskConfig::new("catchup", 100, 1, job_work_120ms).with_policy(OverrunPolicy::CatchUp),
            ],
            400,
        ),
        Scenario::Kill => (
            vec![TaskConfig::new("kill", 100, 1, job_work_200ms)
                .with_deadline(100)
                .with_policy(OverrunPolicy::Kill)],
            350,
        ),
        Scenario::Mixed => (
            vec![
                TaskConfig::new("worker-kill", 100, 1, job_work_150ms).with_policy(OverrunPolicy::Kill),
                TaskConfig::new("worker-skip", 100, 2, job_work_150ms).with_policy(OverrunPolicy::Skip),
                TaskConfig::new("worker-fast", 100, 3, job_work_20ms).with_policy(OverrunPolicy::Skip),
            ],
            800,
        ),
        Scenario::Wrap => (
            vec![
                TaskConfig::new("fast-a", 5, 1, job_noop),
                TaskConfig::new("fast-b", 5, 2, job_noop),
            ],
            600,
        ),
    }
}

fn job_work_10ms(_: usize) {
    burn(10);
}

fn job_work_20ms(_: usize) {
    burn(20);
}

fn job_work_50ms(_: usize) {
    burn(50);
}

fn job_work_120ms(_: usize) {
    burn(120);
}

fn job_work_150ms(_: usize) {
    burn(150);
}

fn job_work_200ms(_: usize) {
    burn(200);
}

fn job_noop(_: usize) {}

static PREEMPTION_OBSERVED: AtomicBool = AtomicBool::new(false);

/// Polls the engine's task snapshots and logs the first moment `high` is
/// seen active while `low` still is -- evidence of actual preemption on
/// this host, not just interleaving.
fn job_referee(_: usize) {
    let Some(engine) = PTL.engine() else {
        return;
    };
    let states = engine.get_task_list();
    let low_active = states.iter().any(|s| s.name == "low" && s.is_active);
    let high_active = states.iter().any(|s| s.name == "high" && s.is_active);
    if low_active && high_active && !PREEMPTION_OBSERVED.swap(true, Ordering::Relaxed) {
        log::info!("referee: high started while low was still active");
    }
}
