//! One-shot CPU calibration and the `burn(ticks)` helper it feeds (spec
//! §4.5).
//!
//! The source note this crate follows points out that the shared counter
//! this produces is read by `burn` without synchronization, and that this
//! is benign because calibration always completes before the first
//! `burn` call. This crate tightens that slightly by using a `OnceLock`
//! rather than a bare racy write, at no cost to the one-shot-before-use
//! usage pattern.

use std::sync::OnceLock;

use crate::kernel::{Kernel, Tick};

/// Number of ticks the calibration busy-loop runs for.
const CALIBRATION_TICKS: Tick = 100;

static LOOPS_PER_TICK: OnceLock<f64> = OnceLock::new();

/// Measure how many busy-loop iterations fit in one tick, for use by
/// [`burn`]. Called once by the supervisor before it enters its
/// steady-state loop.
pub(crate) fn calibrate<K: Kernel>() {
    // Wait for a tick edge so the measurement window isn't clipped short.
    let start = K::now();
    while K::now() == start {
        core::hint::spin_loop();
    }

    let begin = K::now();
    let deadline = begin + CALIBRATION_TICKS;
    let mut counter: u64 = 0;
    while K::now() < deadline {
        counter = core::hint::black_box(counter.wrapping_add(1));
    }

    let loops_per_tick = counter as f64 / CALIBRATION_TICKS as f64;
    // Ignore a racing second calibration attempt; the first one wins.
    let _ = LOOPS_PER_TICK.set(loops_per_tick);
    log::debug!("calibration: {loops_per_tick:.1} loop iterations per tick");
}

/// Burn approximately `ticks` worth of CPU time, as measured by
/// [`calibrate`]. Used by test scenarios to simulate job bodies with a
/// known approximate duration.
pub fn burn(ticks: Tick) {
    let loops_per_tick = LOOPS_PER_TICK.get().copied().unwrap_or(0.0);
    let iterations = (loops_per_tick * ticks as f64) as u64;
    let mut counter: u64 = 0;
    for _ in 0..iterations {
        counter = core::hint::black_box(counter.wrapping_add(1));
    }
}
