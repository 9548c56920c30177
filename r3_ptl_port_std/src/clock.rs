//! Millisecond tick clock derived from [`std::time::Instant`].
//!
//! `r3_ptl::Tick` is a plain `u64`; this port fixes the convention (shared
//! with `r3_ptl`'s own scenario tests) that one tick is one millisecond,
//! measured from this process's first call to [`now`].

use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use r3_ptl::Tick;

static EPOCH: OnceLock<Instant> = OnceLock::new();

fn epoch() -> Instant {
    *EPOCH.get_or_init(Instant::now)
}

pub(crate) fn now() -> Tick {
    epoch().elapsed().as_millis() as Tick
}

pub(crate) fn sleep_until(tick: Tick) {
    let target = epoch() + Duration::from_millis(tick);
    let now = Instant::now();
    if target > now {
        thread::sleep(target - now);
    }
}
