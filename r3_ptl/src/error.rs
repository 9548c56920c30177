//! Error types.
//!
//! The bare kernel-trait primitives in [`crate::kernel`] fail with small
//! `Copy` enums (there are none yet -- this port's primitives are
//! infallible by construction, see `r3_ptl_port_std`), matching
//! `r3_core::kernel::error`'s `no_std`-friendly style. `init`/`start`, being
//! the application-facing entry points, use `thiserror` instead, the same
//! way this crate's kernel lineage layers `thiserror`/`anyhow` on top of
//! bare kernel error codes in its tooling crates (`r3_test_runner`).

use thiserror::Error;

/// Failure returned by [`crate::Ptl::init`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    #[error("task count {0} is invalid (must be 1..=min(MAX_TASKS, global.max_tasks))")]
    InvalidTaskCount(usize),

    #[error("task at index {0} ({1:?}) has a null job entry")]
    NullEntry(usize, &'static str),

    #[error("task at index {0} ({1:?}) has a non-positive period")]
    InvalidPeriod(usize, &'static str),

    #[error(
        "task at index {0} ({1:?}) has a deadline that exceeds its period \
         (0 < deadline <= period is required unless deadline == 0)"
    )]
    InvalidDeadline(usize, &'static str),

    #[error(
        "task at index {0} ({1:?}) has priority {2}, which does not strictly \
         precede the supervisor's priority"
    )]
    PriorityNotBelowSupervisor(usize, &'static str, u8),

    #[error("the periodic task layer has already been initialized")]
    AlreadyInitialized,
}

/// Failure returned by [`crate::Ptl::start`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StartError {
    #[error("start() was called before a successful init()")]
    NotInitialized,

    #[error("start() was already called once")]
    AlreadyStarted,
}
