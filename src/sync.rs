//! # Synchronization
//!
//! Interrupt-masking critical section for a single-core Cortex-M.
//! Every piece of shared kernel state — the TCB array, the ready queue,
//! the registry, the running-task index — lives in one protection
//! domain guarded by this primitive, so there is no lock hierarchy to
//! get wrong.

use cortex_m::interrupt;

/// Run `f` with interrupts disabled, restoring them afterwards.
///
/// Keep the body short: everything inside adds to worst-case interrupt
/// latency, which feeds straight into release jitter for the
/// deadline-scheduled tasks.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&interrupt::CriticalSection) -> R,
{
    interrupt::free(f)
}
