//! The injected scheduling capability.
//!
//! The wall-clock primitive itself is not part of the core: whoever
//! drives the machine cycle registers a repeating task here and calls
//! [`Trigger::repeat_step`](crate::Trigger::repeat_step) whenever that
//! task ticks.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique handle naming one trigger towards the scheduler.
pub type TriggerId = u64;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_trigger_id() -> TriggerId {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Registers and cancels a cancellable repeating task per trigger.
pub trait Scheduler {
    /// Arm the repeating task for `id`. Idempotent per trigger: a prior
    /// schedule for the same id is replaced, never duplicated.
    fn schedule(&mut self, id: TriggerId);

    /// Drop any scheduled task for `id`. Safe to call when nothing is
    /// scheduled.
    fn cancel(&mut self, id: TriggerId);
}
