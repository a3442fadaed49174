//! Scheduling policy.
//!
//! A policy is a plain function from the process table to the slot that
//! should run next. It is consulted only when the table is non-empty and
//! must not call back into the runtime.

pub mod round_robin;

pub use round_robin::round_robin;

use crate::table::ProcessTable;

/// Scheduling policy: picks the slot to resume next.
pub type SchedFn = fn(&ProcessTable) -> usize;

/// The installed policy.
pub(crate) struct Scheduler {
    policy: SchedFn,
}

impl Scheduler {
    pub(crate) fn new(policy: SchedFn) -> Self {
        Scheduler { policy }
    }

    pub(crate) fn replace(&mut self, policy: SchedFn) {
        self.policy = policy;
    }

    /// Ask the policy for the next slot.
    ///
    /// An out-of-range answer is wrapped into the table instead of being
    /// trusted.
    pub(crate) fn pick(&self, table: &ProcessTable) -> usize {
        debug_assert!(!table.is_empty(), "scheduler consulted with no processes");
        let slot = (self.policy)(table);
        if slot < table.len() {
            slot
        } else {
            log::warn!(
                "[LWP] scheduler returned slot {} with {} processes",
                slot,
                table.len()
            );
            slot % table.len()
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Scheduler::new(round_robin)
    }
}
