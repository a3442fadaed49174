//! Round-robin scheduler policy.
//!
//! Treats the table as a ring and resumes the slot after the running one.
//! Exit compacts the table and steps the running slot back, so the ring
//! closes over the gap on its own.

use crate::table::ProcessTable;

/// Next slot after the running one, wrapping to slot 0.
pub fn round_robin(table: &ProcessTable) -> usize {
    match table.running() {
        Some(slot) if slot + 1 < table.len() => slot + 1,
        _ => 0,
    }
}
