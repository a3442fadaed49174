//! Process table.
//!
//! A fixed-capacity, gap-free sequence of context records plus the slot of
//! the one currently running. Pure bookkeeping: nothing here switches
//! stacks.

use crate::error::{LwpError, Result};
use crate::process::{Lwp, LwpId};

pub struct ProcessTable {
    procs: Vec<Lwp>,
    capacity: usize,
    /// Slot of the running (or last stopped) process. `None` before the
    /// first start and after the table has drained.
    running: Option<usize>,
}

impl ProcessTable {
    /// Create an empty table that holds at most `capacity` processes.
    pub fn with_capacity(capacity: usize) -> Self {
        ProcessTable {
            procs: Vec::with_capacity(capacity),
            capacity,
            running: None,
        }
    }

    /// Append a process and return its slot.
    pub(crate) fn push(&mut self, lwp: Lwp) -> Result<usize> {
        if self.is_full() {
            return Err(LwpError::LimitReached {
                capacity: self.capacity,
            });
        }
        self.procs.push(lwp);
        Ok(self.procs.len() - 1)
    }

    /// Remove the process in `slot`, shifting later entries down by one.
    ///
    /// A running slot after the removed one moves down with its entry.
    /// When the running process itself is removed, the running slot becomes
    /// the one before it (`None` for slot 0), so that round-robin picks the
    /// removed process's successor next.
    pub(crate) fn remove(&mut self, slot: usize) -> Lwp {
        let lwp = self.procs.remove(slot);
        self.running = match self.running {
            Some(r) if r > slot => Some(r - 1),
            Some(r) if r == slot => slot.checked_sub(1),
            other => other,
        };
        lwp
    }

    pub fn get(&self, slot: usize) -> Option<&Lwp> {
        self.procs.get(slot)
    }

    pub(crate) fn get_mut(&mut self, slot: usize) -> Option<&mut Lwp> {
        self.procs.get_mut(slot)
    }

    /// Slot currently holding `id`.
    pub fn slot_of(&self, id: LwpId) -> Option<usize> {
        self.procs.iter().position(|p| p.id() == id)
    }

    /// Ids in slot order.
    pub fn ids(&self) -> impl Iterator<Item = LwpId> + '_ {
        self.procs.iter().map(Lwp::id)
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.procs.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn running(&self) -> Option<usize> {
        self.running
    }

    pub(crate) fn set_running(&mut self, slot: Option<usize>) {
        debug_assert!(slot.map_or(true, |s| s < self.procs.len()));
        self.running = slot;
    }
}
