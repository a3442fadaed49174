//! Lightweight process records.

use core::fmt;

use crate::stack::Stack;

/// Entry point of a lightweight process. Receives the argument word given
/// to [`crate::create`]; returning from it exits the process.
pub type LwpFn = fn(usize);

/// Lightweight process identifier.
///
/// Ids are assigned in creation order starting at 1 and are never reused
/// within a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LwpId(pub u64);

impl LwpId {
    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LwpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A context record: identity, owned stack and the suspended stack pointer.
pub struct Lwp {
    id: LwpId,
    stack: Stack,
    /// Valid while the process is suspended. The live value sits in the
    /// CPU's stack pointer while it runs.
    saved_sp: usize,
}

impl Lwp {
    pub(crate) fn new(id: LwpId, stack: Stack, saved_sp: usize) -> Self {
        debug_assert!(stack.contains(saved_sp));
        Lwp {
            id,
            stack,
            saved_sp,
        }
    }

    pub fn id(&self) -> LwpId {
        self.id
    }

    /// Stack capacity in words.
    pub fn stack_words(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn stack(&self) -> &Stack {
        &self.stack
    }

    #[cfg(test)]
    pub(crate) fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    pub(crate) fn saved_sp(&self) -> usize {
        self.saved_sp
    }

    pub(crate) fn saved_sp_ptr(&mut self) -> *mut usize {
        core::ptr::addr_of_mut!(self.saved_sp)
    }
}

impl fmt::Debug for Lwp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lwp")
            .field("id", &self.id)
            .field("stack_words", &self.stack.len())
            .field("saved_sp", &format_args!("{:#x}", self.saved_sp))
            .finish()
    }
}
