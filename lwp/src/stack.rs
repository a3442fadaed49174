//! Stack builder.
//!
//! Allocates the word buffer a context runs on and writes the initial
//! frame image at its high end, so that the first switch into the context
//! behaves as if it had been suspended right after entering its entry
//! function.

use core::mem::size_of;

use crate::arch::{self, FRAME_WORDS, STACK_ALIGN};
use crate::config::STACK_CANARY;
use crate::error::{LwpError, Result};

const WORD: usize = size_of::<usize>();

/// An owned, heap-allocated context stack.
///
/// The buffer never moves once allocated, so stack pointers into it stay
/// valid while the owning record is shuffled around the process table.
pub struct Stack {
    words: Box<[usize]>,
}

impl Stack {
    /// Allocate a zeroed stack of `words` machine words.
    ///
    /// Allocation failure is reported instead of aborting the process.
    pub fn new(words: usize) -> Result<Self> {
        if words <= FRAME_WORDS + 1 {
            return Err(LwpError::StackTooSmall {
                requested: words,
                minimum: FRAME_WORDS + 2,
            });
        }

        let mut buf: Vec<usize> = Vec::new();
        buf.try_reserve_exact(words)
            .map_err(|_| LwpError::AllocationFailed { words })?;
        buf.resize(words, 0);
        // Stacks grow down; the lowest word is the last one an overflow hits.
        buf[0] = STACK_CANARY;

        Ok(Stack {
            words: buf.into_boxed_slice(),
        })
    }

    /// Size of the stack in words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Lowest address of the buffer.
    pub fn base(&self) -> usize {
        self.words.as_ptr() as usize
    }

    /// One past the highest address of the buffer.
    pub fn end(&self) -> usize {
        self.base() + self.words.len() * WORD
    }

    /// Whether `sp` points into this stack.
    pub fn contains(&self, sp: usize) -> bool {
        (self.base()..self.end()).contains(&sp)
    }

    /// Whether the guard word at the bottom of the stack is untouched.
    pub fn canary_intact(&self) -> bool {
        self.words[0] == STACK_CANARY
    }

    /// Overwrite the guard word, as a stack overflow would.
    #[cfg(test)]
    pub(crate) fn clobber_canary(&mut self) {
        self.words[0] = !STACK_CANARY;
    }

    /// Write the initial frame for `entry(arg)` and return the stack
    /// pointer to resume it from.
    ///
    /// The frame sits directly below the highest `STACK_ALIGN`-aligned
    /// address in the buffer.
    pub fn prepare(&mut self, entry: usize, arg: usize) -> usize {
        let base = self.base();
        let top = self.end() & !(STACK_ALIGN - 1);
        let end = (top - base) / WORD;
        let start = end - FRAME_WORDS;

        self.words[start..end].copy_from_slice(&arch::initial_frame(entry, arg));
        base + start * WORD
    }
}
