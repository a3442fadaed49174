//! Runtime configuration constants.
//!
//! Values here bound the process table and the stacks handed out by the
//! stack builder. A [`Config`] built from them can be installed with
//! [`crate::configure`] while the runtime is idle.

use crate::error::{LwpError, Result};

/// Default capacity of the process table.
pub const LWP_PROC_LIMIT: usize = 30;

/// Smallest stack accepted by [`crate::create`], in machine words (32 KiB on
/// 64-bit targets).
///
/// The initial frame only needs a handful of words, but the entry function
/// runs ordinary Rust code (formatting, logging) on this stack.
pub const MIN_STACK_WORDS: usize = 4 * 1024;

/// Stack size used by callers with no particular requirement (128 KiB).
pub const DEFAULT_STACK_WORDS: usize = 16 * 1024;

/// Value stored in the lowest word of every stack.
pub const STACK_CANARY: usize = 0x5AFE_57AC_u32 as usize;

/// Per-runtime configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of live contexts.
    pub capacity: usize,
    /// Smallest stack, in words, that `create` accepts.
    pub min_stack_words: usize,
}

impl Config {
    /// Check the configuration for values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(LwpError::InvalidConfig("capacity must be non-zero"));
        }
        if self.min_stack_words <= crate::arch::FRAME_WORDS + 1 {
            return Err(LwpError::InvalidConfig(
                "min_stack_words must exceed the initial frame",
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            capacity: LWP_PROC_LIMIT,
            min_stack_words: MIN_STACK_WORDS,
        }
    }
}
