//! Architecture-specific context switching.
//!
//! Each backend provides the same three items:
//!
//! - `FRAME_WORDS`: size of the initial frame image written below a fresh
//!   stack's top.
//! - `initial_frame(entry, arg)`: the image itself. Resuming it lands in a
//!   trampoline that calls the runtime's entry shim with `entry` and `arg`.
//! - `switch(from, to)`: saves the callee-saved registers on the current
//!   stack, stores the stack pointer into `*from`, loads `to` as the new
//!   stack pointer and restores the registers saved there.

#[cfg(target_arch = "x86_64")]
mod x86_64;
#[cfg(target_arch = "x86_64")]
pub use self::x86_64::{initial_frame, switch, FRAME_WORDS};

#[cfg(target_arch = "aarch64")]
mod aarch64;
#[cfg(target_arch = "aarch64")]
pub use self::aarch64::{initial_frame, switch, FRAME_WORDS};

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
compile_error!("lwp supports only x86_64 and aarch64 targets");

/// Required alignment of a stack pointer at a call boundary, in bytes.
pub const STACK_ALIGN: usize = 16;
