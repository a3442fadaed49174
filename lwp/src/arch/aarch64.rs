//! Context switch for AArch64 (AAPCS64).

use core::arch::naked_asm;

/// Words in the initial frame: x19-x28, fp, lr and d8-d15.
pub const FRAME_WORDS: usize = 20;

/// Build the frame a fresh context is resumed from.
///
/// `entry` lands in x19, `arg` in x20 and the link register points at
/// [`lwp_trampoline`]. The frame pointer is zero.
pub fn initial_frame(entry: usize, arg: usize) -> [usize; FRAME_WORDS] {
    let mut frame = [0; FRAME_WORDS];
    frame[0] = entry;
    frame[1] = arg;
    frame[11] = lwp_trampoline as *const () as usize;
    frame
}

/// Swap stacks.
///
/// # Safety
///
/// - `from` must be valid for a single write.
/// - `to` must be a stack pointer previously stored by `switch` or
///   produced from [`initial_frame`], and its stack must still be alive.
#[unsafe(naked)]
pub unsafe extern "C" fn switch(_from: *mut usize, _to: usize) {
    // x0 = from, x1 = to
    naked_asm!(
        "sub sp, sp, #0xa0",
        "stp x19, x20, [sp, #0x00]",
        "stp x21, x22, [sp, #0x10]",
        "stp x23, x24, [sp, #0x20]",
        "stp x25, x26, [sp, #0x30]",
        "stp x27, x28, [sp, #0x40]",
        "stp x29, x30, [sp, #0x50]",
        "stp d8, d9, [sp, #0x60]",
        "stp d10, d11, [sp, #0x70]",
        "stp d12, d13, [sp, #0x80]",
        "stp d14, d15, [sp, #0x90]",
        "mov x2, sp",
        "str x2, [x0]",
        "mov sp, x1",
        "ldp x19, x20, [sp, #0x00]",
        "ldp x21, x22, [sp, #0x10]",
        "ldp x23, x24, [sp, #0x20]",
        "ldp x25, x26, [sp, #0x30]",
        "ldp x27, x28, [sp, #0x40]",
        "ldp x29, x30, [sp, #0x50]",
        "ldp d8, d9, [sp, #0x60]",
        "ldp d10, d11, [sp, #0x70]",
        "ldp d12, d13, [sp, #0x80]",
        "ldp d14, d15, [sp, #0x90]",
        "add sp, sp, #0xa0",
        "ret",
    );
}

/// First instruction a new context executes.
#[unsafe(naked)]
unsafe extern "C" fn lwp_trampoline() {
    naked_asm!(
        "mov x0, x19",
        "mov x1, x20",
        "bl {entry}",
        "brk #0x1",
        entry = sym crate::runtime::lwp_entry,
    );
}
