//! Context switch for x86_64 (System V ABI).

use core::arch::naked_asm;

/// Words in the initial frame: the floating-point control word, six
/// callee-saved registers, the return address and two words of padding
/// that keep the trampoline's `call` 16-byte aligned.
pub const FRAME_WORDS: usize = 10;

/// Words `switch` consumes from a resumed stack before returning.
const RESTORED_WORDS: usize = 8;

/// MXCSR in the low half, x87 control word in the high half: the power-on
/// defaults (all exceptions masked, round to nearest).
const DEFAULT_FP_CONTROL: usize = 0x1F80 | (0x037F << 32);

/// Build the frame a fresh context is resumed from.
///
/// `switch` loads MXCSR and the x87 control word, pops r15, r14, r13, r12,
/// rbx and rbp in that order and then returns into [`lwp_trampoline`],
/// which finds `entry` in r12 and `arg` in r13. The saved rbp is zero so
/// frame-pointer walks stop here.
pub fn initial_frame(entry: usize, arg: usize) -> [usize; FRAME_WORDS] {
    [
        DEFAULT_FP_CONTROL,
        0,     // r15
        0,     // r14
        arg,   // r13
        entry, // r12
        0,     // rbx
        0,     // rbp
        lwp_trampoline as *const () as usize,
        0,
        0,
    ]
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
    // rdi = from, rsi = to
    naked_asm!(
        "push rbp",
        "push rbx",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "sub rsp, 8",
        "stmxcsr dword ptr [rsp]",
        "fnstcw word ptr [rsp + 4]",
        "mov [rdi], rsp",
        "mov rsp, rsi",
        "ldmxcsr dword ptr [rsp]",
        "fldcw word ptr [rsp + 4]",
        "add rsp, 8",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop rbx",
        "pop rbp",
        "ret",
    );
}

/// First instruction a new context executes.
#[unsafe(naked)]
unsafe extern "C" fn lwp_trampoline() {
    naked_asm!(
        "mov rdi, r12",
        "mov rsi, r13",
        "call {entry}",
        "ud2",
        entry = sym crate::runtime::lwp_entry,
    );
}
