//! Context-switch engine.
//!
//! Owns the per-thread runtime state (process table, scheduler, host stack
//! pointer) and implements the four transitions: start, yield, stop and
//! exit.
//!
//! Every transition follows the same pattern: borrow the runtime, work out
//! which stack pointer to save into and which one to resume, release the
//! borrow, and only then swap stacks. No borrow is ever held across a
//! switch, so whichever execution stream lands on the other side can borrow
//! the runtime again.

use core::cell::RefCell;
use core::ptr;

use crate::arch;
use crate::config::Config;
use crate::error::{LwpError, Result};
use crate::process::{Lwp, LwpFn, LwpId};
use crate::scheduler::{SchedFn, Scheduler};
use crate::stack::Stack;
use crate::table::ProcessTable;

thread_local! {
    /// The runtime driven by this host thread.
    static RUNTIME: RefCell<Runtime> = RefCell::new(Runtime::new(Config::default()));
}

/// Runtime counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Processes successfully created.
    pub created: u64,
    /// Processes whose exit completed and whose stack was released.
    pub exited: u64,
    /// Stack swaps performed.
    pub context_switches: u64,
}

/// A stack swap worked out under the runtime borrow.
struct Switch {
    from: *mut usize,
    to: usize,
}

impl Switch {
    /// # Safety
    ///
    /// No runtime borrow may be live, and `from`/`to` must satisfy
    /// [`arch::switch`].
    unsafe fn perform(self) {
        // SAFETY: forwarded to the caller.
        unsafe { arch::switch(self.from, self.to) }
    }
}

pub(crate) struct Runtime {
    config: Config,
    table: ProcessTable,
    scheduler: Scheduler,
    /// True while a process runs, false while the host thread does.
    active: bool,
    /// Host stack pointer, saved by `start` and resumed by `stop`.
    host_sp: usize,
    /// Spill slot for the registers of a process that is exiting.
    discard_sp: usize,
    /// A process that exited but whose stack was still in use.
    exited: Option<Lwp>,
    next_id: u64,
    stats: Stats,
}

impl Runtime {
    fn new(config: Config) -> Self {
        Runtime {
            table: ProcessTable::with_capacity(config.capacity),
            config,
            scheduler: Scheduler::default(),
            active: false,
            host_sp: 0,
            discard_sp: 0,
            exited: None,
            next_id: 1,
            stats: Stats::default(),
        }
    }

    fn configure(&mut self, config: Config) -> Result<()> {
        config.validate()?;
        if self.active || !self.table.is_empty() {
            return Err(LwpError::Busy);
        }
        log::debug!(
            "[LWP] configured: capacity {}, minimum stack {} words",
            config.capacity,
            config.min_stack_words
        );
        self.table = ProcessTable::with_capacity(config.capacity);
        self.config = config;
        Ok(())
    }

    fn create(&mut self, entry: LwpFn, arg: usize, stack_words: usize) -> Result<LwpId> {
        if self.table.is_full() {
            return Err(LwpError::LimitReached {
                capacity: self.table.capacity(),
            });
        }
        if stack_words < self.config.min_stack_words {
            return Err(LwpError::StackTooSmall {
                requested: stack_words,
                minimum: self.config.min_stack_words,
            });
        }

        let mut stack = Stack::new(stack_words)?;
        let saved_sp = stack.prepare(entry as *const () as usize, arg);

        let id = LwpId(self.next_id);
        let slot = self.table.push(Lwp::new(id, stack, saved_sp))?;
        self.next_id += 1;
        self.stats.created += 1;

        log::debug!(
            "[LWP] created lwp {} in slot {} ({} words)",
            id,
            slot,
            stack_words
        );
        Ok(id)
    }

    fn current_id(&self) -> Result<LwpId> {
        if !self.active {
            return Err(LwpError::NotRunning);
        }
        self.table
            .running()
            .and_then(|slot| self.table.get(slot))
            .map(Lwp::id)
            .ok_or(LwpError::NotRunning)
    }

    fn pick(&self) -> usize {
        self.scheduler.pick(&self.table)
    }

    /// Stack pointer saved by the process in `slot`.
    fn resume_point(&self, slot: usize) -> usize {
        let lwp = self.table.get(slot).expect("running slot is live");
        debug_assert!(lwp.stack().contains(lwp.saved_sp()));
        lwp.saved_sp()
    }

    fn save_point(&mut self, slot: usize) -> *mut usize {
        self.table
            .get_mut(slot)
            .expect("running slot is live")
            .saved_sp_ptr()
    }

    /// Id of the process in `slot` if it ran off the bottom of its stack.
    fn overflowed(&self, slot: usize) -> Option<LwpId> {
        self.table
            .get(slot)
            .filter(|lwp| !lwp.stack().canary_intact())
            .map(Lwp::id)
    }

    /// Abort if the process in `slot` ran off the bottom of its stack.
    fn check_stack(&self, slot: usize) {
        if let Some(id) = self.overflowed(slot) {
            log::error!("[LWP] stack overflow in lwp {}", id);
            std::process::abort();
        }
    }

    fn prepare_start(&mut self) -> Option<Switch> {
        if self.active {
            log::warn!("[LWP] start called from inside a lightweight process");
            return None;
        }
        if self.table.is_empty() {
            log::debug!("[LWP] start with no processes");
            return None;
        }

        // A stopped process is resumed directly.
        let slot = match self.table.running() {
            Some(slot) => slot,
            None => {
                let slot = self.pick();
                self.table.set_running(Some(slot));
                slot
            }
        };

        self.active = true;
        self.stats.context_switches += 1;
        log::trace!("[LWP] host -> slot {}", slot);

        Some(Switch {
            from: ptr::addr_of_mut!(self.host_sp),
            to: self.resume_point(slot),
        })
    }

    fn prepare_yield(&mut self) -> Option<Switch> {
        let current = match (self.active, self.table.running()) {
            (true, Some(slot)) => slot,
            _ => {
                log::warn!("[LWP] yield called outside a lightweight process");
                return None;
            }
        };
        self.check_stack(current);

        let next = self.pick();
        self.table.set_running(Some(next));
        if next == current {
            return None;
        }

        self.stats.context_switches += 1;
        log::trace!("[LWP] slot {} -> slot {}", current, next);

        Some(Switch {
            from: self.save_point(current),
            to: self.resume_point(next),
        })
    }

    fn prepare_stop(&mut self) -> Option<Switch> {
        let current = match (self.active, self.table.running()) {
            (true, Some(slot)) => slot,
            _ => {
                log::warn!("[LWP] stop called outside a lightweight process");
                return None;
            }
        };
        self.check_stack(current);

        // The running slot stays put so the next start resumes this process.
        self.active = false;
        self.stats.context_switches += 1;
        log::trace!("[LWP] slot {} -> host", current);

        Some(Switch {
            from: self.save_point(current),
            to: self.host_sp,
        })
    }

    fn prepare_exit(&mut self) -> Switch {
        let slot = match (self.active, self.table.running()) {
            (true, Some(slot)) => slot,
            _ => panic!("lwp::exit called outside a lightweight process"),
        };
        self.check_stack(slot);

        let lwp = self.table.remove(slot);
        log::debug!("[LWP] lwp {} exited from slot {}", lwp.id(), slot);
        // Still executing on this stack; the next stream to run drops it.
        if let Some(previous) = self.exited.replace(lwp) {
            self.release(previous);
        }

        let to = if self.table.is_empty() {
            self.active = false;
            self.table.set_running(None);
            log::trace!("[LWP] last process gone, returning to host");
            self.host_sp
        } else {
            let next = self.pick();
            self.table.set_running(Some(next));
            log::trace!("[LWP] exit -> slot {}", next);
            self.resume_point(next)
        };
        self.stats.context_switches += 1;

        Switch {
            from: ptr::addr_of_mut!(self.discard_sp),
            to,
        }
    }

    /// Release the stack of a process that has finished exiting.
    fn reap(&mut self) {
        if let Some(lwp) = self.exited.take() {
            self.release(lwp);
        }
    }

    fn release(&mut self, lwp: Lwp) {
        log::trace!(
            "[LWP] released {} stack words of lwp {}",
            lwp.stack_words(),
            lwp.id()
        );
        self.stats.exited += 1;
        drop(lwp);
    }
}

fn with_runtime<R>(f: impl FnOnce(&mut Runtime) -> R) -> R {
    RUNTIME.with(|rt| f(&mut *rt.borrow_mut()))
}

/// Land on the far side of a switch: drop whatever exited on the way.
fn resumed() {
    with_runtime(Runtime::reap);
}

/// Rust-side entry of every new process, called from the architecture
/// trampoline with the words bound by the stack builder.
pub(crate) extern "C" fn lwp_entry(entry: usize, arg: usize) -> ! {
    resumed();
    // SAFETY: `entry` was produced from an `LwpFn` by `Runtime::create`.
    let entry = unsafe { core::mem::transmute::<usize, LwpFn>(entry) };
    entry(arg);
    exit()
}

// ==================== Public operations ====================

/// Replace this thread's runtime configuration.
///
/// Only allowed while no process exists.
pub fn configure(config: Config) -> Result<()> {
    with_runtime(|rt| rt.configure(config))
}

/// Create a process that will run `entry(arg)` on a stack of
/// `stack_words` machine words.
///
/// The process does not run until [`start`] (or a [`yield_now`] from
/// another process) selects it. Returning from `entry` exits it.
pub fn create(entry: LwpFn, arg: usize, stack_words: usize) -> Result<LwpId> {
    with_runtime(|rt| rt.create(entry, arg, stack_words))
}

/// Create a process that runs a closure.
///
/// If the process is never scheduled before the host thread ends, the
/// closure is leaked rather than dropped.
pub fn spawn<F>(f: F, stack_words: usize) -> Result<LwpId>
where
    F: FnOnce() + 'static,
{
    let boxed: Box<Box<dyn FnOnce()>> = Box::new(Box::new(f));
    let arg = Box::into_raw(boxed) as usize;
    create(run_boxed, arg, stack_words).inspect_err(|_| {
        // SAFETY: creation failed, so no process took ownership of `arg`.
        drop(unsafe { Box::from_raw(arg as *mut Box<dyn FnOnce()>) });
    })
}

fn run_boxed(arg: usize) {
    // SAFETY: `spawn` handed over ownership of this box as the argument.
    let f = unsafe { Box::from_raw(arg as *mut Box<dyn FnOnce()>) };
    f();
}

/// Id of the running process, or [`LwpError::NotRunning`] on the host.
pub fn current_id() -> Result<LwpId> {
    with_runtime(|rt| rt.current_id())
}

/// Hand the host thread to the runtime.
///
/// Resumes the process that was last stopped, or asks the scheduler for
/// one. Returns once a process calls [`stop`] or the last process exits.
/// Does nothing if there are no processes.
pub fn start() {
    let switch = with_runtime(Runtime::prepare_start);
    if let Some(switch) = switch {
        // SAFETY: the borrow is released; `host_sp` lives in the
        // thread-local runtime and the target stack is owned by the table.
        unsafe { switch.perform() };
        resumed();
    }
}

/// Give up the CPU to the process the scheduler picks next.
///
/// Returns when this process is scheduled again. Does nothing on the host.
pub fn yield_now() {
    let switch = with_runtime(Runtime::prepare_yield);
    if let Some(switch) = switch {
        // SAFETY: both stacks are owned by live table entries.
        unsafe { switch.perform() };
        resumed();
    }
}

/// Suspend the runtime and return to the host thread's [`start`] call.
///
/// The calling process resumes from here on the next [`start`].
pub fn stop() {
    let switch = with_runtime(Runtime::prepare_stop);
    if let Some(switch) = switch {
        // SAFETY: the saved slot belongs to a live table entry and
        // `host_sp` was stored by `start`.
        unsafe { switch.perform() };
        resumed();
    }
}

/// Terminate the calling process.
///
/// Control passes to the next scheduled process, or back to the host if
/// this was the last one.
///
/// The caller's stack is released without unwinding it: locals still alive
/// in any frame above this call, including a spawned closure and whatever
/// it captured, are never dropped. Returning from the entry function
/// instead drops them normally.
///
/// # Panics
///
/// Panics if called from the host thread.
pub fn exit() -> ! {
    let switch = with_runtime(Runtime::prepare_exit);
    // SAFETY: the record is parked in the runtime, so this stack outlives
    // the switch; the target was saved by a live process or by `start`.
    unsafe { switch.perform() };
    unreachable!("exited lightweight process was resumed");
}

/// Install a scheduling policy. `None` keeps the current one.
pub fn set_scheduler(policy: Option<SchedFn>) {
    with_runtime(|rt| match policy {
        Some(policy) => {
            log::debug!("[LWP] scheduler replaced");
            rt.scheduler.replace(policy);
        }
        None => log::debug!("[LWP] ignoring empty scheduler"),
    })
}

/// Number of live processes.
pub fn count() -> usize {
    with_runtime(|rt| rt.table.len())
}

/// Capacity of the process table.
pub fn capacity() -> usize {
    with_runtime(|rt| rt.table.capacity())
}

/// Whether a process (rather than the host) is executing.
pub fn is_active() -> bool {
    with_runtime(|rt| rt.active)
}

pub fn stats() -> Stats {
    with_runtime(|rt| rt.stats)
}
