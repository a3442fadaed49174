//! Cooperative lightweight processes.
//!
//! Many independently-stacked execution contexts are multiplexed onto the
//! host thread that drives them. Switches happen only at explicit calls:
//! [`start`], [`yield_now`], [`stop`] and [`exit`]. Which process runs next
//! is decided by a replaceable [`SchedFn`]; the default is [`round_robin`].
//!
//! Each host thread owns an independent runtime.
//!
//! ```no_run
//! fn worker(arg: usize) {
//!     for _ in 0..arg {
//!         println!("lwp {}", lwp::current_id().unwrap());
//!         lwp::yield_now();
//!     }
//! }
//!
//! lwp::create(worker, 3, lwp::DEFAULT_STACK_WORDS).unwrap();
//! lwp::create(worker, 2, lwp::DEFAULT_STACK_WORDS).unwrap();
//! lwp::start();
//! assert_eq!(lwp::count(), 0);
//! ```
//!
//! A panic inside a process aborts the whole program: there is no frame to
//! unwind into above a process's entry function.

mod arch;
pub mod config;
pub mod error;
pub mod process;
pub mod runtime;
pub mod scheduler;
pub mod stack;
pub mod table;

pub use config::{Config, DEFAULT_STACK_WORDS, LWP_PROC_LIMIT, MIN_STACK_WORDS};
pub use error::{LwpError, Result};
pub use process::{Lwp, LwpFn, LwpId};
pub use runtime::{
    capacity, configure, count, create, current_id, exit, is_active, set_scheduler, spawn,
    start, stats, stop, yield_now, Stats,
};
pub use scheduler::{round_robin, SchedFn};
pub use table::ProcessTable;
