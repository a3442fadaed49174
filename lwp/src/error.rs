/// Errors reported by the lightweight process runtime.
///
/// Every variant is recoverable: the runtime state is left exactly as it
/// was before the failing call.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LwpError {
    #[error("process table is full ({capacity} contexts)")]
    LimitReached { capacity: usize },

    #[error("could not allocate a stack of {words} words")]
    AllocationFailed { words: usize },

    #[error("no lightweight process is running")]
    NotRunning,

    #[error("stack of {requested} words is below the minimum of {minimum}")]
    StackTooSmall { requested: usize, minimum: usize },

    #[error("runtime is busy: contexts exist or one is running")]
    Busy,

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = core::result::Result<T, LwpError>;
