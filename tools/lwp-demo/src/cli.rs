use clap::{Parser, ValueEnum};

/// Run a handful of lightweight processes that print indented counters.
#[derive(Parser, Debug)]
#[command(name = "lwp-demo", version, about)]
pub struct Cli {
    /// Number of lightweight processes to create.
    #[arg(short = 'n', long, default_value_t = 5)]
    pub processes: usize,

    /// Lines printed by the first process; each later one prints one more.
    #[arg(short, long, default_value_t = 3)]
    pub turns: usize,

    /// Stack size of every process, in machine words.
    #[arg(long, default_value_t = lwp::DEFAULT_STACK_WORDS)]
    pub stack_words: usize,

    /// Scheduling policy.
    #[arg(long, value_enum, default_value = "round-robin")]
    pub policy: Policy,

    /// Return to the host every N switches (0 runs to completion).
    #[arg(long, default_value_t = 0)]
    pub pause_every: usize,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    /// Visit processes in table order.
    RoundRobin,
    /// Visit processes in reverse table order.
    Reverse,
}
