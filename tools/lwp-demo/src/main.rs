pub mod cli;

use std::process::ExitCode;

use clap::Parser;
use lwp::ProcessTable;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Policy};

/// Columns of indentation per process id.
const INDENT: usize = 4;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("lwp-demo: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> lwp::Result<()> {
    if cli.policy == Policy::Reverse {
        lwp::set_scheduler(Some(reverse));
    }

    for i in 0..cli.processes {
        lwp::create(indent_count, cli.turns + i, cli.stack_words)?;
    }
    if cli.pause_every > 0 {
        let every = cli.pause_every;
        lwp::spawn(move || pauser(every), cli.stack_words)?;
    }

    let mut pauses = 0;
    loop {
        lwp::start();
        if lwp::count() == 0 {
            break;
        }
        pauses += 1;
        println!("-- paused with {} processes left --", lwp::count());
    }

    let stats = lwp::stats();
    log::info!(
        "{} processes, {} context switches, {} pauses",
        stats.created,
        stats.context_switches,
        pauses
    );
    Ok(())
}

/// Print `turns` counters indented by this process's id, yielding after
/// each line.
fn indent_count(turns: usize) {
    let Ok(id) = lwp::current_id() else {
        return;
    };
    let width = id.as_u64() as usize * INDENT;
    for i in 0..turns {
        println!("{:width$}{}", "", i, width = width);
        lwp::yield_now();
    }
    log::debug!("lwp {} finished after {} lines", id, turns);
}

/// Stop the runtime every `every` switches until only this process is left.
fn pauser(every: usize) {
    while lwp::count() > 1 {
        for _ in 0..every {
            lwp::yield_now();
        }
        if lwp::count() > 1 {
            lwp::stop();
        }
    }
}

/// Previous slot, wrapping to the last one.
///
/// Exit steps the running slot back by one for the benefit of forward
/// policies, so right after an exit this one skips the exited process's
/// predecessor for a round.
fn reverse(table: &ProcessTable) -> usize {
    match table.running() {
        Some(slot) if slot > 0 => slot - 1,
        _ => table.len() - 1,
    }
}
