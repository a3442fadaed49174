//! Property tests for switching order: round-robin, custom policies and
//! stop/start.

use std::cell::RefCell;
use std::rc::Rc;

use lwp::{LwpId, ProcessTable, MIN_STACK_WORDS};
use proptest::prelude::*;

type Trace = Rc<RefCell<Vec<LwpId>>>;

/// Spawn a process that records its id and yields `turns` times, then
/// returns.
fn spawn_worker(trace: &Trace, turns: usize) -> LwpId {
    let trace = Rc::clone(trace);
    lwp::spawn(
        move || {
            for _ in 0..turns {
                trace.borrow_mut().push(lwp::current_id().unwrap());
                lwp::yield_now();
            }
        },
        MIN_STACK_WORDS,
    )
    .unwrap()
}

fn first_slot(_: &ProcessTable) -> usize {
    0
}

fn last_slot(table: &ProcessTable) -> usize {
    table.len() - 1
}

fn out_of_range(table: &ProcessTable) -> usize {
    table.len() + 3
}

/// Expected trace for workers with the given turns under round-robin.
fn round_robin_model(workers: &[(LwpId, usize)]) -> Vec<LwpId> {
    fn next(running: Option<usize>, len: usize) -> usize {
        match running {
            Some(slot) if slot + 1 < len => slot + 1,
            _ => 0,
        }
    }

    let mut procs = workers.to_vec();
    let mut trace = Vec::new();
    let mut slot = next(None, procs.len());
    while !procs.is_empty() {
        if procs[slot].1 > 0 {
            procs[slot].1 -= 1;
            trace.push(procs[slot].0);
            slot = next(Some(slot), procs.len());
        } else {
            procs.remove(slot);
            slot = next(slot.checked_sub(1), procs.len());
        }
    }
    trace
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Any mix of workers is interleaved exactly as the round-robin ring
    /// over the compacting table predicts.
    #[test]
    fn round_robin_matches_model(turns in prop::collection::vec(0usize..5, 1..7)) {
        let trace: Trace = Rc::default();
        let workers: Vec<(LwpId, usize)> = turns
            .iter()
            .map(|&t| (spawn_worker(&trace, t), t))
            .collect();
        let before = lwp::stats();

        lwp::start();

        prop_assert_eq!(lwp::count(), 0);
        prop_assert_eq!(lwp::stats().exited - before.exited, workers.len() as u64);
        prop_assert_eq!(trace.borrow().clone(), round_robin_model(&workers));
    }
}

#[test]
fn round_robin_cycles_and_skips_exited() {
    let trace: Trace = Rc::default();
    let a = spawn_worker(&trace, 3);
    let b = spawn_worker(&trace, 1);
    let c = spawn_worker(&trace, 3);

    lwp::start();

    assert_eq!(*trace.borrow(), vec![a, b, c, a, c, a, c]);
}

#[test]
fn exit_from_first_slot_resumes_successor() {
    let trace: Trace = Rc::default();
    spawn_worker(&trace, 0);
    let b = spawn_worker(&trace, 2);
    let c = spawn_worker(&trace, 2);

    lwp::start();

    assert_eq!(*trace.borrow(), vec![b, c, b, c]);
}

#[test]
fn custom_scheduler_applies_from_next_decision() {
    let trace: Trace = Rc::default();
    let log = Rc::clone(&trace);
    let a = lwp::spawn(
        move || {
            for turn in 0..3 {
                log.borrow_mut().push(lwp::current_id().unwrap());
                if turn == 1 {
                    lwp::set_scheduler(Some(first_slot));
                }
                lwp::yield_now();
            }
        },
        MIN_STACK_WORDS,
    )
    .unwrap();
    let b = spawn_worker(&trace, 2);
    let c = spawn_worker(&trace, 2);

    lwp::start();
    lwp::set_scheduler(Some(lwp::round_robin));

    assert_eq!(*trace.borrow(), vec![a, b, c, a, a, b, c]);
}

#[test]
fn empty_scheduler_keeps_previous() {
    lwp::set_scheduler(Some(last_slot));
    lwp::set_scheduler(None);

    let trace: Trace = Rc::default();
    let a = spawn_worker(&trace, 2);
    let b = spawn_worker(&trace, 2);

    lwp::start();
    lwp::set_scheduler(Some(lwp::round_robin));

    // last_slot keeps picking b until it is gone.
    assert_eq!(*trace.borrow(), vec![b, b, a, a]);
}

#[test]
fn out_of_range_slot_is_wrapped() {
    lwp::set_scheduler(Some(out_of_range));

    let trace: Trace = Rc::default();
    spawn_worker(&trace, 2);
    spawn_worker(&trace, 2);

    lwp::start();
    lwp::set_scheduler(Some(lwp::round_robin));

    assert_eq!(trace.borrow().len(), 4);
    assert_eq!(lwp::count(), 0);
}

#[test]
fn start_resumes_stopped_process_directly() {
    let trace = Rc::new(RefCell::new(Vec::new()));

    let log = Rc::clone(&trace);
    lwp::spawn(
        move || {
            log.borrow_mut().push(1);
            lwp::stop();
            log.borrow_mut().push(2);
        },
        MIN_STACK_WORDS,
    )
    .unwrap();
    let log = Rc::clone(&trace);
    lwp::spawn(move || log.borrow_mut().push(10), MIN_STACK_WORDS).unwrap();

    lwp::start();
    assert_eq!(*trace.borrow(), vec![1]);
    assert_eq!(lwp::count(), 2);
    assert!(!lwp::is_active());
    assert!(lwp::current_id().is_err());

    lwp::start();
    assert_eq!(*trace.borrow(), vec![1, 2, 10]);
    assert_eq!(lwp::count(), 0);
}

#[test]
fn stop_and_restart_many_times() {
    let rounds = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&rounds);
    lwp::spawn(
        move || {
            for _ in 0..5 {
                *counter.borrow_mut() += 1;
                lwp::stop();
            }
        },
        MIN_STACK_WORDS,
    )
    .unwrap();

    for expected in 1..=5 {
        lwp::start();
        assert_eq!(*rounds.borrow(), expected);
        assert_eq!(lwp::count(), 1);
    }
    lwp::start();
    assert_eq!(lwp::count(), 0);
}

#[test]
fn yield_and_stop_on_host_are_ignored() {
    let before = lwp::stats();
    lwp::yield_now();
    lwp::stop();
    assert_eq!(lwp::stats(), before);
    assert!(!lwp::is_active());
}

#[test]
fn processes_can_create_processes() {
    let trace: Trace = Rc::default();
    let outer = Rc::clone(&trace);
    let parent = lwp::spawn(
        move || {
            outer.borrow_mut().push(lwp::current_id().unwrap());
            spawn_worker(&outer, 1);
            lwp::yield_now();
            outer.borrow_mut().push(lwp::current_id().unwrap());
        },
        MIN_STACK_WORDS,
    )
    .unwrap();

    lwp::start();

    let trace = trace.borrow();
    assert_eq!(trace.len(), 3);
    assert_eq!(trace[0], parent);
    assert!(trace[1] > parent);
    assert_eq!(trace[2], parent);
    assert_eq!(lwp::count(), 0);
}

#[test]
fn runtimes_are_per_thread() {
    let trace: Trace = Rc::default();
    spawn_worker(&trace, 1);

    let other = std::thread::spawn(|| (lwp::count(), lwp::current_id().is_err()))
        .join()
        .unwrap();
    assert_eq!(other, (0, true));

    lwp::start();
    assert_eq!(trace.borrow().len(), 1);
}

#[cfg(target_arch = "x86_64")]
mod fp_control {
    use super::*;
    use std::arch::asm;

    const ROUNDING: u32 = 0x6000;
    const TOWARD_ZERO: u32 = 0x6000;

    fn mxcsr() -> u32 {
        let mut value = 0u32;
        unsafe { asm!("stmxcsr dword ptr [{}]", in(reg) &mut value) };
        value
    }

    fn set_rounding(mode: u32) {
        let value = (mxcsr() & !ROUNDING) | mode;
        unsafe { asm!("ldmxcsr dword ptr [{}]", in(reg) &value) };
    }

    #[test]
    fn rounding_mode_stays_with_its_process() {
        let host_rounding = mxcsr() & ROUNDING;
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = Rc::clone(&seen);
        lwp::spawn(
            move || {
                set_rounding(TOWARD_ZERO);
                lwp::yield_now();
                log.borrow_mut().push(("changer", mxcsr() & ROUNDING));
            },
            MIN_STACK_WORDS,
        )
        .unwrap();
        let log = Rc::clone(&seen);
        lwp::spawn(
            move || log.borrow_mut().push(("bystander", mxcsr() & ROUNDING)),
            MIN_STACK_WORDS,
        )
        .unwrap();

        lwp::start();

        assert_eq!(
            *seen.borrow(),
            vec![("bystander", 0), ("changer", TOWARD_ZERO)]
        );
        assert_eq!(mxcsr() & ROUNDING, host_rounding);
    }
}
