//! Re-entrant use of a signal from inside its own dispatch pass.
//!
//! Covers:
//! 1. Listeners added mid-pass run from the next pass on.
//! 2. Siblings removed mid-pass still run in the current pass (cohort frozen).
//! 3. Nested dispatch runs to completion before the outer pass resumes.
//! 4. `halt()` affects only the innermost running pass.
//! 5. Listener panics propagate and leave the signal usable.
//! 6. A stale once-entry in the cohort never removes a newer binding.
//!
//! Listeners reach their signal through a `WeakSignal` so no test leaks.

use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use ftui_signal::{Binding, Listener, Propagation, Signal, WeakSignal};

type Log = Rc<RefCell<Vec<String>>>;

fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn recorder(log: &Log, name: &'static str) -> Listener<u32> {
    let log = Rc::clone(log);
    Listener::new(move |v: &u32| log.borrow_mut().push(format!("{name}{v}")))
}

fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

fn live(weak: &WeakSignal<u32>) -> Signal<u32> {
    weak.upgrade().expect("signal outlives its dispatch")
}

// ── Mutation during dispatch ────────────────────────────────────────────

#[test]
fn listener_added_mid_pass_runs_next_pass() {
    let signal: Signal<u32> = Signal::new();
    let log = new_log();
    let late = recorder(&log, "late");

    let handle = signal.downgrade();
    let late_clone = late.clone();
    let adder_log = Rc::clone(&log);
    signal
        .add(&Listener::new(move |v: &u32| {
            adder_log.borrow_mut().push(format!("adder{v}"));
            live(&handle).add(&late_clone).unwrap();
        }))
        .unwrap();

    signal.dispatch(1);
    assert_eq!(entries(&log), vec!["adder1"]);
    assert_eq!(signal.num_listeners(), 2);

    signal.dispatch(2);
    assert_eq!(entries(&log), vec!["adder1", "adder2", "late2"]);
    // Re-adding on every pass is idempotent.
    assert_eq!(signal.num_listeners(), 2);
}

#[test]
fn listener_re_adding_itself_is_not_invoked_twice() {
    let signal: Signal<u32> = Signal::new();
    let calls = Rc::new(Cell::new(0u32));

    let slot: Rc<RefCell<Option<Listener<u32>>>> = Rc::new(RefCell::new(None));
    let handle = signal.downgrade();
    let slot_clone = Rc::clone(&slot);
    let calls_clone = Rc::clone(&calls);
    let listener = Listener::new(move |_: &u32| {
        calls_clone.set(calls_clone.get() + 1);
        if let Some(me) = slot_clone.borrow().as_ref() {
            live(&handle).remove(me);
            live(&handle).add(me).unwrap();
        }
    });
    *slot.borrow_mut() = Some(listener.clone());

    signal.add(&listener).unwrap();
    signal.dispatch(0);
    assert_eq!(calls.get(), 1);
    signal.dispatch(0);
    assert_eq!(calls.get(), 2);

    slot.borrow_mut().take();
}

#[test]
fn sibling_removed_mid_pass_still_runs_this_pass() {
    let signal: Signal<u32> = Signal::new();
    let log = new_log();
    let victim = recorder(&log, "victim");

    let handle = signal.downgrade();
    let victim_clone = victim.clone();
    signal
        .add(&Listener::new(move |_: &u32| {
            live(&handle).remove(&victim_clone);
        }))
        .unwrap();
    let victim_binding = signal.add(&victim).unwrap();

    signal.dispatch(1);
    assert_eq!(entries(&log), vec!["victim1"]);
    assert!(!victim_binding.is_bound());
    assert_eq!(signal.num_listeners(), 1);

    signal.dispatch(2);
    assert_eq!(entries(&log), vec!["victim1"]);
}

#[test]
fn remove_all_mid_pass_keeps_cohort() {
    let signal: Signal<u32> = Signal::new();
    let log = new_log();

    let handle = signal.downgrade();
    signal
        .add(&Listener::new(move |_: &u32| live(&handle).remove_all()))
        .unwrap();
    signal.add(&recorder(&log, "b")).unwrap();

    signal.dispatch(1);
    assert_eq!(entries(&log), vec!["b1"]);
    assert_eq!(signal.num_listeners(), 0);
}

// ── Nested dispatch ─────────────────────────────────────────────────────

#[test]
fn nested_dispatch_completes_before_outer_resumes() {
    let signal: Signal<u32> = Signal::new();
    let log = new_log();

    let handle = signal.downgrade();
    let a_log = Rc::clone(&log);
    signal
        .add(&Listener::new(move |depth: &u32| {
            a_log.borrow_mut().push(format!("a{depth}"));
            if *depth == 0 {
                live(&handle).dispatch(1);
            }
        }))
        .unwrap();
    signal.add(&recorder(&log, "b")).unwrap();

    signal.dispatch(0);
    assert_eq!(entries(&log), vec!["a0", "a1", "b1", "b0"]);
}

#[test]
fn halt_in_nested_pass_does_not_stop_outer() {
    let signal: Signal<u32> = Signal::new();
    let log = new_log();

    let handle = signal.downgrade();
    let a_log = Rc::clone(&log);
    signal
        .add(&Listener::new(move |depth: &u32| {
            a_log.borrow_mut().push(format!("a{depth}"));
            if *depth == 0 {
                live(&handle).dispatch(1);
            } else {
                live(&handle).halt();
            }
        }))
        .unwrap();
    signal.add(&recorder(&log, "b")).unwrap();

    signal.dispatch(0);
    assert_eq!(entries(&log), vec!["a0", "a1", "b0"]);
}

#[test]
fn halt_before_nested_pass_is_not_inherited() {
    let signal: Signal<u32> = Signal::new();
    let log = new_log();

    let handle = signal.downgrade();
    let a_log = Rc::clone(&log);
    signal
        .add(&Listener::new(move |depth: &u32| {
            a_log.borrow_mut().push(format!("a{depth}"));
            if *depth == 0 {
                live(&handle).halt();
                live(&handle).dispatch(1);
            }
        }))
        .unwrap();
    signal.add(&recorder(&log, "b")).unwrap();

    signal.dispatch(0);
    // The inner pass runs fully; the outer pass honours its own halt.
    assert_eq!(entries(&log), vec!["a0", "a1", "b1"]);
}

#[test]
fn once_listener_is_gone_for_nested_dispatch() {
    let signal: Signal<u32> = Signal::new();
    let calls = Rc::new(Cell::new(0u32));

    let handle = signal.downgrade();
    let calls_clone = Rc::clone(&calls);
    let binding = signal
        .add_once(&Listener::new(move |depth: &u32| {
            calls_clone.set(calls_clone.get() + 1);
            if *depth == 0 {
                live(&handle).dispatch(1);
            }
        }))
        .unwrap();

    signal.dispatch(0);
    assert_eq!(calls.get(), 1);
    assert!(!binding.is_bound());
}

#[test]
fn stale_once_entry_leaves_readded_binding_alone() {
    let signal: Signal<u32> = Signal::new();
    let calls = Rc::new(Cell::new(0u32));
    let calls_clone = Rc::clone(&calls);
    let target = Listener::new(move |_: &u32| calls_clone.set(calls_clone.get() + 1));

    // The first listener swaps the target's once-binding for a new one
    // while the old binding is still in the cohort.
    let fresh: Rc<RefCell<Option<Binding<u32>>>> = Rc::new(RefCell::new(None));
    let handle = signal.downgrade();
    let target_clone = target.clone();
    let fresh_slot = Rc::clone(&fresh);
    signal
        .add(&Listener::new(move |v: &u32| {
            if *v == 0 {
                let signal = live(&handle);
                signal.remove(&target_clone);
                *fresh_slot.borrow_mut() = Some(signal.add_once(&target_clone).unwrap());
            }
        }))
        .unwrap();
    let stale = signal.add_once(&target).unwrap();

    signal.dispatch(0);
    assert_eq!(calls.get(), 1);
    assert!(!stale.is_bound());
    let fresh = fresh.borrow().clone().expect("listener re-added the target");
    assert!(!Binding::ptr_eq(&stale, &fresh));
    assert!(fresh.is_bound());
    assert!(signal.has(&target));
    assert_eq!(signal.num_listeners(), 2);

    signal.dispatch(1);
    assert_eq!(calls.get(), 2);
    assert!(!fresh.is_bound());
    assert_eq!(signal.num_listeners(), 1);
}

// ── Propagation verdicts ────────────────────────────────────────────────

#[test]
fn explicit_halt_verdict() {
    let signal: Signal<u32> = Signal::new();
    let log = new_log();
    signal
        .add(&Listener::new(|v: &u32| {
            if *v > 10 {
                Propagation::Halt
            } else {
                Propagation::Continue
            }
        }))
        .unwrap();
    signal.add(&recorder(&log, "tail")).unwrap();

    signal.dispatch(5);
    signal.dispatch(50);
    signal.dispatch(6);
    assert_eq!(entries(&log), vec!["tail5", "tail6"]);
}

#[test]
fn disabled_binding_does_not_halt() {
    let signal: Signal<u32> = Signal::new();
    let log = new_log();
    let stopper = signal.add(&Listener::new(|_: &u32| false)).unwrap();
    signal.add(&recorder(&log, "tail")).unwrap();

    stopper.disable();
    signal.dispatch(1);
    assert_eq!(entries(&log), vec!["tail1"]);
}

// ── Panics ──────────────────────────────────────────────────────────────

#[test]
fn listener_panic_propagates_and_skips_rest() {
    let signal: Signal<u32> = Signal::new();
    let log = new_log();

    signal.add(&recorder(&log, "a")).unwrap();
    signal
        .add(&Listener::new(|v: &u32| {
            if *v == 1 {
                panic!("listener failure");
            }
        }))
        .unwrap();
    signal.add(&recorder(&log, "c")).unwrap();

    let result = catch_unwind(AssertUnwindSafe(|| signal.dispatch(1)));
    assert!(result.is_err());
    assert_eq!(entries(&log), vec!["a1"]);

    // Pass state was released: halt() is a no-op again and dispatch works.
    signal.halt();
    signal.dispatch(2);
    assert_eq!(entries(&log), vec!["a1", "a2", "c2"]);
    assert_eq!(signal.num_listeners(), 3);
}

#[test]
fn panicking_once_listener_is_still_consumed() {
    let signal: Signal<u32> = Signal::new();
    let binding = signal
        .add_once(&Listener::new(|_: &u32| -> () { panic!("boom") }))
        .unwrap();

    let result = catch_unwind(AssertUnwindSafe(|| signal.dispatch(0)));
    assert!(result.is_err());
    assert!(!binding.is_bound());
    assert_eq!(signal.num_listeners(), 0);
}
