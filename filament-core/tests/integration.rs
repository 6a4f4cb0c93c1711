//! Integration Tests for the Reactive System
//!
//! These tests verify that signals, memos, effects, owners, and the
//! scheduler work together correctly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use filament_core::{
    batch, clear_error_hook, create_context, create_effect, create_root, create_system_effect,
    on_cleanup, provide_context, run, set_error_hook, untrack, use_context, Memo, Signal,
};

/// A signal flowing through a memo into an effect: the canonical pipeline.
#[test]
fn signal_memo_effect_pipeline() {
    run(|| {
        create_root(|_| {
            let count = Signal::new(1);
            let log = Rc::new(RefCell::new(Vec::new()));

            let source = count.clone();
            let doubled = Memo::new(move || source.get() * 2);

            let sink = log.clone();
            create_effect(move || sink.borrow_mut().push(doubled.get()));

            // The effect ran once on creation with the memo's primed value.
            assert_eq!(*log.borrow(), vec![2]);

            count.set(2);
            assert_eq!(*log.borrow(), vec![2, 4]);

            // Writing an equal value is a complete no-op.
            count.set(2);
            assert_eq!(*log.borrow(), vec![2, 4]);
        });
    });
}

/// A diamond dependency graph must update each node exactly once per
/// change, with no intermediate (glitched) values observable.
#[test]
fn diamond_updates_without_glitches() {
    run(|| {
        create_root(|_| {
            let source = Signal::new(1);
            let c_runs = Rc::new(Cell::new(0));
            let effect_runs = Rc::new(Cell::new(0));
            let seen = Rc::new(RefCell::new(Vec::new()));

            let input = source.clone();
            let left = Memo::new(move || input.get() + 1);
            let input = source.clone();
            let right = Memo::new(move || input.get() * 10);

            let counter = c_runs.clone();
            let (l, r) = (left.clone(), right.clone());
            let sum = Memo::new(move || {
                counter.set(counter.get() + 1);
                l.get() + r.get()
            });

            let counter = effect_runs.clone();
            let log = seen.clone();
            let observed = sum.clone();
            create_effect(move || {
                counter.set(counter.get() + 1);
                log.borrow_mut().push(observed.get());
            });

            assert_eq!(c_runs.get(), 1);
            assert_eq!(effect_runs.get(), 1);
            assert_eq!(*seen.borrow(), vec![12]);

            source.set(2);

            // One recomputation of the join, one effect run, and the
            // only observed value mixes both updated branches.
            assert_eq!(c_runs.get(), 2);
            assert_eq!(effect_runs.get(), 2);
            assert_eq!(*seen.borrow(), vec![12, 23]);
        });
    });
}

/// A branch that recomputes to an equal value must not wake the join.
#[test]
fn unchanged_branch_settles_quietly() {
    run(|| {
        create_root(|_| {
            let source = Signal::new(5);
            let join_runs = Rc::new(Cell::new(0));

            let input = source.clone();
            let clamped = Memo::new(move || input.get().min(10));

            let counter = join_runs.clone();
            let upstream = clamped.clone();
            let _join = Memo::new(move || {
                counter.set(counter.get() + 1);
                upstream.get()
            });
            assert_eq!(join_runs.get(), 1);

            // 20 and 30 both clamp to 10: the first write changes the
            // memo, the second recomputes it to an equal value.
            source.set(20);
            assert_eq!(join_runs.get(), 2);

            source.set(30);
            assert_eq!(join_runs.get(), 2);
        });
    });
}

/// Batched writes coalesce into a single drain: every affected node runs
/// once, after all writes have landed.
#[test]
fn batch_coalesces_writes() {
    run(|| {
        create_root(|_| {
            let first = Signal::new(1);
            let second = Signal::new(2);
            let seen = Rc::new(RefCell::new(Vec::new()));

            let log = seen.clone();
            let (a, b) = (first.clone(), second.clone());
            create_effect(move || log.borrow_mut().push(a.get() + b.get()));
            assert_eq!(*seen.borrow(), vec![3]);

            let (a, b) = (first.clone(), second.clone());
            batch(move || {
                a.set(10);
                b.set(20);
            });

            // One run, observing both new values; never 12 or 21.
            assert_eq!(*seen.borrow(), vec![3, 30]);
        });
    });
}

#[test]
fn nested_batches_drain_once_at_the_outermost() {
    run(|| {
        create_root(|_| {
            let signal = Signal::new(0);
            let runs = Rc::new(Cell::new(0));

            let counter = runs.clone();
            let reader = signal.clone();
            create_effect(move || {
                reader.get();
                counter.set(counter.get() + 1);
            });
            assert_eq!(runs.get(), 1);

            let writer = signal.clone();
            batch(move || {
                let inner = writer.clone();
                batch(move || inner.set(1));
                // The inner batch flattened: nothing has drained yet.
                writer.set(2);
            });
            assert_eq!(runs.get(), 2);
        });
    });
}

/// Disposing a root unlinks its computations: further writes reach
/// nothing.
#[test]
fn disposal_stops_updates() {
    run(|| {
        let signal = Signal::new(0);
        let runs = Rc::new(Cell::new(0));

        create_root(|disposer| {
            let counter = runs.clone();
            let reader = signal.clone();
            create_effect(move || {
                reader.get();
                counter.set(counter.get() + 1);
            });
            assert_eq!(runs.get(), 1);
            assert_eq!(signal.observer_count(), 1);

            disposer.dispose();
        });

        assert_eq!(signal.observer_count(), 0);
        signal.set(1);
        assert_eq!(runs.get(), 1);
    });
}

#[test]
fn cleanups_run_in_reverse_registration_order() {
    let order = Rc::new(RefCell::new(Vec::new()));
    run(|| {
        create_root(|disposer| {
            for label in ["c1", "c2", "c3"] {
                let order = order.clone();
                on_cleanup(move || order.borrow_mut().push(label));
            }
            disposer.dispose();
        });
    });
    assert_eq!(*order.borrow(), vec!["c3", "c2", "c1"]);
}

/// Cleanups registered inside an effect run before the next rerun and on
/// disposal.
#[test]
fn effect_cleanups_run_before_each_rerun() {
    run(|| {
        create_root(|disposer| {
            let signal = Signal::new(0);
            let events = Rc::new(RefCell::new(Vec::new()));

            let log = events.clone();
            let reader = signal.clone();
            create_effect(move || {
                let value = reader.get();
                log.borrow_mut().push(format!("run {value}"));
                let log = log.clone();
                on_cleanup(move || log.borrow_mut().push(format!("cleanup {value}")));
            });
            assert_eq!(*events.borrow(), vec!["run 0"]);

            signal.set(1);
            assert_eq!(*events.borrow(), vec!["run 0", "cleanup 0", "run 1"]);

            disposer.dispose();
            assert_eq!(
                *events.borrow(),
                vec!["run 0", "cleanup 0", "run 1", "cleanup 1"]
            );
        });
    });
}

/// Computations created inside an effect are disposed when it reruns.
#[test]
fn nested_computations_are_disposed_on_rerun() {
    run(|| {
        create_root(|_| {
            let outer = Signal::new(0);
            let inner = Signal::new(0);
            let inner_runs = Rc::new(Cell::new(0));

            let counter = inner_runs.clone();
            let (outer_r, inner_r) = (outer.clone(), inner.clone());
            create_effect(move || {
                outer_r.get();
                let counter = counter.clone();
                let inner_r = inner_r.clone();
                create_effect(move || {
                    inner_r.get();
                    counter.set(counter.get() + 1);
                });
            });
            assert_eq!(inner_runs.get(), 1);

            inner.set(1);
            assert_eq!(inner_runs.get(), 2);

            // The rerun disposes the old inner effect and creates a
            // fresh one, so only one inner effect observes this write.
            outer.set(1);
            assert_eq!(inner_runs.get(), 3);
            inner.set(2);
            assert_eq!(inner_runs.get(), 4);
        });
    });
}

#[test]
fn system_effects_run_before_user_effects() {
    run(|| {
        create_root(|_| {
            let signal = Signal::new(0);
            let order = Rc::new(RefCell::new(Vec::new()));

            let log = order.clone();
            let reader = signal.clone();
            create_effect(move || {
                reader.get();
                log.borrow_mut().push("user");
            });
            let log = order.clone();
            let reader = signal.clone();
            create_system_effect(move || {
                reader.get();
                log.borrow_mut().push("system");
            });
            order.borrow_mut().clear();

            signal.set(1);
            assert_eq!(*order.borrow(), vec!["system", "user"]);
        });
    });
}

/// Untracked reads do not subscribe the enclosing effect.
#[test]
fn untrack_suppresses_subscription() {
    run(|| {
        create_root(|_| {
            let tracked = Signal::new(0);
            let ignored = Signal::new(0);
            let runs = Rc::new(Cell::new(0));

            let counter = runs.clone();
            let (t, i) = (tracked.clone(), ignored.clone());
            create_effect(move || {
                t.get();
                untrack(|| i.get());
                counter.set(counter.get() + 1);
            });
            assert_eq!(runs.get(), 1);

            ignored.set(1);
            assert_eq!(runs.get(), 1);

            tracked.set(1);
            assert_eq!(runs.get(), 2);
        });
    });
}

/// Context values are visible to computations created inside the
/// provider, including their later reruns.
#[test]
fn context_reaches_effect_reruns() {
    run(|| {
        create_root(|_| {
            let theme = create_context("light");
            let signal = Signal::new(0);
            let seen = Rc::new(RefCell::new(Vec::new()));

            let log = seen.clone();
            let reader = signal.clone();
            let ctx = theme.clone();
            provide_context(&theme, "dark", move || {
                create_effect(move || {
                    reader.get();
                    log.borrow_mut().push(use_context(&ctx));
                });
            });

            // The provider has unwound, but the effect captured its
            // owner's context at creation.
            signal.set(1);
            assert_eq!(*seen.borrow(), vec!["dark", "dark"]);
            assert_eq!(use_context(&theme), "light");
        });
    });
}

/// A panic inside one effect is contained: it reaches the error hook and
/// the rest of the batch still drains.
#[test]
fn panicking_effect_does_not_poison_the_batch() {
    run(|| {
        create_root(|_| {
            let errors = Rc::new(RefCell::new(Vec::new()));
            let sink = errors.clone();
            set_error_hook(move |error| sink.borrow_mut().push(error.to_string()));

            let signal = Signal::new(0);
            let healthy_runs = Rc::new(Cell::new(0));

            let reader = signal.clone();
            create_effect(move || {
                if reader.get() > 0 {
                    panic!("effect exploded");
                }
            });
            let counter = healthy_runs.clone();
            let reader = signal.clone();
            create_effect(move || {
                reader.get();
                counter.set(counter.get() + 1);
            });
            assert_eq!(healthy_runs.get(), 1);

            signal.set(1);

            // The healthy effect still ran and the failure was reported.
            assert_eq!(healthy_runs.get(), 2);
            assert_eq!(errors.borrow().len(), 1);
            assert!(errors.borrow()[0].contains("effect exploded"));

            clear_error_hook();
        });
    });
}

/// Sessions are fully isolated: state created in one runtime is invisible
/// to another.
#[test]
fn runtime_sessions_are_isolated() {
    let outer_runs = Rc::new(Cell::new(0));

    run(|| {
        create_root(|_| {
            let signal = Signal::new(0);
            let counter = outer_runs.clone();
            let reader = signal.clone();
            create_effect(move || {
                reader.get();
                counter.set(counter.get() + 1);
            });
            assert_eq!(outer_runs.get(), 1);

            // A nested session has its own queues and owner tree.
            run(|| {
                create_root(|_| {
                    let inner = Signal::new(0);
                    let inner_reader = inner.clone();
                    create_effect(move || {
                        inner_reader.get();
                    });
                    inner.set(1);
                });
            });

            // Nothing in the inner session touched the outer effect.
            assert_eq!(outer_runs.get(), 1);
        });
    });
}
