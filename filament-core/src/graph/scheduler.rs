//! Update Scheduler
//!
//! This module implements glitch-free update propagation. A write does not
//! run anything directly: it marks downstream nodes and queues them, and a
//! single drain loop then reruns each affected node at most once.
//!
//! # How Marking Works
//!
//! 1. A changed source marks its direct observers `Stale` (definitely
//!    recompute) and everything further downstream `Pending` (recompute
//!    only if an input actually changes).
//!
//! 2. When a queued memo recomputes to a different value, it upgrades its
//!    `Pending` observers to `Stale`. Marking enqueues in dependency
//!    order, so the upgrade always lands before the observer drains.
//!
//! 3. At drain time a node still `Pending` had no input change and settles
//!    back to `Clean` without running.
//!
//! # Queues
//!
//! Memos drain first, to a fixpoint, so effects only ever observe fully
//! settled values. Effects then drain system-first, user-second. Effects
//! may write signals, which starts the next round of the outer loop.

use std::cell::RefCell;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::rc::Rc;

use super::edges::EdgeList;
use super::node::{update_computation, Computation, NodeState};
use crate::reactive::runtime::{handle_error, runtime, NodeError, NodeOrigin, Runtime};

/// Queue a node on the runtime: memos on the update queue, effects on the
/// effect queue.
pub(crate) fn enqueue(rt: &Runtime, node: Rc<Computation>) {
    if node.pure {
        rt.updates.borrow_mut().push(node);
    } else {
        rt.effects.borrow_mut().push(node);
    }
}

/// Mark every observer of a changed source.
///
/// Direct observers become `Stale`. A clean observer is queued, and the
/// conservative `Pending` wavefront spreads from it before its state is
/// set, so downstream nodes queue in dependency order. An observer that
/// was already `Pending` is upgraded in place without re-queueing.
pub(crate) fn mark_stale(rt: &Rc<Runtime>, edges: &RefCell<EdgeList>) {
    let observers = edges.borrow().snapshot();
    for observer in observers {
        if observer.state.get() == NodeState::Clean {
            enqueue(rt, observer.clone());
            if observer.pure {
                mark_downstream(rt, &observer);
            }
        }
        observer.state.set(NodeState::Stale);
    }
}

/// Tentatively mark everything downstream of `node` as `Pending`.
///
/// Only clean nodes are touched: anything already marked was reached on
/// another path and is queued. Recursion only continues through memos,
/// since effects have no observers.
pub(crate) fn mark_downstream(rt: &Rc<Runtime>, node: &Rc<Computation>) {
    let observers = node.observers.borrow().snapshot();
    for observer in observers {
        if observer.state.get() == NodeState::Clean {
            observer.state.set(NodeState::Pending);
            enqueue(rt, observer.clone());
            if observer.pure {
                mark_downstream(rt, &observer);
            }
        }
    }
}

/// Process one queued node according to its state at drain time.
pub(crate) fn run_top(rt: &Rc<Runtime>, node: &Rc<Computation>) {
    match node.state.get() {
        NodeState::Clean => {}
        // No confirmed input change reached this node; settle it.
        NodeState::Pending => node.state.set(NodeState::Clean),
        NodeState::Stale => update_computation(rt, node),
    }
}

/// Run one queued node, converting a panic into an error-hook report so
/// the rest of the batch still drains.
fn guarded_run(rt: &Rc<Runtime>, node: &Rc<Computation>, origin: NodeOrigin) {
    let result = catch_unwind(AssertUnwindSafe(|| run_top(rt, node)));
    if let Err(payload) = result {
        handle_error(NodeError::from_panic(origin, payload));
    }
}

/// Drain both queues until the graph is quiescent.
pub(crate) fn complete_updates(rt: &Rc<Runtime>) {
    loop {
        // Memos first, to a fixpoint: a recomputing memo can upgrade
        // pending observers and queue more updates.
        loop {
            let batch = rt.updates.take();
            if batch.is_empty() {
                break;
            }
            tracing::trace!(count = batch.len(), "draining update queue");
            for node in &batch {
                guarded_run(rt, node, NodeOrigin::Memo);
            }
        }

        let effects = rt.effects.take();
        if effects.is_empty() {
            break;
        }
        tracing::trace!(count = effects.len(), "draining effect queue");

        let (system, user): (Vec<_>, Vec<_>) =
            effects.into_iter().partition(|node| !node.user.get());
        for node in &system {
            guarded_run(rt, node, NodeOrigin::Effect);
        }
        for node in &user {
            guarded_run(rt, node, NodeOrigin::Effect);
        }
    }
}

/// Run `f` inside an update batch and drain the queues afterward.
///
/// Reentrant calls flatten into the enclosing batch: marking still queues,
/// and the outermost call drains. `init` preserves already-queued work for
/// an effect's first run; a plain batch starts from empty queues.
///
/// If `f` itself panics the queues are reset and the panic propagates to
/// the caller. Panics inside queued nodes are contained by the drain loop
/// instead.
pub(crate) fn run_updates<R>(rt: &Rc<Runtime>, f: impl FnOnce() -> R, init: bool) -> R {
    if rt.in_update.get() {
        return f();
    }

    rt.in_update.set(true);
    rt.exec_count.set(rt.exec_count.get() + 1);
    if !init {
        rt.updates.borrow_mut().clear();
        rt.effects.borrow_mut().clear();
    }
    tracing::trace!(batch = rt.exec_count.get(), "starting update batch");

    let result = catch_unwind(AssertUnwindSafe(|| {
        let value = f();
        complete_updates(rt);
        value
    }));
    rt.in_update.set(false);

    match result {
        Ok(value) => value,
        Err(payload) => {
            rt.updates.borrow_mut().clear();
            rt.effects.borrow_mut().clear();
            resume_unwind(payload)
        }
    }
}

/// Group several writes into a single update batch.
///
/// Marking accumulates across the whole closure and the queues drain once
/// at the end, so each affected memo and effect runs at most once no
/// matter how many signals were written. Nested batches flatten into the
/// outermost one.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let rt = runtime();
    run_updates(&rt, f, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::runtime::run;
    use std::cell::Cell;

    #[test]
    fn enqueue_routes_by_purity() {
        run(|| {
            let rt = runtime();
            let memo = Computation::detached(true, NodeState::Stale);
            let effect = Computation::detached(false, NodeState::Stale);

            enqueue(&rt, memo);
            enqueue(&rt, effect);

            assert_eq!(rt.updates.borrow().len(), 1);
            assert_eq!(rt.effects.borrow().len(), 1);
        });
    }

    #[test]
    fn run_top_settles_pending_nodes_without_running() {
        run(|| {
            let rt = runtime();
            let node = Computation::detached(true, NodeState::Pending);
            run_top(&rt, &node);
            assert_eq!(node.state(), NodeState::Clean);
        });
    }

    #[test]
    fn nested_batches_flatten() {
        run(|| {
            let rt = runtime();
            let outer_ran = Cell::new(false);
            batch(|| {
                let count_before = rt.exec_count.get();
                batch(|| {
                    // The inner batch must not bump the counter again.
                    assert_eq!(rt.exec_count.get(), count_before);
                });
                outer_ran.set(true);
            });
            assert!(outer_ran.get());
        });
    }

    #[test]
    fn batch_increments_exec_count() {
        run(|| {
            let rt = runtime();
            let before = rt.exec_count.get();
            batch(|| {});
            batch(|| {});
            assert_eq!(rt.exec_count.get(), before + 2);
        });
    }

    #[test]
    fn panicking_batch_resets_queues() {
        run(|| {
            let rt = runtime();
            let result = catch_unwind(AssertUnwindSafe(|| {
                batch(|| {
                    enqueue(&rt, Computation::detached(true, NodeState::Stale));
                    panic!("boom");
                })
            }));
            assert!(result.is_err());
            assert!(rt.updates.borrow().is_empty());
            assert!(rt.effects.borrow().is_empty());
            assert!(!rt.in_update.get());
        });
    }
}
