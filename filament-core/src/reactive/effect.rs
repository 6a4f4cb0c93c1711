//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs immediately to do its work and
//!    establish its dependencies. Created inside a batch, it is queued
//!    and runs when the batch drains instead.
//!
//! 2. When a dependency changes, the effect is queued. Effects drain
//!    after all memos have settled, so they only ever observe consistent
//!    values.
//!
//! 3. Before each rerun the effect's old dependencies are cleared and new
//!    ones are tracked during execution.
//!
//! # Ordering
//!
//! Effects come in two priorities. System effects (internal bookkeeping,
//! render plumbing) drain before user effects within each batch, so user
//! code observes a world the system has already caught up with.
//!
//! # Cleanup
//!
//! [`create_effect_with_cleanup`] lets each run return a teardown
//! closure. The teardown runs before the next rerun and once more when
//! the owning scope is disposed.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::graph::node::{create_computation, ComputeFn, NodeState};
use crate::graph::scheduler::{enqueue, run_top, run_updates};
use crate::reactive::owner::on_cleanup;
use crate::reactive::runtime::runtime;

/// Create an effect that reruns whenever a signal or memo it reads
/// changes.
///
/// Runs once immediately (or at the end of the enclosing batch). The
/// effect lives until its owning scope is disposed; there is no handle to
/// hold. Panics if no runtime or no owner is active: an ownerless effect
/// would be dropped after its first run and silently stop rerunning.
pub fn create_effect(f: impl FnMut() + 'static) {
    create_effect_node(f, true);
}

/// Create a system-priority effect.
///
/// Identical to [`create_effect`] except that within each batch it drains
/// before all user effects.
pub fn create_system_effect(f: impl FnMut() + 'static) {
    create_effect_node(f, false);
}

fn create_effect_node(mut f: impl FnMut() + 'static, user: bool) {
    let rt = runtime();
    // Only the owner holds effects strongly. With no owner the node
    // would be dropped on return and never rerun.
    assert!(
        rt.owner.borrow().is_some(),
        "no reactive owner active; create effects inside `create_root` or another computation"
    );
    let node = create_computation(None, None, false, NodeState::Stale);
    node.user.set(user);

    let func: ComputeFn = Rc::new(RefCell::new(
        move |_prev: Option<&dyn Any>| -> Box<dyn Any> {
            f();
            Box::new(())
        },
    ));
    *node.func.borrow_mut() = Some(func);

    if rt.in_update.get() {
        enqueue(&rt, node);
    } else {
        let runner = rt.clone();
        run_updates(&rt, move || run_top(&runner, &node), true);
    }
}

/// Create an effect whose runs each return a teardown closure.
///
/// The teardown from run N executes right before run N+1, and the last
/// one executes when the owning scope is disposed. Use it to release
/// whatever the run acquired: subscriptions, timers, handles.
pub fn create_effect_with_cleanup<F, C>(mut f: F)
where
    F: FnMut() -> C + 'static,
    C: FnOnce() + 'static,
{
    let teardown: Rc<RefCell<Option<Box<dyn FnOnce()>>>> = Rc::new(RefCell::new(None));

    let slot = teardown.clone();
    create_effect(move || {
        if let Some(previous) = slot.borrow_mut().take() {
            previous();
        }
        let next = f();
        *slot.borrow_mut() = Some(Box::new(next));
    });

    on_cleanup(move || {
        if let Some(last) = teardown.borrow_mut().take() {
            last();
        }
    });
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
