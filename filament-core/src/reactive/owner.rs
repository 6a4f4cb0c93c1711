//! Owners and Disposal
//!
//! An owner is a node in the disposal tree. Every computation and cleanup
//! created while an owner is current attaches to it, and disposing the
//! owner tears all of it down: child roots, owned computations, then
//! cleanups, each group newest-first.
//!
//! # Ownership Links
//!
//! Strong references point down the tree (owner to owned), weak references
//! point up (owned to owner), so dropping a root releases the whole
//! subtree without reference cycles.

use std::any::Any;
use std::cell::RefCell;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::graph::node::{clean_node, Computation};
use crate::reactive::context::ContextValues;
use crate::reactive::runtime::{current_runtime, runtime, set_runtime, Runtime};

/// A node in the disposal tree.
pub struct Owner {
    /// Computations created under this owner.
    pub(crate) owned: RefCell<Vec<Rc<Computation>>>,

    /// Cleanup callbacks, run in reverse registration order on disposal.
    pub(crate) cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,

    /// Roots created under this owner.
    pub(crate) child_owners: RefCell<Vec<Rc<Owner>>>,

    /// The enclosing owner, if any. Weak: the parent holds the strong
    /// reference.
    pub(crate) parent: Option<Weak<Owner>>,

    /// Context values visible to computations created under this owner.
    pub(crate) context: RefCell<ContextValues>,
}

impl Owner {
    /// Look up a context value by id, innermost provision first.
    pub(crate) fn lookup(&self, id: u64) -> Option<Rc<dyn Any>> {
        self.context
            .borrow()
            .iter()
            .rev()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, value)| value.clone())
    }
}

/// Handle for disposing a root created by [`create_root`].
pub struct RootDisposer {
    owner: Rc<Owner>,
}

impl RootDisposer {
    /// Dispose the root: every computation, child root, and cleanup
    /// created under it is torn down.
    pub fn dispose(self) {
        dispose_owner(&self.owner);
    }
}

/// Create a disposal root and run `f` under it.
///
/// The closure receives a [`RootDisposer`] it can store for later.
/// Anything created inside `f` (and inside computations created there)
/// belongs to the root and is torn down when the disposer fires.
///
/// If no runtime is active a fresh one is bootstrapped and left installed
/// on this thread. Roots nest: a root created inside another owner is
/// disposed along with it.
pub fn create_root<R>(f: impl FnOnce(RootDisposer) -> R) -> R {
    let rt = match current_runtime() {
        Some(rt) => rt,
        None => {
            let fresh = Rc::new(Runtime::new());
            set_runtime(Some(fresh.clone()));
            fresh
        }
    };

    let prev_owner = rt.owner.borrow().clone();
    let root = Rc::new(Owner {
        owned: RefCell::new(Vec::new()),
        cleanups: RefCell::new(Vec::new()),
        child_owners: RefCell::new(Vec::new()),
        parent: prev_owner.as_ref().map(Rc::downgrade),
        context: RefCell::new(
            prev_owner
                .as_ref()
                .map(|owner| owner.context.borrow().clone())
                .unwrap_or_default(),
        ),
    });
    if let Some(parent) = &prev_owner {
        parent.child_owners.borrow_mut().push(root.clone());
    }

    *rt.owner.borrow_mut() = Some(root.clone());
    let disposer = RootDisposer {
        owner: root.clone(),
    };
    let result = catch_unwind(AssertUnwindSafe(|| f(disposer)));
    *rt.owner.borrow_mut() = prev_owner;

    match result {
        Ok(value) => value,
        Err(payload) => resume_unwind(payload),
    }
}

/// Register a cleanup on the current owner.
///
/// Cleanups run in reverse registration order, both when the owner is
/// disposed and before the enclosing computation reruns. Panics if no
/// runtime or owner is active: a cleanup registered into the void would
/// silently never run.
pub fn on_cleanup(f: impl FnOnce() + 'static) {
    let rt = runtime();
    let owner = rt.owner.borrow().clone();
    let owner = owner.expect("no reactive owner active; `on_cleanup` requires an enclosing root or computation");
    owner.cleanups.borrow_mut().push(Box::new(f));
}

/// Tear down an owner: child roots, owned computations, then cleanups,
/// each newest-first. Owned computations are unlinked from their sources
/// and their functions dropped, so queued entries become no-ops.
pub(crate) fn dispose_owner(owner: &Rc<Owner>) {
    let children = std::mem::take(&mut *owner.child_owners.borrow_mut());
    for child in children.into_iter().rev() {
        dispose_owner(&child);
    }

    let owned = std::mem::take(&mut *owner.owned.borrow_mut());
    for node in owned.into_iter().rev() {
        node.func.borrow_mut().take();
        clean_node(&node);
    }

    let cleanups = std::mem::take(&mut *owner.cleanups.borrow_mut());
    for cleanup in cleanups.into_iter().rev() {
        cleanup();
    }

    if let Some(parent) = owner.parent.as_ref().and_then(Weak::upgrade) {
        parent
            .child_owners
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, owner));
    }
}
