//! Graph Nodes
//!
//! This module defines the computation node, the shared internal
//! representation behind memos and effects, and the routines that run and
//! unlink them.
//!
//! # How Computations Work
//!
//! 1. While a computation's function runs, it is installed as the current
//!    listener. Every signal or memo it reads attaches an edge back to it.
//!
//! 2. Before each rerun the node is cleaned: all upstream edges are
//!    unlinked, owned child computations are disposed, and registered
//!    cleanups run in reverse order. Dependencies are therefore always
//!    exactly what the most recent run actually read.
//!
//! 3. Everything created during a run (nested computations, cleanups,
//!    child roots) is collected by a temporary owner and adopted onto the
//!    node afterward, so the next cleaning pass disposes it.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use super::edges::{EdgeList, SourceList, SourceRef};
use crate::reactive::context::ContextValues;
use crate::reactive::owner::{dispose_owner, Owner};
use crate::reactive::runtime::{runtime, Runtime};

/// Dirty state of a computation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// The node's value is up-to-date.
    Clean,

    /// The node definitely needs to recompute. A direct input changed.
    Stale,

    /// The node might need to recompute. Something changed upstream, but
    /// no direct input has been confirmed different yet.
    Pending,
}

/// The recompute function stored on a node.
///
/// Receives a borrow of the previous value and returns the next one,
/// type-erased so memos and effects share one node representation. The
/// stored value stays in place while the function runs, so a panicking
/// run cannot lose it.
pub(crate) type ComputeFn = Rc<RefCell<dyn FnMut(Option<&dyn Any>) -> Box<dyn Any>>>;

/// A computation node: the internal representation of a memo or effect.
pub struct Computation {
    /// The recompute function. Cleared on disposal so a queued node that
    /// was disposed mid-batch becomes a no-op.
    pub(crate) func: RefCell<Option<ComputeFn>>,

    /// Current dirty state.
    pub(crate) state: Cell<NodeState>,

    /// Upstream edges: the sources read during the most recent run.
    pub(crate) sources: RefCell<SourceList>,

    /// Downstream edges: the computations observing this node. Only memos
    /// accumulate observers; effects are graph leaves.
    pub(crate) observers: RefCell<EdgeList>,

    /// The most recent value produced by `func`.
    pub(crate) value: RefCell<Option<Box<dyn Any>>>,

    /// The batch counter at the time of the last completed run.
    pub(crate) updated_at: Cell<u64>,

    /// Pure nodes (memos) drain from the update queue; impure nodes
    /// (effects) drain from the effect queue.
    pub(crate) pure: bool,

    /// Whether this effect was created by application code. System effects
    /// drain before user effects.
    pub(crate) user: Cell<bool>,

    /// Computations created during this node's runs. Disposed on cleaning.
    pub(crate) owned: RefCell<Vec<Rc<Computation>>>,

    /// Cleanup callbacks registered during this node's runs. Run in
    /// reverse registration order on cleaning.
    pub(crate) cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,

    /// Roots created during this node's runs. Disposed on cleaning.
    pub(crate) child_owners: RefCell<Vec<Rc<Owner>>>,

    /// The owner this node was created under. Weak: the owner holds the
    /// strong reference.
    pub(crate) owner: Option<Weak<Owner>>,

    /// Context values captured from the owner at creation time.
    pub(crate) context: ContextValues,
}

impl Computation {
    /// Create a node without an owner or runtime. Test scaffolding for the
    /// edge store; real nodes come from [`create_computation`].
    #[cfg(test)]
    pub(crate) fn detached(pure: bool, state: NodeState) -> Rc<Computation> {
        Rc::new(Computation {
            func: RefCell::new(None),
            state: Cell::new(state),
            sources: RefCell::new(SourceList::default()),
            observers: RefCell::new(EdgeList::default()),
            value: RefCell::new(None),
            updated_at: Cell::new(0),
            pure,
            user: Cell::new(false),
            owned: RefCell::new(Vec::new()),
            cleanups: RefCell::new(Vec::new()),
            child_owners: RefCell::new(Vec::new()),
            owner: None,
            context: ContextValues::default(),
        })
    }

    /// Current dirty state.
    pub fn state(&self) -> NodeState {
        self.state.get()
    }

    /// Number of computations observing this node.
    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }
}

impl std::fmt::Debug for Computation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computation")
            .field("state", &self.state.get())
            .field("pure", &self.pure)
            .field("sources", &self.sources.borrow().len())
            .field("observers", &self.observers.borrow().len())
            .finish()
    }
}

/// Create a computation node under the current owner.
///
/// The node captures the owner's context values and is registered with the
/// owner for disposal. Panics if no runtime is active.
pub(crate) fn create_computation(
    func: Option<ComputeFn>,
    value: Option<Box<dyn Any>>,
    pure: bool,
    state: NodeState,
) -> Rc<Computation> {
    let rt = runtime();
    let owner = rt.owner.borrow().clone();
    let context = owner
        .as_ref()
        .map(|o| o.context.borrow().clone())
        .unwrap_or_default();

    let node = Rc::new(Computation {
        func: RefCell::new(func),
        state: Cell::new(state),
        sources: RefCell::new(SourceList::default()),
        observers: RefCell::new(EdgeList::default()),
        value: RefCell::new(value),
        updated_at: Cell::new(0),
        pure,
        user: Cell::new(false),
        owned: RefCell::new(Vec::new()),
        cleanups: RefCell::new(Vec::new()),
        child_owners: RefCell::new(Vec::new()),
        owner: owner.as_ref().map(Rc::downgrade),
        context,
    });

    if let Some(owner) = owner {
        owner.owned.borrow_mut().push(node.clone());
    }

    node
}

/// Record that `listener` read `source`, linking both halves of the edge.
pub(crate) fn register_dependency(listener: &Rc<Computation>, source: SourceRef) {
    let source_index = listener.sources.borrow().len();
    let slot = source
        .edges()
        .borrow_mut()
        .attach(Rc::downgrade(listener), source_index);
    listener.sources.borrow_mut().push(source, slot);
}

/// Run a node's function with the node installed as listener and owner.
///
/// Nested computations, cleanups, and roots created by the function land
/// on a temporary owner and are adopted onto the node whether the run
/// succeeds or panics. A panic is re-raised after the runtime state has
/// been restored.
pub(crate) fn run_computation(rt: &Rc<Runtime>, node: &Rc<Computation>) {
    let func = node.func.borrow().clone();
    let Some(func) = func else { return };

    let collector = Rc::new(Owner {
        owned: RefCell::new(Vec::new()),
        cleanups: RefCell::new(Vec::new()),
        child_owners: RefCell::new(Vec::new()),
        parent: node.owner.clone(),
        context: RefCell::new(node.context.clone()),
    });

    let prev_listener = rt.listener.replace(Some(node.clone()));
    let prev_owner = rt.owner.replace(Some(collector.clone()));

    // Borrowed, not taken: a panic leaves the stored value untouched.
    let prev_value = node.value.borrow();
    let result = catch_unwind(AssertUnwindSafe(|| {
        (&mut *func.borrow_mut())(prev_value.as_deref())
    }));
    drop(prev_value);

    node.owned
        .borrow_mut()
        .append(&mut collector.owned.borrow_mut());
    node.cleanups
        .borrow_mut()
        .append(&mut collector.cleanups.borrow_mut());
    node.child_owners
        .borrow_mut()
        .append(&mut collector.child_owners.borrow_mut());

    rt.listener.replace(prev_listener);
    rt.owner.replace(prev_owner);

    match result {
        Ok(value) => {
            *node.value.borrow_mut() = Some(value);
            node.updated_at.set(rt.exec_count.get());
        }
        Err(payload) => resume_unwind(payload),
    }
}

/// Clean a node and rerun its function. No-op for disposed nodes.
pub(crate) fn update_computation(rt: &Rc<Runtime>, node: &Rc<Computation>) {
    if node.func.borrow().is_none() {
        node.state.set(NodeState::Clean);
        return;
    }
    clean_node(node);
    run_computation(rt, node);
}

/// Unlink a node from its sources and dispose everything it owns.
///
/// Leaves the node marked clean with its observer list intact, ready to
/// re-register dependencies on the next run.
pub(crate) fn clean_node(node: &Rc<Computation>) {
    // Entries are re-read each iteration: detaching patches slot records,
    // and when a node observes the same source twice the patch can land on
    // one of our own later entries.
    let len = node.sources.borrow().len();
    for i in 0..len {
        let Some((source, slot)) = node.sources.borrow().get(i) else {
            continue;
        };
        let moved = source.edges().borrow_mut().detach(slot);
        if let Some((weak, source_index)) = moved {
            if let Some(observer) = weak.upgrade() {
                observer.sources.borrow_mut().set_slot(source_index, slot);
            }
        }
    }
    node.sources.borrow_mut().clear();

    // Owned state is disposed newest-first, mirroring cleanup order.
    let child_owners = std::mem::take(&mut *node.child_owners.borrow_mut());
    for owner in child_owners.into_iter().rev() {
        dispose_owner(&owner);
    }

    let owned = std::mem::take(&mut *node.owned.borrow_mut());
    for child in owned.into_iter().rev() {
        child.func.borrow_mut().take();
        clean_node(&child);
    }

    let cleanups = std::mem::take(&mut *node.cleanups.borrow_mut());
    for cleanup in cleanups.into_iter().rev() {
        cleanup();
    }

    node.state.set(NodeState::Clean);
}
