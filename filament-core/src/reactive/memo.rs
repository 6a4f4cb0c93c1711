//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when its
//! dependencies change. It is both an observer (it reads sources) and a
//! source (effects and other memos can read it).
//!
//! # How Memos Work
//!
//! 1. On creation, the memo runs once to establish its dependencies and
//!    prime the cache.
//!
//! 2. When a direct input changes, the memo is marked `Stale` and queued;
//!    transitive upstream changes mark it `Pending` instead.
//!
//! 3. A `Stale` memo recomputes on the next read or queue drain. If the
//!    new value differs from the cache, the memo's own observers are
//!    upgraded from `Pending` to `Stale`.
//!
//! 4. A `Pending` memo whose inputs turn out unchanged settles back to
//!    `Clean` without recomputing.
//!
//! # Why This Matters
//!
//! The equality gate is what stops glitches and redundant work: a memo
//! that recomputes to the same value propagates nothing, so entire
//! subgraphs settle without running.

use std::any::Any;
use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use crate::graph::edges::SourceRef;
use crate::graph::node::{
    create_computation, register_dependency, update_computation, ComputeFn, Computation, NodeState,
};
use crate::graph::scheduler::{mark_stale, run_top};
use crate::reactive::runtime::{current_runtime, runtime};
use crate::reactive::signal::EqualsFn;

/// The typed cache shared between the memo handle and its node function.
struct MemoCell<T> {
    cached: RefCell<Option<T>>,
    equals: EqualsFn<T>,
}

/// A cached derived value that recomputes only when its inputs change.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(2);
/// let doubled = Memo::new(move || count.get() * 2);
///
/// assert_eq!(doubled.get(), 4);
/// ```
pub struct Memo<T: Clone + 'static> {
    node: Rc<Computation>,
    cell: Rc<MemoCell<T>>,
}

impl<T: Clone + PartialEq + 'static> Memo<T> {
    /// Create a memo, comparing successive values with `PartialEq`.
    ///
    /// The computation runs once immediately to establish dependencies
    /// and prime the cache. Panics if no runtime is active.
    pub fn new(f: impl FnMut() -> T + 'static) -> Self {
        Self::new_with_equals(f, |a, b| a == b)
    }
}

impl<T: Clone + 'static> Memo<T> {
    /// Create a memo with a custom equality function for change
    /// detection.
    pub fn new_with_equals(mut f: impl FnMut() -> T + 'static, equals: EqualsFn<T>) -> Self {
        let rt = runtime();
        let node = create_computation(None, None, true, NodeState::Stale);
        let cell = Rc::new(MemoCell {
            cached: RefCell::new(None),
            equals,
        });

        // The node function recomputes, commits to the cache, and marks
        // downstream observers on change. Weak self-reference: the owner
        // holds the node strongly.
        let weak = Rc::downgrade(&node);
        let commit = cell.clone();
        let func: ComputeFn = Rc::new(RefCell::new(
            move |_prev: Option<&dyn Any>| -> Box<dyn Any> {
                let next = f();

                let mut cached = commit.cached.borrow_mut();
                let had_cached = cached.is_some();
                let changed = match &*cached {
                    Some(old) => !(commit.equals)(old, &next),
                    None => true,
                };
                if changed {
                    *cached = Some(next.clone());
                }
                drop(cached);

                // The first run has no observers to notify.
                if changed && had_cached {
                    if let (Some(node), Some(rt)) = (weak.upgrade(), current_runtime()) {
                        mark_stale(&rt, &node.observers);
                    }
                }

                Box::new(next)
            },
        ));
        *node.func.borrow_mut() = Some(func);

        update_computation(&rt, &node);
        Memo { node, cell }
    }

    /// Get the memo's value, recomputing first if an input changed.
    ///
    /// If a computation is currently running, it is registered as an
    /// observer of this memo. Panics if no runtime is active.
    pub fn get(&self) -> T {
        let rt = runtime();
        run_top(&rt, &self.node);

        let listener = rt.listener.borrow().clone();
        if let Some(listener) = listener {
            register_dependency(&listener, SourceRef::Memo(self.node.clone()));
        }

        self.cell
            .cached
            .borrow()
            .clone()
            .expect("memo cache is primed on creation")
    }

    /// Get the memo's last committed value without registering a
    /// dependency or forcing a recomputation.
    ///
    /// Mid-batch this can return a value the pending drain is about to
    /// replace. Works without an active runtime.
    pub fn get_untracked(&self) -> T {
        self.cell
            .cached
            .borrow()
            .clone()
            .expect("memo cache is primed on creation")
    }

    /// The memo's current dirty state.
    pub fn state(&self) -> NodeState {
        self.node.state()
    }

    /// Number of computations currently observing this memo.
    pub fn observer_count(&self) -> usize {
        self.node.observer_count()
    }
}

impl<T: Clone + 'static> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: Clone + Debug + 'static> Debug for Memo<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("state", &self.node.state())
            .field("cached", &self.cell.cached.borrow())
            .field("observer_count", &self.observer_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
