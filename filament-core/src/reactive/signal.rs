//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read while a computation is running, the signal
//!    attaches that computation as an observer.
//!
//! 2. When a signal's value changes, its observers are marked and queued;
//!    the scheduler drains them at the end of the batch.
//!
//! 3. Writes are equality-gated: setting a value equal to the current one
//!    is a complete no-op and propagates nothing.
//!
//! # Sharing
//!
//! A signal is a cheap handle around shared state. Cloning it yields a
//! second handle to the same value and observer list. All access is
//! single-threaded, on the thread that owns the runtime.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use crate::graph::edges::{EdgeList, SignalEdges, SourceRef};
use crate::graph::node::register_dependency;
use crate::graph::scheduler::{mark_stale, run_updates};
use crate::reactive::runtime::runtime;

/// Comparison used to gate writes and memo recomputations.
pub type EqualsFn<T> = fn(&T, &T) -> bool;

struct SignalInner<T> {
    value: RefCell<T>,
    edges: RefCell<EdgeList>,
    equals: EqualsFn<T>,
}

impl<T> SignalEdges for SignalInner<T> {
    fn edges(&self) -> &RefCell<EdgeList> {
        &self.edges
    }
}

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// // Read the value (tracked inside memos and effects)
/// let value = count.get();
///
/// // Update the value (marks and queues observers)
/// count.set(5);
/// ```
pub struct Signal<T: 'static> {
    inner: Rc<SignalInner<T>>,
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    /// Create a new signal with the given initial value, comparing values
    /// with `PartialEq`.
    pub fn new(value: T) -> Self {
        Self::new_with_equals(value, |a, b| a == b)
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Create a new signal with a custom equality function.
    ///
    /// Useful for types without `PartialEq`, or to force propagation on
    /// every write with `|_, _| false`.
    pub fn new_with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                value: RefCell::new(value),
                edges: RefCell::new(EdgeList::default()),
                equals,
            }),
        }
    }

    /// Get the current value.
    ///
    /// If a computation is currently running, it is registered as an
    /// observer of this signal. Panics if no runtime is active; use
    /// [`Signal::get_untracked`] outside reactive sessions.
    pub fn get(&self) -> T {
        let rt = runtime();
        let listener = rt.listener.borrow().clone();
        if let Some(listener) = listener {
            register_dependency(&listener, SourceRef::Signal(self.inner.clone()));
        }
        self.inner.value.borrow().clone()
    }

    /// Get the current value without registering a dependency.
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Set a new value and propagate to observers.
    ///
    /// If the new value compares equal to the current one, nothing
    /// happens: no write, no marking, no effect runs. Otherwise observers
    /// are marked and the batch drains (immediately for a standalone
    /// write, at batch end inside [`batch`](crate::graph::scheduler::batch)).
    pub fn set(&self, value: T) {
        if (self.inner.equals)(&self.inner.value.borrow(), &value) {
            return;
        }
        *self.inner.value.borrow_mut() = value;

        if self.inner.edges.borrow().is_empty() {
            return;
        }
        let rt = runtime();
        let marker = rt.clone();
        let inner = self.inner.clone();
        run_updates(&rt, move || mark_stale(&marker, &inner.edges), false);
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = f(&self.inner.value.borrow());
        self.set(new_value);
    }

    /// Number of computations currently observing this signal.
    pub fn observer_count(&self) -> usize {
        self.inner.edges.borrow().len()
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Debug + 'static> Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("value", &self.get_untracked())
            .field("observer_count", &self.observer_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
