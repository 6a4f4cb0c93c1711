//! Reactive Runtime
//!
//! The runtime is the per-thread coordinator that connects signals, memos,
//! and effects. It tracks who is currently listening, which owner collects
//! new computations, and the queues drained by the scheduler.
//!
//! # How It Works
//!
//! 1. While a computation runs, it is installed as the `listener`. Every
//!    source read during that window registers an edge back to it.
//!
//! 2. New computations and cleanups attach to the current `owner`, forming
//!    the disposal tree.
//!
//! 3. Writes queue affected nodes on `updates` (memos) and `effects`
//!    (effects); the scheduler drains both at batch end.
//!
//! # Sessions
//!
//! The current runtime lives in thread-local storage. [`run`] executes a
//! closure inside a fresh runtime for full isolation; [`set_runtime`]
//! swaps the slot directly for embedders that manage session lifetimes
//! themselves. All reactive state is single-threaded.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::rc::Rc;

use thiserror::Error;

use crate::graph::node::Computation;
use crate::reactive::owner::Owner;

/// The reactive runtime for one session.
pub struct Runtime {
    /// The computation currently collecting dependencies, if any.
    pub(crate) listener: RefCell<Option<Rc<Computation>>>,

    /// The owner that adopts newly created computations and cleanups.
    pub(crate) owner: RefCell<Option<Rc<Owner>>>,

    /// Queued memos awaiting recomputation.
    pub(crate) updates: RefCell<Vec<Rc<Computation>>>,

    /// Queued effects awaiting execution.
    pub(crate) effects: RefCell<Vec<Rc<Computation>>>,

    /// Monotonic batch counter. Completed runs are stamped with it.
    pub(crate) exec_count: Cell<u64>,

    /// Whether an update batch is currently draining.
    pub(crate) in_update: Cell<bool>,
}

impl Runtime {
    /// Create an empty runtime with no listener, owner, or queued work.
    pub fn new() -> Self {
        Self {
            listener: RefCell::new(None),
            owner: RefCell::new(None),
            updates: RefCell::new(Vec::new()),
            effects: RefCell::new(Vec::new()),
            exec_count: Cell::new(0),
            in_update: Cell::new(false),
        }
    }

    /// The batch counter value.
    pub fn exec_count(&self) -> u64 {
        self.exec_count.get()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Rc<Runtime>>> = RefCell::new(None);
    static ERROR_HOOK: RefCell<Option<Rc<dyn Fn(NodeError)>>> = RefCell::new(None);
}

/// The runtime installed on this thread, if any.
pub fn current_runtime() -> Option<Rc<Runtime>> {
    CURRENT.with(|current| current.borrow().clone())
}

/// Install `rt` as this thread's runtime. Returns the previously installed
/// runtime so callers can restore it.
pub fn set_runtime(rt: Option<Rc<Runtime>>) -> Option<Rc<Runtime>> {
    CURRENT.with(|current| current.replace(rt))
}

/// The active runtime. Reactive operations are meaningless without one,
/// so calling them outside a session is treated as a usage bug.
pub(crate) fn runtime() -> Rc<Runtime> {
    current_runtime().expect("no reactive runtime active; enter one with `run` or `create_root`")
}

/// Run `f` inside a fresh, isolated runtime.
///
/// The previous runtime is restored afterward, even if `f` panics.
/// Nothing created inside the session is visible outside it.
pub fn run<R>(f: impl FnOnce() -> R) -> R {
    let prev = set_runtime(Some(Rc::new(Runtime::new())));
    let result = catch_unwind(AssertUnwindSafe(f));
    set_runtime(prev);
    match result {
        Ok(value) => value,
        Err(payload) => resume_unwind(payload),
    }
}

/// Run `f` without dependency tracking.
///
/// Signal and memo reads inside `f` do not register the enclosing
/// computation as an observer. The listener is restored afterward, even
/// if `f` panics. Outside a runtime this is a plain call.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let Some(rt) = current_runtime() else {
        return f();
    };
    let prev = rt.listener.replace(None);
    let result = catch_unwind(AssertUnwindSafe(f));
    rt.listener.replace(prev);
    match result {
        Ok(value) => value,
        Err(payload) => resume_unwind(payload),
    }
}

/// What kind of computation a contained failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOrigin {
    /// A memo recomputation.
    Memo,

    /// An effect execution.
    Effect,
}

impl fmt::Display for NodeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeOrigin::Memo => f.write_str("memo"),
            NodeOrigin::Effect => f.write_str("effect"),
        }
    }
}

/// A panic contained while draining an update batch.
///
/// The failing node is skipped and the rest of the batch still drains;
/// the failure is reported through the error hook instead of tearing the
/// batch down.
#[derive(Debug, Clone, Error)]
#[error("{origin} computation panicked: {message}")]
pub struct NodeError {
    /// Which kind of node failed.
    pub origin: NodeOrigin,

    /// The panic message, when it carried one.
    pub message: String,
}

impl NodeError {
    pub(crate) fn from_panic(origin: NodeOrigin, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { origin, message }
    }
}

/// Install a hook that receives failures contained during batch drains.
///
/// Replaces any previously installed hook for this thread.
pub fn set_error_hook(hook: impl Fn(NodeError) + 'static) {
    ERROR_HOOK.with(|slot| *slot.borrow_mut() = Some(Rc::new(hook)));
}

/// Remove the error hook, returning to the default logging behavior.
pub fn clear_error_hook() {
    ERROR_HOOK.with(|slot| slot.borrow_mut().take());
}

/// Report a contained failure to the hook, or log it if none is set.
pub(crate) fn handle_error(error: NodeError) {
    let hook = ERROR_HOOK.with(|slot| slot.borrow().clone());
    match hook {
        Some(hook) => hook(error),
        None => tracing::error!(%error, "reactive computation panicked"),
    }
}
