//! Reactive Context
//!
//! Context passes a value down the ownership tree without threading it
//! through every intermediate computation. A provider scopes a value to a
//! closure; any computation created inside that scope can read it, and
//! reads outside any provider fall back to the context's default.
//!
//! # Implementation
//!
//! Each owner carries a flat list of `(context id, value)` pairs. A
//! computation snapshots its owner's list at creation time, so providers
//! that have already unwound remain visible to the computations created
//! under them. Lookup scans the list newest-first, which is what makes
//! nested providers shadow outer ones.

use std::any::Any;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::reactive::owner::create_root;
use crate::reactive::runtime::current_runtime;

/// The `(context id, value)` pairs visible to an owner, in provision order.
pub(crate) type ContextValues = Vec<(u64, Rc<dyn Any>)>;

/// Counter for generating unique context IDs.
static CONTEXT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A typed context handle.
///
/// Created once with a default value; any number of scopes can then
/// provide and read it. Two contexts never collide, even when they carry
/// the same type.
pub struct Context<T: Clone + 'static> {
    id: u64,
    default: T,
}

impl<T: Clone + 'static> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            default: self.default.clone(),
        }
    }
}

impl<T: Clone + 'static> Context<T> {
    /// The context's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Create a context with a default value.
///
/// The default is returned by [`use_context`] whenever no enclosing scope
/// has provided a value.
pub fn create_context<T: Clone + 'static>(default: T) -> Context<T> {
    Context {
        id: CONTEXT_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
        default,
    }
}

/// Provide `value` for `context` while `f` runs.
///
/// The provision is visible to `f` and to every computation created
/// inside it, including their later reruns. It is restored on exit, even
/// if `f` panics. Without an active owner a throwaway root is created to
/// host the provision.
pub fn provide_context<T: Clone + 'static, R>(
    context: &Context<T>,
    value: T,
    f: impl FnOnce() -> R,
) -> R {
    let owner = current_runtime().and_then(|rt| rt.owner.borrow().clone());
    let Some(owner) = owner else {
        return create_root(|_| provide_context(context, value, f));
    };

    let saved = owner.context.borrow().clone();
    owner
        .context
        .borrow_mut()
        .push((context.id, Rc::new(value)));
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));
    *owner.context.borrow_mut() = saved;

    match result {
        Ok(value) => value,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

/// Read the innermost provided value for `context`, or its default.
///
/// Reads the current owner first, then walks up the ownership tree.
/// Context reads are not reactive: providing a new value does not rerun
/// computations that read the old one.
pub fn use_context<T: Clone + 'static>(context: &Context<T>) -> T {
    if let Some(rt) = current_runtime() {
        let mut current = rt.owner.borrow().clone();
        while let Some(owner) = current {
            if let Some(value) = owner.lookup(context.id) {
                if let Ok(value) = value.downcast::<T>() {
                    return (*value).clone();
                }
                break;
            }
            current = owner.parent.as_ref().and_then(|weak| weak.upgrade());
        }
    }
    context.default.clone()
}
