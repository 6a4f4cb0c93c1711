//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, memos,
//! effects, and the ownership tree that disposes them.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is
//! read inside a memo or effect, that computation is automatically
//! registered as an observer. When the signal's value changes, observers
//! are marked and queued.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result and recomputes only
//! when an input actually changed. A memo that recomputes to an equal
//! value propagates nothing downstream.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that reruns whenever its
//! dependencies change. Effects run after all memos have settled, so they
//! never observe an inconsistent intermediate state.
//!
//! ## Owners
//!
//! Every computation belongs to an owner. Disposing an owner tears down
//! its whole subtree: nested computations, child roots, and registered
//! cleanups.
//!
//! # Implementation Notes
//!
//! Dependency tracking is automatic: while a computation runs it is
//! installed as the runtime's listener, and every source read during that
//! window links an edge back to it. This transparent-reactivity approach
//! is the one used by SolidJS, Vue 3, and Leptos.

pub mod context;
pub mod effect;
pub mod memo;
pub mod owner;
pub mod runtime;
pub mod signal;

pub use context::{create_context, provide_context, use_context, Context};
pub use effect::{create_effect, create_effect_with_cleanup, create_system_effect};
pub use memo::Memo;
pub use owner::{create_root, on_cleanup, RootDisposer};
pub use runtime::{
    clear_error_hook, current_runtime, run, set_error_hook, set_runtime, untrack, NodeError,
    NodeOrigin, Runtime,
};
pub use signal::{EqualsFn, Signal};
