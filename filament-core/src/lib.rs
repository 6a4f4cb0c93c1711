//! Filament Core
//!
//! This crate provides the core runtime for the Filament fine-grained
//! reactivity library. It implements:
//!
//! - Reactive primitives (signals, memos, effects)
//! - Glitch-free update scheduling with batching
//! - An ownership tree for deterministic disposal
//! - Context propagation through the ownership tree
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `reactive`: The public primitives and the per-thread runtime
//! - `graph`: The dependency graph, edge storage, and update scheduler
//!
//! # Example
//!
//! ```rust,ignore
//! use filament_core::{create_effect, create_root, run, Memo, Signal};
//!
//! run(|| {
//!     create_root(|disposer| {
//!         let count = Signal::new(1);
//!
//!         let source = count.clone();
//!         let doubled = Memo::new(move || source.get() * 2);
//!
//!         create_effect(move || {
//!             println!("doubled is {}", doubled.get());
//!         });
//!         // Prints: "doubled is 2"
//!
//!         count.set(2);
//!         // The memo recomputes once, then the effect prints: "doubled is 4"
//!
//!         disposer.dispose();
//!     });
//! });
//! ```

pub mod graph;
pub mod reactive;

pub use graph::{batch, NodeState};
pub use reactive::{
    clear_error_hook, create_context, create_effect, create_effect_with_cleanup, create_root,
    create_system_effect, current_runtime, on_cleanup, provide_context, run, set_error_hook,
    set_runtime, untrack, use_context, Context, EqualsFn, Memo, NodeError, NodeOrigin,
    RootDisposer, Runtime, Signal,
};
