//! Dependency Graph
//!
//! This module implements the computational dependency graph that tracks
//! relationships between reactive sources and the computations that read
//! them.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph where:
//!
//! - Sources are signals and memos
//! - Observers are memos and effects
//! - An edge from B to A means "A read B during its last run"
//!
//! When a signal changes, the scheduler marks the affected subgraph and
//! drains it in dependency order, so each computation reruns at most once.
//!
//! # Design Decisions
//!
//! 1. Edges live on the nodes themselves rather than in a central
//!    registry. Marking follows pointers directly and disposal unlinks in
//!    O(1) per edge via slot-indexed swap removal.
//!
//! 2. Dirty tracking is three-state: direct observers of a change are
//!    definitely stale, while transitive observers are only tentatively
//!    pending until a recomputed input confirms a real change. This is
//!    what makes propagation glitch-free without a topological sort.

pub mod edges;
pub mod node;
pub mod scheduler;

pub use node::NodeState;
pub use scheduler::batch;
