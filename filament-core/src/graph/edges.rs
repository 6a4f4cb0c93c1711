//! Graph Edges
//!
//! This module implements the bidirectional edge storage between sources
//! (signals, memos) and the computations that observe them.
//!
//! # How Edges Work
//!
//! Every edge is recorded twice:
//!
//! - The source keeps a list of its observers.
//! - The observer keeps a list of its sources.
//!
//! Each side also records the index ("slot") at which it appears in the
//! other side's list. Removal swaps the last entry into the vacated slot
//! and patches the moved entry's slot record, so unlinking an edge is O(1)
//! no matter how many observers a source has.
//!
//! # Memory Layout
//!
//! Most nodes have a handful of edges, so both lists store their first
//! few entries inline before spilling to the heap.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::node::Computation;

/// Number of edges stored inline before spilling to the heap.
pub(crate) const INLINE_EDGES: usize = 4;

/// Anything that exposes an observer list: signals and memo nodes.
pub trait SignalEdges {
    /// The observer list for this source.
    fn edges(&self) -> &RefCell<EdgeList>;
}

/// A reference to an upstream source held by an observing computation.
#[derive(Clone)]
pub enum SourceRef {
    /// A plain signal.
    Signal(Rc<dyn SignalEdges>),

    /// A memo node. Kept as a computation so marking can walk further
    /// downstream through it.
    Memo(Rc<Computation>),
}

impl SourceRef {
    /// The observer list of the referenced source.
    pub fn edges(&self) -> &RefCell<EdgeList> {
        match self {
            SourceRef::Signal(signal) => signal.edges(),
            SourceRef::Memo(node) => &node.observers,
        }
    }
}

/// The downstream half of the edge store: who observes this source.
///
/// `slots[i]` is the index at which this source appears in observer `i`'s
/// source list, so the reverse record can be found without searching.
#[derive(Default)]
pub struct EdgeList {
    observers: SmallVec<[Weak<Computation>; INLINE_EDGES]>,
    slots: SmallVec<[usize; INLINE_EDGES]>,
}

impl EdgeList {
    /// Attach an observer. `source_index` is where this source sits in the
    /// observer's own source list. Returns the slot assigned to the observer.
    pub fn attach(&mut self, observer: Weak<Computation>, source_index: usize) -> usize {
        self.observers.push(observer);
        self.slots.push(source_index);
        self.observers.len() - 1
    }

    /// Detach the observer at `slot` by swapping the last entry into its
    /// place. Returns the moved observer and its source index so the caller
    /// can patch the moved observer's slot record, or `None` if the removed
    /// entry was already last.
    pub fn detach(&mut self, slot: usize) -> Option<(Weak<Computation>, usize)> {
        let last = self.observers.len() - 1;
        self.observers.swap_remove(slot);
        self.slots.swap_remove(slot);
        if slot < last {
            Some((self.observers[slot].clone(), self.slots[slot]))
        } else {
            None
        }
    }

    /// Number of attached observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether any observer is attached.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Upgrade all live observers, in slot order.
    ///
    /// Marking mutates observer state and queues while iterating, so
    /// callers work from this snapshot rather than the live list.
    pub fn snapshot(&self) -> Vec<Rc<Computation>> {
        self.observers.iter().filter_map(Weak::upgrade).collect()
    }
}

/// The upstream half of the edge store: which sources a computation reads.
///
/// Each entry pairs the source with the slot this computation occupies in
/// that source's observer list.
#[derive(Default)]
pub struct SourceList {
    entries: SmallVec<[(SourceRef, usize); INLINE_EDGES]>,
}

impl SourceList {
    /// Record a source and the observer slot it assigned us.
    pub fn push(&mut self, source: SourceRef, slot: usize) {
        self.entries.push((source, slot));
    }

    /// Number of recorded sources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The source and slot at `index`, if present.
    pub fn get(&self, index: usize) -> Option<(SourceRef, usize)> {
        self.entries.get(index).cloned()
    }

    /// Patch the observer slot recorded at `index`. Called when a swap
    /// removal in the source's observer list moved us to a new slot.
    pub fn set_slot(&mut self, index: usize, slot: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.1 = slot;
        }
    }

    /// Drop every recorded source.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
